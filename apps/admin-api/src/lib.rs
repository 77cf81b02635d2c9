//! 管理后台 HTTP/WebSocket 服务：在线用户、消息通知与数据权限查询。

pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod utils;

use admin_auth::TokenVerifier;
use admin_notify::{LocalConnectionHub, NoticeService, PresenceService};
use admin_permission::DataScopeResolver;
use admin_storage::{
    DataPermissionStore, DepartmentStore, NoticeStore, PresenceStore, RowQuery, UserStore,
};
use axum::{Router, middleware as axum_middleware};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// 运行时依赖的全部存储。
pub struct AppStores {
    pub users: Arc<dyn UserStore>,
    pub departments: Arc<dyn DepartmentStore>,
    pub permissions: Arc<dyn DataPermissionStore>,
    pub notices: Arc<dyn NoticeStore>,
    pub rows: Arc<dyn RowQuery>,
    pub presence: Arc<dyn PresenceStore>,
}

#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<dyn TokenVerifier>,
    pub users: Arc<dyn UserStore>,
    pub notice_store: Arc<dyn NoticeStore>,
    pub rows: Arc<dyn RowQuery>,
    pub resolver: Arc<DataScopeResolver>,
    pub presence: Arc<PresenceService>,
    pub notices: Arc<NoticeService>,
    pub hub: Arc<LocalConnectionHub>,
}

impl AppState {
    pub fn new(auth: Arc<dyn TokenVerifier>, stores: AppStores, group_prefix: &str) -> Self {
        let hub = Arc::new(LocalConnectionHub::new());
        let presence = Arc::new(PresenceService::new(
            stores.presence,
            hub.clone(),
            group_prefix,
        ));
        let resolver = Arc::new(DataScopeResolver::new(
            stores.departments.clone(),
            stores.permissions,
        ));
        let notices = Arc::new(
            NoticeService::new(
                stores.users.clone(),
                stores.departments,
                stores.notices.clone(),
                presence.clone(),
            )
            .with_audience_scope(resolver.clone(), stores.rows.clone()),
        );
        Self {
            auth,
            users: stores.users,
            notice_store: stores.notices,
            rows: stores.rows,
            resolver,
            presence,
            notices,
            hub,
        }
    }
}

/// 组装路由与中间件；同时挂载在 `/` 与 `/api` 前缀下。
pub fn build_app(state: AppState) -> Router {
    let api = routes::create_api_router();
    Router::new()
        .merge(api.clone())
        .nest("/api", api)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(axum_middleware::from_fn(middleware::request_context))
}
