//! 路由定义
//!
//! - 健康检查与指标：/health, /metrics
//! - 在线用户：/online-users, /online-users/{user_id}/logout
//! - 消息通知：/notices, /notices/mine
//! - 数据权限：/data-scope/{table}, /tables/{table}/rows
//! - WebSocket：/ws?token=

use super::AppState;
use super::handlers::*;
use axum::{
    Router,
    routing::{get, post},
};

/// 创建 API 路由
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(get_metrics))
        .route("/online-users", get(list_online_users))
        .route("/online-users/:user_id/logout", post(logout_user))
        .route("/notices", post(create_notice))
        .route("/notices/mine", get(list_my_notices))
        .route("/data-scope/:table", get(get_data_scope))
        .route("/tables/:table/rows", get(list_table_rows))
        .route("/ws", get(ws_connect))
}
