//! admin-api 启动入口。
//!
//! 未配置 ADMIN_DATABASE_URL 时使用内存存储（内置 tenant-1 / user-1 超级管理员）；
//! 未配置 ADMIN_REDIS_URLS 时在线分组使用内存实现。

use admin_api::{AppState, AppStores, build_app};
use admin_auth::JwtManager;
use admin_config::AppConfig;
use admin_storage::{
    InMemoryDataPermissionStore, InMemoryDepartmentStore, InMemoryNoticeStore,
    InMemoryPresenceStore, InMemoryRowStore, InMemoryUserStore, PgDataPermissionStore,
    PgDepartmentStore, PgNoticeStore, PgRowStore, PgUserStore, PresenceExpiry, PresenceStore,
    RedisPresenceStore, connect_pool,
};
use admin_telemetry::init_tracing;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载本地 .env（如存在），便于直接 cargo run 启动
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;
    init_tracing();

    let expiry = PresenceExpiry::new(
        config.presence.layer_expire_seconds,
        config.presence.group_ttl_seconds,
    );
    let presence: Arc<dyn PresenceStore> = if config.redis_urls.is_empty() {
        Arc::new(InMemoryPresenceStore::new(expiry))
    } else {
        Arc::new(RedisPresenceStore::connect(
            &config.redis_urls,
            &config.redis_key_prefix,
            expiry,
        )?)
    };

    let stores = match &config.database_url {
        Some(database_url) => {
            let pool = connect_pool(database_url).await?;
            AppStores {
                users: Arc::new(PgUserStore::new(pool.clone())),
                departments: Arc::new(PgDepartmentStore::new(pool.clone())),
                permissions: Arc::new(PgDataPermissionStore::new(pool.clone())),
                notices: Arc::new(PgNoticeStore::new(pool.clone())),
                rows: Arc::new(PgRowStore::new(pool)),
                presence,
            }
        }
        None => {
            tracing::warn!(target: "admin.api", "database_url_missing_using_in_memory_stores");
            AppStores {
                users: Arc::new(InMemoryUserStore::with_default_admin()),
                departments: Arc::new(InMemoryDepartmentStore::new()),
                permissions: Arc::new(InMemoryDataPermissionStore::new()),
                notices: Arc::new(InMemoryNoticeStore::new()),
                rows: Arc::new(InMemoryRowStore::new()),
                presence,
            }
        }
    };

    let jwt = JwtManager::new(config.jwt_secret.clone(), config.jwt_access_ttl_seconds);
    let state = AppState::new(Arc::new(jwt), stores, &config.presence.group_prefix);
    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind(&config.http_addr).await?;
    tracing::info!(target: "admin.api", addr = %config.http_addr, "server_started");
    axum::serve(listener, app).await?;
    Ok(())
}
