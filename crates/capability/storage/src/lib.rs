//! # Admin Storage 模块
//!
//! 统一的数据存储抽象层：
//!
//! 1. **接口层**：`traits.rs`（用户、部门、数据权限、通知、表查询）与 `presence.rs`（在线分组）
//! 2. **模型层**：`models.rs`
//! 3. **错误与校验**：`error.rs`、`validation.rs`
//! 4. **实现层**：
//!    - `in_memory/`：`RwLock<HashMap>` 实现，用于单进程部署和测试
//!    - `postgres/`：sqlx 实现，谓词编译为参数化 SQL
//!    - `redis.rs`：在线分组的有序集合实现，支持多分片
//!
//! 所有业务存储接口显式接收 `TenantContext`；在线分组按分组名寻址，
//! 分组名与连接名在访问存储前校验。

pub mod connection;
pub mod error;
pub mod in_memory;
pub mod models;
pub mod postgres;
pub mod presence;
pub mod redis;
pub mod traits;
pub mod validation;

pub use connection::*;
pub use error::*;
pub use models::*;
pub use presence::*;
pub use redis::RedisPresenceStore;
pub use traits::*;
pub use validation::*;

pub use in_memory::{
    InMemoryDataPermissionStore, InMemoryDepartmentStore, InMemoryNoticeStore,
    InMemoryPresenceStore, InMemoryRowStore, InMemoryUserStore,
};

pub use postgres::{PgDataPermissionStore, PgDepartmentStore, PgNoticeStore, PgRowStore, PgUserStore};
