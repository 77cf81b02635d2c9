//! 内存存储实现模块
//!
//! 用于单进程部署和测试；未配置数据库 / Redis 时由 admin-api 选用。

pub mod data_permission;
pub mod department;
pub mod notice;
pub mod presence;
pub mod rows;
pub mod user;

pub use data_permission::*;
pub use department::*;
pub use notice::*;
pub use presence::*;
pub use rows::*;
pub use user::*;
