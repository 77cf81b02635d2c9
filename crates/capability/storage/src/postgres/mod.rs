//! # PostgreSQL 存储实现模块
//!
//! 所有查询参数化并显式带 `tenant_id` 条件。
//!
//! ## 依赖的表
//!
//! - `users`（user_id, tenant_id, username, dept_id, is_superuser, push_enabled, is_active）
//! - `tenant_user_roles`（tenant_id, user_id, role_code）
//! - `tenant_role_permissions`（tenant_id, role_code, permission_code）
//! - `departments`（dept_id, tenant_id, parent_id, name, mode_type, is_active）
//! - `data_permissions`（permission_id, tenant_id, name, scope_type, scope_id, mode_type, rules jsonb, is_active）
//!   - scope_type 取值 `user` / `department`
//! - `notices`（notice_id, tenant_id, title, content, level, notice_type, target jsonb, created_by, created_at）
//! - `notice_recipients`（tenant_id, notice_id, user_id），主键 (tenant_id, notice_id, user_id)
//! - 业务表以 `"<app>"."<model>"`（schema.table）访问，且必须有 `tenant_id` 列

pub mod data_permission;
pub mod department;
pub mod notice;
pub mod rows;
pub mod sql;
pub mod user;

pub use data_permission::*;
pub use department::*;
pub use notice::*;
pub use rows::*;
pub use user::*;
