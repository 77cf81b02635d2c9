//! 存储接口定义
//!
//! 所有方法显式接收 `TenantContext`，实现负责按租户隔离。

use crate::error::StorageError;
use crate::models::{NoticeCreate, NoticeRecord, UserRecord};
use domain::{DataPermission, DepartmentNode, Predicate, TenantContext};
use serde_json::Value;

#[async_trait::async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user(
        &self,
        ctx: &TenantContext,
        user_id: &str,
    ) -> Result<Option<UserRecord>, StorageError>;

    /// 按 ID 批量读取；不存在的 ID 被忽略。
    async fn find_users(
        &self,
        ctx: &TenantContext,
        user_ids: &[String],
    ) -> Result<Vec<UserRecord>, StorageError>;

    async fn list_user_ids_by_departments(
        &self,
        ctx: &TenantContext,
        dept_ids: &[String],
    ) -> Result<Vec<String>, StorageError>;

    async fn list_user_ids_by_roles(
        &self,
        ctx: &TenantContext,
        roles: &[String],
    ) -> Result<Vec<String>, StorageError>;

    /// 租户内全部启用用户。
    async fn list_active_user_ids(&self, ctx: &TenantContext) -> Result<Vec<String>, StorageError>;
}

/// 部门层级查询。
#[async_trait::async_trait]
pub trait DepartmentStore: Send + Sync {
    async fn find_department(
        &self,
        ctx: &TenantContext,
        dept_id: &str,
    ) -> Result<Option<DepartmentNode>, StorageError>;

    /// 祖先链：从部门自身开始，依次到根。
    async fn ancestors(
        &self,
        ctx: &TenantContext,
        dept_id: &str,
    ) -> Result<Vec<DepartmentNode>, StorageError>;

    /// 全部后代部门 ID（含自身）。
    async fn descendants(
        &self,
        ctx: &TenantContext,
        dept_id: &str,
    ) -> Result<Vec<String>, StorageError>;
}

/// 数据权限授权读取（只返回启用的授权）。
#[async_trait::async_trait]
pub trait DataPermissionStore: Send + Sync {
    async fn list_for_user(
        &self,
        ctx: &TenantContext,
        user_id: &str,
    ) -> Result<Vec<DataPermission>, StorageError>;

    async fn list_for_department(
        &self,
        ctx: &TenantContext,
        dept_id: &str,
    ) -> Result<Vec<DataPermission>, StorageError>;
}

#[async_trait::async_trait]
pub trait NoticeStore: Send + Sync {
    async fn create_notice(
        &self,
        ctx: &TenantContext,
        notice: NoticeCreate,
    ) -> Result<NoticeRecord, StorageError>;

    /// 接收人集合包含该用户的通知，按创建时间倒序。
    async fn list_notices_for_user(
        &self,
        ctx: &TenantContext,
        user_id: &str,
    ) -> Result<Vec<NoticeRecord>, StorageError>;
}

/// 表查询能力：按谓词返回行（JSON 对象）。
#[async_trait::async_trait]
pub trait RowQuery: Send + Sync {
    async fn apply_predicate(
        &self,
        ctx: &TenantContext,
        table: &str,
        predicate: &Predicate,
    ) -> Result<Vec<Value>, StorageError>;
}
