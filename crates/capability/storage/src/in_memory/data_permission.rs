//! 数据权限授权内存实现

use crate::error::StorageError;
use crate::traits::DataPermissionStore;
use crate::validation::ensure_tenant;
use domain::{DataPermission, GrantScope, TenantContext};
use std::sync::RwLock;

pub struct InMemoryDataPermissionStore {
    grants: RwLock<Vec<DataPermission>>,
}

impl InMemoryDataPermissionStore {
    pub fn new() -> Self {
        Self {
            grants: RwLock::new(Vec::new()),
        }
    }

    /// 写入或替换（按 permission_id）。
    pub fn upsert(&self, grant: DataPermission) -> Result<(), StorageError> {
        let mut grants = self
            .grants
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        grants.retain(|item| item.permission_id != grant.permission_id);
        grants.push(grant);
        Ok(())
    }

    fn list(&self, ctx: &TenantContext, scope: &GrantScope) -> Result<Vec<DataPermission>, StorageError> {
        ensure_tenant(ctx)?;
        let grants = self
            .grants
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        Ok(grants
            .iter()
            .filter(|grant| {
                grant.is_active && grant.tenant_id == ctx.tenant_id && &grant.scope == scope
            })
            .cloned()
            .collect())
    }
}

impl Default for InMemoryDataPermissionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl DataPermissionStore for InMemoryDataPermissionStore {
    async fn list_for_user(
        &self,
        ctx: &TenantContext,
        user_id: &str,
    ) -> Result<Vec<DataPermission>, StorageError> {
        self.list(ctx, &GrantScope::User(user_id.to_string()))
    }

    async fn list_for_department(
        &self,
        ctx: &TenantContext,
        dept_id: &str,
    ) -> Result<Vec<DataPermission>, StorageError> {
        self.list(ctx, &GrantScope::Department(dept_id.to_string()))
    }
}
