//! 用户内存存储实现

use crate::error::StorageError;
use crate::models::UserRecord;
use crate::traits::UserStore;
use crate::validation::ensure_tenant;
use domain::TenantContext;
use std::collections::HashMap;
use std::sync::RwLock;

/// 用户内存存储（键为 user_id）。
pub struct InMemoryUserStore {
    users: RwLock<HashMap<String, UserRecord>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
        }
    }

    /// 内置超级管理员（tenant-1 / user-1）。
    pub fn with_default_admin() -> Self {
        let store = Self::new();
        let admin = UserRecord {
            tenant_id: "tenant-1".to_string(),
            user_id: "user-1".to_string(),
            username: "admin".to_string(),
            dept_id: None,
            roles: vec![domain::permissions::ROLE_ADMIN.to_string()],
            permissions: domain::permissions::PERMISSION_CODES
                .iter()
                .map(|code| (*code).to_string())
                .collect(),
            is_superuser: true,
            push_enabled: true,
            is_active: true,
        };
        if let Ok(mut users) = store.users.write() {
            users.insert(admin.user_id.clone(), admin);
        }
        store
    }

    pub fn upsert(&self, user: UserRecord) -> Result<(), StorageError> {
        let mut users = self
            .users
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        users.insert(user.user_id.clone(), user);
        Ok(())
    }

    fn select<F>(&self, ctx: &TenantContext, filter: F) -> Result<Vec<String>, StorageError>
    where
        F: Fn(&UserRecord) -> bool,
    {
        ensure_tenant(ctx)?;
        let users = self
            .users
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        let mut ids: Vec<String> = users
            .values()
            .filter(|user| user.tenant_id == ctx.tenant_id && user.is_active && filter(user))
            .map(|user| user.user_id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }
}

impl Default for InMemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_user(
        &self,
        ctx: &TenantContext,
        user_id: &str,
    ) -> Result<Option<UserRecord>, StorageError> {
        ensure_tenant(ctx)?;
        let users = self
            .users
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        Ok(users
            .get(user_id)
            .filter(|user| user.tenant_id == ctx.tenant_id)
            .cloned())
    }

    async fn find_users(
        &self,
        ctx: &TenantContext,
        user_ids: &[String],
    ) -> Result<Vec<UserRecord>, StorageError> {
        ensure_tenant(ctx)?;
        let users = self
            .users
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        Ok(user_ids
            .iter()
            .filter_map(|id| users.get(id))
            .filter(|user| user.tenant_id == ctx.tenant_id)
            .cloned()
            .collect())
    }

    async fn list_user_ids_by_departments(
        &self,
        ctx: &TenantContext,
        dept_ids: &[String],
    ) -> Result<Vec<String>, StorageError> {
        self.select(ctx, |user| {
            user.dept_id
                .as_ref()
                .map(|dept| dept_ids.contains(dept))
                .unwrap_or(false)
        })
    }

    async fn list_user_ids_by_roles(
        &self,
        ctx: &TenantContext,
        roles: &[String],
    ) -> Result<Vec<String>, StorageError> {
        self.select(ctx, |user| user.roles.iter().any(|role| roles.contains(role)))
    }

    async fn list_active_user_ids(&self, ctx: &TenantContext) -> Result<Vec<String>, StorageError> {
        self.select(ctx, |_| true)
    }
}
