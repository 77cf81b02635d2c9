//! Postgres 用户存储实现

use crate::error::StorageError;
use crate::models::UserRecord;
use crate::traits::UserStore;
use crate::validation::ensure_tenant;
use domain::TenantContext;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use std::collections::HashMap;

const USER_COLUMNS: &str =
    "user_id, tenant_id, username, dept_id, is_superuser, push_enabled, is_active";

pub struct PgUserStore {
    pub pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 通过数据库 URL 建立连接池
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let pool = crate::connection::connect_pool(database_url).await?;
        Ok(Self { pool })
    }

    /// 批量读取角色与接口权限码。
    async fn load_grants(
        &self,
        tenant_id: &str,
        user_ids: &[String],
    ) -> Result<(HashMap<String, Vec<String>>, HashMap<String, Vec<String>>), StorageError> {
        let role_rows = sqlx::query(
            "select user_id, role_code from tenant_user_roles \
             where tenant_id = $1 and user_id = any($2)",
        )
        .bind(tenant_id)
        .bind(user_ids)
        .fetch_all(&self.pool)
        .await?;
        let mut roles: HashMap<String, Vec<String>> = HashMap::new();
        for row in role_rows {
            roles
                .entry(row.try_get("user_id")?)
                .or_default()
                .push(row.try_get("role_code")?);
        }

        let permission_rows = sqlx::query(
            "select distinct ur.user_id, rp.permission_code \
             from tenant_role_permissions rp \
             join tenant_user_roles ur \
               on ur.tenant_id = rp.tenant_id and ur.role_code = rp.role_code \
             where ur.tenant_id = $1 and ur.user_id = any($2)",
        )
        .bind(tenant_id)
        .bind(user_ids)
        .fetch_all(&self.pool)
        .await?;
        let mut permissions: HashMap<String, Vec<String>> = HashMap::new();
        for row in permission_rows {
            permissions
                .entry(row.try_get("user_id")?)
                .or_default()
                .push(row.try_get("permission_code")?);
        }
        Ok((roles, permissions))
    }

    async fn hydrate(&self, tenant_id: &str, rows: Vec<PgRow>) -> Result<Vec<UserRecord>, StorageError> {
        let mut users = Vec::with_capacity(rows.len());
        for row in rows {
            users.push(UserRecord {
                user_id: row.try_get("user_id")?,
                tenant_id: row.try_get("tenant_id")?,
                username: row.try_get("username")?,
                dept_id: row.try_get("dept_id")?,
                roles: Vec::new(),
                permissions: Vec::new(),
                is_superuser: row.try_get("is_superuser")?,
                push_enabled: row.try_get("push_enabled")?,
                is_active: row.try_get("is_active")?,
            });
        }
        if users.is_empty() {
            return Ok(users);
        }
        let ids: Vec<String> = users.iter().map(|user| user.user_id.clone()).collect();
        let (mut roles, mut permissions) = self.load_grants(tenant_id, &ids).await?;
        for user in &mut users {
            user.roles = roles.remove(&user.user_id).unwrap_or_default();
            user.permissions = permissions.remove(&user.user_id).unwrap_or_default();
        }
        Ok(users)
    }

    async fn select_ids(
        &self,
        sql: &str,
        tenant_id: &str,
        filter: &[String],
    ) -> Result<Vec<String>, StorageError> {
        let ids: Vec<String> = sqlx::query_scalar(sql)
            .bind(tenant_id)
            .bind(filter)
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }
}

#[async_trait::async_trait]
impl UserStore for PgUserStore {
    async fn find_user(
        &self,
        ctx: &TenantContext,
        user_id: &str,
    ) -> Result<Option<UserRecord>, StorageError> {
        let mut users = self.find_users(ctx, &[user_id.to_string()]).await?;
        Ok(users.pop())
    }

    async fn find_users(
        &self,
        ctx: &TenantContext,
        user_ids: &[String],
    ) -> Result<Vec<UserRecord>, StorageError> {
        ensure_tenant(ctx)?;
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query(&format!(
            "select {USER_COLUMNS} from users where tenant_id = $1 and user_id = any($2)"
        ))
        .bind(&ctx.tenant_id)
        .bind(user_ids)
        .fetch_all(&self.pool)
        .await?;
        self.hydrate(&ctx.tenant_id, rows).await
    }

    async fn list_user_ids_by_departments(
        &self,
        ctx: &TenantContext,
        dept_ids: &[String],
    ) -> Result<Vec<String>, StorageError> {
        ensure_tenant(ctx)?;
        self.select_ids(
            "select user_id from users \
             where tenant_id = $1 and is_active and dept_id = any($2) order by user_id",
            &ctx.tenant_id,
            dept_ids,
        )
        .await
    }

    async fn list_user_ids_by_roles(
        &self,
        ctx: &TenantContext,
        roles: &[String],
    ) -> Result<Vec<String>, StorageError> {
        ensure_tenant(ctx)?;
        self.select_ids(
            "select distinct u.user_id from users u \
             join tenant_user_roles ur on ur.tenant_id = u.tenant_id and ur.user_id = u.user_id \
             where u.tenant_id = $1 and u.is_active and ur.role_code = any($2) order by u.user_id",
            &ctx.tenant_id,
            roles,
        )
        .await
    }

    async fn list_active_user_ids(&self, ctx: &TenantContext) -> Result<Vec<String>, StorageError> {
        ensure_tenant(ctx)?;
        let ids: Vec<String> = sqlx::query_scalar(
            "select user_id from users where tenant_id = $1 and is_active order by user_id",
        )
        .bind(&ctx.tenant_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }
}
