//! Postgres 数据权限授权实现
//!
//! 规则列表保存在 jsonb 列；单条规则解析失败时跳过该规则并记录告警，
//! 不影响同一授权内的其他规则。

use crate::error::StorageError;
use crate::postgres::department::parse_mode;
use crate::traits::DataPermissionStore;
use crate::validation::ensure_tenant;
use domain::{DataPermission, GrantScope, PermissionRule, TenantContext};
use serde_json::Value;
use sqlx::{PgPool, Row};

pub struct PgDataPermissionStore {
    pub pool: PgPool,
}

impl PgDataPermissionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn list(
        &self,
        ctx: &TenantContext,
        scope_type: &str,
        scope_id: &str,
    ) -> Result<Vec<DataPermission>, StorageError> {
        ensure_tenant(ctx)?;
        let rows = sqlx::query(
            "select permission_id, tenant_id, name, mode_type, rules, is_active \
             from data_permissions \
             where tenant_id = $1 and scope_type = $2 and scope_id = $3 and is_active \
             order by permission_id",
        )
        .bind(&ctx.tenant_id)
        .bind(scope_type)
        .bind(scope_id)
        .fetch_all(&self.pool)
        .await?;
        let mut grants = Vec::with_capacity(rows.len());
        for row in rows {
            let permission_id: String = row.try_get("permission_id")?;
            let mode: String = row.try_get("mode_type")?;
            let rules: Value = row.try_get("rules")?;
            let scope = match scope_type {
                "department" => GrantScope::Department(scope_id.to_string()),
                _ => GrantScope::User(scope_id.to_string()),
            };
            grants.push(DataPermission {
                rules: parse_rules(&permission_id, rules),
                permission_id,
                tenant_id: row.try_get("tenant_id")?,
                name: row.try_get("name")?,
                scope,
                mode: parse_mode(&mode),
                is_active: row.try_get("is_active")?,
            });
        }
        Ok(grants)
    }
}

fn parse_rules(permission_id: &str, rules: Value) -> Vec<PermissionRule> {
    let Value::Array(items) = rules else {
        tracing::warn!(
            target: "admin.storage",
            permission_id,
            "data_permission_rules_not_array"
        );
        return Vec::new();
    };
    items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value::<PermissionRule>(item) {
            Ok(rule) => Some(rule),
            Err(err) => {
                tracing::warn!(
                    target: "admin.storage",
                    permission_id,
                    index,
                    error = %err,
                    "data_permission_rule_skipped"
                );
                None
            }
        })
        .collect()
}

#[async_trait::async_trait]
impl DataPermissionStore for PgDataPermissionStore {
    async fn list_for_user(
        &self,
        ctx: &TenantContext,
        user_id: &str,
    ) -> Result<Vec<DataPermission>, StorageError> {
        self.list(ctx, "user", user_id).await
    }

    async fn list_for_department(
        &self,
        ctx: &TenantContext,
        dept_id: &str,
    ) -> Result<Vec<DataPermission>, StorageError> {
        self.list(ctx, "department", dept_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bad_rule_is_skipped_others_kept() {
        let rules = parse_rules(
            "p1",
            json!([
                {"type": "OWNER", "field": "creator_id", "match": "exact"},
                {"type": "DATE", "field": "created_at", "value": "soon", "match": "gte"}
            ]),
        );
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].field, "creator_id");
    }
}
