//! Postgres 表查询能力：谓词编译为 WHERE 子句，行以 jsonb 返回。

use crate::error::StorageError;
use crate::postgres::sql::{push_predicate, quote_table};
use crate::traits::RowQuery;
use crate::validation::ensure_tenant;
use domain::{Predicate, TenantContext};
use serde_json::Value;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};

pub struct PgRowStore {
    pub pool: PgPool,
}

impl PgRowStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl RowQuery for PgRowStore {
    async fn apply_predicate(
        &self,
        ctx: &TenantContext,
        table: &str,
        predicate: &Predicate,
    ) -> Result<Vec<Value>, StorageError> {
        ensure_tenant(ctx)?;
        let Some(table_sql) = quote_table(table) else {
            return Err(StorageError::validation(format!("invalid table: {table:?}")));
        };
        if predicate.is_false() {
            return Ok(Vec::new());
        }
        let mut builder = QueryBuilder::<Postgres>::new("select to_jsonb(t) as row from ");
        builder
            .push(table_sql)
            .push(" t where t.tenant_id = ")
            .push_bind(ctx.tenant_id.clone())
            .push(" and (");
        push_predicate(&mut builder, predicate);
        builder.push(")");
        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| row.try_get::<Value, _>("row").map_err(StorageError::from))
            .collect()
    }
}
