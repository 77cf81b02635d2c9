//! Postgres 部门树实现（递归 CTE）

use crate::error::StorageError;
use crate::traits::DepartmentStore;
use crate::validation::ensure_tenant;
use domain::{DepartmentNode, ModeType, TenantContext};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

/// 祖先链最大深度，防止脏数据成环。
const MAX_DEPTH: i32 = 64;

pub struct PgDepartmentStore {
    pub pool: PgPool,
}

impl PgDepartmentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

pub(crate) fn parse_mode(value: &str) -> ModeType {
    if value.eq_ignore_ascii_case("AND") {
        ModeType::And
    } else {
        ModeType::Or
    }
}

fn to_node(row: &PgRow) -> Result<DepartmentNode, StorageError> {
    let mode: String = row.try_get("mode_type")?;
    Ok(DepartmentNode {
        dept_id: row.try_get("dept_id")?,
        tenant_id: row.try_get("tenant_id")?,
        parent_id: row.try_get("parent_id")?,
        name: row.try_get("name")?,
        mode: parse_mode(&mode),
        is_active: row.try_get("is_active")?,
    })
}

#[async_trait::async_trait]
impl DepartmentStore for PgDepartmentStore {
    async fn find_department(
        &self,
        ctx: &TenantContext,
        dept_id: &str,
    ) -> Result<Option<DepartmentNode>, StorageError> {
        ensure_tenant(ctx)?;
        let row = sqlx::query(
            "select dept_id, tenant_id, parent_id, name, mode_type, is_active \
             from departments where tenant_id = $1 and dept_id = $2",
        )
        .bind(&ctx.tenant_id)
        .bind(dept_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(to_node).transpose()
    }

    async fn ancestors(
        &self,
        ctx: &TenantContext,
        dept_id: &str,
    ) -> Result<Vec<DepartmentNode>, StorageError> {
        ensure_tenant(ctx)?;
        let rows = sqlx::query(
            "with recursive chain as ( \
               select dept_id, tenant_id, parent_id, name, mode_type, is_active, 0 as depth \
               from departments where tenant_id = $1 and dept_id = $2 \
               union all \
               select d.dept_id, d.tenant_id, d.parent_id, d.name, d.mode_type, d.is_active, c.depth + 1 \
               from departments d \
               join chain c on d.tenant_id = c.tenant_id and d.dept_id = c.parent_id \
               where c.depth < $3 \
             ) \
             select dept_id, tenant_id, parent_id, name, mode_type, is_active \
             from chain order by depth",
        )
        .bind(&ctx.tenant_id)
        .bind(dept_id)
        .bind(MAX_DEPTH)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(to_node).collect()
    }

    async fn descendants(
        &self,
        ctx: &TenantContext,
        dept_id: &str,
    ) -> Result<Vec<String>, StorageError> {
        ensure_tenant(ctx)?;
        let ids: Vec<String> = sqlx::query_scalar(
            "with recursive tree as ( \
               select dept_id from departments where tenant_id = $1 and dept_id = $2 \
               union \
               select d.dept_id from departments d \
               join tree t on d.parent_id = t.dept_id \
               where d.tenant_id = $1 \
             ) \
             select dept_id from tree order by dept_id",
        )
        .bind(&ctx.tenant_id)
        .bind(dept_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }
}
