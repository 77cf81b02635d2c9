//! 表查询能力的内存实现：行以 JSON 对象保存，谓词直接求值。

use crate::error::StorageError;
use crate::traits::RowQuery;
use crate::validation::ensure_tenant;
use domain::{Predicate, TenantContext};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::RwLock;

pub struct InMemoryRowStore {
    /// (tenant_id, table) -> rows
    tables: RwLock<HashMap<(String, String), Vec<Value>>>,
}

impl InMemoryRowStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
        }
    }

    pub fn insert_rows(
        &self,
        tenant_id: &str,
        table: &str,
        rows: impl IntoIterator<Item = Value>,
    ) -> Result<(), StorageError> {
        let mut tables = self
            .tables
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        tables
            .entry((tenant_id.to_string(), table.to_string()))
            .or_default()
            .extend(rows);
        Ok(())
    }
}

impl Default for InMemoryRowStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl RowQuery for InMemoryRowStore {
    async fn apply_predicate(
        &self,
        ctx: &TenantContext,
        table: &str,
        predicate: &Predicate,
    ) -> Result<Vec<Value>, StorageError> {
        ensure_tenant(ctx)?;
        if predicate.is_false() {
            return Ok(Vec::new());
        }
        let tables = self
            .tables
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        Ok(tables
            .get(&(ctx.tenant_id.clone(), table.to_string()))
            .map(|rows| {
                rows.iter()
                    .filter(|row| predicate.matches(row))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}
