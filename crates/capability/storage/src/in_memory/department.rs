//! 部门树内存实现

use crate::error::StorageError;
use crate::traits::DepartmentStore;
use crate::validation::ensure_tenant;
use domain::{DepartmentNode, TenantContext};
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

pub struct InMemoryDepartmentStore {
    departments: RwLock<HashMap<String, DepartmentNode>>,
}

impl InMemoryDepartmentStore {
    pub fn new() -> Self {
        Self {
            departments: RwLock::new(HashMap::new()),
        }
    }

    pub fn upsert(&self, node: DepartmentNode) -> Result<(), StorageError> {
        let mut departments = self
            .departments
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        departments.insert(node.dept_id.clone(), node);
        Ok(())
    }
}

impl Default for InMemoryDepartmentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl DepartmentStore for InMemoryDepartmentStore {
    async fn find_department(
        &self,
        ctx: &TenantContext,
        dept_id: &str,
    ) -> Result<Option<DepartmentNode>, StorageError> {
        ensure_tenant(ctx)?;
        let departments = self
            .departments
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        Ok(departments
            .get(dept_id)
            .filter(|node| node.tenant_id == ctx.tenant_id)
            .cloned())
    }

    async fn ancestors(
        &self,
        ctx: &TenantContext,
        dept_id: &str,
    ) -> Result<Vec<DepartmentNode>, StorageError> {
        ensure_tenant(ctx)?;
        let departments = self
            .departments
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = Some(dept_id.to_string());
        while let Some(id) = current {
            // 数据异常成环时截断
            if !seen.insert(id.clone()) {
                break;
            }
            let Some(node) = departments
                .get(&id)
                .filter(|node| node.tenant_id == ctx.tenant_id)
            else {
                break;
            };
            current = node.parent_id.clone();
            chain.push(node.clone());
        }
        Ok(chain)
    }

    async fn descendants(
        &self,
        ctx: &TenantContext,
        dept_id: &str,
    ) -> Result<Vec<String>, StorageError> {
        ensure_tenant(ctx)?;
        let departments = self
            .departments
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        if !departments
            .get(dept_id)
            .map(|node| node.tenant_id == ctx.tenant_id)
            .unwrap_or(false)
        {
            return Ok(Vec::new());
        }
        let mut children: HashMap<&str, Vec<&str>> = HashMap::new();
        for node in departments.values() {
            if node.tenant_id != ctx.tenant_id {
                continue;
            }
            if let Some(parent) = node.parent_id.as_deref() {
                children.entry(parent).or_default().push(node.dept_id.as_str());
            }
        }
        let mut result = Vec::new();
        let mut seen = HashSet::new();
        let mut stack = vec![dept_id];
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            result.push(id.to_string());
            if let Some(items) = children.get(id) {
                stack.extend(items.iter().copied());
            }
        }
        result.sort();
        Ok(result)
    }
}
