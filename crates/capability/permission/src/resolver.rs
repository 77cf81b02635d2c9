//! 数据权限解析。
//!
//! 解析顺序：
//! 1. 超级管理员直接放行
//! 2. 每条授权只保留作用于目标表的规则，单条规则时组合方式固定为 OR
//! 3. ALL 规则：AND 授权中被丢弃（单位元），OR 授权整体退化为该 ALL 规则；
//!    AND 授权丢弃 ALL 后没有剩余规则时为恒假
//! 4. 用户直属授权构成第一层（OR），随后按祖先链由近及远逐层合并，
//!    每层内部与层间合并都使用该部门的 `mode_type`
//! 5. 没有任何一层产生结果时拒绝全部

use crate::builder::build_fragment;
use crate::combinator::{combine, combine_pair, effective_mode};
use crate::value::{ValueEnv, referenced_departments, resolve_value};
use admin_storage::{DataPermissionStore, DepartmentStore, StorageError};
use domain::{DataPermission, DepartmentNode, ModeType, PermissionRule, Predicate, TenantContext};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// 解析结果。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "scope", content = "predicate", rename_all = "snake_case")]
pub enum DataScope {
    AllowAll,
    DenyAll,
    Filter(Predicate),
}

impl DataScope {
    pub fn from_predicate(predicate: Predicate) -> Self {
        match predicate {
            Predicate::True => Self::AllowAll,
            Predicate::False => Self::DenyAll,
            other => Self::Filter(other),
        }
    }

    /// 交给表查询能力的谓词。
    pub fn predicate(&self) -> Predicate {
        match self {
            Self::AllowAll => Predicate::True,
            Self::DenyAll => Predicate::False,
            Self::Filter(predicate) => predicate.clone(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AllowAll => "allow_all",
            Self::DenyAll => "deny_all",
            Self::Filter(_) => "filter",
        }
    }
}

/// 祖先链中的一层。
#[derive(Debug, Clone)]
pub struct DepartmentLevel {
    pub department: DepartmentNode,
    pub grants: Vec<DataPermission>,
}

/// 解析一次所需的全部授权数据。
#[derive(Debug, Clone, Default)]
pub struct GrantCatalog {
    /// 直接授予用户的授权。
    pub own: Vec<DataPermission>,
    /// 由近及远：用户所在部门、父部门……根部门。
    pub levels: Vec<DepartmentLevel>,
    /// 部门 ID -> 全部后代 ID（含自身）。
    pub descendants: HashMap<String, Vec<String>>,
}

fn rule_fragment(rule: &PermissionRule, env: &ValueEnv<'_>) -> Predicate {
    let value = resolve_value(&rule.kind, env);
    build_fragment(&rule.field, &rule.match_op, &value, rule.exclude)
}

/// 单条授权对目标表的谓词；没有适用规则时返回 None。
pub fn grant_predicate(grant: &DataPermission, table: &str, env: &ValueEnv<'_>) -> Option<Predicate> {
    let mut rules: Vec<&PermissionRule> = grant
        .rules
        .iter()
        .filter(|rule| rule.applies_to(table))
        .collect();
    if rules.is_empty() {
        return None;
    }
    let mode = effective_mode(rules.len(), grant.mode);
    if rules.iter().any(|rule| rule.kind.is_all()) {
        match mode {
            ModeType::Or => {
                let all_rule = rules
                    .iter()
                    .find(|rule| rule.kind.is_all() && !rule.exclude)
                    .or_else(|| rules.iter().find(|rule| rule.kind.is_all()))
                    .copied()?;
                return Some(rule_fragment(all_rule, env));
            }
            ModeType::And => {
                rules.retain(|rule| !rule.kind.is_all());
                if rules.is_empty() {
                    return Some(Predicate::False);
                }
            }
        }
    }
    Some(combine(
        rules.into_iter().map(|rule| rule_fragment(rule, env)),
        mode,
    ))
}

fn level_predicate(
    grants: &[DataPermission],
    mode: ModeType,
    table: &str,
    env: &ValueEnv<'_>,
) -> Option<Predicate> {
    let predicates: Vec<Predicate> = grants
        .iter()
        .filter(|grant| grant.is_active)
        .filter_map(|grant| grant_predicate(grant, table, env))
        .collect();
    if predicates.is_empty() {
        None
    } else {
        Some(combine(predicates, mode))
    }
}

/// 纯计算：根据已加载的授权数据解析目标表的数据范围。
pub fn resolve(ctx: &TenantContext, table: &str, catalog: &GrantCatalog, now_secs: i64) -> DataScope {
    if ctx.is_superuser {
        return DataScope::AllowAll;
    }
    let env = ValueEnv {
        ctx,
        now_secs,
        descendants: &catalog.descendants,
    };
    let mut accumulated = level_predicate(&catalog.own, ModeType::Or, table, &env);
    for level in &catalog.levels {
        if !level.department.is_active {
            continue;
        }
        let mode = level.department.mode;
        let Some(predicate) = level_predicate(&level.grants, mode, table, &env) else {
            continue;
        };
        accumulated = Some(match accumulated {
            None => predicate,
            Some(previous) => combine_pair(previous, predicate, mode),
        });
    }
    match accumulated {
        Some(predicate) => DataScope::from_predicate(predicate),
        None => DataScope::DenyAll,
    }
}

/// 数据权限解析错误。
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// 加载授权与部门层级后解析数据范围。
pub struct DataScopeResolver {
    departments: Arc<dyn DepartmentStore>,
    permissions: Arc<dyn DataPermissionStore>,
}

impl DataScopeResolver {
    pub fn new(
        departments: Arc<dyn DepartmentStore>,
        permissions: Arc<dyn DataPermissionStore>,
    ) -> Self {
        Self {
            departments,
            permissions,
        }
    }

    /// 读取用户直属授权、祖先链各层授权，并预取规则引用部门的后代集合。
    pub async fn load_catalog(
        &self,
        ctx: &TenantContext,
        table: &str,
    ) -> Result<GrantCatalog, ResolveError> {
        let mut catalog = GrantCatalog::default();
        if let Some(user_id) = ctx.user() {
            catalog.own = self.permissions.list_for_user(ctx, user_id).await?;
        }
        if let Some(dept_id) = ctx.dept_id.as_deref() {
            for department in self.departments.ancestors(ctx, dept_id).await? {
                let grants = if department.is_active {
                    self.permissions
                        .list_for_department(ctx, &department.dept_id)
                        .await?
                } else {
                    Vec::new()
                };
                catalog.levels.push(DepartmentLevel { department, grants });
            }
        }

        let mut referenced = BTreeSet::new();
        let all_grants = catalog
            .own
            .iter()
            .chain(catalog.levels.iter().flat_map(|level| level.grants.iter()));
        for grant in all_grants {
            for rule in grant.rules.iter().filter(|rule| rule.applies_to(table)) {
                referenced.extend(referenced_departments(&rule.kind, ctx));
            }
        }
        for dept_id in referenced {
            let ids = self.departments.descendants(ctx, &dept_id).await?;
            catalog.descendants.insert(dept_id, ids);
        }
        Ok(catalog)
    }

    /// 按当前时间解析。
    pub async fn resolve_predicate(
        &self,
        ctx: &TenantContext,
        table: &str,
    ) -> Result<DataScope, ResolveError> {
        self.resolve_at(ctx, table, now_epoch_seconds()).await
    }

    pub async fn resolve_at(
        &self,
        ctx: &TenantContext,
        table: &str,
        now_secs: i64,
    ) -> Result<DataScope, ResolveError> {
        let scope = if ctx.is_superuser {
            DataScope::AllowAll
        } else {
            let catalog = self.load_catalog(ctx, table).await?;
            resolve(ctx, table, &catalog, now_secs)
        };
        match scope {
            DataScope::AllowAll => admin_telemetry::record_scope_allow_all(),
            DataScope::DenyAll => admin_telemetry::record_scope_deny_all(),
            DataScope::Filter(_) => admin_telemetry::record_scope_filtered(),
        }
        tracing::debug!(
            target: "admin.permission",
            tenant_id = %ctx.tenant_id,
            user_id = %ctx.user_id,
            table,
            scope = scope.as_str(),
            "data_scope_resolved"
        );
        Ok(scope)
    }
}

fn now_epoch_seconds() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_secs() as i64)
        .unwrap_or_default()
}
