//! 规则值的即时解析。
//!
//! 动态规则类型在构建片段前按当前用户解析：
//! - OWNER：当前用户 ID，无用户时为 `"0"`
//! - OWNER_DEPARTMENT：用户直属部门，无部门时为 `"0"`
//! - OWNER_DEPARTMENTS / DEPARTMENTS：部门及全部下级的 ID 列表，无部门时为空列表
//! - DATE：`now + offset`（负偏移表示过去）
//! - JSON / TABLE_*：字符串载荷先按 JSON 解码

use domain::{FieldValue, RuleKind, TenantContext};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};

/// 缺少用户或部门上下文时使用的哨兵值，保证匹配为空。
pub const MISSING_CONTEXT_SENTINEL: &str = "0";

/// 解析后的规则值。
#[derive(Debug, Clone, PartialEq)]
pub enum RuleValue {
    Scalar(FieldValue),
    List(Vec<FieldValue>),
}

impl RuleValue {
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Array(items) => Self::List(items.iter().map(FieldValue::from_json).collect()),
            other => Self::Scalar(FieldValue::from_json(other)),
        }
    }

    fn ids(ids: impl IntoIterator<Item = String>) -> Self {
        Self::List(ids.into_iter().map(FieldValue::Str).collect())
    }

    /// 值本身或列表中任一元素为 `"*"`。
    pub fn is_wildcard(&self) -> bool {
        match self {
            Self::Scalar(value) => value.is_wildcard(),
            Self::List(items) => items.iter().any(FieldValue::is_wildcard),
        }
    }

    /// 统一视为列表（标量为单元素列表，`null` 为空列表）。
    pub fn to_list(&self) -> Vec<FieldValue> {
        match self {
            Self::Scalar(FieldValue::Null) => Vec::new(),
            Self::Scalar(value) => vec![value.clone()],
            Self::List(items) => items.clone(),
        }
    }

    /// 列表中的文本条目（ip_in 使用）。
    pub fn texts(&self) -> Vec<String> {
        self.to_list()
            .into_iter()
            .filter_map(|value| match value {
                FieldValue::Str(text) => Some(text),
                FieldValue::Int(v) | FieldValue::Timestamp(v) => Some(v.to_string()),
                FieldValue::Bool(_) | FieldValue::Null => None,
            })
            .collect()
    }
}

/// 值解析所需的环境：当前用户、时间与预取的部门后代集合。
pub struct ValueEnv<'a> {
    pub ctx: &'a TenantContext,
    pub now_secs: i64,
    /// 部门 ID -> 全部后代 ID（含自身）。
    pub descendants: &'a HashMap<String, Vec<String>>,
}

impl ValueEnv<'_> {
    fn descendants_of<'d>(&self, dept_ids: impl IntoIterator<Item = &'d str>) -> Vec<String> {
        let mut ids = BTreeSet::new();
        for dept_id in dept_ids {
            match self.descendants.get(dept_id) {
                Some(items) => ids.extend(items.iter().cloned()),
                None => {
                    ids.insert(dept_id.to_string());
                }
            }
        }
        ids.into_iter().collect()
    }
}

/// 解析单条规则的值。
pub fn resolve_value(kind: &RuleKind, env: &ValueEnv<'_>) -> RuleValue {
    match kind {
        RuleKind::Owner => RuleValue::Scalar(FieldValue::Str(
            env.ctx.user().unwrap_or(MISSING_CONTEXT_SENTINEL).to_string(),
        )),
        RuleKind::OwnerDepartment => RuleValue::Scalar(FieldValue::Str(
            env.ctx
                .dept_id
                .as_deref()
                .unwrap_or(MISSING_CONTEXT_SENTINEL)
                .to_string(),
        )),
        RuleKind::OwnerDepartments => match env.ctx.dept_id.as_deref() {
            Some(dept_id) => RuleValue::ids(env.descendants_of([dept_id])),
            None => RuleValue::List(Vec::new()),
        },
        RuleKind::Departments(ids) => {
            RuleValue::ids(env.descendants_of(ids.iter().map(String::as_str)))
        }
        RuleKind::All => RuleValue::Scalar(FieldValue::Str("*".to_string())),
        RuleKind::Date { offset_seconds } => {
            RuleValue::Scalar(FieldValue::Timestamp(env.now_secs.saturating_add(*offset_seconds)))
        }
        RuleKind::Json(value)
        | RuleKind::TableUser(value)
        | RuleKind::TableRole(value)
        | RuleKind::TableDept(value)
        | RuleKind::TableMenu(value) => RuleValue::from_json(&decode_structured(value)),
        RuleKind::Field(value) => RuleValue::from_json(value),
    }
}

/// 字符串载荷若是合法 JSON 则解码，否则保持原样。
fn decode_structured(value: &Value) -> Value {
    match value {
        Value::String(text) => serde_json::from_str::<Value>(text).unwrap_or_else(|_| value.clone()),
        other => other.clone(),
    }
}

/// 规则引用的部门（用于预取后代集合）。
pub fn referenced_departments(kind: &RuleKind, ctx: &TenantContext) -> Vec<String> {
    match kind {
        RuleKind::OwnerDepartments => ctx.dept_id.iter().cloned().collect(),
        RuleKind::Departments(ids) => ids.clone(),
        _ => Vec::new(),
    }
}
