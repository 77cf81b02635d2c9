//! 数据权限规则词汇表。
//!
//! 规则以 JSON 形式持久化：
//!
//! ```json
//! {"table": "system.users", "type": "OWNER", "field": "creator_id",
//!  "value": null, "match": "exact", "exclude": false}
//! ```
//!
//! 反序列化时转换为封闭的 [`RuleKind`] × [`MatchOp`]，每种规则类型携带自己的载荷。

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 匹配所有表的通配符。
pub const TABLE_WILDCARD: &str = "*";

/// 规则组合方式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ModeType {
    And,
    #[default]
    Or,
}

/// 匹配运算符；未知运算符保留原名，按属性后缀查询处理。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MatchOp {
    Exact,
    Contains,
    StartsWith,
    EndsWith,
    Gte,
    Lte,
    Gt,
    Lt,
    Regex,
    In,
    IpIn,
    M2mIn,
    M2mAll,
    All,
    Lookup(String),
}

impl MatchOp {
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "" | "exact" => Self::Exact,
            "contains" => Self::Contains,
            "startswith" => Self::StartsWith,
            "endswith" => Self::EndsWith,
            "gte" => Self::Gte,
            "lte" => Self::Lte,
            "gt" => Self::Gt,
            "lt" => Self::Lt,
            "regex" => Self::Regex,
            "in" => Self::In,
            "ip_in" => Self::IpIn,
            "m2m_in" => Self::M2mIn,
            "m2m_all" => Self::M2mAll,
            "all" => Self::All,
            other => Self::Lookup(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Exact => "exact",
            Self::Contains => "contains",
            Self::StartsWith => "startswith",
            Self::EndsWith => "endswith",
            Self::Gte => "gte",
            Self::Lte => "lte",
            Self::Gt => "gt",
            Self::Lt => "lt",
            Self::Regex => "regex",
            Self::In => "in",
            Self::IpIn => "ip_in",
            Self::M2mIn => "m2m_in",
            Self::M2mAll => "m2m_all",
            Self::All => "all",
            Self::Lookup(name) => name,
        }
    }
}

/// 规则类型及其载荷。
#[derive(Debug, Clone, PartialEq)]
pub enum RuleKind {
    /// 本人创建的数据。
    Owner,
    /// 本部门数据。
    OwnerDepartment,
    /// 本部门及下级部门数据。
    OwnerDepartments,
    /// 指定部门（含下级）数据。
    Departments(Vec<String>),
    /// 全部数据。
    All,
    /// 相对当前时间的偏移（秒）；负数表示过去。
    Date { offset_seconds: i64 },
    Json(Value),
    TableUser(Value),
    TableRole(Value),
    TableDept(Value),
    TableMenu(Value),
    /// 普通字段匹配。
    Field(Value),
}

impl RuleKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Owner => "OWNER",
            Self::OwnerDepartment => "OWNER_DEPARTMENT",
            Self::OwnerDepartments => "OWNER_DEPARTMENTS",
            Self::Departments(_) => "DEPARTMENTS",
            Self::All => "ALL",
            Self::Date { .. } => "DATE",
            Self::Json(_) => "JSON",
            Self::TableUser(_) => "TABLE_USER",
            Self::TableRole(_) => "TABLE_ROLE",
            Self::TableDept(_) => "TABLE_DEPT",
            Self::TableMenu(_) => "TABLE_MENU",
            Self::Field(_) => "FIELD",
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }

    fn raw_value(&self) -> Value {
        match self {
            Self::Owner | Self::OwnerDepartment | Self::OwnerDepartments | Self::All => Value::Null,
            Self::Departments(ids) => Value::from(ids.clone()),
            Self::Date { offset_seconds } => Value::from(*offset_seconds),
            Self::Json(value)
            | Self::TableUser(value)
            | Self::TableRole(value)
            | Self::TableDept(value)
            | Self::TableMenu(value)
            | Self::Field(value) => value.clone(),
        }
    }
}

/// 持久化格式的原始规则。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPermissionRule {
    #[serde(default = "default_table")]
    pub table: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub value: Value,
    #[serde(rename = "match", default)]
    pub match_op: String,
    #[serde(default)]
    pub exclude: bool,
}

fn default_table() -> String {
    TABLE_WILDCARD.to_string()
}

/// 规则解析错误。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleParseError(pub String);

impl std::fmt::Display for RuleParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid permission rule: {}", self.0)
    }
}

impl std::error::Error for RuleParseError {}

/// 一条数据权限规则。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPermissionRule", into = "RawPermissionRule")]
pub struct PermissionRule {
    /// `"<app>.<model>"` 或 `"*"`。
    pub table: String,
    pub field: String,
    pub kind: RuleKind,
    pub match_op: MatchOp,
    pub exclude: bool,
}

impl PermissionRule {
    pub fn new(table: impl Into<String>, field: impl Into<String>, kind: RuleKind, match_op: MatchOp) -> Self {
        Self {
            table: table.into(),
            field: field.into(),
            kind,
            match_op,
            exclude: false,
        }
    }

    pub fn excluded(mut self) -> Self {
        self.exclude = true;
        self
    }

    /// 规则是否作用于目标表。
    pub fn applies_to(&self, table: &str) -> bool {
        self.table == TABLE_WILDCARD || self.table == table
    }
}

impl TryFrom<RawPermissionRule> for PermissionRule {
    type Error = RuleParseError;

    fn try_from(raw: RawPermissionRule) -> Result<Self, Self::Error> {
        let kind = match raw.kind.as_deref().map(str::trim).unwrap_or("") {
            "OWNER" => RuleKind::Owner,
            "OWNER_DEPARTMENT" => RuleKind::OwnerDepartment,
            "OWNER_DEPARTMENTS" => RuleKind::OwnerDepartments,
            "DEPARTMENTS" => RuleKind::Departments(id_list(&raw.value)),
            "ALL" => RuleKind::All,
            "DATE" => RuleKind::Date {
                offset_seconds: parse_offset(&raw.value)?,
            },
            "JSON" => RuleKind::Json(raw.value),
            "TABLE_USER" => RuleKind::TableUser(raw.value),
            "TABLE_ROLE" => RuleKind::TableRole(raw.value),
            "TABLE_DEPT" => RuleKind::TableDept(raw.value),
            "TABLE_MENU" => RuleKind::TableMenu(raw.value),
            _ => RuleKind::Field(raw.value),
        };
        let table = raw.table.trim();
        Ok(Self {
            table: if table.is_empty() {
                TABLE_WILDCARD.to_string()
            } else {
                table.to_string()
            },
            field: raw.field.trim().to_string(),
            kind,
            match_op: MatchOp::parse(&raw.match_op),
            exclude: raw.exclude,
        })
    }
}

impl From<PermissionRule> for RawPermissionRule {
    fn from(rule: PermissionRule) -> Self {
        let kind = match &rule.kind {
            RuleKind::Field(_) => None,
            other => Some(other.type_name().to_string()),
        };
        Self {
            table: rule.table,
            value: rule.kind.raw_value(),
            kind,
            field: rule.field,
            match_op: rule.match_op.as_str().to_string(),
            exclude: rule.exclude,
        }
    }
}

/// 部门 ID 列表：接受数组、JSON 数组字符串或逗号分隔字符串。
fn id_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(scalar_id).collect(),
        Value::String(text) => match serde_json::from_str::<Value>(text) {
            Ok(Value::Array(items)) => items.iter().filter_map(scalar_id).collect(),
            _ => text
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect(),
        },
        other => scalar_id(other).into_iter().collect(),
    }
}

fn scalar_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn parse_offset(value: &Value) -> Result<i64, RuleParseError> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|v| v as i64))
            .ok_or_else(|| RuleParseError(format!("date offset {n}"))),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| RuleParseError(format!("date offset {s}"))),
        other => Err(RuleParseError(format!("date offset {other}"))),
    }
}

/// 授权主体。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", content = "id", rename_all = "snake_case")]
pub enum GrantScope {
    User(String),
    Department(String),
}

/// 一条数据权限授权（Grant）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPermission {
    pub permission_id: String,
    pub tenant_id: String,
    pub name: String,
    pub scope: GrantScope,
    #[serde(default)]
    pub mode: ModeType,
    pub rules: Vec<PermissionRule>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// 部门树节点。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepartmentNode {
    pub dept_id: String,
    pub tenant_id: String,
    pub parent_id: Option<String>,
    pub name: String,
    /// 本级多条授权的组合方式。
    #[serde(default)]
    pub mode: ModeType,
    #[serde(default = "default_active")]
    pub is_active: bool,
}
