//! 行级过滤谓词（显式 AST）。
//!
//! 谓词由数据权限规则编译而来，与具体存储引擎无关：
//! - 内存表通过 [`Predicate::matches`] 直接求值
//! - PostgreSQL 实现将其编译为参数化 WHERE 子句
//!
//! `And`/`Or` 的子节点使用 `BTreeSet` 存放，结构相同的片段天然去重，
//! 组合结果与片段顺序无关。

use serde::Serialize;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::net::IpAddr;

/// 谓词中的标量值。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
    /// Unix 秒级时间戳（DATE 规则）。
    Timestamp(i64),
}

impl FieldValue {
    /// 从 JSON 标量转换；浮点数与复合值按文本保存。
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(v) => Self::Bool(*v),
            Value::Number(number) => match number.as_i64() {
                Some(v) => Self::Int(v),
                None => Self::Str(number.to_string()),
            },
            Value::String(v) => Self::Str(v.clone()),
            other => Self::Str(other.to_string()),
        }
    }

    /// 是否为通配符 `"*"`。
    pub fn is_wildcard(&self) -> bool {
        matches!(self, Self::Str(v) if v == "*")
    }

    fn as_text(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Bool(v) => Some(v.to_string()),
            Self::Int(v) | Self::Timestamp(v) => Some(v.to_string()),
            Self::Str(v) => Some(v.clone()),
        }
    }
}

/// 比较类运算。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Exact,
    Contains,
    StartsWith,
    EndsWith,
    Gt,
    Gte,
    Lt,
    Lte,
    Regex,
}

/// 作用于单个字段的叶子条件。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Condition {
    /// `field <op> value`
    Compare {
        field: String,
        op: CompareOp,
        value: FieldValue,
    },
    /// `field IN (values)`
    In {
        field: String,
        values: BTreeSet<FieldValue>,
    },
    /// 多对多关系中任一关联值属于 `values`。
    RelatedIn {
        field: String,
        values: BTreeSet<FieldValue>,
    },
    /// IP 属于网段内的主机地址。
    IpNetwork {
        field: String,
        network: IpAddr,
        prefix: u8,
    },
    /// IP 位于闭区间 `[start, end]`。
    IpRange {
        field: String,
        start: IpAddr,
        end: IpAddr,
    },
}

impl Condition {
    pub fn field(&self) -> &str {
        match self {
            Self::Compare { field, .. }
            | Self::In { field, .. }
            | Self::RelatedIn { field, .. }
            | Self::IpNetwork { field, .. }
            | Self::IpRange { field, .. } => field,
        }
    }

    fn matches(&self, row: &Value) -> bool {
        let found = lookup(row, self.field());
        match self {
            Self::Compare { op, value, .. } => compare(found, *op, value),
            Self::In { values, .. } => found
                .map(|item| values.iter().any(|value| value_eq(item, value)))
                .unwrap_or(false),
            Self::RelatedIn { values, .. } => match found {
                Some(Value::Array(items)) => items.iter().any(|item| {
                    let item = item.get("id").unwrap_or(item);
                    values.iter().any(|value| value_eq(item, value))
                }),
                Some(item) => values.iter().any(|value| value_eq(item, value)),
                None => false,
            },
            Self::IpNetwork {
                network, prefix, ..
            } => row_ip(found)
                .map(|ip| is_network_host(ip, *network, *prefix))
                .unwrap_or(false),
            Self::IpRange { start, end, .. } => row_ip(found)
                .map(|ip| ip_in_range(ip, *start, *end))
                .unwrap_or(false),
        }
    }
}

/// 布尔谓词树。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "node", content = "children", rename_all = "snake_case")]
pub enum Predicate {
    /// 恒真（不过滤）。
    True,
    /// 恒假（不返回任何行）。
    False,
    Condition(Condition),
    Not(Box<Predicate>),
    And(BTreeSet<Predicate>),
    Or(BTreeSet<Predicate>),
}

impl Predicate {
    pub fn condition(condition: Condition) -> Self {
        Self::Condition(condition)
    }

    pub fn is_true(&self) -> bool {
        matches!(self, Self::True)
    }

    pub fn is_false(&self) -> bool {
        matches!(self, Self::False)
    }

    /// 取反；常量直接翻转，双重否定消去。
    pub fn negate(self) -> Self {
        match self {
            Self::True => Self::False,
            Self::False => Self::True,
            Self::Not(inner) => *inner,
            other => Self::Not(Box::new(other)),
        }
    }

    /// 对一行 JSON 对象求值。
    pub fn matches(&self, row: &Value) -> bool {
        match self {
            Self::True => true,
            Self::False => false,
            Self::Condition(condition) => condition.matches(row),
            Self::Not(inner) => !inner.matches(row),
            Self::And(children) => children.iter().all(|child| child.matches(row)),
            Self::Or(children) => children.iter().any(|child| child.matches(row)),
        }
    }
}

/// 字段查找：先按完整键名，再按 `__` 分段逐层进入对象。
fn lookup<'a>(row: &'a Value, field: &str) -> Option<&'a Value> {
    if let Some(value) = row.get(field) {
        return Some(value);
    }
    let mut current = row;
    for segment in field.split("__") {
        current = current.get(segment)?;
    }
    Some(current)
}

fn value_eq(row: &Value, expected: &FieldValue) -> bool {
    match (row, expected) {
        (Value::Null, FieldValue::Null) => true,
        (Value::Bool(a), FieldValue::Bool(b)) => a == b,
        (Value::Number(a), FieldValue::Int(b) | FieldValue::Timestamp(b)) => a.as_i64() == Some(*b),
        (Value::String(a), FieldValue::Str(b)) => a == b,
        (Value::String(a), FieldValue::Int(b)) => a.parse::<i64>().ok() == Some(*b),
        (Value::Number(a), FieldValue::Str(b)) => a.to_string() == *b,
        _ => false,
    }
}

fn value_cmp(row: &Value, expected: &FieldValue) -> Option<Ordering> {
    let row_number = match row {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse::<f64>().ok(),
        _ => None,
    };
    match expected {
        FieldValue::Int(b) | FieldValue::Timestamp(b) => row_number?.partial_cmp(&(*b as f64)),
        FieldValue::Str(b) => match (row_number, b.parse::<f64>().ok()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => row.as_str().map(|a| a.cmp(b.as_str())),
        },
        FieldValue::Bool(b) => row.as_bool().map(|a| a.cmp(b)),
        FieldValue::Null => None,
    }
}

fn row_text(row: &Value) -> Option<String> {
    match row {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn compare(found: Option<&Value>, op: CompareOp, expected: &FieldValue) -> bool {
    let Some(row) = found else {
        return matches!(op, CompareOp::Exact) && matches!(expected, FieldValue::Null);
    };
    match op {
        CompareOp::Exact => value_eq(row, expected),
        CompareOp::Gt => value_cmp(row, expected) == Some(Ordering::Greater),
        CompareOp::Gte => matches!(
            value_cmp(row, expected),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        CompareOp::Lt => value_cmp(row, expected) == Some(Ordering::Less),
        CompareOp::Lte => matches!(
            value_cmp(row, expected),
            Some(Ordering::Less | Ordering::Equal)
        ),
        CompareOp::Contains | CompareOp::StartsWith | CompareOp::EndsWith | CompareOp::Regex => {
            let (Some(text), Some(pattern)) = (row_text(row), expected.as_text()) else {
                return false;
            };
            match op {
                CompareOp::Contains => text.contains(&pattern),
                CompareOp::StartsWith => text.starts_with(&pattern),
                CompareOp::EndsWith => text.ends_with(&pattern),
                _ => regex::Regex::new(&pattern)
                    .map(|re| re.is_match(&text))
                    .unwrap_or(false),
            }
        }
    }
}

fn row_ip(found: Option<&Value>) -> Option<IpAddr> {
    found?.as_str()?.trim().parse::<IpAddr>().ok()
}

/// 地址转换为 (数值, 位宽)。
pub fn ip_bits(ip: IpAddr) -> (u128, u8) {
    match ip {
        IpAddr::V4(v4) => (u32::from(v4) as u128, 32),
        IpAddr::V6(v6) => (u128::from(v6), 128),
    }
}

fn ip_in_range(ip: IpAddr, start: IpAddr, end: IpAddr) -> bool {
    let (value, width) = ip_bits(ip);
    let (low, low_width) = ip_bits(start);
    let (high, high_width) = ip_bits(end);
    width == low_width && width == high_width && low <= value && value <= high
}

/// 判断 `ip` 是否为网段 `network/prefix` 的主机地址。
///
/// IPv4 前缀 ≤ 30 时排除网络地址与广播地址；IPv6 前缀 ≤ 126 时排除子网路由地址。
pub fn is_network_host(ip: IpAddr, network: IpAddr, prefix: u8) -> bool {
    let (value, width) = ip_bits(ip);
    let (base, base_width) = ip_bits(network);
    if width != base_width || prefix > width {
        return false;
    }
    let host_bits = u32::from(width - prefix);
    let mask = if host_bits >= 128 {
        0
    } else {
        !0u128 << host_bits
    };
    let mask = if width == 32 { mask & 0xFFFF_FFFF } else { mask };
    let network_addr = base & mask;
    if value & mask != network_addr {
        return false;
    }
    let broadcast = network_addr | (!mask & if width == 32 { 0xFFFF_FFFF } else { !0u128 });
    match width {
        32 if prefix <= 30 => value != network_addr && value != broadcast,
        128 if prefix <= 126 => value != network_addr,
        _ => true,
    }
}
