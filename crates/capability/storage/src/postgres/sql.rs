//! 谓词编译为参数化 WHERE 子句。
//!
//! 值一律通过 `push_bind` 绑定；字段名必须是合法标识符，否则该条件编译为未知值
//! `null::boolean`。三值逻辑下外层 `not`、`and`、`or` 只在结果与该条件取值无关时为真，
//! 无法编译的条件因此不会放行额外的行，包括被 `not` 包住的排除规则。
//! 文本类比较统一转为 `::text`，数值比较保留列的原类型。

use domain::predicate::ip_bits;
use domain::{CompareOp, Condition, FieldValue, Predicate};
use sqlx::{Postgres, QueryBuilder};
use std::collections::BTreeSet;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// 标识符：`[A-Za-z_][A-Za-z0-9_]*`，且不含 `__` 关联路径。
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let head_ok = chars
        .next()
        .map(|ch| ch.is_ascii_alphabetic() || ch == '_')
        .unwrap_or(false);
    head_ok && chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_') && !name.contains("__")
}

/// `"<app>.<model>"` 转为带引号的 `"app"."model"`；单段名直接引用。
pub fn quote_table(table: &str) -> Option<String> {
    let segments: Vec<&str> = table.split('.').collect();
    if segments.len() > 2 || !segments.iter().all(|segment| is_identifier(segment)) {
        return None;
    }
    Some(
        segments
            .iter()
            .map(|segment| format!("\"{segment}\""))
            .collect::<Vec<_>>()
            .join("."),
    )
}

fn column(field: &str) -> Option<String> {
    is_identifier(field).then(|| format!("\"{field}\""))
}

pub fn push_predicate(builder: &mut QueryBuilder<'_, Postgres>, predicate: &Predicate) {
    match predicate {
        Predicate::True => {
            builder.push("true");
        }
        Predicate::False => {
            builder.push("false");
        }
        Predicate::Not(inner) => {
            builder.push("not (");
            push_predicate(builder, inner);
            builder.push(")");
        }
        Predicate::And(children) => push_group(builder, children, " and ", "true"),
        Predicate::Or(children) => push_group(builder, children, " or ", "false"),
        Predicate::Condition(condition) => push_condition(builder, condition),
    }
}

fn push_group(
    builder: &mut QueryBuilder<'_, Postgres>,
    children: &BTreeSet<Predicate>,
    separator: &str,
    empty: &str,
) {
    if children.is_empty() {
        builder.push(empty);
        return;
    }
    builder.push("(");
    for (index, child) in children.iter().enumerate() {
        if index > 0 {
            builder.push(separator);
        }
        push_predicate(builder, child);
    }
    builder.push(")");
}

fn text_of(value: &FieldValue) -> Option<String> {
    match value {
        FieldValue::Null => None,
        FieldValue::Bool(v) => Some(v.to_string()),
        FieldValue::Int(v) | FieldValue::Timestamp(v) => Some(v.to_string()),
        FieldValue::Str(v) => Some(v.clone()),
    }
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn push_condition(builder: &mut QueryBuilder<'_, Postgres>, condition: &Condition) {
    let Some(col) = column(condition.field()) else {
        builder.push("null::boolean");
        return;
    };
    match condition {
        Condition::Compare { op, value, .. } => push_compare(builder, &col, *op, value),
        Condition::In { values, .. } => {
            let texts: Vec<String> = values.iter().filter_map(text_of).collect();
            builder
                .push(&col)
                .push("::text = any(")
                .push_bind(texts)
                .push(")");
        }
        Condition::RelatedIn { values, .. } => {
            let texts: Vec<String> = values.iter().filter_map(text_of).collect();
            builder
                .push("exists (select 1 from jsonb_array_elements_text(to_jsonb(")
                .push(&col)
                .push(")) as related(item) where related.item = any(")
                .push_bind(texts)
                .push("))");
        }
        Condition::IpNetwork {
            network, prefix, ..
        } => {
            builder
                .push("(")
                .push(&col)
                .push("::inet <<= ")
                .push_bind(format!("{network}/{prefix}"))
                .push("::inet");
            let (first, last) = network_bounds(*network, *prefix);
            match network {
                IpAddr::V4(_) if *prefix <= 30 => {
                    builder
                        .push(" and host(")
                        .push(&col)
                        .push("::inet) not in (")
                        .push_bind(first.to_string())
                        .push(", ")
                        .push_bind(last.to_string())
                        .push(")");
                }
                IpAddr::V6(_) if *prefix <= 126 => {
                    builder
                        .push(" and host(")
                        .push(&col)
                        .push("::inet) <> ")
                        .push_bind(first.to_string());
                }
                _ => {}
            }
            builder.push(")");
        }
        Condition::IpRange { start, end, .. } => {
            builder
                .push(&col)
                .push("::inet between ")
                .push_bind(start.to_string())
                .push("::inet and ")
                .push_bind(end.to_string())
                .push("::inet");
        }
    }
}

fn push_compare(builder: &mut QueryBuilder<'_, Postgres>, col: &str, op: CompareOp, value: &FieldValue) {
    let symbol = match op {
        CompareOp::Gt => ">",
        CompareOp::Gte => ">=",
        CompareOp::Lt => "<",
        CompareOp::Lte => "<=",
        _ => "=",
    };
    match (op, value) {
        (CompareOp::Exact, FieldValue::Null) => {
            builder.push(col).push(" is null");
        }
        (_, FieldValue::Null) => {
            builder.push("false");
        }
        (CompareOp::Gt | CompareOp::Gte | CompareOp::Lt | CompareOp::Lte, FieldValue::Int(v)) => {
            builder.push(col).push(" ").push(symbol).push(" ").push_bind(*v);
        }
        (
            CompareOp::Gt | CompareOp::Gte | CompareOp::Lt | CompareOp::Lte | CompareOp::Exact,
            FieldValue::Timestamp(v),
        ) => {
            builder
                .push(col)
                .push(" ")
                .push(symbol)
                .push(" to_timestamp(")
                .push_bind(*v)
                .push("::double precision)");
        }
        (CompareOp::Contains | CompareOp::StartsWith | CompareOp::EndsWith, value) => {
            let text = escape_like(&text_of(value).unwrap_or_default());
            let pattern = match op {
                CompareOp::Contains => format!("%{text}%"),
                CompareOp::StartsWith => format!("{text}%"),
                _ => format!("%{text}"),
            };
            builder.push(col).push("::text like ").push_bind(pattern);
        }
        (CompareOp::Regex, value) => {
            builder
                .push(col)
                .push("::text ~ ")
                .push_bind(text_of(value).unwrap_or_default());
        }
        (_, value) => {
            builder
                .push(col)
                .push("::text ")
                .push(symbol)
                .push(" ")
                .push_bind(text_of(value).unwrap_or_default());
        }
    }
}

/// 网段的首地址与末地址。
fn network_bounds(network: IpAddr, prefix: u8) -> (IpAddr, IpAddr) {
    let (base, width) = ip_bits(network);
    let prefix = prefix.min(width);
    let host_bits = u32::from(width - prefix);
    let full: u128 = if width == 32 { 0xFFFF_FFFF } else { !0u128 };
    let host_mask = if host_bits >= 128 {
        !0u128
    } else {
        ((1u128 << host_bits) - 1) & full
    };
    let first = base & !host_mask & full;
    let last = first | host_mask;
    if width == 32 {
        (
            IpAddr::V4(Ipv4Addr::from(first as u32)),
            IpAddr::V4(Ipv4Addr::from(last as u32)),
        )
    } else {
        (
            IpAddr::V6(Ipv6Addr::from(first)),
            IpAddr::V6(Ipv6Addr::from(last)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(predicate: &Predicate) -> String {
        let mut builder = QueryBuilder::<Postgres>::new("");
        push_predicate(&mut builder, predicate);
        builder.sql().to_string()
    }

    #[test]
    fn identifiers_and_tables() {
        assert!(is_identifier("creator_id"));
        assert!(!is_identifier("dept__name"));
        assert!(!is_identifier("1abc"));
        assert!(!is_identifier("name; drop"));
        assert_eq!(quote_table("system.users").as_deref(), Some("\"system\".\"users\""));
        assert_eq!(quote_table("a.b.c"), None);
    }

    #[test]
    fn values_are_bound_not_interpolated() {
        let predicate = Predicate::Or(
            [
                Predicate::condition(Condition::Compare {
                    field: "name".into(),
                    op: CompareOp::Exact,
                    value: FieldValue::Str("x' or 1=1".into()),
                }),
                Predicate::condition(Condition::Compare {
                    field: "age".into(),
                    op: CompareOp::Gte,
                    value: FieldValue::Int(18),
                }),
            ]
            .into_iter()
            .collect(),
        );
        let sql = compile(&predicate);
        assert!(!sql.contains("1=1"));
        assert!(sql.contains("$1"));
        assert!(sql.contains("$2"));
        assert!(sql.contains(" or "));
    }

    fn related_path(value: &str) -> Predicate {
        Predicate::condition(Condition::Compare {
            field: "dept__name".into(),
            op: CompareOp::Exact,
            value: FieldValue::Str(value.into()),
        })
    }

    #[test]
    fn invalid_field_compiles_to_unknown() {
        assert_eq!(compile(&related_path("ops")), "null::boolean");
    }

    #[test]
    fn excluded_related_path_stays_closed() {
        let predicate = Predicate::Not(Box::new(related_path("secret")));
        let sql = compile(&predicate);
        assert_eq!(sql, "not (null::boolean)");
        assert!(!sql.contains("not (false)"));
    }

    #[test]
    fn network_bounds_for_v4() {
        let (first, last) = network_bounds("10.0.0.1".parse().expect("ip"), 30);
        assert_eq!(first.to_string(), "10.0.0.0");
        assert_eq!(last.to_string(), "10.0.0.3");
    }
}
