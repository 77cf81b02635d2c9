//! `ip_in` 条目解析。
//!
//! 每个条目可以是：
//! - CIDR：`10.0.0.0/30`，匹配网段内主机地址
//! - 区间：`10.0.0.1-10.0.0.9`，闭区间
//! - 完整地址：精确匹配
//! - 前缀：`192.168.`，按字符串前缀匹配
//! - `*`：恒真
//!
//! 无法解析的条目直接跳过；没有任何可用条目时结果为恒假。

use crate::combinator::combine;
use domain::predicate::ip_bits;
use domain::{CompareOp, Condition, FieldValue, ModeType, Predicate};
use std::net::IpAddr;

/// 单个条目的解析结果。
#[derive(Debug, Clone, PartialEq)]
enum IpEntry {
    Any,
    Network(IpAddr, u8),
    Range(IpAddr, IpAddr),
    Exact(IpAddr),
    Prefix(String),
}

fn parse_entry(raw: &str) -> Option<IpEntry> {
    let entry = raw.trim();
    if entry.is_empty() {
        return None;
    }
    if entry == "*" {
        return Some(IpEntry::Any);
    }
    if let Some((address, prefix)) = entry.split_once('/') {
        let network: IpAddr = address.trim().parse().ok()?;
        let prefix: u8 = prefix.trim().parse().ok()?;
        let (_, width) = ip_bits(network);
        return (prefix <= width).then_some(IpEntry::Network(network, prefix));
    }
    if let Some((start, end)) = entry.split_once('-') {
        let start: IpAddr = start.trim().parse().ok()?;
        let end: IpAddr = end.trim().parse().ok()?;
        let (low, low_width) = ip_bits(start);
        let (high, high_width) = ip_bits(end);
        if low_width != high_width || low > high {
            return None;
        }
        return Some(IpEntry::Range(start, end));
    }
    if let Ok(address) = entry.parse::<IpAddr>() {
        return Some(IpEntry::Exact(address));
    }
    let is_prefix = if entry.contains(':') {
        entry.chars().all(|ch| ch.is_ascii_hexdigit() || ch == ':')
    } else {
        entry.chars().all(|ch| ch.is_ascii_digit() || ch == '.')
    };
    is_prefix.then(|| IpEntry::Prefix(entry.to_string()))
}

/// 将条目列表编译为谓词片段（各条目之间为 OR）。
pub fn ip_fragment<S: AsRef<str>>(field: &str, entries: &[S]) -> Predicate {
    let mut fragments = Vec::new();
    for raw in entries {
        let Some(entry) = parse_entry(raw.as_ref()) else {
            tracing::debug!(target: "admin.permission", field, entry = raw.as_ref(), "ip_entry_skipped");
            continue;
        };
        let condition = match entry {
            IpEntry::Any => return Predicate::True,
            IpEntry::Network(network, prefix) => Condition::IpNetwork {
                field: field.to_string(),
                network,
                prefix,
            },
            IpEntry::Range(start, end) => Condition::IpRange {
                field: field.to_string(),
                start,
                end,
            },
            IpEntry::Exact(address) => Condition::Compare {
                field: field.to_string(),
                op: CompareOp::Exact,
                value: FieldValue::Str(address.to_string()),
            },
            IpEntry::Prefix(prefix) => Condition::Compare {
                field: field.to_string(),
                op: CompareOp::StartsWith,
                value: FieldValue::Str(prefix),
            },
        };
        fragments.push(Predicate::condition(condition));
    }
    combine(fragments, ModeType::Or)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_each_entry_shape() {
        assert_eq!(parse_entry(" * "), Some(IpEntry::Any));
        assert!(matches!(parse_entry("10.0.0.0/30"), Some(IpEntry::Network(_, 30))));
        assert!(matches!(parse_entry("10.0.0.1-10.0.0.9"), Some(IpEntry::Range(_, _))));
        assert!(matches!(parse_entry("10.0.0.1"), Some(IpEntry::Exact(_))));
        assert_eq!(parse_entry("192.168."), Some(IpEntry::Prefix("192.168.".into())));
    }

    #[test]
    fn malformed_entries_skipped() {
        assert_eq!(parse_entry("10.0.0.0/33"), None);
        assert_eq!(parse_entry("10.0.0.9-10.0.0.1"), None);
        assert_eq!(parse_entry("10.0.0.1-::1"), None);
        assert_eq!(parse_entry("office"), None);

        let fragment = ip_fragment("ip", &["office", "10.0.0.5"]);
        assert!(fragment.matches(&json!({"ip": "10.0.0.5"})));
        assert!(!fragment.matches(&json!({"ip": "10.0.0.6"})));
    }

    #[test]
    fn nothing_usable_is_false() {
        assert_eq!(ip_fragment("ip", &["bad", ""]), Predicate::False);
        assert_eq!(ip_fragment::<&str>("ip", &[]), Predicate::False);
    }

    #[test]
    fn wildcard_anywhere_is_true() {
        assert_eq!(ip_fragment("ip", &["10.0.0.1", "*"]), Predicate::True);
    }

    #[test]
    fn range_and_prefix_rows() {
        let fragment = ip_fragment("ip", &["10.0.0.1-10.0.0.9", "192.168."]);
        assert!(fragment.matches(&json!({"ip": "10.0.0.9"})));
        assert!(!fragment.matches(&json!({"ip": "10.0.0.10"})));
        assert!(fragment.matches(&json!({"ip": "192.168.3.4"})));
    }
}
