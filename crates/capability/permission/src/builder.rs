//! 单条规则编译为谓词片段。

use crate::ip::ip_fragment;
use crate::value::RuleValue;
use domain::{CompareOp, Condition, FieldValue, MatchOp, ModeType, Predicate};
use std::collections::BTreeSet;

/// 按匹配运算符构建片段；`exclude` 时对结果取反。
pub fn build_fragment(field: &str, match_op: &MatchOp, value: &RuleValue, exclude: bool) -> Predicate {
    let fragment = if value.is_wildcard() {
        Predicate::True
    } else {
        match match_op {
            MatchOp::All => Predicate::True,
            MatchOp::IpIn => ip_fragment(field, &value.texts()),
            MatchOp::Regex => regex_fragment(field, value),
            MatchOp::In => Predicate::condition(Condition::In {
                field: field.to_string(),
                values: value.to_list().into_iter().collect(),
            }),
            MatchOp::M2mIn => related_in(field, value.to_list()),
            MatchOp::M2mAll => {
                let values = value.to_list();
                if values.is_empty() {
                    Predicate::False
                } else {
                    crate::combinator::combine(
                        values.into_iter().map(|item| related_in(field, vec![item])),
                        ModeType::And,
                    )
                }
            }
            MatchOp::Exact => compare_fragment(field, CompareOp::Exact, value),
            MatchOp::Contains => compare_fragment(field, CompareOp::Contains, value),
            MatchOp::StartsWith => compare_fragment(field, CompareOp::StartsWith, value),
            MatchOp::EndsWith => compare_fragment(field, CompareOp::EndsWith, value),
            MatchOp::Gt => compare_fragment(field, CompareOp::Gt, value),
            MatchOp::Gte => compare_fragment(field, CompareOp::Gte, value),
            MatchOp::Lt => compare_fragment(field, CompareOp::Lt, value),
            MatchOp::Lte => compare_fragment(field, CompareOp::Lte, value),
            MatchOp::Lookup(name) => {
                compare_fragment(&format!("{field}__{name}"), CompareOp::Exact, value)
            }
        }
    };
    if exclude { fragment.negate() } else { fragment }
}

fn related_in(field: &str, values: Vec<FieldValue>) -> Predicate {
    Predicate::condition(Condition::RelatedIn {
        field: field.to_string(),
        values: values.into_iter().collect::<BTreeSet<_>>(),
    })
}

fn compare(field: &str, op: CompareOp, value: FieldValue) -> Predicate {
    Predicate::condition(Condition::Compare {
        field: field.to_string(),
        op,
        value,
    })
}

/// 标量直接比较；列表在 exact 下等价于 in，其余运算逐项 OR。
fn compare_fragment(field: &str, op: CompareOp, value: &RuleValue) -> Predicate {
    match value {
        RuleValue::Scalar(scalar) => compare(field, op, scalar.clone()),
        RuleValue::List(items) if op == CompareOp::Exact => Predicate::condition(Condition::In {
            field: field.to_string(),
            values: items.iter().cloned().collect(),
        }),
        RuleValue::List(items) => crate::combinator::combine(
            items.iter().cloned().map(|item| compare(field, op, item)),
            ModeType::Or,
        ),
    }
}

/// 正则无法编译时片段为恒假。
fn regex_fragment(field: &str, value: &RuleValue) -> Predicate {
    let RuleValue::Scalar(FieldValue::Str(pattern)) = value else {
        return Predicate::False;
    };
    match regex::Regex::new(pattern) {
        Ok(_) => compare(field, CompareOp::Regex, FieldValue::Str(pattern.clone())),
        Err(err) => {
            tracing::debug!(
                target: "admin.permission",
                field,
                pattern = pattern.as_str(),
                error = %err,
                "regex_rule_invalid"
            );
            Predicate::False
        }
    }
}
