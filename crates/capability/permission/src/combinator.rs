//! 片段组合。
//!
//! 片段先放入有序集合去重，组合结果与输入顺序无关，重复片段不影响结果。
//! - AND：恒真为单位元被跳过；出现恒假则整体恒假；全部为恒真时结果恒真
//! - OR：出现恒真则整体恒真；恒假被跳过；没有剩余片段时结果恒假

use domain::{ModeType, Predicate};
use std::collections::BTreeSet;

/// 只有一条规则时组合方式固定为 OR。
pub fn effective_mode(rule_count: usize, declared: ModeType) -> ModeType {
    if rule_count == 1 {
        ModeType::Or
    } else {
        declared
    }
}

/// 按组合方式折叠片段。
pub fn combine<I>(fragments: I, mode: ModeType) -> Predicate
where
    I: IntoIterator<Item = Predicate>,
{
    let fragments: BTreeSet<Predicate> = fragments.into_iter().collect();
    let mut children = BTreeSet::new();
    match mode {
        ModeType::And => {
            for fragment in fragments {
                match fragment {
                    Predicate::True => {}
                    Predicate::False => return Predicate::False,
                    Predicate::And(inner) => children.extend(inner),
                    other => {
                        children.insert(other);
                    }
                }
            }
            collapse(children, Predicate::True, Predicate::And)
        }
        ModeType::Or => {
            for fragment in fragments {
                match fragment {
                    Predicate::True => return Predicate::True,
                    Predicate::False => {}
                    Predicate::Or(inner) => children.extend(inner),
                    other => {
                        children.insert(other);
                    }
                }
            }
            collapse(children, Predicate::False, Predicate::Or)
        }
    }
}

/// 两个谓词按组合方式合并。
pub fn combine_pair(left: Predicate, right: Predicate, mode: ModeType) -> Predicate {
    combine([left, right], mode)
}

fn collapse(
    mut children: BTreeSet<Predicate>,
    empty: Predicate,
    wrap: fn(BTreeSet<Predicate>) -> Predicate,
) -> Predicate {
    match children.len() {
        0 => empty,
        1 => children.pop_first().unwrap_or(empty),
        _ => wrap(children),
    }
}
