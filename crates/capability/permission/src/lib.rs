//! 数据权限能力：规则编译、片段组合、按部门层级解析行级过滤谓词。

pub mod builder;
pub mod combinator;
pub mod ip;
pub mod resolver;
pub mod value;

pub use builder::build_fragment;
pub use combinator::{combine, combine_pair, effective_mode};
pub use ip::ip_fragment;
pub use resolver::{
    DataScope, DataScopeResolver, DepartmentLevel, GrantCatalog, ResolveError, grant_predicate,
    resolve,
};
pub use value::{MISSING_CONTEXT_SENTINEL, RuleValue, ValueEnv, resolve_value};
