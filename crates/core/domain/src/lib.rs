pub mod data_scope;
pub mod notice;
pub mod permissions;
pub mod predicate;

pub use data_scope::{
    DataPermission, DepartmentNode, GrantScope, MatchOp, ModeType, PermissionRule, RawPermissionRule,
    RuleKind, RuleParseError, TABLE_WILDCARD,
};
pub use notice::{NoticeLevel, NoticeTarget, NoticeType};
pub use predicate::{CompareOp, Condition, FieldValue, Predicate};

/// 租户上下文：所有模块共享的执行上下文。
#[derive(Debug, Clone)]
pub struct TenantContext {
    pub tenant_id: String,
    pub user_id: String,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
    /// 用户所属部门（无部门时为 None）。
    pub dept_id: Option<String>,
    pub is_superuser: bool,
}

impl TenantContext {
    /// 构造显式身份与权限范围的租户上下文。
    pub fn new(
        tenant_id: impl Into<String>,
        user_id: impl Into<String>,
        roles: Vec<String>,
        permissions: Vec<String>,
        dept_id: Option<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            user_id: user_id.into(),
            roles,
            permissions,
            dept_id,
            is_superuser: false,
        }
    }

    /// 标记为超级管理员。
    pub fn with_superuser(mut self, is_superuser: bool) -> Self {
        self.is_superuser = is_superuser;
        self
    }

    /// 是否具备指定的接口权限码（超级管理员全部放行）。
    pub fn has_permission(&self, code: &str) -> bool {
        self.is_superuser || self.permissions.iter().any(|item| item == code)
    }

    /// 当前用户 ID；空字符串视为无用户上下文。
    pub fn user(&self) -> Option<&str> {
        if self.user_id.is_empty() {
            None
        } else {
            Some(self.user_id.as_str())
        }
    }
}

impl Default for TenantContext {
    /// 空上下文（仅用于测试或占位）。
    fn default() -> Self {
        Self {
            tenant_id: "".to_string(),
            user_id: "".to_string(),
            roles: Vec::new(),
            permissions: Vec::new(),
            dept_id: None,
            is_superuser: false,
        }
    }
}
