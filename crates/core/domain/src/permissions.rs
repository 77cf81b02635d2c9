//! 接口权限码。

pub const ROLE_ADMIN: &str = "admin";

pub const ONLINE_USER_READ: &str = "ONLINE.USER.READ";
pub const ONLINE_USER_LOGOUT: &str = "ONLINE.USER.LOGOUT";
pub const NOTICE_READ: &str = "NOTICE.READ";
pub const NOTICE_WRITE: &str = "NOTICE.WRITE";
pub const DATA_SCOPE_READ: &str = "DATA_SCOPE.READ";
pub const TABLE_ROW_READ: &str = "TABLE.ROW.READ";
pub const METRICS_READ: &str = "METRICS.READ";

/// 全部权限码（内置 admin 角色使用）。
pub const PERMISSION_CODES: &[&str] = &[
    ONLINE_USER_READ,
    ONLINE_USER_LOGOUT,
    NOTICE_READ,
    NOTICE_WRITE,
    DATA_SCOPE_READ,
    TABLE_ROW_READ,
    METRICS_READ,
];
