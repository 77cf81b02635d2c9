//! 存储层数据模型

use domain::{NoticeLevel, NoticeTarget, NoticeType, TenantContext};
use serde::Serialize;

/// 用户记录（数据权限解析与消息推送所需字段）。
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub tenant_id: String,
    pub user_id: String,
    pub username: String,
    pub dept_id: Option<String>,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
    pub is_superuser: bool,
    /// 个人偏好：是否接收实时推送。
    pub push_enabled: bool,
    pub is_active: bool,
}

impl UserRecord {
    pub fn to_tenant_context(&self) -> TenantContext {
        TenantContext::new(
            self.tenant_id.clone(),
            self.user_id.clone(),
            self.roles.clone(),
            self.permissions.clone(),
            self.dept_id.clone(),
        )
        .with_superuser(self.is_superuser)
    }
}

/// 新建通知。
#[derive(Debug, Clone)]
pub struct NoticeCreate {
    pub notice_id: String,
    pub title: String,
    pub content: String,
    pub level: NoticeLevel,
    pub notice_type: NoticeType,
    pub target: NoticeTarget,
    /// 解析后的接收人集合。
    pub recipient_ids: Vec<String>,
    pub created_by: String,
    pub created_at_ms: i64,
}

/// 通知记录。
#[derive(Debug, Clone, Serialize)]
pub struct NoticeRecord {
    pub notice_id: String,
    pub tenant_id: String,
    pub title: String,
    pub content: String,
    pub level: NoticeLevel,
    pub notice_type: NoticeType,
    pub target: NoticeTarget,
    pub recipient_ids: Vec<String>,
    pub created_by: String,
    pub created_at_ms: i64,
}
