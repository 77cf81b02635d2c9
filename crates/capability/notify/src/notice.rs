//! 消息通知服务。
//!
//! 流程：校验 → 解析接收人 → （可选）按发送者数据范围裁剪 → 持久化 → 推送摘要。
//! 推送只发往开启了实时推送且当前在线的接收人；推送失败不影响通知本身。

use crate::NotifyError;
use crate::message::{MessageType, OutboundMessage};
use crate::presence::PresenceService;
use admin_permission::{DataScope, DataScopeResolver};
use admin_storage::{DepartmentStore, NoticeCreate, NoticeRecord, NoticeStore, RowQuery, UserStore};
use domain::{NoticeLevel, NoticeTarget, NoticeType, TenantContext};
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// 接收人裁剪所用的用户表。
pub const AUDIENCE_TABLE: &str = "system.users";

/// 待发送的通知。
#[derive(Debug, Clone)]
pub struct NoticeDraft {
    pub title: String,
    pub content: String,
    pub level: NoticeLevel,
    pub notice_type: NoticeType,
    pub target: NoticeTarget,
}

#[derive(Debug, Clone, Serialize)]
pub struct NotifyOutcome {
    pub notice: NoticeRecord,
    /// 实际收到推送的用户。
    pub pushed_to: Vec<String>,
}

struct AudienceScope {
    resolver: Arc<DataScopeResolver>,
    rows: Arc<dyn RowQuery>,
}

pub struct NoticeService {
    users: Arc<dyn UserStore>,
    departments: Arc<dyn DepartmentStore>,
    notices: Arc<dyn NoticeStore>,
    presence: Arc<PresenceService>,
    audience: Option<AudienceScope>,
}

impl NoticeService {
    pub fn new(
        users: Arc<dyn UserStore>,
        departments: Arc<dyn DepartmentStore>,
        notices: Arc<dyn NoticeStore>,
        presence: Arc<PresenceService>,
    ) -> Self {
        Self {
            users,
            departments,
            notices,
            presence,
            audience: None,
        }
    }

    /// 接收人限定在发送者对 `AUDIENCE_TABLE` 可见的用户内。
    pub fn with_audience_scope(
        mut self,
        resolver: Arc<DataScopeResolver>,
        rows: Arc<dyn RowQuery>,
    ) -> Self {
        self.audience = Some(AudienceScope { resolver, rows });
        self
    }

    /// 按接收对象解析用户 ID（去重、升序）。部门包含全部下级部门。
    pub async fn resolve_recipients(
        &self,
        ctx: &TenantContext,
        notice_type: NoticeType,
        target: &NoticeTarget,
    ) -> Result<Vec<String>, NotifyError> {
        if !target.is_valid_for(notice_type) {
            return Err(NotifyError::InvalidInput(format!(
                "target does not match notice type {}",
                notice_type.as_str()
            )));
        }
        let ids = match target {
            NoticeTarget::Users(user_ids) => self
                .users
                .find_users(ctx, user_ids)
                .await?
                .into_iter()
                .filter(|user| user.is_active)
                .map(|user| user.user_id)
                .collect(),
            NoticeTarget::Depts(dept_ids) => {
                let mut expanded = BTreeSet::new();
                for dept_id in dept_ids {
                    expanded.extend(self.departments.descendants(ctx, dept_id).await?);
                }
                let expanded: Vec<String> = expanded.into_iter().collect();
                self.users
                    .list_user_ids_by_departments(ctx, &expanded)
                    .await?
            }
            NoticeTarget::Roles(roles) => self.users.list_user_ids_by_roles(ctx, roles).await?,
            NoticeTarget::Everyone => self.users.list_active_user_ids(ctx).await?,
        };
        let unique: BTreeSet<String> = ids.into_iter().collect();
        Ok(unique.into_iter().collect())
    }

    async fn restrict_to_audience(
        &self,
        ctx: &TenantContext,
        recipients: Vec<String>,
    ) -> Result<Vec<String>, NotifyError> {
        let Some(audience) = &self.audience else {
            return Ok(recipients);
        };
        let scope = audience
            .resolver
            .resolve_predicate(ctx, AUDIENCE_TABLE)
            .await?;
        let visible: HashSet<String> = match scope {
            DataScope::AllowAll => return Ok(recipients),
            DataScope::DenyAll => HashSet::new(),
            DataScope::Filter(predicate) => audience
                .rows
                .apply_predicate(ctx, AUDIENCE_TABLE, &predicate)
                .await?
                .iter()
                .filter_map(row_user_id)
                .collect(),
        };
        Ok(recipients
            .into_iter()
            .filter(|user_id| visible.contains(user_id))
            .collect())
    }

    pub async fn notify(
        &self,
        ctx: &TenantContext,
        draft: NoticeDraft,
    ) -> Result<NotifyOutcome, NotifyError> {
        if draft.title.trim().is_empty() {
            return Err(NotifyError::InvalidInput("title required".to_string()));
        }
        let recipients = self
            .resolve_recipients(ctx, draft.notice_type, &draft.target)
            .await?;
        let recipients = self.restrict_to_audience(ctx, recipients).await?;
        self.notify_resolved(ctx, draft, recipients).await
    }

    /// 以已解析的接收人集合持久化通知并推送摘要（不再做接收对象校验与数据范围裁剪）。
    pub async fn notify_resolved(
        &self,
        ctx: &TenantContext,
        draft: NoticeDraft,
        recipients: Vec<String>,
    ) -> Result<NotifyOutcome, NotifyError> {
        let recipients: Vec<String> = recipients
            .into_iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let notice = self
            .notices
            .create_notice(
                ctx,
                NoticeCreate {
                    notice_id: uuid::Uuid::new_v4().to_string(),
                    title: draft.title,
                    content: draft.content,
                    level: draft.level,
                    notice_type: draft.notice_type,
                    target: draft.target,
                    recipient_ids: recipients,
                    created_by: ctx.user_id.clone(),
                    created_at_ms: now_epoch_millis(),
                },
            )
            .await?;
        admin_telemetry::record_notice_created();

        let pushed_to = self.push_summary(ctx, &notice).await;
        tracing::info!(
            target: "admin.notify",
            tenant_id = %ctx.tenant_id,
            notice_id = %notice.notice_id,
            recipients = notice.recipient_ids.len(),
            pushed = pushed_to.len(),
            "notice_created"
        );
        Ok(NotifyOutcome { notice, pushed_to })
    }

    async fn push_summary(&self, ctx: &TenantContext, notice: &NoticeRecord) -> Vec<String> {
        let users = match self.users.find_users(ctx, &notice.recipient_ids).await {
            Ok(users) => users,
            Err(err) => {
                tracing::warn!(target: "admin.notify", notice_id = %notice.notice_id, error = %err, "notice_push_skipped");
                return Vec::new();
            }
        };
        let summary = OutboundMessage {
            sender: ctx.user_id.clone(),
            message_type: MessageType::Notice,
            content: summary_content(notice),
            refresh_unread: true,
        };

        let mut pushed_to = Vec::new();
        for user in users.iter().filter(|user| user.push_enabled && user.is_active) {
            match self
                .presence
                .push_message(&ctx.tenant_id, &user.user_id, summary.clone())
                .await
            {
                Ok(report) if !report.delivered.is_empty() => pushed_to.push(user.user_id.clone()),
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(
                        target: "admin.notify",
                        notice_id = %notice.notice_id,
                        user_id = %user.user_id,
                        error = %err,
                        "notice_push_failed"
                    );
                }
            }
        }
        pushed_to.sort();
        pushed_to
    }
}

fn summary_content(notice: &NoticeRecord) -> Value {
    json!({
        "notice_id": notice.notice_id,
        "title": notice.title,
        "level": notice.level,
        "notice_type": notice.notice_type,
    })
}

fn row_user_id(row: &Value) -> Option<String> {
    match row.get("user_id").or_else(|| row.get("id"))? {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn now_epoch_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis() as i64)
        .unwrap_or_default()
}
