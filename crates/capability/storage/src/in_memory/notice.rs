//! 通知内存实现

use crate::error::StorageError;
use crate::models::{NoticeCreate, NoticeRecord};
use crate::traits::NoticeStore;
use crate::validation::ensure_tenant;
use domain::TenantContext;
use std::sync::RwLock;

pub struct InMemoryNoticeStore {
    notices: RwLock<Vec<NoticeRecord>>,
}

impl InMemoryNoticeStore {
    pub fn new() -> Self {
        Self {
            notices: RwLock::new(Vec::new()),
        }
    }
}

impl Default for InMemoryNoticeStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl NoticeStore for InMemoryNoticeStore {
    async fn create_notice(
        &self,
        ctx: &TenantContext,
        notice: NoticeCreate,
    ) -> Result<NoticeRecord, StorageError> {
        ensure_tenant(ctx)?;
        let record = NoticeRecord {
            notice_id: notice.notice_id,
            tenant_id: ctx.tenant_id.clone(),
            title: notice.title,
            content: notice.content,
            level: notice.level,
            notice_type: notice.notice_type,
            target: notice.target,
            recipient_ids: notice.recipient_ids,
            created_by: notice.created_by,
            created_at_ms: notice.created_at_ms,
        };
        let mut notices = self
            .notices
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        notices.push(record.clone());
        Ok(record)
    }

    async fn list_notices_for_user(
        &self,
        ctx: &TenantContext,
        user_id: &str,
    ) -> Result<Vec<NoticeRecord>, StorageError> {
        ensure_tenant(ctx)?;
        let notices = self
            .notices
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        let mut items: Vec<NoticeRecord> = notices
            .iter()
            .filter(|notice| {
                notice.tenant_id == ctx.tenant_id
                    && notice.recipient_ids.iter().any(|id| id == user_id)
            })
            .cloned()
            .collect();
        items.sort_by(|a, b| b.created_at_ms.cmp(&a.created_at_ms));
        Ok(items)
    }
}
