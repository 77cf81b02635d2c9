//! Postgres 通知实现
//!
//! 通知主体写入 `notices`，解析后的接收人写入 `notice_recipients`，两者同一事务。

use crate::error::StorageError;
use crate::models::{NoticeCreate, NoticeRecord};
use crate::traits::NoticeStore;
use crate::validation::ensure_tenant;
use domain::TenantContext;
use serde::de::DeserializeOwned;
use serde_json::Value;
use sqlx::{PgPool, Row};

pub struct PgNoticeStore {
    pub pool: PgPool,
}

impl PgNoticeStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// 枚举以文本列保存（与 serde 名称一致）。
fn enum_text<T: serde::Serialize>(value: &T) -> Result<String, StorageError> {
    match serde_json::to_value(value)? {
        Value::String(text) => Ok(text),
        other => Ok(other.to_string()),
    }
}

fn enum_from_text<T: DeserializeOwned>(text: String) -> Result<T, StorageError> {
    Ok(serde_json::from_value(Value::String(text))?)
}

#[async_trait::async_trait]
impl NoticeStore for PgNoticeStore {
    async fn create_notice(
        &self,
        ctx: &TenantContext,
        notice: NoticeCreate,
    ) -> Result<NoticeRecord, StorageError> {
        ensure_tenant(ctx)?;
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "insert into notices \
             (notice_id, tenant_id, title, content, level, notice_type, target, created_by, created_at) \
             values ($1, $2, $3, $4, $5, $6, $7, $8, to_timestamp($9 / 1000.0))",
        )
        .bind(&notice.notice_id)
        .bind(&ctx.tenant_id)
        .bind(&notice.title)
        .bind(&notice.content)
        .bind(enum_text(&notice.level)?)
        .bind(enum_text(&notice.notice_type)?)
        .bind(serde_json::to_value(&notice.target)?)
        .bind(&notice.created_by)
        .bind(notice.created_at_ms as f64)
        .execute(&mut *tx)
        .await?;
        sqlx::query(
            "insert into notice_recipients (tenant_id, notice_id, user_id) \
             select $1, $2, unnest($3::text[]) on conflict do nothing",
        )
        .bind(&ctx.tenant_id)
        .bind(&notice.notice_id)
        .bind(&notice.recipient_ids)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(NoticeRecord {
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
        })
    }

    async fn list_notices_for_user(
        &self,
        ctx: &TenantContext,
        user_id: &str,
    ) -> Result<Vec<NoticeRecord>, StorageError> {
        ensure_tenant(ctx)?;
        let rows = sqlx::query(
            "select n.notice_id, n.tenant_id, n.title, n.content, n.level, n.notice_type, n.target, \
                    n.created_by, (extract(epoch from n.created_at) * 1000)::bigint as created_at_ms, \
                    array(select r2.user_id from notice_recipients r2 \
                          where r2.tenant_id = n.tenant_id and r2.notice_id = n.notice_id \
                          order by r2.user_id) as recipient_ids \
             from notices n \
             join notice_recipients r on r.tenant_id = n.tenant_id and r.notice_id = n.notice_id \
             where n.tenant_id = $1 and r.user_id = $2 \
             order by n.created_at desc",
        )
        .bind(&ctx.tenant_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            let target: Value = row.try_get("target")?;
            items.push(NoticeRecord {
                notice_id: row.try_get("notice_id")?,
                tenant_id: row.try_get("tenant_id")?,
                title: row.try_get("title")?,
                content: row.try_get("content")?,
                level: enum_from_text(row.try_get("level")?)?,
                notice_type: enum_from_text(row.try_get("notice_type")?)?,
                target: serde_json::from_value(target)?,
                recipient_ids: row.try_get("recipient_ids")?,
                created_by: row.try_get("created_by")?,
                created_at_ms: row.try_get("created_at_ms")?,
            });
        }
        Ok(items)
    }
}
