//! 在线状态服务。
//!
//! 每个用户对应一个在线分组 `{group_prefix}{tenant_id}.{user_id}`，分组成员是该用户的连接名。
//! 租户 ID 不能含 `.`，分组名由此可以无歧义地还原出用户 ID。
//! 推送按连接并发投递，单个连接失败只记录日志；强制下线先发信号再移除成员，
//! 信号失败也会移除。

use crate::NotifyError;
use crate::message::{MessageType, OutboundMessage};
use crate::transport::ConnectionSender;
use admin_storage::{PresenceStore, validate_connection_name, validate_group_name};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::task::JoinSet;

/// 单次推送的投递结果。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PushReport {
    pub delivered: Vec<String>,
    pub failed: Vec<String>,
}

/// 强制下线结果：`removed` 为实际移除的连接（只含该用户分组内的存活连接），
/// `signal_failed` 为信号未送达的部分。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LogoutReport {
    pub removed: Vec<String>,
    pub signal_failed: Vec<String>,
}

pub struct PresenceService {
    store: Arc<dyn PresenceStore>,
    sender: Arc<dyn ConnectionSender>,
    group_prefix: String,
    clock: fn() -> i64,
}

impl PresenceService {
    pub fn new(
        store: Arc<dyn PresenceStore>,
        sender: Arc<dyn ConnectionSender>,
        group_prefix: impl Into<String>,
    ) -> Self {
        Self {
            store,
            sender,
            group_prefix: group_prefix.into(),
            clock: now_epoch_seconds,
        }
    }

    /// 替换时间源（Unix 秒）。
    pub fn with_clock(mut self, clock: fn() -> i64) -> Self {
        self.clock = clock;
        self
    }

    /// 用户所在租户的在线分组名，租户 ID 或分组名非法时返回校验错误。
    pub fn group_for_user(&self, tenant_id: &str, user_id: &str) -> Result<String, NotifyError> {
        let group = format!("{}{}", self.tenant_prefix(tenant_id)?, user_id);
        validate_group_name(&group)?;
        Ok(group)
    }

    fn tenant_prefix(&self, tenant_id: &str) -> Result<String, NotifyError> {
        if tenant_id.is_empty() || tenant_id.contains('.') {
            return Err(NotifyError::InvalidInput(format!(
                "invalid tenant for presence group: {tenant_id:?}"
            )));
        }
        let prefix = format!("{}{}.", self.group_prefix, tenant_id);
        validate_group_name(&prefix)?;
        Ok(prefix)
    }

    pub async fn connect(
        &self,
        tenant_id: &str,
        user_id: &str,
        connection: &str,
    ) -> Result<(), NotifyError> {
        let group = self.group_for_user(tenant_id, user_id)?;
        self.store.touch(&group, connection, (self.clock)()).await?;
        admin_telemetry::record_presence_touch();
        tracing::info!(
            target: "admin.presence",
            tenant_id,
            user_id,
            connection,
            "connection_joined"
        );
        Ok(())
    }

    pub async fn heartbeat(
        &self,
        tenant_id: &str,
        user_id: &str,
        connection: &str,
    ) -> Result<(), NotifyError> {
        let group = self.group_for_user(tenant_id, user_id)?;
        self.store.touch(&group, connection, (self.clock)()).await?;
        admin_telemetry::record_presence_touch();
        tracing::debug!(target: "admin.presence", tenant_id, user_id, connection, "presence_touch");
        Ok(())
    }

    pub async fn disconnect(
        &self,
        tenant_id: &str,
        user_id: &str,
        connection: &str,
    ) -> Result<(), NotifyError> {
        let group = self.group_for_user(tenant_id, user_id)?;
        self.store.remove(&group, connection).await?;
        admin_telemetry::record_presence_removal();
        tracing::info!(
            target: "admin.presence",
            tenant_id,
            user_id,
            connection,
            "connection_left"
        );
        Ok(())
    }

    pub async fn alive_connections(
        &self,
        tenant_id: &str,
        user_id: &str,
    ) -> Result<Vec<String>, NotifyError> {
        let group = self.group_for_user(tenant_id, user_id)?;
        Ok(self.store.list_alive(&group, (self.clock)()).await?)
    }

    pub async fn is_online(&self, tenant_id: &str, user_id: &str) -> Result<bool, NotifyError> {
        Ok(!self.alive_connections(tenant_id, user_id).await?.is_empty())
    }

    pub async fn push(
        &self,
        tenant_id: &str,
        user_id: &str,
        content: Value,
        message_type: MessageType,
    ) -> Result<PushReport, NotifyError> {
        self.push_message(tenant_id, user_id, OutboundMessage::new(message_type, content))
            .await
    }

    /// 向用户全部存活连接并发投递；没有存活连接时返回空结果。
    pub async fn push_message(
        &self,
        tenant_id: &str,
        user_id: &str,
        message: OutboundMessage,
    ) -> Result<PushReport, NotifyError> {
        let connections = self.alive_connections(tenant_id, user_id).await?;
        let message = Arc::new(message);
        let mut tasks = JoinSet::new();
        for connection in connections {
            let sender = self.sender.clone();
            let message = message.clone();
            tasks.spawn(async move {
                let result = sender.send(&connection, &message).await;
                (connection, result)
            });
        }

        let mut report = PushReport::default();
        while let Some(joined) = tasks.join_next().await {
            let (connection, result) = match joined {
                Ok(outcome) => outcome,
                Err(err) => {
                    tracing::warn!(target: "admin.presence", user_id, error = %err, "push_task_failed");
                    continue;
                }
            };
            match result {
                Ok(()) => {
                    admin_telemetry::record_push_delivered();
                    report.delivered.push(connection);
                }
                Err(err) => {
                    admin_telemetry::record_push_failed();
                    tracing::warn!(
                        target: "admin.presence",
                        tenant_id,
                        user_id,
                        connection = %connection,
                        error = %err,
                        "push_failed"
                    );
                    report.failed.push(connection);
                }
            }
        }
        report.delivered.sort();
        report.failed.sort();
        Ok(report)
    }

    /// 强制下线。未指定 `connections` 时作用于全部存活连接；指定时只处理其中
    /// 属于该用户分组的存活连接。所有校验先于任何信号与移除。
    pub async fn force_logout(
        &self,
        tenant_id: &str,
        user_id: &str,
        connections: Option<&[String]>,
    ) -> Result<LogoutReport, NotifyError> {
        let group = self.group_for_user(tenant_id, user_id)?;
        if let Some(explicit) = connections {
            for connection in explicit {
                validate_connection_name(connection)?;
            }
        }
        let alive = self.store.list_alive(&group, (self.clock)()).await?;
        let targets: Vec<String> = match connections {
            Some(explicit) => {
                let requested: HashSet<&str> = explicit.iter().map(String::as_str).collect();
                let owned: Vec<String> = alive
                    .into_iter()
                    .filter(|member| requested.contains(member.as_str()))
                    .collect();
                let skipped = requested.len() - owned.len();
                if skipped > 0 {
                    tracing::debug!(
                        target: "admin.presence",
                        tenant_id,
                        user_id,
                        skipped,
                        "force_logout_skipped_foreign"
                    );
                }
                owned
            }
            None => alive,
        };

        let signal = OutboundMessage::logout("forced logout");
        let mut report = LogoutReport::default();
        let mut first_error = None;
        for connection in targets {
            if let Err(err) = self.sender.send(&connection, &signal).await {
                tracing::warn!(
                    target: "admin.presence",
                    tenant_id,
                    user_id,
                    connection = %connection,
                    error = %err,
                    "force_logout_signal_failed"
                );
                report.signal_failed.push(connection.clone());
            }
            match self.store.remove(&group, &connection).await {
                Ok(()) => {
                    admin_telemetry::record_presence_removal();
                    report.removed.push(connection);
                }
                Err(err) => {
                    tracing::error!(
                        target: "admin.presence",
                        user_id,
                        connection = %connection,
                        error = %err,
                        "force_logout_remove_failed"
                    );
                    first_error.get_or_insert(err);
                }
            }
        }
        if let Some(err) = first_error {
            return Err(err.into());
        }

        admin_telemetry::record_forced_logout();
        tracing::info!(
            target: "admin.presence",
            tenant_id,
            user_id,
            removed = report.removed.len(),
            signal_failed = report.signal_failed.len(),
            "user_forced_logout"
        );
        Ok(report)
    }

    /// 租户内至少有一个存活连接的用户。
    pub async fn online_user_ids(&self, tenant_id: &str) -> Result<Vec<String>, NotifyError> {
        let prefix = self.tenant_prefix(tenant_id)?;
        let groups = self.store.list_groups(&format!("{prefix}*")).await?;
        let now = (self.clock)();
        let mut users = Vec::new();
        for group in groups {
            let Some(user_id) = group.strip_prefix(&prefix) else {
                continue;
            };
            if user_id.is_empty() {
                continue;
            }
            if !self.store.list_alive(&group, now).await?.is_empty() {
                users.push(user_id.to_string());
            }
        }
        users.sort();
        users.dedup();
        Ok(users)
    }
}

fn now_epoch_seconds() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_secs() as i64)
        .unwrap_or_default()
}
