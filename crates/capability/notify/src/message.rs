//! 推送消息信封。

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 推送类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    System,
    Info,
    /// 新通知摘要。
    Notice,
    /// 强制下线信号，客户端收到后关闭连接。
    Logout,
}

/// 发往单个连接的消息。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub sender: String,
    pub message_type: MessageType,
    pub content: Value,
    /// 客户端是否需要刷新未读数。
    #[serde(default)]
    pub refresh_unread: bool,
}

impl OutboundMessage {
    pub fn new(message_type: MessageType, content: Value) -> Self {
        Self {
            sender: "system".to_string(),
            message_type,
            content,
            refresh_unread: false,
        }
    }

    pub fn logout(reason: &str) -> Self {
        Self::new(MessageType::Logout, Value::String(reason.to_string()))
    }

    pub fn is_logout(&self) -> bool {
        self.message_type == MessageType::Logout
    }
}
