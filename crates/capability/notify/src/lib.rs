//! 在线与通知能力：
//!
//! - `PresenceService`：连接上线/心跳/下线、按用户推送、强制下线、在线用户枚举
//! - `NoticeService`：解析接收人、持久化通知并向在线用户推送摘要
//! - `ConnectionSender`：按连接名投递，进程内实现为 `LocalConnectionHub`

pub mod message;
pub mod notice;
pub mod presence;
pub mod transport;

pub use message::{MessageType, OutboundMessage};
pub use notice::{AUDIENCE_TABLE, NoticeDraft, NoticeService, NotifyOutcome};
pub use presence::{LogoutReport, PresenceService, PushReport};
pub use transport::{ConnectionSender, LocalConnectionHub, NoopSender};

use admin_permission::ResolveError;
use admin_storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl From<ResolveError> for NotifyError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::Storage(inner) => Self::Storage(inner),
        }
    }
}

impl NotifyError {
    /// 调用方输入错误（而非后端故障）。
    pub fn is_invalid_input(&self) -> bool {
        match self {
            Self::Storage(err) => err.is_validation(),
            Self::InvalidInput(_) => true,
            Self::Transport(_) => false,
        }
    }
}
