//! 稳定的 DTO 与 API 响应契约。

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 标准 API 响应封装。
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

/// 失败响应的错误体。
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ApiError {
                code: code.into(),
                message: message.into(),
            }),
        }
    }
}

/// 在线用户。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OnlineUserDto {
    pub user_id: String,
    pub username: Option<String>,
    pub connections: Vec<String>,
}

/// 强制下线请求体；`connections` 缺省时作用于全部连接。
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequest {
    #[serde(default)]
    pub connections: Option<Vec<String>>,
}

/// 强制下线结果。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutResultDto {
    pub user_id: String,
    pub removed: Vec<String>,
    pub signal_failed: Vec<String>,
}

/// 通知创建请求体。
///
/// `noticeType` 取 SYSTEM / USER / DEPT / ROLE / NOTICE，
/// 只有与类型对应的目标列表生效。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNoticeRequest {
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub level: Option<String>,
    pub notice_type: String,
    #[serde(default, alias = "target_user")]
    pub target_users: Vec<String>,
    #[serde(default, alias = "target_dept")]
    pub target_depts: Vec<String>,
    #[serde(default, alias = "target_role")]
    pub target_roles: Vec<String>,
}

/// 通知返回结构。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoticeDto {
    pub notice_id: String,
    pub title: String,
    pub content: String,
    pub level: String,
    pub notice_type: String,
    pub recipient_count: usize,
    pub created_by: String,
    pub created_at_ms: i64,
}

/// 通知创建结果。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNoticeResponse {
    pub notice: NoticeDto,
    pub pushed_to: Vec<String>,
}

/// 当前用户对某张表的数据范围。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataScopeDto {
    pub table: String,
    /// allow_all / deny_all / filter
    pub scope: String,
    pub predicate: Option<Value>,
}

/// 按数据范围过滤后的行。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowsDto {
    pub table: String,
    pub scope: String,
    pub rows: Vec<Value>,
}

/// WebSocket 握手参数。
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub token: Option<String>,
}

/// 指标快照。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshotDto {
    pub scope_allow_all: u64,
    pub scope_deny_all: u64,
    pub scope_filtered: u64,
    pub presence_touches: u64,
    pub presence_removals: u64,
    pub push_delivered: u64,
    pub push_failed: u64,
    pub forced_logouts: u64,
    pub notices_created: u64,
}
