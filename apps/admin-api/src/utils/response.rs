//! HTTP 响应辅助函数和 DTO 转换
//!
//! - 错误响应：auth_error, forbidden_error, bad_request_error, not_found_error, internal_auth_error,
//!   storage_error, notify_error, resolve_error
//! - DTO 转换：notice_to_dto
//!
//! 所有错误返回统一的 ApiResponse 格式；存储层校验错误映射为 400。

use admin_auth::AuthError;
use admin_notify::NotifyError;
use admin_permission::ResolveError;
use admin_storage::{NoticeRecord, StorageError};
use api_contract::{ApiResponse, NoticeDto};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// 认证错误响应
pub fn auth_error(status: StatusCode) -> Response {
    (
        status,
        Json(ApiResponse::<()>::error(
            "AUTH.UNAUTHORIZED",
            "unauthorized",
        )),
    )
        .into_response()
}

/// 禁止访问错误响应
pub fn forbidden_error() -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(ApiResponse::<()>::error("AUTH.FORBIDDEN", "forbidden")),
    )
        .into_response()
}

/// 错误请求响应
pub fn bad_request_error(message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiResponse::<()>::error("INVALID.REQUEST", message.into())),
    )
        .into_response()
}

/// 资源不存在响应
pub fn not_found_error(message: impl Into<String>) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ApiResponse::<()>::error("RESOURCE.NOT_FOUND", message.into())),
    )
        .into_response()
}

fn internal_error(message: String) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiResponse::<()>::error("INTERNAL.ERROR", message)),
    )
        .into_response()
}

/// 认证内部错误响应
pub fn internal_auth_error(err: AuthError) -> Response {
    internal_error(err.to_string())
}

/// 存储错误响应
pub fn storage_error(err: StorageError) -> Response {
    if err.is_validation() {
        return bad_request_error(err.to_string());
    }
    tracing::error!(target: "admin.api", error = %err, "storage_failed");
    internal_error(err.to_string())
}

pub fn resolve_error(err: ResolveError) -> Response {
    match err {
        ResolveError::Storage(inner) => storage_error(inner),
    }
}

pub fn notify_error(err: NotifyError) -> Response {
    match err {
        NotifyError::Storage(inner) => storage_error(inner),
        NotifyError::InvalidInput(message) => bad_request_error(message),
        NotifyError::Transport(message) => {
            tracing::error!(target: "admin.api", error = %message, "transport_failed");
            internal_error(message)
        }
    }
}

/// NoticeRecord 转 NoticeDto
pub fn notice_to_dto(record: NoticeRecord) -> NoticeDto {
    NoticeDto {
        notice_id: record.notice_id,
        title: record.title,
        content: record.content,
        level: record.level.as_str().to_string(),
        notice_type: record.notice_type.as_str().to_string(),
        recipient_count: record.recipient_ids.len(),
        created_by: record.created_by,
        created_at_ms: record.created_at_ms,
    }
}
