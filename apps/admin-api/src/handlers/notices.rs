//! 消息通知 handlers
//!
//! - POST /notices - 创建通知并推送给在线接收人
//! - GET /notices/mine - 当前用户收到的通知

use crate::AppState;
use crate::middleware::{require_permission, require_tenant_context};
use crate::utils::response::{bad_request_error, notice_to_dto, notify_error, storage_error};
use admin_notify::NoticeDraft;
use api_contract::{ApiResponse, CreateNoticeRequest, CreateNoticeResponse, NoticeDto};
use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use domain::{NoticeLevel, NoticeTarget, NoticeType, permissions};

pub async fn create_notice(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateNoticeRequest>,
) -> Response {
    let ctx = match require_tenant_context(&state, &headers) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    if let Err(response) = require_permission(&ctx, permissions::NOTICE_WRITE) {
        return response;
    }
    let Some(notice_type) = NoticeType::parse(&req.notice_type) else {
        return bad_request_error(format!("unknown noticeType: {}", req.notice_type));
    };
    let level = match req.level.as_deref() {
        None => NoticeLevel::default(),
        Some(value) => match NoticeLevel::parse(value) {
            Some(level) => level,
            None => return bad_request_error(format!("unknown level: {value}")),
        },
    };
    let draft = NoticeDraft {
        title: req.title.trim().to_string(),
        content: req.content,
        level,
        notice_type,
        target: NoticeTarget::select(
            notice_type,
            req.target_users,
            req.target_depts,
            req.target_roles,
        ),
    };
    match state.notices.notify(&ctx, draft).await {
        Ok(outcome) => {
            let data = CreateNoticeResponse {
                notice: notice_to_dto(outcome.notice),
                pushed_to: outcome.pushed_to,
            };
            (StatusCode::OK, Json(ApiResponse::success(data))).into_response()
        }
        Err(err) => notify_error(err),
    }
}

pub async fn list_my_notices(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let ctx = match require_tenant_context(&state, &headers) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    if let Err(response) = require_permission(&ctx, permissions::NOTICE_READ) {
        return response;
    }
    match state
        .notice_store
        .list_notices_for_user(&ctx, &ctx.user_id)
        .await
    {
        Ok(records) => {
            let data: Vec<NoticeDto> = records.into_iter().map(notice_to_dto).collect();
            (StatusCode::OK, Json(ApiResponse::success(data))).into_response()
        }
        Err(err) => storage_error(err),
    }
}
