//! 在线用户 handlers
//!
//! - GET /online-users - 列出在线用户及其存活连接
//! - POST /online-users/{user_id}/logout - 强制下线（可指定连接）

use crate::AppState;
use crate::middleware::{require_permission, require_tenant_context};
use crate::utils::response::{not_found_error, notify_error, storage_error};
use api_contract::{ApiResponse, LogoutRequest, LogoutResultDto, OnlineUserDto};
use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use domain::permissions;
use std::collections::HashMap;

#[derive(serde::Deserialize)]
pub struct UserPath {
    user_id: String,
}

pub async fn list_online_users(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let ctx = match require_tenant_context(&state, &headers) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    if let Err(response) = require_permission(&ctx, permissions::ONLINE_USER_READ) {
        return response;
    }
    let user_ids = match state.presence.online_user_ids(&ctx.tenant_id).await {
        Ok(ids) => ids,
        Err(err) => return notify_error(err),
    };
    // 已停用或删除的用户不展示
    let usernames: HashMap<String, String> = match state.users.find_users(&ctx, &user_ids).await {
        Ok(users) => users
            .into_iter()
            .map(|user| (user.user_id, user.username))
            .collect(),
        Err(err) => return storage_error(err),
    };

    let mut data = Vec::new();
    for user_id in user_ids {
        let Some(username) = usernames.get(&user_id) else {
            continue;
        };
        let connections = match state.presence.alive_connections(&ctx.tenant_id, &user_id).await {
            Ok(connections) => connections,
            Err(err) => return notify_error(err),
        };
        if connections.is_empty() {
            continue;
        }
        data.push(OnlineUserDto {
            user_id,
            username: Some(username.clone()),
            connections,
        });
    }
    (StatusCode::OK, Json(ApiResponse::success(data))).into_response()
}

pub async fn logout_user(
    State(state): State<AppState>,
    Path(path): Path<UserPath>,
    headers: HeaderMap,
    req: Option<Json<LogoutRequest>>,
) -> Response {
    let ctx = match require_tenant_context(&state, &headers) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    if let Err(response) = require_permission(&ctx, permissions::ONLINE_USER_LOGOUT) {
        return response;
    }
    match state.users.find_user(&ctx, &path.user_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return not_found_error("user not found"),
        Err(err) => return storage_error(err),
    }
    let connections = req.and_then(|Json(req)| req.connections);
    match state
        .presence
        .force_logout(&ctx.tenant_id, &path.user_id, connections.as_deref())
        .await
    {
        Ok(report) => {
            tracing::info!(
                target: "admin.api",
                operator = %ctx.user_id,
                user_id = %path.user_id,
                removed = report.removed.len(),
                "online_user_logout"
            );
            let dto = LogoutResultDto {
                user_id: path.user_id,
                removed: report.removed,
                signal_failed: report.signal_failed,
            };
            (StatusCode::OK, Json(ApiResponse::success(dto))).into_response()
        }
        Err(err) => notify_error(err),
    }
}
