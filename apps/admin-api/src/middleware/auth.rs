//! 认证和授权中间件
//!
//! - request_context：请求上下文中间件，注入 request_id/trace_id
//! - bearer_token：从 Authorization 头提取 Bearer token
//! - require_tenant_context：验证 token 并提取租户上下文
//! - require_permission：校验接口权限码
//!
//! WebSocket 握手无法携带自定义头，改用 `?token=` 查询参数，校验逻辑相同。

use axum::{
    body::Body,
    extract::Request,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    middleware::Next,
    response::Response,
};
use admin_auth::AuthError;
use admin_telemetry::new_request_ids;
use tracing::{Instrument, info_span};

use crate::AppState;
use crate::utils::response::{auth_error, forbidden_error, internal_auth_error};
use domain::TenantContext;

/// 请求上下文中间件：注入 request_id/trace_id
pub async fn request_context(mut req: Request<Body>, next: Next) -> Response {
    let ids = new_request_ids();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    req.extensions_mut().insert(ids.clone());

    let span = info_span!(
        "request",
        request_id = %ids.request_id,
        trace_id = %ids.trace_id,
        method = %method,
        path = %path
    );

    let mut response = next.run(req).instrument(span).await;
    response.headers_mut().insert(
        "x-request-id",
        HeaderValue::from_str(&ids.request_id).unwrap_or_else(|_| HeaderValue::from_static("")),
    );
    response.headers_mut().insert(
        "x-trace-id",
        HeaderValue::from_str(&ids.trace_id).unwrap_or_else(|_| HeaderValue::from_static("")),
    );
    response
}

/// 从请求头中提取 Bearer token
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let header_value = headers.get(header::AUTHORIZATION)?;
    let auth_str = header_value.to_str().ok()?;
    auth_str.strip_prefix("Bearer ")
}

/// 校验 token 字符串并返回租户上下文
pub fn verify_token(state: &AppState, token: &str) -> Result<TenantContext, Response> {
    match state.auth.verify_access_token(token) {
        Ok(ctx) => Ok(ctx),
        Err(AuthError::TokenInvalid | AuthError::TokenExpired) => {
            Err(auth_error(StatusCode::UNAUTHORIZED))
        }
        Err(err) => Err(internal_auth_error(err)),
    }
}

/// 验证并提取租户上下文
pub fn require_tenant_context(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<TenantContext, Response> {
    match bearer_token(headers) {
        Some(token) => verify_token(state, token),
        None => Err(auth_error(StatusCode::UNAUTHORIZED)),
    }
}

/// 校验接口权限码
pub fn require_permission(ctx: &TenantContext, code: &str) -> Result<(), Response> {
    if ctx.has_permission(code) {
        Ok(())
    } else {
        tracing::info!(
            target: "admin.api",
            user_id = %ctx.user_id,
            permission = code,
            "permission_denied"
        );
        Err(forbidden_error())
    }
}
