//! WebSocket 接入
//!
//! - GET /ws?token=
//!
//! 连接建立后加入用户在线分组；客户端任意消息视为心跳。
//! 收到强制下线信号时先转发给客户端再关闭连接。

use crate::AppState;
use crate::middleware::verify_token;
use crate::utils::response::auth_error;
use admin_notify::OutboundMessage;
use api_contract::WsQuery;
use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::Response,
};
use domain::TenantContext;
use tokio::sync::mpsc::UnboundedReceiver;
use uuid::Uuid;

pub async fn ws_connect(
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    upgrade: WebSocketUpgrade,
) -> Response {
    let Some(token) = query.token.as_deref().filter(|token| !token.is_empty()) else {
        return auth_error(StatusCode::UNAUTHORIZED);
    };
    let ctx = match verify_token(&state, token) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    upgrade.on_upgrade(move |socket| serve_socket(state, ctx, socket))
}

async fn serve_socket(state: AppState, ctx: TenantContext, socket: WebSocket) {
    let connection = format!("ws.{}", Uuid::new_v4().simple());
    let outbound = match state.hub.register(&connection) {
        Ok(rx) => rx,
        Err(err) => {
            tracing::error!(target: "admin.presence", error = %err, "connection_register_failed");
            return;
        }
    };
    if let Err(err) = state.presence.connect(&ctx.tenant_id, &ctx.user_id, &connection).await {
        tracing::error!(
            target: "admin.presence",
            user_id = %ctx.user_id,
            error = %err,
            "connection_join_failed"
        );
        state.hub.unregister(&connection);
        return;
    }

    pump(&state, &ctx, &connection, socket, outbound).await;

    state.hub.unregister(&connection);
    if let Err(err) = state.presence.disconnect(&ctx.tenant_id, &ctx.user_id, &connection).await {
        tracing::warn!(
            target: "admin.presence",
            user_id = %ctx.user_id,
            connection = %connection,
            error = %err,
            "connection_leave_failed"
        );
    }
}

async fn pump(
    state: &AppState,
    ctx: &TenantContext,
    connection: &str,
    mut socket: WebSocket,
    mut outbound: UnboundedReceiver<OutboundMessage>,
) {
    loop {
        tokio::select! {
            message = outbound.recv() => {
                let Some(message) = message else { break };
                let text = match serde_json::to_string(&message) {
                    Ok(text) => text,
                    Err(err) => {
                        tracing::warn!(target: "admin.presence", error = %err, "message_encode_failed");
                        continue;
                    }
                };
                if socket.send(Message::Text(text)).await.is_err() {
                    break;
                }
                if message.is_logout() {
                    if let Err(err) = socket.send(Message::Close(None)).await {
                        tracing::debug!(
                            target: "admin.presence",
                            connection,
                            error = %err,
                            "close_frame_failed"
                        );
                    }
                    break;
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {
                        if let Err(err) = state.presence.heartbeat(&ctx.tenant_id, &ctx.user_id, connection).await {
                            tracing::warn!(
                                target: "admin.presence",
                                user_id = %ctx.user_id,
                                connection,
                                error = %err,
                                "heartbeat_failed"
                            );
                        }
                    }
                }
            }
        }
    }
}
