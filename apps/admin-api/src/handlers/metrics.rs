//! 进程内指标快照。
//!
//! - GET /metrics

use admin_telemetry::metrics;
use api_contract::{ApiResponse, MetricsSnapshotDto};
use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use domain::permissions;

use crate::{
    AppState,
    middleware::{require_permission, require_tenant_context},
};

pub async fn get_metrics(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let ctx = match require_tenant_context(&state, &headers) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    if let Err(response) = require_permission(&ctx, permissions::METRICS_READ) {
        return response;
    }

    let snapshot = metrics().snapshot();
    (
        StatusCode::OK,
        Json(ApiResponse::success(MetricsSnapshotDto {
            scope_allow_all: snapshot.scope_allow_all,
            scope_deny_all: snapshot.scope_deny_all,
            scope_filtered: snapshot.scope_filtered,
            presence_touches: snapshot.presence_touches,
            presence_removals: snapshot.presence_removals,
            push_delivered: snapshot.push_delivered,
            push_failed: snapshot.push_failed,
            forced_logouts: snapshot.forced_logouts,
            notices_created: snapshot.notices_created,
        })),
    )
        .into_response()
}
