//! 数据权限 handlers
//!
//! - GET /data-scope/{table} - 当前用户对该表的过滤谓词
//! - GET /tables/{table}/rows - 按数据范围过滤后的行

use crate::AppState;
use crate::middleware::{require_permission, require_tenant_context};
use crate::utils::response::{resolve_error, storage_error};
use admin_permission::DataScope;
use api_contract::{ApiResponse, DataScopeDto, RowsDto};
use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use domain::permissions;

#[derive(serde::Deserialize)]
pub struct TablePath {
    table: String,
}

pub async fn get_data_scope(
    State(state): State<AppState>,
    Path(path): Path<TablePath>,
    headers: HeaderMap,
) -> Response {
    let ctx = match require_tenant_context(&state, &headers) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    if let Err(response) = require_permission(&ctx, permissions::DATA_SCOPE_READ) {
        return response;
    }
    let scope = match state.resolver.resolve_predicate(&ctx, &path.table).await {
        Ok(scope) => scope,
        Err(err) => return resolve_error(err),
    };
    let predicate = match &scope {
        DataScope::Filter(predicate) => serde_json::to_value(predicate).ok(),
        DataScope::AllowAll | DataScope::DenyAll => None,
    };
    let dto = DataScopeDto {
        table: path.table,
        scope: scope.as_str().to_string(),
        predicate,
    };
    (StatusCode::OK, Json(ApiResponse::success(dto))).into_response()
}

pub async fn list_table_rows(
    State(state): State<AppState>,
    Path(path): Path<TablePath>,
    headers: HeaderMap,
) -> Response {
    let ctx = match require_tenant_context(&state, &headers) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    if let Err(response) = require_permission(&ctx, permissions::TABLE_ROW_READ) {
        return response;
    }
    let scope = match state.resolver.resolve_predicate(&ctx, &path.table).await {
        Ok(scope) => scope,
        Err(err) => return resolve_error(err),
    };
    let rows = match scope {
        DataScope::DenyAll => Vec::new(),
        _ => match state
            .rows
            .apply_predicate(&ctx, &path.table, &scope.predicate())
            .await
        {
            Ok(rows) => rows,
            Err(err) => return storage_error(err),
        },
    };
    let dto = RowsDto {
        table: path.table,
        scope: scope.as_str().to_string(),
        rows,
    };
    (StatusCode::OK, Json(ApiResponse::success(dto))).into_response()
}
