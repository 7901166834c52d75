use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};

use tably_core::{ListParams, ServiceError};

use crate::api::middleware::require_admin;
use crate::api::AppState;
use crate::model::{Claims, IssueCode};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin/codes", get(list_codes).post(issue_code))
        .route("/admin/codes/{code}/reset", post(reset_code))
        .route("/admin/audit-log", get(list_audit))
        .route("/admin/devices", get(list_devices))
}

async fn list_codes(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<ListParams>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    require_admin(&claims)?;
    let result = svc.list_codes(&params).map_err(ServiceError::from)?;
    Ok(Json(serde_json::json!({
        "items": result.items,
        "total": result.total,
    })))
}

async fn issue_code(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(input): Json<IssueCode>,
) -> Result<(axum::http::StatusCode, Json<serde_json::Value>), ServiceError> {
    require_admin(&claims)?;
    let code = svc.issue_code(input).map_err(ServiceError::from)?;
    Ok((
        axum::http::StatusCode::CREATED,
        Json(serde_json::to_value(code).map_err(|e| ServiceError::Internal(e.to_string()))?),
    ))
}

async fn reset_code(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(code): Path<String>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    require_admin(&claims)?;
    let reset = svc
        .force_reset_code(&code, &claims.device_id)
        .map_err(ServiceError::from)?;
    Ok(Json(serde_json::to_value(reset).map_err(|e| {
        ServiceError::Internal(e.to_string())
    })?))
}

async fn list_audit(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<ListParams>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    require_admin(&claims)?;
    let result = svc.list_audit(&params).map_err(ServiceError::from)?;
    Ok(Json(serde_json::json!({
        "items": result.items,
        "total": result.total,
    })))
}

async fn list_devices(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    require_admin(&claims)?;
    let devices = svc.list_devices(&claims.sub).map_err(ServiceError::from)?;
    Ok(Json(serde_json::json!({ "items": devices })))
}
