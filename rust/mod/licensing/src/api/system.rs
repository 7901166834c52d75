use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use tably_core::ServiceError;

use crate::api::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/system/status", get(system_status))
}

async fn system_status(
    State(svc): State<AppState>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let status = svc.system_status().map_err(ServiceError::from)?;
    Ok(Json(serde_json::to_value(status).map_err(|e| {
        ServiceError::Internal(e.to_string())
    })?))
}
