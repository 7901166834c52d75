use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};

use tably_core::ServiceError;

use crate::api::AppState;
use crate::model::{LoginRequest, SetupRequest};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/setup-pin", post(setup_pin))
        .route("/auth/login", post(login))
}

async fn setup_pin(
    State(svc): State<AppState>,
    Json(req): Json<SetupRequest>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let token = svc.setup_pins(req).map_err(ServiceError::from)?;
    Ok(Json(serde_json::to_value(token).map_err(|e| {
        ServiceError::Internal(e.to_string())
    })?))
}

async fn login(
    State(svc): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let token = svc.login(req).map_err(ServiceError::from)?;
    Ok(Json(serde_json::to_value(token).map_err(|e| {
        ServiceError::Internal(e.to_string())
    })?))
}
