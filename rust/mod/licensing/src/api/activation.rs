use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;

use tably_core::ServiceError;

use crate::api::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/activate", post(activate))
}

#[derive(Debug, Deserialize)]
struct ActivateRequest {
    code: String,
}

async fn activate(
    State(svc): State<AppState>,
    Json(req): Json<ActivateRequest>,
) -> Result<(axum::http::StatusCode, Json<serde_json::Value>), ServiceError> {
    let restaurant_id = svc.activate(&req.code).map_err(ServiceError::from)?;
    Ok((
        axum::http::StatusCode::CREATED,
        Json(serde_json::json!({ "restaurant_id": restaurant_id })),
    ))
}
