use axum::extract::State;
use axum::routing::post;
use axum::{Extension, Json, Router};

use tably_core::ServiceError;

use crate::api::middleware::require_admin;
use crate::api::AppState;
use crate::model::{Claims, RevokeRequest, UpdateKitchenPinRequest, VerifyAdminPinRequest};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/security/verify-admin-pin", post(verify_admin_pin))
        .route("/security/update-kitchen-pin", post(update_kitchen_pin))
        .route("/security/revoke-activation", post(revoke_activation))
}

async fn verify_admin_pin(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<VerifyAdminPinRequest>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    require_admin(&claims)?;
    svc.verify_admin_pin(&claims.sub, &req.admin_pin, &claims.device_id)
        .map_err(ServiceError::from)?;
    Ok(Json(serde_json::json!({ "verified": true })))
}

async fn update_kitchen_pin(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateKitchenPinRequest>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    require_admin(&claims)?;
    svc.update_kitchen_pin(
        &claims.sub,
        &req.admin_pin,
        &req.new_kitchen_pin,
        &claims.device_id,
    )
    .map_err(ServiceError::from)?;
    Ok(Json(serde_json::json!({ "updated": true })))
}

async fn revoke_activation(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<RevokeRequest>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    require_admin(&claims)?;
    svc.revoke_activation(&claims.sub, &req.admin_pin, &claims.device_id)
        .map_err(ServiceError::from)?;
    Ok(Json(serde_json::json!({ "revoked": true })))
}
