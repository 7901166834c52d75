mod activation;
mod admin;
mod auth;
mod middleware;
mod security;
mod system;

use std::sync::Arc;

use axum::Router;

use crate::service::LicensingService;

/// Shared application state.
pub type AppState = Arc<LicensingService>;

/// Build the complete licensing API router.
///
/// Routes are absolute (the terminal serves them at the root). The
/// authorization middleware wraps everything; public paths are listed
/// in `middleware::PUBLIC_PATHS`.
pub fn build_router(svc: Arc<LicensingService>) -> Router {
    let api = Router::new()
        .merge(activation::routes())
        .merge(auth::routes())
        .merge(security::routes())
        .merge(system::routes())
        .merge(admin::routes());

    Router::new()
        .merge(api)
        .layer(axum::middleware::from_fn_with_state(
            svc.clone(),
            middleware::authz_middleware,
        ))
        .with_state(svc)
}
