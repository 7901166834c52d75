use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use tably_core::ServiceError;

use crate::api::AppState;
use crate::model::{Claims, Role};

/// Paths that don't require authentication.
const PUBLIC_PATHS: &[&str] = &["/activate", "/setup-pin", "/auth/login", "/system/status"];

/// Token + lifecycle authorization middleware.
///
/// Verifies the Bearer token, then re-resolves the restaurant's lifecycle
/// status from storage. The status never rides inside the token — tokens
/// are long-lived, and suspension or revocation must bite on the very
/// next request. Valid claims are stored as an Extension for handlers.
pub async fn authz_middleware(
    State(svc): State<AppState>,
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let path = req.uri().path().to_string();

    if is_public_path(&path) {
        return next.run(req).await;
    }

    let token = match extract_bearer(req.headers()) {
        Some(t) => t.to_string(),
        None => {
            return ServiceError::Unauthorized("missing authorization header".into())
                .into_response();
        }
    };

    let claims = match svc.verify_token(&token) {
        Ok(c) => c,
        Err(e) => return ServiceError::from(e).into_response(),
    };

    // The lifecycle gate: every authenticated request checks the live
    // status, so a valid signature alone is never enough.
    if let Err(e) = svc.resolve_active(&claims.sub) {
        return ServiceError::from(e).into_response();
    }

    req.extensions_mut().insert(claims);
    next.run(req).await
}

/// Require the admin role on an already-authenticated request.
pub fn require_admin(claims: &Claims) -> Result<(), ServiceError> {
    if claims.role != Role::Admin {
        return Err(ServiceError::PermissionDenied(
            "admin role required".into(),
        ));
    }
    Ok(())
}

/// Extract the Bearer token from Authorization header.
fn extract_bearer(headers: &axum::http::HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

/// Check if a path is public (no auth required).
fn is_public_path(path: &str) -> bool {
    PUBLIC_PATHS.iter().any(|p| path == *p)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_paths_match_exactly() {
        assert!(is_public_path("/activate"));
        assert!(is_public_path("/system/status"));
        assert!(!is_public_path("/activate/extra"));
        assert!(!is_public_path("/admin/codes"));
    }

    #[test]
    fn kitchen_role_is_not_admin() {
        let claims = Claims {
            sub: "r1".into(),
            device_id: "kds-1".into(),
            role: Role::Kitchen,
            sid: "s1".into(),
            iat: 0,
            exp: 1,
        };
        assert!(require_admin(&claims).is_err());
    }
}
