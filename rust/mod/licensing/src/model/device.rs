use serde::{Deserialize, Serialize};

/// Role a device credential is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Kitchen,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Kitchen => "KITCHEN",
        }
    }
}

/// One physical device + role pairing, upserted on every successful login.
///
/// Never independently revoked — revocation is enforced at the lifecycle
/// gate, which re-resolves the restaurant's status on every request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceCredential {
    /// Caller-supplied stable device identifier.
    pub device_id: String,

    /// Role the device logged in as.
    pub role: Role,

    /// Owning installation.
    pub restaurant_id: String,

    /// RFC 3339 timestamp of the first login.
    pub created_at: String,

    /// RFC 3339 timestamp of the most recent login.
    pub last_used: String,
}

impl DeviceCredential {
    /// Storage key: one row per device+role pairing.
    pub fn storage_id(device_id: &str, role: Role) -> String {
        format!("{}:{}", device_id, role.as_str())
    }
}

/// JWT claims payload for a device credential token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: restaurant id.
    pub sub: String,

    /// Device identifier.
    pub device_id: String,

    /// Role the token was issued for.
    pub role: Role,

    /// Token id (audit correlation).
    pub sid: String,

    /// Issued at (unix timestamp).
    pub iat: i64,

    /// Expiration (unix timestamp).
    pub exp: i64,
}

/// Request body for `POST /auth/login`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub pin: String,
    pub role: Role,
    pub device_id: String,
}

/// Request body for `POST /setup-pin`.
#[derive(Debug, Clone, Deserialize)]
pub struct SetupRequest {
    pub restaurant_id: String,
    pub admin_pin: String,
    #[serde(default)]
    pub kitchen_pin: Option<String>,
    /// Device performing setup; receives the initial admin token.
    pub device_id: String,
}

/// Request body for `POST /security/verify-admin-pin`.
#[derive(Debug, Clone, Deserialize)]
pub struct VerifyAdminPinRequest {
    pub admin_pin: String,
}

/// Request body for `POST /security/update-kitchen-pin`.
///
/// Carries the admin PIN again: the update never trusts that a prior
/// standalone verify happened.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateKitchenPinRequest {
    pub admin_pin: String,
    pub new_kitchen_pin: String,
}

/// Request body for `POST /security/revoke-activation`.
#[derive(Debug, Clone, Deserialize)]
pub struct RevokeRequest {
    pub admin_pin: String,
}

/// Token issued after login or setup.
#[derive(Debug, Clone, Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub role: Role,
    pub token_type: String,
    pub expires_in: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_id_pairs_device_and_role() {
        assert_eq!(DeviceCredential::storage_id("tablet-1", Role::Admin), "tablet-1:ADMIN");
        assert_eq!(DeviceCredential::storage_id("tablet-1", Role::Kitchen), "tablet-1:KITCHEN");
    }

    #[test]
    fn role_roundtrips_screaming() {
        let r: Role = serde_json::from_str("\"KITCHEN\"").unwrap();
        assert_eq!(r, Role::Kitchen);
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"ADMIN\"");
    }
}
