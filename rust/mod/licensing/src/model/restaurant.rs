use serde::{Deserialize, Serialize};

/// Lifecycle status of a provisioned installation.
///
/// `status` is the single source of truth; the wire-level `is_active`
/// convenience flag is always derived from it, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RestaurantStatus {
    Active,
    Suspended,
    Revoked,
    Inactive,
}

impl RestaurantStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RestaurantStatus::Active => "ACTIVE",
            RestaurantStatus::Suspended => "SUSPENDED",
            RestaurantStatus::Revoked => "REVOKED",
            RestaurantStatus::Inactive => "INACTIVE",
        }
    }
}

/// One provisioned installation.
///
/// This struct is the stored record (JSON `data` column); PIN hashes are
/// argon2id strings and never leave the service layer — API responses use
/// [`SystemStatus`] or plain ids instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Restaurant {
    /// Unique identifier (UUIDv4, no dashes).
    pub id: String,

    /// Lifecycle status (authoritative).
    pub status: RestaurantStatus,

    /// The activation code this installation was provisioned from.
    /// Set exactly once by the activation transaction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activation_code_id: Option<String>,

    /// Argon2id hash of the admin PIN. None means setup is incomplete.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_pin_hash: Option<String>,

    /// Argon2id hash of the kitchen PIN. Optional role.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kitchen_pin_hash: Option<String>,

    /// RFC 3339 creation timestamp.
    pub created_at: String,

    /// RFC 3339 last update timestamp.
    pub updated_at: String,
}

impl Restaurant {
    /// Derived convenience flag: true iff `status == ACTIVE`.
    pub fn is_active(&self) -> bool {
        self.status == RestaurantStatus::Active
    }

    /// Setup is complete iff the admin PIN has been configured.
    pub fn setup_complete(&self) -> bool {
        self.admin_pin_hash.is_some()
    }
}

/// Public system status, returned by `GET /system/status`.
#[derive(Debug, Clone, Serialize)]
pub struct SystemStatus {
    /// Whether any installation has been activated on this terminal.
    pub activated: bool,
    /// Whether PIN setup has completed.
    pub setup_complete: bool,
    /// Installation status, if activated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<RestaurantStatus>,
    /// Derived from `status` — never independently stored.
    pub is_active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_active_derives_from_status() {
        let mut r = Restaurant {
            id: "r1".into(),
            status: RestaurantStatus::Active,
            activation_code_id: None,
            admin_pin_hash: None,
            kitchen_pin_hash: None,
            created_at: "2026-01-01T00:00:00Z".into(),
            updated_at: "2026-01-01T00:00:00Z".into(),
        };
        assert!(r.is_active());
        r.status = RestaurantStatus::Revoked;
        assert!(!r.is_active());
        r.status = RestaurantStatus::Suspended;
        assert!(!r.is_active());
    }

    #[test]
    fn setup_complete_requires_admin_hash() {
        let mut r = Restaurant {
            id: "r1".into(),
            status: RestaurantStatus::Active,
            activation_code_id: None,
            admin_pin_hash: None,
            kitchen_pin_hash: Some("$argon2id$...".into()),
            created_at: "2026-01-01T00:00:00Z".into(),
            updated_at: "2026-01-01T00:00:00Z".into(),
        };
        assert!(!r.setup_complete());
        r.admin_pin_hash = Some("$argon2id$...".into());
        assert!(r.setup_complete());
    }

    #[test]
    fn status_serializes_screaming() {
        let json = serde_json::to_string(&RestaurantStatus::Revoked).unwrap();
        assert_eq!(json, "\"REVOKED\"");
    }
}
