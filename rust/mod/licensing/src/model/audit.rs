use serde::{Deserialize, Serialize};

/// Append-only record of a security-sensitive action.
///
/// Written on both successes and failures of credential operations.
/// Lockout state changes are a mechanical throttle and are not audited.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Unique identifier (UUIDv4, no dashes).
    pub id: String,

    /// Action name, e.g. `KITCHEN_PIN_RESET` or `ACTIVATION_REVOKED`.
    pub action: String,

    /// Acting identity — a device id, or "system" for unauthenticated flows.
    pub actor: String,

    /// Target entity — usually a restaurant id or activation code.
    pub target: String,

    /// Free-form structured context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,

    /// RFC 3339 timestamp.
    pub created_at: String,
}
