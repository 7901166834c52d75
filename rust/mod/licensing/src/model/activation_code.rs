use serde::{Deserialize, Serialize};

use crate::service::eligibility::Eligibility;

/// Lifecycle status of an activation code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CodeStatus {
    /// Issued, redeemable.
    Active,
    /// Redeemed by an installation.
    Used,
    /// Administratively revoked; never redeemable again.
    Invalidated,
    /// Past its expiry date.
    Expired,
}

/// A license token redeemable exactly once to provision a restaurant.
///
/// `is_used` is a legacy redundant flag kept alongside `status`; readers
/// must tolerate historically inconsistent rows by OR-ing all the "used"
/// signals (see the eligibility engine), while every writer in this
/// codebase sets them together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivationCode {
    /// The code string itself (unique, primary key).
    pub code: String,

    /// Lifecycle status.
    pub status: CodeStatus,

    /// Legacy redundant used flag.
    #[serde(default)]
    pub is_used: bool,

    /// RFC 3339 timestamp when the code was redeemed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub used_at: Option<String>,

    /// RFC 3339 expiry timestamp; None means the code never expires.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,

    /// Name of the purchasing entity (restaurant or chain).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_name: Option<String>,

    /// Purchased plan identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,

    /// RFC 3339 creation timestamp.
    pub created_at: String,

    /// RFC 3339 last update timestamp.
    pub updated_at: String,
}

/// Input for issuing a new activation code.
#[derive(Debug, Clone, Deserialize)]
pub struct IssueCode {
    pub code: String,
    #[serde(default)]
    pub entity_name: Option<String>,
    #[serde(default)]
    pub plan: Option<String>,
    /// RFC 3339 expiry timestamp, if the code should expire.
    #[serde(default)]
    pub expires_at: Option<String>,
}

/// An activation code annotated with its current eligibility,
/// as returned by the admin listing.
#[derive(Debug, Clone, Serialize)]
pub struct CodeListing {
    #[serde(flatten)]
    pub code: ActivationCode,
    pub eligibility: Eligibility,
}
