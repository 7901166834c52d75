//! Activation code eligibility — the single source of truth for whether
//! a code may provision an installation.
//!
//! Called by the activation transaction (inside the transaction boundary)
//! and by the admin code listing. Must never be duplicated or re-derived
//! elsewhere.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::{ActivationCode, CodeStatus};

/// Why a code is (in)eligible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EligibilityReason {
    Valid,
    Used,
    Revoked,
    Expired,
}

/// Eligibility verdict for an activation code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Eligibility {
    pub eligible: bool,
    pub reason: EligibilityReason,
}

impl Eligibility {
    fn ineligible(reason: EligibilityReason) -> Self {
        Self {
            eligible: false,
            reason,
        }
    }
}

/// Pure eligibility check. Precedence, first match wins:
///
/// 1. INVALIDATED → REVOKED
/// 2. past expiry → EXPIRED (callers opportunistically persist the status)
/// 3. any "used" signal (status, legacy flag, used_at, bound restaurant)
///    → USED. The signals are OR'd to tolerate historically inconsistent
///    writes.
/// 4. otherwise → VALID
///
/// No side effects; the lazy EXPIRED persist belongs to callers.
pub fn assess(code: &ActivationCode, has_restaurant: bool, now: DateTime<Utc>) -> Eligibility {
    if code.status == CodeStatus::Invalidated {
        return Eligibility::ineligible(EligibilityReason::Revoked);
    }

    if let Some(expires_at) = code.expires_at.as_deref() {
        // Unparsable expiry is treated as no expiry (tolerant reads).
        if let Ok(exp) = DateTime::parse_from_rfc3339(expires_at) {
            if exp.with_timezone(&Utc) < now {
                return Eligibility::ineligible(EligibilityReason::Expired);
            }
        }
    }

    if code.status == CodeStatus::Used
        || code.is_used
        || code.used_at.is_some()
        || has_restaurant
    {
        return Eligibility::ineligible(EligibilityReason::Used);
    }

    Eligibility {
        eligible: true,
        reason: EligibilityReason::Valid,
    }
}
