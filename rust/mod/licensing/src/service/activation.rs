//! The activation transaction: redeem a code, create the installation.
//!
//! Eligibility is re-checked inside the transaction boundary so that two
//! concurrent activation attempts on the same code produce exactly one
//! winner; the UNIQUE constraint on `restaurants.activation_code_id`
//! backstops the same invariant at the schema level.

use chrono::Utc;
use tably_core::{new_id, now_rfc3339};
use tably_sql::Value;
use tracing::info;

use crate::model::{ActivationCode, CodeStatus, Restaurant, RestaurantStatus};
use crate::service::eligibility::{self, EligibilityReason};
use crate::service::{audit, LicensingError, LicensingService};

/// What happened inside the activation transaction.
enum Outcome {
    Activated(String),
    Denied(EligibilityReason),
    UnknownCode,
}

impl LicensingService {
    /// Redeem an activation code, creating a new ACTIVE restaurant bound
    /// to it. PINs are configured by the separate setup step.
    ///
    /// On an ineligible code nothing is written except the lazy EXPIRED
    /// status update.
    pub fn activate(&self, raw_code: &str) -> Result<String, LicensingError> {
        let code_str = raw_code.trim().to_string();
        if code_str.is_empty() {
            return Err(LicensingError::Validation("code must not be empty".into()));
        }

        let mut outcome = Outcome::UnknownCode;
        let now_ts = now_rfc3339();

        self.sql.with_tx(&mut |tx| {
            // Re-read the code and its binding inside the transaction.
            let rows = tx.query(
                "SELECT data FROM activation_codes WHERE id = ?1",
                &[Value::Text(code_str.clone())],
            )?;
            let Some(data) = rows.first().and_then(|r| r.get_str("data")) else {
                outcome = Outcome::UnknownCode;
                return Ok(());
            };
            let mut code: ActivationCode = serde_json::from_str(data)
                .map_err(|e| tably_sql::SQLError::Query(e.to_string()))?;

            let bound = tx.query(
                "SELECT COUNT(*) AS c FROM restaurants WHERE activation_code_id = ?1",
                &[Value::Text(code_str.clone())],
            )?;
            let has_restaurant =
                bound.first().and_then(|r| r.get_i64("c")).unwrap_or(0) > 0;

            let verdict = eligibility::assess(&code, has_restaurant, Utc::now());
            if !verdict.eligible {
                if verdict.reason == EligibilityReason::Expired
                    && code.status != CodeStatus::Expired
                {
                    // Lazy expiry persist — the only write on a denial.
                    code.status = CodeStatus::Expired;
                    code.updated_at = now_ts.clone();
                    let json = serde_json::to_string(&code)
                        .map_err(|e| tably_sql::SQLError::Execution(e.to_string()))?;
                    tx.exec(
                        "UPDATE activation_codes SET status = 'EXPIRED', data = ?1, updated_at = ?2 WHERE id = ?3",
                        &[
                            Value::Text(json),
                            Value::Text(now_ts.clone()),
                            Value::Text(code_str.clone()),
                        ],
                    )?;
                }
                outcome = Outcome::Denied(verdict.reason);
                return Ok(());
            }

            // Eligible: create the installation and consume the code,
            // all in this transaction.
            let restaurant = Restaurant {
                id: new_id(),
                status: RestaurantStatus::Active,
                activation_code_id: Some(code_str.clone()),
                admin_pin_hash: None,
                kitchen_pin_hash: None,
                created_at: now_ts.clone(),
                updated_at: now_ts.clone(),
            };
            let restaurant_json = serde_json::to_string(&restaurant)
                .map_err(|e| tably_sql::SQLError::Execution(e.to_string()))?;
            tx.exec(
                "INSERT INTO restaurants (id, status, activation_code_id, configured, data, created_at, updated_at)
                 VALUES (?1, 'ACTIVE', ?2, 0, ?3, ?4, ?5)",
                &[
                    Value::Text(restaurant.id.clone()),
                    Value::Text(code_str.clone()),
                    Value::Text(restaurant_json),
                    Value::Text(now_ts.clone()),
                    Value::Text(now_ts.clone()),
                ],
            )?;

            code.status = CodeStatus::Used;
            code.is_used = true;
            code.used_at = Some(now_ts.clone());
            code.updated_at = now_ts.clone();
            let code_json = serde_json::to_string(&code)
                .map_err(|e| tably_sql::SQLError::Execution(e.to_string()))?;
            tx.exec(
                "UPDATE activation_codes
                 SET status = 'USED', is_used = 1, used_at = ?1, data = ?2, updated_at = ?3
                 WHERE id = ?4",
                &[
                    Value::Text(now_ts.clone()),
                    Value::Text(code_json),
                    Value::Text(now_ts.clone()),
                    Value::Text(code_str.clone()),
                ],
            )?;

            audit::append_audit(
                tx,
                &audit::new_entry(
                    "RESTAURANT_ACTIVATED",
                    "system",
                    &restaurant.id,
                    Some(serde_json::json!({ "code": code_str })),
                ),
            )?;

            outcome = Outcome::Activated(restaurant.id.clone());
            Ok(())
        })?;

        match outcome {
            Outcome::Activated(id) => {
                info!(restaurant_id = %id, "activation succeeded");
                Ok(id)
            }
            Outcome::UnknownCode => {
                Err(LicensingError::Validation("invalid activation code".into()))
            }
            Outcome::Denied(reason) => Err(match reason {
                EligibilityReason::Used => {
                    LicensingError::Validation("activation code already used".into())
                }
                EligibilityReason::Revoked => {
                    LicensingError::Validation("activation code has been revoked".into())
                }
                EligibilityReason::Expired => {
                    LicensingError::Validation("activation code has expired".into())
                }
                EligibilityReason::Valid => {
                    LicensingError::Internal("denied with VALID reason".into())
                }
            }),
        }
    }
}
