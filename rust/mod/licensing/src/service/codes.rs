//! Activation code ledger: issuance, listing, administrative force-reset.
//!
//! License issuance is normally external; `issue_code` exists so a local
//! deployment can mint codes without a second system. The admin listing
//! annotates every code with the same eligibility verdict the activation
//! endpoint uses — one source of truth.

use chrono::Utc;
use tably_core::{ListParams, ListResult, now_rfc3339};
use tably_sql::Value;
use tracing::warn;

use crate::model::{ActivationCode, CodeListing, CodeStatus, IssueCode};
use crate::service::{LicensingError, LicensingService, eligibility};

impl LicensingService {
    /// Issue a new activation code into the ledger.
    pub fn issue_code(&self, input: IssueCode) -> Result<ActivationCode, LicensingError> {
        let code_str = input.code.trim().to_string();
        if code_str.is_empty() {
            return Err(LicensingError::Validation("code must not be empty".into()));
        }
        if let Some(ref exp) = input.expires_at {
            if chrono::DateTime::parse_from_rfc3339(exp).is_err() {
                return Err(LicensingError::Validation(
                    "expires_at must be an RFC 3339 timestamp".into(),
                ));
            }
        }

        let now = now_rfc3339();
        let code = ActivationCode {
            code: code_str.clone(),
            status: CodeStatus::Active,
            is_used: false,
            used_at: None,
            expires_at: input.expires_at,
            entity_name: input.entity_name,
            plan: input.plan,
            created_at: now.clone(),
            updated_at: now.clone(),
        };

        let mut indexes: Vec<(&str, Value)> = vec![
            ("status", Value::Text("ACTIVE".into())),
            ("is_used", Value::Integer(0)),
            ("created_at", Value::Text(now.clone())),
            ("updated_at", Value::Text(now)),
        ];
        if let Some(ref exp) = code.expires_at {
            indexes.push(("expires_at", Value::Text(exp.clone())));
        }

        self.insert_record("activation_codes", &code_str, &code, &indexes)
            .map_err(|e| match e {
                LicensingError::Conflict(_) => {
                    LicensingError::Conflict(format!("code '{}' already exists", code_str))
                }
                other => other,
            })?;

        Ok(code)
    }

    /// Get a code from the ledger.
    pub fn get_code(&self, code: &str) -> Result<ActivationCode, LicensingError> {
        self.get_record("activation_codes", code)
    }

    /// Whether any restaurant is bound to this code.
    pub(crate) fn code_has_restaurant(&self, code: &str) -> Result<bool, LicensingError> {
        let rows = self.sql.query(
            "SELECT COUNT(*) AS c FROM restaurants WHERE activation_code_id = ?1",
            &[Value::Text(code.to_string())],
        )?;
        Ok(rows.first().and_then(|r| r.get_i64("c")).unwrap_or(0) > 0)
    }

    /// List codes annotated with their current eligibility, most recent
    /// first. Codes found past expiry are opportunistically marked
    /// EXPIRED; a failure of that lazy write never blocks the listing.
    pub fn list_codes(&self, params: &ListParams) -> Result<ListResult<CodeListing>, LicensingError> {
        let rows = self.sql.query(
            "SELECT data FROM activation_codes ORDER BY created_at DESC, id LIMIT ?1 OFFSET ?2",
            &[
                Value::Integer(params.limit as i64),
                Value::Integer(params.offset as i64),
            ],
        )?;

        let now = Utc::now();
        let mut items = Vec::new();
        for row in &rows {
            let Some(data) = row.get_str("data") else {
                continue;
            };
            let code: ActivationCode = serde_json::from_str(data)
                .map_err(|e| LicensingError::Internal(e.to_string()))?;

            let has_restaurant = self.code_has_restaurant(&code.code)?;
            let verdict = eligibility::assess(&code, has_restaurant, now);

            if verdict.reason == eligibility::EligibilityReason::Expired
                && code.status != CodeStatus::Expired
            {
                if let Err(e) = self.mark_code_expired(&code.code) {
                    warn!(code = %code.code, error = %e, "lazy expiry write failed");
                }
            }

            items.push(CodeListing {
                code,
                eligibility: verdict,
            });
        }

        let total_rows = self
            .sql
            .query("SELECT COUNT(*) AS c FROM activation_codes", &[])?;
        let total = total_rows
            .first()
            .and_then(|r| r.get_i64("c"))
            .unwrap_or(0) as usize;

        Ok(ListResult { items, total })
    }

    /// Administrative force-reset: return a code to ACTIVE/unused.
    ///
    /// Does not unbind an existing restaurant — a bound restaurant keeps
    /// the code ineligible through the eligibility engine's bound-check.
    pub fn force_reset_code(&self, code: &str, actor: &str) -> Result<ActivationCode, LicensingError> {
        let mut record: ActivationCode = self.get_record("activation_codes", code)?;
        record.status = CodeStatus::Active;
        record.is_used = false;
        record.used_at = None;
        record.updated_at = now_rfc3339();

        self.update_record(
            "activation_codes",
            code,
            &record,
            &[
                ("status", Value::Text("ACTIVE".into())),
                ("is_used", Value::Integer(0)),
                ("used_at", Value::Null),
                ("updated_at", Value::Text(record.updated_at.clone())),
            ],
        )?;

        self.record_audit("CODE_FORCE_RESET", actor, code, None)?;
        Ok(record)
    }

    pub(crate) fn mark_code_expired(&self, code: &str) -> Result<(), LicensingError> {
        let mut record: ActivationCode = self.get_record("activation_codes", code)?;
        record.status = CodeStatus::Expired;
        record.updated_at = now_rfc3339();
        self.update_record(
            "activation_codes",
            code,
            &record,
            &[
                ("status", Value::Text("EXPIRED".into())),
                ("updated_at", Value::Text(record.updated_at.clone())),
            ],
        )
    }
}

#[cfg(test)]
mod tests {
    use tably_core::ListParams;

    use crate::model::{CodeStatus, IssueCode};
    use crate::service::eligibility::EligibilityReason;
    use crate::service::test_support::{activated_restaurant, test_service};
    use crate::service::LicensingError;

    #[test]
    fn issue_and_get_roundtrip() {
        let svc = test_service();
        svc.issue_code(IssueCode {
            code: "X1-VALID".into(),
            entity_name: Some("Bistro".into()),
            plan: Some("standard".into()),
            expires_at: None,
        })
        .unwrap();

        let code = svc.get_code("X1-VALID").unwrap();
        assert_eq!(code.status, CodeStatus::Active);
        assert!(!code.is_used);
    }

    #[test]
    fn duplicate_code_conflicts() {
        let svc = test_service();
        let input = IssueCode {
            code: "X1-DUP".into(),
            entity_name: None,
            plan: None,
            expires_at: None,
        };
        svc.issue_code(input.clone()).unwrap();
        let err = svc.issue_code(input).unwrap_err();
        assert!(matches!(err, LicensingError::Conflict(_)));
    }

    #[test]
    fn empty_code_rejected() {
        let svc = test_service();
        let err = svc
            .issue_code(IssueCode {
                code: "   ".into(),
                entity_name: None,
                plan: None,
                expires_at: None,
            })
            .unwrap_err();
        assert!(matches!(err, LicensingError::Validation(_)));
    }

    #[test]
    fn listing_annotates_eligibility_and_lazily_expires() {
        let svc = test_service();
        svc.issue_code(IssueCode {
            code: "FRESH".into(),
            entity_name: None,
            plan: None,
            expires_at: None,
        })
        .unwrap();
        svc.issue_code(IssueCode {
            code: "STALE".into(),
            entity_name: None,
            plan: None,
            expires_at: Some("2020-01-01T00:00:00Z".into()),
        })
        .unwrap();
        activated_restaurant(&svc, "REDEEMED");

        let listing = svc.list_codes(&ListParams::default()).unwrap();
        assert_eq!(listing.total, 3);

        let find = |c: &str| {
            listing
                .items
                .iter()
                .find(|l| l.code.code == c)
                .unwrap()
                .eligibility
        };
        assert_eq!(find("FRESH").reason, EligibilityReason::Valid);
        assert_eq!(find("STALE").reason, EligibilityReason::Expired);
        assert_eq!(find("REDEEMED").reason, EligibilityReason::Used);

        // The lazy write persisted EXPIRED.
        assert_eq!(svc.get_code("STALE").unwrap().status, CodeStatus::Expired);
    }

    #[test]
    fn force_reset_returns_code_to_active() {
        let svc = test_service();
        svc.issue_code(IssueCode {
            code: "X1-RESET".into(),
            entity_name: None,
            plan: None,
            expires_at: None,
        })
        .unwrap();
        svc.activate("X1-RESET").unwrap();
        assert_eq!(svc.get_code("X1-RESET").unwrap().status, CodeStatus::Used);

        let reset = svc.force_reset_code("X1-RESET", "admin-device").unwrap();
        assert_eq!(reset.status, CodeStatus::Active);
        assert!(!reset.is_used);
        assert!(reset.used_at.is_none());

        // Still bound to a restaurant, so still not redeemable.
        let err = svc.activate("X1-RESET").unwrap_err();
        assert!(matches!(err, LicensingError::Validation(_)));
    }
}
