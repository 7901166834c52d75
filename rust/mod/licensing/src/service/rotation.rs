//! Admin PIN verification and double-verified kitchen PIN rotation.
//!
//! The rotation endpoint re-verifies the admin PIN inside the same
//! request even though the UI performs a standalone verify step first —
//! the service never trusts that an earlier verify happened.

use tably_core::now_rfc3339;
use tably_sql::Value;
use tracing::info;

use crate::service::auth::{hash_pin, validate_pin, verify_pin};
use crate::service::{LicensingError, LicensingService};

impl LicensingService {
    /// Verify the admin PIN for an ACTIVE restaurant. Shares the lockout
    /// counter with login, so verify probes escalate the same window.
    pub fn verify_admin_pin(
        &self,
        restaurant_id: &str,
        admin_pin: &str,
        actor: &str,
    ) -> Result<(), LicensingError> {
        validate_pin(admin_pin)?;
        let restaurant = self.resolve_active(restaurant_id)?;

        if let Err(retry_after_secs) = self.lockout.check(&restaurant.id) {
            return Err(LicensingError::Locked { retry_after_secs });
        }

        let ok = restaurant
            .admin_pin_hash
            .as_deref()
            .map(|h| verify_pin(admin_pin, h))
            .unwrap_or(false);

        if !ok {
            let engaged = self.lockout.register_failure(&restaurant.id);
            self.record_audit("ADMIN_PIN_VERIFY_FAILED", actor, &restaurant.id, None)?;
            return Err(match engaged {
                Some(retry_after_secs) => LicensingError::Locked { retry_after_secs },
                None => LicensingError::Unauthorized("invalid PIN".into()),
            });
        }

        self.lockout.reset(&restaurant.id);
        self.record_audit("ADMIN_PIN_VERIFIED", actor, &restaurant.id, None)?;
        Ok(())
    }

    /// Rotate the kitchen PIN, gated on a fresh admin PIN verification.
    pub fn update_kitchen_pin(
        &self,
        restaurant_id: &str,
        admin_pin: &str,
        new_kitchen_pin: &str,
        actor: &str,
    ) -> Result<(), LicensingError> {
        validate_pin(new_kitchen_pin)?;

        if let Err(e) = self.verify_admin_pin(restaurant_id, admin_pin, actor) {
            // Only credential failures are reset failures; a lockout
            // rejection is a throttle and is not audited here.
            // verify_admin_pin already audited the failed verify itself.
            if matches!(e, LicensingError::Unauthorized(_)) {
                self.record_audit("KITCHEN_PIN_RESET_FAILED", actor, restaurant_id, None)?;
            }
            return Err(e);
        }

        let mut restaurant = self.resolve_active(restaurant_id)?;
        restaurant.kitchen_pin_hash = Some(hash_pin(new_kitchen_pin)?);
        restaurant.updated_at = now_rfc3339();

        self.update_record(
            "restaurants",
            &restaurant.id,
            &restaurant,
            &[("updated_at", Value::Text(restaurant.updated_at.clone()))],
        )?;

        self.record_audit("KITCHEN_PIN_RESET", actor, &restaurant.id, None)?;
        info!(restaurant_id = %restaurant.id, "kitchen PIN rotated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::model::{LoginRequest, Role};
    use crate::service::test_support::{provisioned_restaurant, test_service};
    use crate::service::LicensingError;

    #[test]
    fn verify_accepts_correct_admin_pin() {
        let svc = test_service();
        let rid = provisioned_restaurant(&svc, "X1-VER", "1234", None);
        svc.verify_admin_pin(&rid, "1234", "tablet-1").unwrap();
    }

    #[test]
    fn verify_rejects_wrong_pin_and_escalates_lockout() {
        let svc = test_service();
        let rid = provisioned_restaurant(&svc, "X1-VERLOCK", "1234", None);

        for _ in 0..2 {
            assert!(matches!(
                svc.verify_admin_pin(&rid, "0000", "tablet-1").unwrap_err(),
                LicensingError::Unauthorized(_)
            ));
        }
        // The third failure engages the lock and already answers 429.
        match svc.verify_admin_pin(&rid, "0000", "tablet-1").unwrap_err() {
            LicensingError::Locked { retry_after_secs } => {
                assert_eq!(retry_after_secs, 5 * 60);
            }
            other => panic!("expected Locked, got {:?}", other),
        }
        // Even the correct PIN stays locked out.
        assert!(matches!(
            svc.verify_admin_pin(&rid, "1234", "tablet-1").unwrap_err(),
            LicensingError::Locked { .. }
        ));
    }

    #[test]
    fn rotation_requires_fresh_admin_pin() {
        let svc = test_service();
        let rid = provisioned_restaurant(&svc, "X1-ROT", "1234", Some("5678"));

        // A prior standalone verify does not carry into the update.
        svc.verify_admin_pin(&rid, "1234", "tablet-1").unwrap();
        let err = svc
            .update_kitchen_pin(&rid, "0000", "9999", "tablet-1")
            .unwrap_err();
        assert!(matches!(err, LicensingError::Unauthorized(_)));

        // Old kitchen PIN still works after the failed rotation.
        svc.login(LoginRequest {
            pin: "5678".into(),
            role: Role::Kitchen,
            device_id: "kds-1".into(),
        })
        .unwrap();
    }

    #[test]
    fn rotation_swaps_the_kitchen_pin() {
        let svc = test_service();
        let rid = provisioned_restaurant(&svc, "X1-SWAP", "1234", Some("5678"));

        svc.update_kitchen_pin(&rid, "1234", "9999", "tablet-1").unwrap();

        let old = svc.login(LoginRequest {
            pin: "5678".into(),
            role: Role::Kitchen,
            device_id: "kds-1".into(),
        });
        assert!(matches!(old.unwrap_err(), LicensingError::Unauthorized(_)));

        svc.login(LoginRequest {
            pin: "9999".into(),
            role: Role::Kitchen,
            device_id: "kds-1".into(),
        })
        .unwrap();
    }

    #[test]
    fn rotation_can_introduce_a_kitchen_pin() {
        let svc = test_service();
        let rid = provisioned_restaurant(&svc, "X1-INTRO", "1234", None);

        svc.update_kitchen_pin(&rid, "1234", "5678", "tablet-1").unwrap();
        svc.login(LoginRequest {
            pin: "5678".into(),
            role: Role::Kitchen,
            device_id: "kds-1".into(),
        })
        .unwrap();
    }

    #[test]
    fn lockout_rejections_are_not_audited_as_reset_failures() {
        use tably_core::ListParams;

        let svc = test_service();
        let rid = provisioned_restaurant(&svc, "X1-ROTLOCK", "1234", Some("5678"));

        for _ in 0..3 {
            let _ = svc.verify_admin_pin(&rid, "0000", "tablet-1");
        }
        let err = svc
            .update_kitchen_pin(&rid, "1234", "9999", "tablet-1")
            .unwrap_err();
        assert!(matches!(err, LicensingError::Locked { .. }));

        // Throttled rejection: no reset-failure entry was written.
        let log = svc.list_audit(&ListParams::default()).unwrap();
        assert!(!log
            .items
            .iter()
            .any(|e| e.action == "KITCHEN_PIN_RESET_FAILED"));
    }

    #[test]
    fn malformed_new_pin_is_rejected_before_verification() {
        let svc = test_service();
        let rid = provisioned_restaurant(&svc, "X1-BADPIN", "1234", None);
        let err = svc
            .update_kitchen_pin(&rid, "1234", "12", "tablet-1")
            .unwrap_err();
        assert!(matches!(err, LicensingError::Validation(_)));
    }
}
