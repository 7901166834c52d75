//! Atomic cascading revocation.
//!
//! Revoking an activation tears down the whole terminal: dependent data
//! is deleted in dependency order, every installation is moved to
//! REVOKED with its PIN hashes cleared, and the bound activation codes
//! are invalidated — all inside one transaction so a crash mid-cascade
//! leaves the terminal either fully licensed or fully revoked, never in
//! between.

use tably_core::now_rfc3339;
use tably_sql::{SQLError, Value};
use tracing::warn;

use crate::model::{Restaurant, RestaurantStatus};
use crate::service::auth::verify_pin;
use crate::service::{audit, LicensingError, LicensingService};

/// Deletion order honors foreign-key direction: children first.
const CASCADE: &[(&str, &str)] = &[
    (
        "order_items",
        "DELETE FROM order_items WHERE order_id IN
         (SELECT id FROM orders WHERE restaurant_id = ?1)",
    ),
    ("orders", "DELETE FROM orders WHERE restaurant_id = ?1"),
    ("menu_items", "DELETE FROM menu_items WHERE restaurant_id = ?1"),
    ("categories", "DELETE FROM categories WHERE restaurant_id = ?1"),
    ("qr_sessions", "DELETE FROM qr_sessions WHERE restaurant_id = ?1"),
    ("dining_tables", "DELETE FROM dining_tables WHERE restaurant_id = ?1"),
    ("devices", "DELETE FROM devices WHERE restaurant_id = ?1"),
];

impl LicensingService {
    /// Revoke the terminal's activation. Requires a fresh admin PIN.
    ///
    /// The cascade covers every installation in the local store, not just
    /// the caller's — a terminal holds exactly one licensed installation
    /// and a revoked terminal must be left with no usable residue.
    pub fn revoke_activation(
        &self,
        restaurant_id: &str,
        admin_pin: &str,
        actor: &str,
    ) -> Result<(), LicensingError> {
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
            self.record_audit("ACTIVATION_REVOKE_FAILED", actor, &restaurant.id, None)?;
            return Err(match engaged {
                Some(retry_after_secs) => LicensingError::Locked { retry_after_secs },
                None => LicensingError::Unauthorized("invalid PIN".into()),
            });
        }
        self.lockout.reset(&restaurant.id);

        let now_ts = now_rfc3339();
        let actor = actor.to_string();
        let target = restaurant.id.clone();

        self.sql.with_tx(&mut |tx| {
            let rows = tx.query("SELECT data FROM restaurants", &[])?;
            for row in &rows {
                let Some(data) = row.get_str("data") else {
                    continue;
                };
                let mut r: Restaurant = serde_json::from_str(data)
                    .map_err(|e| SQLError::Query(e.to_string()))?;

                for (_, stmt) in CASCADE {
                    tx.exec(stmt, &[Value::Text(r.id.clone())])?;
                }

                if let Some(code_id) = r.activation_code_id.clone() {
                    tx.exec(
                        "UPDATE activation_codes
                         SET status = 'INVALIDATED',
                             data = json_set(data, '$.status', 'INVALIDATED',
                                                   '$.updated_at', ?1),
                             updated_at = ?1
                         WHERE id = ?2",
                        &[Value::Text(now_ts.clone()), Value::Text(code_id)],
                    )?;
                }

                r.status = RestaurantStatus::Revoked;
                r.admin_pin_hash = None;
                r.kitchen_pin_hash = None;
                r.updated_at = now_ts.clone();
                let json = serde_json::to_string(&r)
                    .map_err(|e| SQLError::Execution(e.to_string()))?;
                tx.exec(
                    "UPDATE restaurants
                     SET status = 'REVOKED', configured = 0, data = ?1, updated_at = ?2
                     WHERE id = ?3",
                    &[
                        Value::Text(json),
                        Value::Text(now_ts.clone()),
                        Value::Text(r.id.clone()),
                    ],
                )?;
            }

            audit::append_audit(
                tx,
                &audit::new_entry("ACTIVATION_REVOKED", &actor, &target, None),
            )?;
            Ok(())
        })?;

        warn!(restaurant_id = %target, "activation revoked, local data wiped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use tably_core::ListParams;
    use tably_sql::{Row, SQLError, SQLExecutor, SQLStore, SqliteStore, Value};

    use crate::model::{CodeStatus, LoginRequest, RestaurantStatus, Role};
    use crate::service::test_support::{provisioned_restaurant, test_service};
    use crate::service::{LicensingConfig, LicensingError, LicensingService};

    fn seed_collaborators(svc: &crate::service::LicensingService, rid: &str) {
        svc.sql
            .exec(
                "INSERT INTO categories (id, restaurant_id, data, created_at, updated_at)
                 VALUES ('c1', ?1, '{}', '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')",
                &[Value::Text(rid.to_string())],
            )
            .unwrap();
        svc.sql
            .exec(
                "INSERT INTO orders (id, restaurant_id, data, created_at, updated_at)
                 VALUES ('o1', ?1, '{}', '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')",
                &[Value::Text(rid.to_string())],
            )
            .unwrap();
        svc.sql
            .exec(
                "INSERT INTO order_items (id, order_id, data, created_at, updated_at)
                 VALUES ('oi1', 'o1', '{}', '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')",
                &[],
            )
            .unwrap();
    }

    fn count(svc: &crate::service::LicensingService, table: &str) -> i64 {
        let sql = format!("SELECT COUNT(*) AS c FROM {}", table);
        svc.sql.query(&sql, &[]).unwrap()[0].get_i64("c").unwrap()
    }

    #[test]
    fn revocation_cascades_and_invalidates_the_code() {
        let svc = test_service();
        let rid = provisioned_restaurant(&svc, "X1-REV", "1234", Some("5678"));
        seed_collaborators(&svc, &rid);

        svc.revoke_activation(&rid, "1234", "tablet-1").unwrap();

        assert_eq!(count(&svc, "categories"), 0);
        assert_eq!(count(&svc, "orders"), 0);
        assert_eq!(count(&svc, "order_items"), 0);
        assert_eq!(count(&svc, "devices"), 0);

        let restaurant = svc.get_restaurant(&rid).unwrap();
        assert_eq!(restaurant.status, RestaurantStatus::Revoked);
        assert!(restaurant.admin_pin_hash.is_none());
        assert!(restaurant.kitchen_pin_hash.is_none());

        let code = svc.get_code("X1-REV").unwrap();
        assert_eq!(code.status, CodeStatus::Invalidated);

        // The revoked code can never be redeemed again.
        let err = svc.activate("X1-REV").unwrap_err();
        match err {
            LicensingError::Validation(msg) => assert!(msg.contains("revoked")),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn wrong_pin_leaves_everything_untouched() {
        let svc = test_service();
        let rid = provisioned_restaurant(&svc, "X1-NOREV", "1234", None);
        seed_collaborators(&svc, &rid);

        let err = svc.revoke_activation(&rid, "0000", "tablet-1").unwrap_err();
        assert!(matches!(err, LicensingError::Unauthorized(_)));

        assert_eq!(count(&svc, "categories"), 1);
        assert_eq!(count(&svc, "orders"), 1);
        let restaurant = svc.get_restaurant(&rid).unwrap();
        assert_eq!(restaurant.status, RestaurantStatus::Active);
        assert!(restaurant.setup_complete());

        // And the failed attempt is audited.
        let log = svc.list_audit(&ListParams::default()).unwrap();
        assert!(log
            .items
            .iter()
            .any(|e| e.action == "ACTIVATION_REVOKE_FAILED"));
    }

    #[test]
    fn revoked_terminal_rejects_logins_and_further_admin_ops() {
        let svc = test_service();
        let rid = provisioned_restaurant(&svc, "X1-DEAD", "1234", Some("5678"));
        svc.revoke_activation(&rid, "1234", "tablet-1").unwrap();

        // configured flag was cleared, so login finds no restaurant.
        let err = svc
            .login(LoginRequest {
                pin: "1234".into(),
                role: Role::Admin,
                device_id: "tablet-1".into(),
            })
            .unwrap_err();
        assert!(matches!(err, LicensingError::NotFound(_)));

        // Direct resolution reports the lifecycle state.
        assert!(matches!(
            svc.resolve_active(&rid).unwrap_err(),
            LicensingError::NotActive(_)
        ));
        assert!(matches!(
            svc.verify_admin_pin(&rid, "1234", "tablet-1").unwrap_err(),
            LicensingError::NotActive(_)
        ));
    }

    #[test]
    fn revocation_is_audited_atomically() {
        let svc = test_service();
        let rid = provisioned_restaurant(&svc, "X1-AUDIT", "1234", None);
        svc.revoke_activation(&rid, "1234", "tablet-1").unwrap();

        let log = svc.list_audit(&ListParams::default()).unwrap();
        let entry = log
            .items
            .iter()
            .find(|e| e.action == "ACTIVATION_REVOKED")
            .unwrap();
        assert_eq!(entry.target, rid);
        assert_eq!(entry.actor, "tablet-1");
    }

    /// Store wrapper that lets a test blow a fuse partway through a
    /// transaction: once armed, the Nth in-transaction statement fails.
    struct ShortFuseStore {
        inner: SqliteStore,
        fuse: Mutex<Option<u32>>,
    }

    impl ShortFuseStore {
        fn arm(&self, execs_before_failure: u32) {
            *self.fuse.lock().unwrap() = Some(execs_before_failure);
        }
    }

    impl SQLExecutor for ShortFuseStore {
        fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, SQLError> {
            self.inner.query(sql, params)
        }

        fn exec(&self, sql: &str, params: &[Value]) -> Result<u64, SQLError> {
            self.inner.exec(sql, params)
        }
    }

    impl SQLStore for ShortFuseStore {
        fn with_tx(
            &self,
            f: &mut dyn FnMut(&dyn SQLExecutor) -> Result<(), SQLError>,
        ) -> Result<(), SQLError> {
            self.inner.with_tx(&mut |tx| {
                let fused = FusedExecutor {
                    inner: tx,
                    fuse: &self.fuse,
                };
                f(&fused)
            })
        }
    }

    struct FusedExecutor<'a> {
        inner: &'a dyn SQLExecutor,
        fuse: &'a Mutex<Option<u32>>,
    }

    impl SQLExecutor for FusedExecutor<'_> {
        fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, SQLError> {
            self.inner.query(sql, params)
        }

        fn exec(&self, sql: &str, params: &[Value]) -> Result<u64, SQLError> {
            {
                let mut fuse = self.fuse.lock().unwrap();
                if let Some(remaining) = fuse.as_mut() {
                    if *remaining == 0 {
                        return Err(SQLError::Execution("disk I/O error".into()));
                    }
                    *remaining -= 1;
                }
            }
            self.inner.exec(sql, params)
        }
    }

    #[test]
    fn mid_cascade_failure_leaves_every_table_untouched() {
        let store = Arc::new(ShortFuseStore {
            inner: SqliteStore::open_in_memory().unwrap(),
            fuse: Mutex::new(None),
        });
        let svc =
            LicensingService::new(store.clone(), LicensingConfig::default()).unwrap();
        let rid = provisioned_restaurant(&svc, "X1-FUSE", "1234", Some("5678"));
        seed_collaborators(&svc, &rid);

        // Let a few cascade deletes run, then fail mid-transaction.
        store.arm(3);
        let err = svc.revoke_activation(&rid, "1234", "tablet-1").unwrap_err();
        assert!(matches!(err, LicensingError::Storage(_)));
        *store.fuse.lock().unwrap() = None;

        // The partial cascade rolled back entirely.
        assert_eq!(count(&svc, "categories"), 1);
        assert_eq!(count(&svc, "orders"), 1);
        assert_eq!(count(&svc, "order_items"), 1);

        let restaurant = svc.get_restaurant(&rid).unwrap();
        assert_eq!(restaurant.status, RestaurantStatus::Active);
        assert!(restaurant.setup_complete());
        assert_eq!(svc.get_code("X1-FUSE").unwrap().status, CodeStatus::Used);

        let log = svc.list_audit(&ListParams::default()).unwrap();
        assert!(!log.items.iter().any(|e| e.action == "ACTIVATION_REVOKED"));

        // With the fuse disarmed the same revocation goes through.
        svc.revoke_activation(&rid, "1234", "tablet-1").unwrap();
        assert_eq!(count(&svc, "categories"), 0);
    }
}
