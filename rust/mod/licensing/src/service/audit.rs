//! Append-only audit log writer and admin listing.

use tably_core::{ListParams, ListResult, new_id, now_rfc3339};
use tably_sql::{SQLError, SQLExecutor, Value};

use crate::model::AuditEntry;
use crate::service::{LicensingError, LicensingService};

/// Append an audit entry through the given executor. Free-standing so
/// the revocation transaction can write its final entry atomically with
/// the wipe.
pub(crate) fn append_audit(
    exec: &dyn SQLExecutor,
    entry: &AuditEntry,
) -> Result<(), SQLError> {
    let json = serde_json::to_string(entry)
        .map_err(|e| SQLError::Execution(e.to_string()))?;
    exec.exec(
        "INSERT INTO audit_log (id, action, actor, target, created_at, data)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        &[
            Value::Text(entry.id.clone()),
            Value::Text(entry.action.clone()),
            Value::Text(entry.actor.clone()),
            Value::Text(entry.target.clone()),
            Value::Text(entry.created_at.clone()),
            Value::Text(json),
        ],
    )?;
    Ok(())
}

/// Build a new entry with a fresh id and timestamp.
pub(crate) fn new_entry(
    action: &str,
    actor: &str,
    target: &str,
    details: Option<serde_json::Value>,
) -> AuditEntry {
    AuditEntry {
        id: new_id(),
        action: action.to_string(),
        actor: actor.to_string(),
        target: target.to_string(),
        details,
        created_at: now_rfc3339(),
    }
}

impl LicensingService {
    /// Record a security-sensitive action. Failures to write the audit
    /// log are surfaced — a security event that cannot be recorded is an
    /// operational error, not something to swallow.
    pub(crate) fn record_audit(
        &self,
        action: &str,
        actor: &str,
        target: &str,
        details: Option<serde_json::Value>,
    ) -> Result<(), LicensingError> {
        let entry = new_entry(action, actor, target, details);
        tracing::info!(action, actor, target, "audit");
        append_audit(self.sql.as_ref(), &entry).map_err(LicensingError::from)
    }

    /// List audit entries, most recent first.
    pub fn list_audit(&self, params: &ListParams) -> Result<ListResult<AuditEntry>, LicensingError> {
        let rows = self.sql.query(
            "SELECT data FROM audit_log ORDER BY created_at DESC, id LIMIT ?1 OFFSET ?2",
            &[
                Value::Integer(params.limit as i64),
                Value::Integer(params.offset as i64),
            ],
        )?;

        let mut items = Vec::new();
        for row in &rows {
            if let Some(data) = row.get_str("data") {
                let entry: AuditEntry = serde_json::from_str(data)
                    .map_err(|e| LicensingError::Internal(e.to_string()))?;
                items.push(entry);
            }
        }

        let total_rows = self
            .sql
            .query("SELECT COUNT(*) AS c FROM audit_log", &[])?;
        let total = total_rows
            .first()
            .and_then(|r| r.get_i64("c"))
            .unwrap_or(0) as usize;

        Ok(ListResult { items, total })
    }
}

#[cfg(test)]
mod tests {
    use tably_core::ListParams;

    use crate::service::test_support::test_service;

    #[test]
    fn audit_entries_are_listed_most_recent_first() {
        let svc = test_service();
        svc.record_audit("FIRST_ACTION", "device-1", "r1", None).unwrap();
        svc.record_audit("SECOND_ACTION", "device-1", "r1", Some(serde_json::json!({"k": 1})))
            .unwrap();

        let result = svc.list_audit(&ListParams::default()).unwrap();
        assert_eq!(result.total, 2);
        // Same-timestamp entries tie-break by id; both actions present.
        let actions: Vec<&str> = result.items.iter().map(|e| e.action.as_str()).collect();
        assert!(actions.contains(&"FIRST_ACTION"));
        assert!(actions.contains(&"SECOND_ACTION"));
    }

    #[test]
    fn pagination_limits_results() {
        let svc = test_service();
        for i in 0..5 {
            svc.record_audit(&format!("ACTION_{}", i), "d", "t", None).unwrap();
        }
        let result = svc
            .list_audit(&ListParams { limit: 2, offset: 0 })
            .unwrap();
        assert_eq!(result.items.len(), 2);
        assert_eq!(result.total, 5);
    }
}
