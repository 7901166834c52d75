pub mod activation;
pub mod audit;
pub mod auth;
pub mod codes;
pub mod eligibility;
pub mod lockout;
pub mod revocation;
pub mod rotation;
pub mod schema;
pub mod status;

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use tably_sql::{SQLError, SQLStore, Value};

/// Licensing service error type.
#[derive(Debug, Error)]
pub enum LicensingError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("validation: {0}")]
    Validation(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The installation is not ACTIVE — distinct from a credential or
    /// role failure so revocation is visible to outstanding tokens.
    #[error("not active: {0}")]
    NotActive(String),

    /// Too many consecutive failures for this identifier.
    #[error("locked: retry in {retry_after_secs}s")]
    Locked { retry_after_secs: u64 },

    #[error("storage: {0}")]
    Storage(String),

    #[error("internal: {0}")]
    Internal(String),
}

impl From<SQLError> for LicensingError {
    fn from(e: SQLError) -> Self {
        LicensingError::Storage(e.to_string())
    }
}

impl From<LicensingError> for tably_core::ServiceError {
    fn from(e: LicensingError) -> Self {
        match e {
            LicensingError::NotFound(m) => tably_core::ServiceError::NotFound(m),
            LicensingError::Conflict(m) => tably_core::ServiceError::Conflict(m),
            LicensingError::Validation(m) => tably_core::ServiceError::Validation(m),
            LicensingError::Unauthorized(m) => tably_core::ServiceError::Unauthorized(m),
            LicensingError::Forbidden(m) => tably_core::ServiceError::PermissionDenied(m),
            LicensingError::NotActive(m) => tably_core::ServiceError::NotActive(m),
            LicensingError::Locked { retry_after_secs } => {
                tably_core::ServiceError::RateLimited {
                    message: format!(
                        "too many failed attempts, retry in {}s",
                        retry_after_secs
                    ),
                    retry_after_secs,
                }
            }
            LicensingError::Storage(m) => tably_core::ServiceError::Storage(m),
            LicensingError::Internal(m) => tably_core::ServiceError::Internal(m),
        }
    }
}

/// Configuration for the licensing service.
#[derive(Debug, Clone)]
pub struct LicensingConfig {
    /// JWT signing secret.
    pub jwt_secret: String,
    /// Device credential lifetime in seconds (default: 30 days).
    ///
    /// Intentionally long — revocation takes effect through the lifecycle
    /// gate's live status check, not through token expiry.
    pub token_ttl_secs: i64,
}

impl Default for LicensingConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "tably-dev-secret-change-me".to_string(),
            token_ttl_secs: 30 * 24 * 60 * 60,
        }
    }
}

/// The licensing service. Holds the store, configuration, and the
/// in-memory lockout guard.
pub struct LicensingService {
    pub(crate) sql: Arc<dyn SQLStore>,
    pub(crate) config: LicensingConfig,
    pub(crate) lockout: lockout::LockoutGuard,
}

impl LicensingService {
    /// Create a new LicensingService, initializing the DB schema.
    pub fn new(
        sql: Arc<dyn SQLStore>,
        config: LicensingConfig,
    ) -> Result<Arc<Self>, LicensingError> {
        schema::init_schema(sql.as_ref())?;
        Ok(Arc::new(Self {
            sql,
            config,
            lockout: lockout::LockoutGuard::new(),
        }))
    }

    // ── Generic record helpers (JSON `data` column + indexed columns) ──

    /// Insert a record as JSON into a table with indexed columns.
    pub(crate) fn insert_record<T: Serialize>(
        &self,
        table: &str,
        id: &str,
        record: &T,
        indexes: &[(&str, Value)],
    ) -> Result<(), LicensingError> {
        let json = serde_json::to_string(record)
            .map_err(|e| LicensingError::Internal(e.to_string()))?;

        let mut cols = vec!["id", "data"];
        let mut placeholders = vec!["?1".to_string(), "?2".to_string()];
        let mut params = vec![Value::Text(id.to_string()), Value::Text(json)];

        for (i, (col, val)) in indexes.iter().enumerate() {
            let idx = i + 3;
            cols.push(col);
            placeholders.push(format!("?{}", idx));
            params.push(val.clone());
        }

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            cols.join(", "),
            placeholders.join(", "),
        );

        self.sql.exec(&sql, &params).map_err(|e| {
            let msg = e.to_string();
            if msg.contains("UNIQUE constraint") {
                LicensingError::Conflict(msg)
            } else {
                LicensingError::Storage(msg)
            }
        })?;

        Ok(())
    }

    /// Get a record by id, deserializing the JSON `data` column.
    pub(crate) fn get_record<T: DeserializeOwned>(
        &self,
        table: &str,
        id: &str,
    ) -> Result<T, LicensingError> {
        self.get_record_opt(table, id)?
            .ok_or_else(|| LicensingError::NotFound(format!("{}/{}", table, id)))
    }

    /// Get a record by id, or None if absent.
    pub(crate) fn get_record_opt<T: DeserializeOwned>(
        &self,
        table: &str,
        id: &str,
    ) -> Result<Option<T>, LicensingError> {
        let sql = format!("SELECT data FROM {} WHERE id = ?1", table);
        let rows = self
            .sql
            .query(&sql, &[Value::Text(id.to_string())])
            .map_err(|e| LicensingError::Storage(e.to_string()))?;
        let Some(row) = rows.first() else {
            return Ok(None);
        };
        let data = row
            .get_str("data")
            .ok_or_else(|| LicensingError::Internal("missing data column".into()))?;
        serde_json::from_str(data)
            .map(Some)
            .map_err(|e| LicensingError::Internal(e.to_string()))
    }

    /// Update a record's JSON data and indexed columns.
    pub(crate) fn update_record<T: Serialize>(
        &self,
        table: &str,
        id: &str,
        record: &T,
        indexes: &[(&str, Value)],
    ) -> Result<(), LicensingError> {
        let json = serde_json::to_string(record)
            .map_err(|e| LicensingError::Internal(e.to_string()))?;

        let mut sets = vec!["data = ?1".to_string()];
        let mut params: Vec<Value> = vec![Value::Text(json)];

        for (i, (col, val)) in indexes.iter().enumerate() {
            let idx = i + 2;
            sets.push(format!("{} = ?{}", col, idx));
            params.push(val.clone());
        }

        let id_idx = params.len() + 1;
        params.push(Value::Text(id.to_string()));

        let sql = format!(
            "UPDATE {} SET {} WHERE id = ?{}",
            table,
            sets.join(", "),
            id_idx,
        );

        let affected = self
            .sql
            .exec(&sql, &params)
            .map_err(|e| LicensingError::Storage(e.to_string()))?;

        if affected == 0 {
            return Err(LicensingError::NotFound(format!("{}/{}", table, id)));
        }

        Ok(())
    }
}
