//! Public system status for the terminal boot screen.

use crate::model::SystemStatus;
use crate::service::{LicensingError, LicensingService};

impl LicensingService {
    /// Status of this terminal: activated? set up? currently active?
    ///
    /// Unauthenticated — the boot screen uses it to decide whether to
    /// show the activation form, the PIN setup form, or the login pad.
    /// Reads the most recent installation regardless of the configured
    /// flag so a half-provisioned terminal still reports `activated`.
    pub fn system_status(&self) -> Result<SystemStatus, LicensingError> {
        let rows = self.sql.query(
            "SELECT data FROM restaurants ORDER BY created_at DESC LIMIT 1",
            &[],
        )?;
        let Some(data) = rows.first().and_then(|r| r.get_str("data")) else {
            return Ok(SystemStatus {
                activated: false,
                setup_complete: false,
                status: None,
                is_active: false,
            });
        };
        let restaurant: crate::model::Restaurant = serde_json::from_str(data)
            .map_err(|e| LicensingError::Internal(e.to_string()))?;

        Ok(SystemStatus {
            activated: true,
            setup_complete: restaurant.setup_complete(),
            status: Some(restaurant.status),
            is_active: restaurant.is_active(),
        })
    }
}
