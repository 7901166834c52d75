//! Licensing module — activation codes, device authorization, lifecycle.
//!
//! # Resources
//!
//! - **ActivationCode** — one-shot license code with status + expiry
//! - **Restaurant** — provisioned installation, lifecycle status + PIN hashes
//! - **DeviceCredential** — device+role registry row, upserted per login
//! - **AuditEntry** — append-only record of security-sensitive actions
//!
//! # Usage
//!
//! ```ignore
//! use licensing::{LicensingModule, service::LicensingConfig};
//!
//! let module = LicensingModule::new(sql, LicensingConfig::default())?;
//! let router = module.routes(); // Mount at the root
//! ```

pub mod api;
pub mod model;
pub mod service;

use std::sync::Arc;

use axum::Router;

use tably_core::Module;

use crate::service::{LicensingConfig, LicensingService};

/// Licensing module implementing the Module trait.
///
/// Holds the LicensingService and provides HTTP routes for activation,
/// authentication, security operations, and the admin surface.
pub struct LicensingModule {
    service: Arc<LicensingService>,
}

impl LicensingModule {
    /// Create a new LicensingModule.
    pub fn new(
        sql: Arc<dyn tably_sql::SQLStore>,
        config: LicensingConfig,
    ) -> Result<Self, tably_core::ServiceError> {
        let service = LicensingService::new(sql, config)
            .map_err(tably_core::ServiceError::from)?;
        Ok(Self { service })
    }

    /// Get a reference to the underlying LicensingService.
    pub fn service(&self) -> &Arc<LicensingService> {
        &self.service
    }
}

impl Module for LicensingModule {
    fn name(&self) -> &str {
        "licensing"
    }

    fn routes(&self) -> Router {
        api::build_router(self.service.clone())
    }
}
