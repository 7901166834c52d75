//! PIN authentication, device registry, and token issuance.
//!
//! The single-tenant terminal model: one configured restaurant per
//! database, devices authenticate against its role PINs. PIN hashes are
//! argon2id; tokens are HS256 JWTs whose claims deliberately exclude the
//! lifecycle status — that is re-resolved on every request by the gate.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use tably_core::{new_id, now_rfc3339};
use tably_sql::Value;
use tracing::info;

use crate::model::{
    Claims, DeviceCredential, LoginRequest, Restaurant, Role, SetupRequest, TokenResponse,
};
use crate::service::{LicensingError, LicensingService};

/// PINs are short numeric secrets entered on a touch keypad.
pub(crate) fn validate_pin(pin: &str) -> Result<(), LicensingError> {
    if pin.len() < 4 || pin.len() > 8 || !pin.chars().all(|c| c.is_ascii_digit()) {
        return Err(LicensingError::Validation(
            "PIN must be 4-8 digits".into(),
        ));
    }
    Ok(())
}

pub(crate) fn hash_pin(pin: &str) -> Result<String, LicensingError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(pin.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| LicensingError::Internal(format!("hash failure: {}", e)))
}

/// Constant-time verification against a stored argon2id hash.
/// A malformed stored hash verifies as false rather than erroring.
pub(crate) fn verify_pin(pin: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(pin.as_bytes(), &parsed)
        .is_ok()
}

impl LicensingService {
    /// Fetch a restaurant by id.
    pub fn get_restaurant(&self, id: &str) -> Result<Restaurant, LicensingError> {
        self.get_record("restaurants", id)
    }

    /// The terminal's configured restaurant, if setup has completed.
    pub(crate) fn find_configured_restaurant(
        &self,
    ) -> Result<Option<Restaurant>, LicensingError> {
        let rows = self.sql.query(
            "SELECT data FROM restaurants WHERE configured = 1 ORDER BY created_at LIMIT 1",
            &[],
        )?;
        let Some(data) = rows.first().and_then(|r| r.get_str("data")) else {
            return Ok(None);
        };
        serde_json::from_str(data)
            .map(Some)
            .map_err(|e| LicensingError::Internal(e.to_string()))
    }

    /// Resolve a restaurant and require it to be ACTIVE.
    ///
    /// The authorization gate calls this per request so that suspension
    /// and revocation take effect immediately, regardless of any token
    /// still in circulation.
    pub fn resolve_active(&self, id: &str) -> Result<Restaurant, LicensingError> {
        let restaurant = self.get_restaurant(id)?;
        if !restaurant.is_active() {
            return Err(LicensingError::NotActive(format!(
                "restaurant is {}",
                restaurant.status.as_str()
            )));
        }
        Ok(restaurant)
    }

    /// One-time PIN setup after activation. Hashes and stores the admin
    /// PIN (and optionally the kitchen PIN), marks the installation
    /// configured, and issues the first admin token to the setup device.
    pub fn setup_pins(&self, req: SetupRequest) -> Result<TokenResponse, LicensingError> {
        validate_pin(&req.admin_pin)?;
        if let Some(ref kitchen) = req.kitchen_pin {
            validate_pin(kitchen)?;
        }
        if req.device_id.trim().is_empty() {
            return Err(LicensingError::Validation("device_id is required".into()));
        }

        let mut restaurant = self.resolve_active(&req.restaurant_id)?;
        if restaurant.setup_complete() {
            return Err(LicensingError::Validation(
                "PIN setup has already been completed".into(),
            ));
        }

        restaurant.admin_pin_hash = Some(hash_pin(&req.admin_pin)?);
        restaurant.kitchen_pin_hash = match req.kitchen_pin {
            Some(ref kitchen) => Some(hash_pin(kitchen)?),
            None => None,
        };
        restaurant.updated_at = now_rfc3339();

        self.update_record(
            "restaurants",
            &restaurant.id,
            &restaurant,
            &[
                ("configured", Value::Integer(1)),
                ("updated_at", Value::Text(restaurant.updated_at.clone())),
            ],
        )?;

        self.record_audit("PIN_SETUP_COMPLETED", &req.device_id, &restaurant.id, None)?;
        self.upsert_device(&restaurant.id, &req.device_id, Role::Admin)?;

        info!(restaurant_id = %restaurant.id, "PIN setup completed");
        self.issue_token(&restaurant.id, &req.device_id, Role::Admin)
    }

    /// Device login with a role PIN.
    ///
    /// Ordering matters: the lifecycle check precedes the lockout check,
    /// so probing a suspended installation neither counts as a failure
    /// nor reveals whether a PIN was correct. A missing hash for the
    /// requested role is treated exactly like a wrong PIN.
    pub fn login(&self, req: LoginRequest) -> Result<TokenResponse, LicensingError> {
        validate_pin(&req.pin)?;
        if req.device_id.trim().is_empty() {
            return Err(LicensingError::Validation("device_id is required".into()));
        }

        let restaurant = self
            .find_configured_restaurant()?
            .ok_or_else(|| LicensingError::NotFound("no configured restaurant".into()))?;

        if !restaurant.is_active() {
            return Err(LicensingError::NotActive(format!(
                "restaurant is {}",
                restaurant.status.as_str()
            )));
        }

        if let Err(retry_after_secs) = self.lockout.check(&restaurant.id) {
            return Err(LicensingError::Locked { retry_after_secs });
        }

        let hash = match req.role {
            Role::Admin => restaurant.admin_pin_hash.as_deref(),
            Role::Kitchen => restaurant.kitchen_pin_hash.as_deref(),
        };
        let ok = hash.map(|h| verify_pin(&req.pin, h)).unwrap_or(false);

        if !ok {
            let engaged = self.lockout.register_failure(&restaurant.id);
            self.record_audit(
                "DEVICE_LOGIN_FAILED",
                &req.device_id,
                &restaurant.id,
                Some(serde_json::json!({ "role": req.role.as_str() })),
            )?;
            // The tripping failure answers with the throttle, not 401.
            return Err(match engaged {
                Some(retry_after_secs) => LicensingError::Locked { retry_after_secs },
                None => LicensingError::Unauthorized("invalid PIN".into()),
            });
        }

        self.lockout.reset(&restaurant.id);
        self.upsert_device(&restaurant.id, &req.device_id, req.role)?;
        self.record_audit(
            "DEVICE_LOGIN",
            &req.device_id,
            &restaurant.id,
            Some(serde_json::json!({ "role": req.role.as_str() })),
        )?;

        self.issue_token(&restaurant.id, &req.device_id, req.role)
    }

    /// Insert or refresh the device+role registry row.
    pub(crate) fn upsert_device(
        &self,
        restaurant_id: &str,
        device_id: &str,
        role: Role,
    ) -> Result<(), LicensingError> {
        let storage_id = DeviceCredential::storage_id(device_id, role);
        let now = now_rfc3339();

        if let Some(mut existing) =
            self.get_record_opt::<DeviceCredential>("devices", &storage_id)?
        {
            existing.last_used = now.clone();
            return self.update_record(
                "devices",
                &storage_id,
                &existing,
                &[("last_used", Value::Text(now))],
            );
        }

        let credential = DeviceCredential {
            device_id: device_id.to_string(),
            role,
            restaurant_id: restaurant_id.to_string(),
            created_at: now.clone(),
            last_used: now.clone(),
        };
        self.insert_record(
            "devices",
            &storage_id,
            &credential,
            &[
                ("restaurant_id", Value::Text(restaurant_id.to_string())),
                ("role", Value::Text(role.as_str().to_string())),
                ("last_used", Value::Text(now)),
            ],
        )
    }

    /// Devices registered to a restaurant, most recently used first.
    pub fn list_devices(
        &self,
        restaurant_id: &str,
    ) -> Result<Vec<DeviceCredential>, LicensingError> {
        let rows = self.sql.query(
            "SELECT data FROM devices WHERE restaurant_id = ?1 ORDER BY last_used DESC",
            &[Value::Text(restaurant_id.to_string())],
        )?;
        let mut devices = Vec::new();
        for row in &rows {
            if let Some(data) = row.get_str("data") {
                let cred: DeviceCredential = serde_json::from_str(data)
                    .map_err(|e| LicensingError::Internal(e.to_string()))?;
                devices.push(cred);
            }
        }
        Ok(devices)
    }

    /// Mint a signed HS256 token for a device+role.
    pub(crate) fn issue_token(
        &self,
        restaurant_id: &str,
        device_id: &str,
        role: Role,
    ) -> Result<TokenResponse, LicensingError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: restaurant_id.to_string(),
            device_id: device_id.to_string(),
            role,
            sid: new_id(),
            iat: now,
            exp: now + self.config.token_ttl_secs,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| LicensingError::Internal(format!("token encode: {}", e)))?;

        Ok(TokenResponse {
            token,
            role,
            token_type: "Bearer".to_string(),
            expires_in: self.config.token_ttl_secs,
        })
    }

    /// Decode and validate a bearer token's signature and expiry.
    pub fn verify_token(&self, token: &str) -> Result<Claims, LicensingError> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|_| LicensingError::Unauthorized("invalid or expired token".into()))
    }
}
