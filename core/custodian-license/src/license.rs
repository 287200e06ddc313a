//! The license record and its validity checks.
//!
//! A license is usable iff it is active, already issued, and not yet
//! expired. Entitlement is a separate check: exact, case-sensitive
//! membership of the service name in `services`.

use crate::error::{LicenseError, LicenseResult};
use crate::signature;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// The secret shared between authority and device, used as the MAC key.
///
/// Serializes as a plain string (it only ever travels inside encrypted
/// payloads) but never shows up in `Debug` output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(transparent)]
pub struct LicenseSecret(String);

impl LicenseSecret {
    /// Wraps an existing secret.
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Generates a fresh random secret.
    #[must_use]
    pub fn generate() -> Self {
        Self::new(uuid::Uuid::new_v4().to_string())
    }

    /// Returns the secret bytes, for MAC computation only.
    pub fn expose(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Returns true if no secret is set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for LicenseSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("LicenseSecret([REDACTED])")
    }
}

/// A license entitling one device to a set of services until expiry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct License {
    /// Opaque identifier assigned by the authority.
    pub id: String,
    /// MAC key shared with the authority.
    pub key: LicenseSecret,
    /// Principal that issued the license.
    pub issuer: String,
    /// Device the license is bound to.
    pub device_id: String,
    /// Deactivated licenses are unusable regardless of expiry.
    pub active: bool,
    /// Issue time.
    pub created_at: DateTime<Utc>,
    /// Expiry time (exclusive).
    pub expires_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
    /// Last modifying principal.
    pub updated_by: String,
    /// Entitled service names.
    #[serde(default)]
    pub services: Vec<String>,
    /// Opaque plan metadata.
    #[serde(default)]
    pub plan: BTreeMap<String, serde_json::Value>,
    /// Envelope signature, computed on demand and never serialized.
    #[serde(skip)]
    pub signature: Option<Vec<u8>>,
}

impl License {
    /// Checks that the license is usable at `now`.
    ///
    /// # Errors
    ///
    /// - [`LicenseError::NotActive`] if deactivated (regardless of dates)
    /// - [`LicenseError::Expired`] if `now >= expires_at`
    /// - [`LicenseError::MalformedEntity`] if `created_at` is in the future
    pub fn validate(&self, now: DateTime<Utc>) -> LicenseResult<()> {
        if !self.active {
            return Err(LicenseError::NotActive);
        }
        if now >= self.expires_at {
            return Err(LicenseError::Expired(self.expires_at.to_rfc3339()));
        }
        if self.created_at > now {
            return Err(LicenseError::MalformedEntity("invalid issue date".to_string()));
        }
        Ok(())
    }

    /// Returns true if `service` is one of the entitled services.
    #[must_use]
    pub fn has_service(&self, service: &str) -> bool {
        self.services.iter().any(|s| s == service)
    }

    /// Validates the license at `now` and then checks entitlement.
    pub fn check(&self, service: &str, now: DateTime<Utc>) -> LicenseResult<()> {
        self.validate(now)?;
        if !self.has_service(service) {
            return Err(LicenseError::ServiceNotEntitled(service.to_string()));
        }
        Ok(())
    }

    /// Returns true if the license is usable right now.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.validate(Utc::now()).is_ok()
    }

    /// Serializes the license to JSON (the signature is never included).
    pub fn to_json(&self) -> LicenseResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parses a license from JSON.
    pub fn from_json(bytes: &[u8]) -> LicenseResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Computes the device-binding tag: `HMAC(key, device_id)`.
    #[must_use]
    pub fn device_tag(&self) -> Vec<u8> {
        signature::sign(self.key.expose(), self.device_id.as_bytes())
    }

    /// Computes the envelope signature over the serialized license and
    /// stores it in `signature`.
    pub fn seal(&mut self) -> LicenseResult<&[u8]> {
        let material = self.to_json()?;
        let tag = signature::sign(self.key.expose(), &material);
        Ok(self.signature.insert(tag).as_slice())
    }
}
