//! Authority-side issuance and validation.
//!
//! The authority owns a [`LicenseDirectory`] (a database in production, an
//! in-memory map here) and answers two kinds of device traffic:
//!
//! - **fetch**: a device presents its encrypted, hex-encoded id (or its
//!   device id plus the encrypted license key) and gets the encrypted
//!   license bound to it, if that license is currently valid;
//! - **validate**: a device presents a service name, its id and its
//!   device-binding tag; the authority checks validity, verifies the tag in
//!   constant time, checks entitlement, and returns an envelope signature
//!   the device keeps as proof of the exchange.

use crate::error::{LicenseError, LicenseResult};
use crate::license::{License, LicenseSecret};
use crate::protocol::{ValidationRequest, ValidationResponse};
use crate::signature;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use custodian_crypto::Encryptor;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

/// Storage for issued licenses.
#[async_trait]
pub trait LicenseDirectory: Send + Sync {
    /// Stores a new license. Fails with [`LicenseError::Conflict`] if the id
    /// or device is already taken.
    async fn insert(&self, license: License) -> LicenseResult<()>;

    /// Retrieves a license by id.
    async fn by_id(&self, id: &str) -> LicenseResult<License>;

    /// Retrieves the license bound to a device.
    async fn by_device(&self, device_id: &str) -> LicenseResult<License>;
}

/// In-memory license directory. Data is lost on restart.
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    licenses: RwLock<HashMap<String, License>>,
}

impl MemoryDirectory {
    /// Creates an empty directory.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LicenseDirectory for MemoryDirectory {
    async fn insert(&self, license: License) -> LicenseResult<()> {
        let mut licenses = self.licenses.write().await;
        if licenses.contains_key(&license.id) {
            return Err(LicenseError::Conflict(format!("license {}", license.id)));
        }
        if licenses.values().any(|l| l.device_id == license.device_id) {
            return Err(LicenseError::Conflict(format!(
                "device {} already licensed",
                license.device_id
            )));
        }
        licenses.insert(license.id.clone(), license);
        Ok(())
    }

    async fn by_id(&self, id: &str) -> LicenseResult<License> {
        self.licenses
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| LicenseError::NotFound(id.to_string()))
    }

    async fn by_device(&self, device_id: &str) -> LicenseResult<License> {
        self.licenses
            .read()
            .await
            .values()
            .find(|l| l.device_id == device_id)
            .cloned()
            .ok_or_else(|| LicenseError::NotFound(format!("device {device_id}")))
    }
}

/// The caller-supplied part of a new license.
#[derive(Debug, Clone)]
pub struct LicenseDraft {
    /// Preassigned id; generated if `None`.
    pub id: Option<String>,
    /// Preassigned secret; generated if `None`.
    pub key: Option<LicenseSecret>,
    /// Device to bind to. Required.
    pub device_id: String,
    /// Initial activation state.
    pub active: bool,
    /// Issue time.
    pub created_at: DateTime<Utc>,
    /// Expiry time.
    pub expires_at: DateTime<Utc>,
    /// Entitled services.
    pub services: Vec<String>,
    /// Opaque plan metadata.
    pub plan: BTreeMap<String, serde_json::Value>,
}

impl LicenseDraft {
    /// An active draft for `device_id` issued now and expiring at `expires_at`.
    pub fn new(device_id: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            id: None,
            key: None,
            device_id: device_id.into(),
            active: true,
            created_at: Utc::now(),
            expires_at,
            services: Vec::new(),
            plan: BTreeMap::new(),
        }
    }

    /// Sets the entitled services.
    #[must_use]
    pub fn services<I, S>(mut self, services: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.services = services.into_iter().map(Into::into).collect();
        self
    }
}

/// The issuing authority.
pub struct Authority<D> {
    directory: D,
    encryptor: Arc<dyn Encryptor>,
}

impl<D: LicenseDirectory> Authority<D> {
    /// Creates an authority over `directory`.
    pub fn new(directory: D, encryptor: Arc<dyn Encryptor>) -> Self {
        Self {
            directory,
            encryptor,
        }
    }

    /// Returns the underlying directory.
    pub fn directory(&self) -> &D {
        &self.directory
    }

    /// Issues a license on behalf of `issuer`.
    ///
    /// Assigns `id` and `key` when the draft leaves them empty, stamps the
    /// issuer, and sets `updated_at = created_at`, `updated_by = issuer`.
    pub async fn issue(&self, issuer: &str, draft: LicenseDraft) -> LicenseResult<License> {
        if draft.device_id.is_empty() {
            return Err(LicenseError::MalformedEntity("device id can't be empty".to_string()));
        }

        let license = License {
            id: draft
                .id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            key: draft
                .key
                .filter(|k| !k.is_empty())
                .unwrap_or_else(LicenseSecret::generate),
            issuer: issuer.to_string(),
            device_id: draft.device_id,
            active: draft.active,
            created_at: draft.created_at,
            expires_at: draft.expires_at,
            updated_at: draft.created_at,
            updated_by: issuer.to_string(),
            services: draft.services,
            plan: draft.plan,
            signature: None,
        };

        self.directory.insert(license.clone()).await?;
        info!("Issued license {} for device {}", license.id, license.device_id);
        Ok(license)
    }

    /// Returns the encrypted license for the device named by an encrypted,
    /// hex-encoded credential.
    pub async fn fetch_for_device(&self, credential: &str) -> LicenseResult<Vec<u8>> {
        let device_id = String::from_utf8(self.encryptor.decrypt_hex(credential)?)
            .map_err(|e| LicenseError::MalformedEntity(format!("invalid device id: {e}")))?;

        let license = self.directory.by_device(&device_id).await?;
        license.validate(Utc::now())?;

        debug!("Serving license {} to device {device_id}", license.id);
        Ok(self.encryptor.encrypt(&license.to_json()?)?)
    }

    /// Returns the encrypted license bound to `device_id`, authenticating
    /// with the license key itself (encrypted and hex-encoded).
    ///
    /// A key that does not match is [`LicenseError::Unauthorized`]; the
    /// validity check only runs for an authenticated caller.
    pub async fn fetch_with_key(
        &self,
        device_id: &str,
        credential: &str,
    ) -> LicenseResult<Vec<u8>> {
        let license = self.directory.by_device(device_id).await?;
        let presented = Zeroizing::new(self.encryptor.decrypt_hex(credential)?);

        if !signature::secrets_equal(&presented, license.key.expose()) {
            warn!("Rejected key for device {device_id}");
            return Err(LicenseError::Unauthorized);
        }
        license.validate(Utc::now())?;

        debug!("Serving license {} to key holder of {device_id}", license.id);
        Ok(self.encryptor.encrypt(&license.to_json()?)?)
    }

    /// Validates `service` for the device, verifying its device-binding tag.
    ///
    /// Returns the envelope signature over the serialized license.
    pub async fn validate(
        &self,
        service: &str,
        device_id: &str,
        tag: &[u8],
    ) -> LicenseResult<Vec<u8>> {
        let mut license = self.directory.by_device(device_id).await?;
        license.validate(Utc::now())?;
        signature::verify_device(license.key.expose(), &license.device_id, tag)?;

        if !license.has_service(service) {
            return Err(LicenseError::ServiceNotEntitled(service.to_string()));
        }

        Ok(license.seal()?.to_vec())
    }

    /// Answers an encrypted [`ValidationRequest`] with an encrypted
    /// [`ValidationResponse`]. Requests that cannot be opened, or that carry
    /// no tag, are errors rather than 403 answers.
    pub async fn answer(&self, blob: &[u8]) -> LicenseResult<Vec<u8>> {
        let request = ValidationRequest::open(self.encryptor.as_ref(), blob)?;
        let tag = request
            .tag
            .as_deref()
            .ok_or_else(|| LicenseError::MalformedEntity("missing device tag".to_string()))
            .and_then(signature::decode_tag)?;

        let response = match self
            .validate(&request.service_name, &request.device_id, &tag)
            .await
        {
            Ok(envelope) => ValidationResponse::allowed().with_signature(&envelope),
            Err(e) => {
                debug!("Rejected {} for {}: {e}", request.service_name, request.device_id);
                ValidationResponse::forbidden(e.to_string())
            }
        };
        response.seal(self.encryptor.as_ref())
    }
}
