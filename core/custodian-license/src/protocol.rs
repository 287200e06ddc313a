//! Encrypted request/response blobs exchanged with callers and the authority.
//!
//! Both sides speak JSON inside a ciphertext produced by an [`Encryptor`].
//! Requests name the service and the requesting device; responses carry an
//! HTTP-style status and a human-readable message.

use crate::error::{LicenseError, LicenseResult};
use custodian_crypto::Encryptor;
use serde::{Deserialize, Serialize};

/// Status for an allowed request.
pub const STATUS_OK: u16 = 200;

/// Status for a rejected request.
pub const STATUS_FORBIDDEN: u16 = 403;

/// A request to validate access to a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRequest {
    /// Name of the service being accessed.
    pub service_name: String,
    /// Requesting device or client.
    #[serde(default)]
    pub device_id: String,
    /// Hex device-binding tag, required by the authority.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl ValidationRequest {
    /// Creates a request without a tag.
    pub fn new(service_name: impl Into<String>, device_id: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            device_id: device_id.into(),
            tag: None,
        }
    }

    /// Attaches a device-binding tag (hex-encoded on the wire).
    #[must_use]
    pub fn with_tag(mut self, tag: &[u8]) -> Self {
        self.tag = Some(hex::encode(tag));
        self
    }

    /// Serializes and encrypts the request.
    pub fn seal(&self, encryptor: &dyn Encryptor) -> LicenseResult<Vec<u8>> {
        Ok(encryptor.encrypt(&serde_json::to_vec(self)?)?)
    }

    /// Decrypts and parses a request blob.
    pub fn open(encryptor: &dyn Encryptor, blob: &[u8]) -> LicenseResult<Self> {
        let plain = encryptor.decrypt(blob)?;
        let request: Self = serde_json::from_slice(&plain)?;
        if request.service_name.is_empty() {
            return Err(LicenseError::MalformedEntity(
                "service name must not be empty".to_string(),
            ));
        }
        Ok(request)
    }
}

/// The answer to a [`ValidationRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResponse {
    /// 200 when allowed, 403 when forbidden.
    pub status: u16,
    /// Rejection reason; empty when allowed.
    #[serde(default)]
    pub message: String,
    /// Hex envelope signature returned by the authority on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl ValidationResponse {
    /// An allowing response.
    #[must_use]
    pub fn allowed() -> Self {
        Self {
            status: STATUS_OK,
            message: String::new(),
            signature: None,
        }
    }

    /// A forbidding response carrying `reason`.
    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self {
            status: STATUS_FORBIDDEN,
            message: reason.into(),
            signature: None,
        }
    }

    /// Maps a validation outcome to a response.
    pub fn from_outcome(outcome: &LicenseResult<()>) -> Self {
        match outcome {
            Ok(()) => Self::allowed(),
            Err(e) => Self::forbidden(e.to_string()),
        }
    }

    /// Attaches an envelope signature.
    #[must_use]
    pub fn with_signature(mut self, signature: &[u8]) -> Self {
        self.signature = Some(hex::encode(signature));
        self
    }

    /// Returns true if the request was allowed.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        self.status == STATUS_OK
    }

    /// Serializes and encrypts the response.
    pub fn seal(&self, encryptor: &dyn Encryptor) -> LicenseResult<Vec<u8>> {
        Ok(encryptor.encrypt(&serde_json::to_vec(self)?)?)
    }

    /// Decrypts and parses a response blob.
    pub fn open(encryptor: &dyn Encryptor, blob: &[u8]) -> LicenseResult<Self> {
        let plain = encryptor.decrypt(blob)?;
        Ok(serde_json::from_slice(&plain)?)
    }
}
