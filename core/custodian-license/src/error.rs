//! Error types for license custody and validation.

use custodian_crypto::CryptoError;
use thiserror::Error;

/// Licensing-specific errors.
#[derive(Debug, Error)]
pub enum LicenseError {
    /// Custody holds no license yet.
    #[error("license not loaded")]
    NotLoaded,

    /// License has expired.
    #[error("license expired on {0}")]
    Expired(String),

    /// License is deactivated.
    #[error("license is not active")]
    NotActive,

    /// The license does not entitle the requested service.
    #[error("service not allowed: {0}")]
    ServiceNotEntitled(String),

    /// Payload or entity is malformed (parse, serialize or shape failure).
    #[error("malformed entity: {0}")]
    MalformedEntity(String),

    /// MAC tag did not match.
    #[error("invalid signature")]
    InvalidSignature,

    /// Encryption or decryption failed.
    #[error("crypto failure: {0}")]
    Crypto(#[from] CryptoError),

    /// The authority could not be reached or refused the request.
    #[error("fetch failed{}: {message}", status_suffix(.status))]
    Fetch {
        /// HTTP status, when a response was received.
        status: Option<u16>,
        /// Transport error or response body.
        message: String,
    },

    /// Local file I/O failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// The configured delegate validator rejected the request.
    #[error("rejected by delegate validator: {0}")]
    DelegateRejected(String),

    /// Credential did not match the license.
    #[error("unauthorized access")]
    Unauthorized,

    /// No license exists for the given identifier.
    #[error("license not found: {0}")]
    NotFound(String),

    /// A license with the same id or device already exists.
    #[error("entity already exists: {0}")]
    Conflict(String),

    /// The custody worker is gone.
    #[error("custody channel closed")]
    ChannelClosed,
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" ({s})")).unwrap_or_default()
}

impl From<serde_json::Error> for LicenseError {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedEntity(err.to_string())
    }
}

/// Result type for license operations.
pub type LicenseResult<T> = Result<T, LicenseError>;
