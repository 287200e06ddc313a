//! License custody and validation.
//!
//! This crate handles:
//! - The license record and its validity/entitlement checks
//! - HMAC tags binding a license secret to a device or payload
//! - Fetching a license from the issuing authority
//! - The custody actor that owns the agent's single license
//! - Authority-side issuance and tag-verified validation
//!
//! # Design Principles
//!
//! - **One owner**: the held license lives inside a single worker task;
//!   every read and write is a message to it
//! - **Encrypted at rest and on the wire**: cache file, fetch credential
//!   and validation blobs all pass through an [`custodian_crypto::Encryptor`]
//! - **Secrets stay secret**: the license key is redacted from `Debug`
//!   output and compared only in constant time
//! - **Fail loudly**: every operation returns a concrete [`LicenseError`];
//!   only a missing cache file is recovered internally (by fetching)

mod authority;
mod cache;
mod custody;
mod delegate;
mod device;
mod error;
mod fetch;
mod license;
mod protocol;
pub mod signature;

pub use authority::{Authority, LicenseDirectory, LicenseDraft, MemoryDirectory};
pub use cache::CacheFile;
pub use custody::{Custody, CustodyBuilder, DEFAULT_QUEUE_DEPTH};
pub use delegate::{DelegateValidator, RemoteValidator};
pub use device::DeviceFingerprint;
pub use error::{LicenseError, LicenseResult};
pub use fetch::{fetch, AuthorityClient, LicenseSource, DEFAULT_TIMEOUT};
pub use license::{License, LicenseSecret};
pub use protocol::{ValidationRequest, ValidationResponse, STATUS_FORBIDDEN, STATUS_OK};
