//! Fetching a license from the issuing authority.
//!
//! The custody actor only calls this on a cache miss. Retries are the
//! caller's business; a single failed round-trip surfaces as
//! [`LicenseError::Fetch`].

use crate::error::{LicenseError, LicenseResult};
use async_trait::async_trait;
use custodian_crypto::Encryptor;
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Default timeout for authority round-trips.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Somewhere a license can be obtained from when none is cached.
///
/// Returns the encrypted, serialized license exactly as received.
#[async_trait]
pub trait LicenseSource: Send + Sync {
    /// Obtains the encrypted license bytes.
    async fn fetch(&self) -> LicenseResult<Vec<u8>>;
}

/// HTTP client for the authority's license endpoint.
pub struct AuthorityClient {
    url: String,
    credential: String,
    encryptor: Arc<dyn Encryptor>,
    client: Client,
}

impl AuthorityClient {
    /// Creates a client for `url` authenticating with `credential`
    /// (the device id or agent key).
    pub fn new(
        url: impl Into<String>,
        credential: impl Into<String>,
        encryptor: Arc<dyn Encryptor>,
    ) -> LicenseResult<Self> {
        Self::with_timeout(url, credential, encryptor, DEFAULT_TIMEOUT)
    }

    /// Like [`AuthorityClient::new`] with an explicit request timeout.
    pub fn with_timeout(
        url: impl Into<String>,
        credential: impl Into<String>,
        encryptor: Arc<dyn Encryptor>,
        timeout: Duration,
    ) -> LicenseResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LicenseError::Fetch {
                status: None,
                message: format!("failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            url: url.into(),
            credential: credential.into(),
            encryptor,
            client,
        })
    }

    /// Returns the authority URL.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl LicenseSource for AuthorityClient {
    async fn fetch(&self) -> LicenseResult<Vec<u8>> {
        fetch(&self.client, &self.url, &self.credential, self.encryptor.as_ref()).await
    }
}

/// Performs one authenticated `GET` against the authority.
///
/// The credential is encrypted and hex-encoded into the `Authorization`
/// header. Any non-2xx response is a [`LicenseError::Fetch`] carrying the
/// response body.
pub async fn fetch(
    client: &Client,
    url: &str,
    credential: &str,
    encryptor: &dyn Encryptor,
) -> LicenseResult<Vec<u8>> {
    let authorization = encryptor.encrypt_hex(credential.as_bytes())?;

    debug!("Fetching license from {url}");

    let response = client
        .get(url)
        .header(AUTHORIZATION, authorization)
        .header(CONTENT_TYPE, "application/json")
        .send()
        .await
        .map_err(|e| LicenseError::Fetch {
            status: None,
            message: e.to_string(),
        })?;

    let status = response.status();
    let body = response.bytes().await.map_err(|e| LicenseError::Fetch {
        status: Some(status.as_u16()),
        message: format!("failed to read response body: {e}"),
    })?;

    if !status.is_success() {
        return Err(LicenseError::Fetch {
            status: Some(status.as_u16()),
            message: String::from_utf8_lossy(&body).trim().to_string(),
        });
    }

    Ok(body.to_vec())
}
