//! Optional secondary validation consulted after the local checks pass.
//!
//! The custody actor holds an `Option<Arc<dyn DelegateValidator>>`; a
//! rejection from the delegate overrides a local success.

use crate::error::{LicenseError, LicenseResult};
use crate::protocol::{ValidationRequest, ValidationResponse};
use async_trait::async_trait;
use custodian_crypto::Encryptor;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// A secondary validator.
#[async_trait]
pub trait DelegateValidator: Send + Sync {
    /// Returns `Ok(())` to allow, or an error describing the rejection.
    async fn validate(&self, service: &str, client: &str) -> LicenseResult<()>;
}

/// Delegate that forwards the request to a remote validation endpoint.
///
/// The request is sent as an encrypted [`ValidationRequest`] and the reply
/// is expected to be an encrypted [`ValidationResponse`].
pub struct RemoteValidator {
    url: String,
    encryptor: Arc<dyn Encryptor>,
    client: Client,
}

impl RemoteValidator {
    /// Creates a delegate posting to `url`.
    pub fn new(
        url: impl Into<String>,
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
            encryptor,
            client,
        })
    }
}

#[async_trait]
impl DelegateValidator for RemoteValidator {
    async fn validate(&self, service: &str, client: &str) -> LicenseResult<()> {
        let body = ValidationRequest::new(service, client).seal(self.encryptor.as_ref())?;

        let response = self
            .client
            .post(&self.url)
            .body(body)
            .send()
            .await
            .map_err(|e| LicenseError::Fetch {
                status: None,
                message: e.to_string(),
            })?;

        let status = response.status();
        let data = response.bytes().await.map_err(|e| LicenseError::Fetch {
            status: Some(status.as_u16()),
            message: format!("failed to read response body: {e}"),
        })?;

        if !status.is_success() {
            warn!("Delegate validator returned {status}");
            return Err(LicenseError::Fetch {
                status: Some(status.as_u16()),
                message: String::from_utf8_lossy(&data).trim().to_string(),
            });
        }

        let answer = ValidationResponse::open(self.encryptor.as_ref(), &data)?;
        if answer.is_allowed() {
            debug!("Delegate allowed service {service}");
            Ok(())
        } else {
            Err(LicenseError::DelegateRejected(answer.message))
        }
    }
}
