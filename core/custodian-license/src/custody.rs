//! The custody actor: sole owner of the agent's license.
//!
//! A single worker task holds the license and processes one
//! [`CustodyCommand`] at a time. [`Custody`] handles are cheap to clone and
//! forward each call over an mpsc channel, awaiting the reply on a oneshot.
//! Because only the worker ever touches the license, a reload is atomic with
//! respect to validations: each one sees either the old license or the new
//! one, never a mix.
//!
//! Operation errors are returned to the caller and never stop the worker.
//! It exits once every handle has been dropped.

use crate::cache::CacheFile;
use crate::delegate::DelegateValidator;
use crate::error::{LicenseError, LicenseResult};
use crate::fetch::LicenseSource;
use crate::license::License;
use crate::protocol::{ValidationRequest, ValidationResponse};
use chrono::Utc;
use custodian_crypto::Encryptor;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

/// Default depth of the command queue.
pub const DEFAULT_QUEUE_DEPTH: usize = 64;

/// Command sent to the custody worker.
enum CustodyCommand {
    /// Read the cache file, or fetch from the authority if absent.
    Load {
        reply: oneshot::Sender<LicenseResult<()>>,
    },
    /// Write the held license to the cache file.
    Save {
        reply: oneshot::Sender<LicenseResult<()>>,
    },
    /// Check validity and entitlement for a service.
    Validate {
        service: String,
        client: String,
        reply: oneshot::Sender<LicenseResult<()>>,
    },
    /// Drop the held license and delete the cache file.
    Remove {
        reply: oneshot::Sender<LicenseResult<()>>,
    },
    /// Return a copy of the held license.
    Snapshot {
        reply: oneshot::Sender<Option<License>>,
    },
}

/// Handle to a running custody worker.
#[derive(Clone)]
pub struct Custody {
    commands: mpsc::Sender<CustodyCommand>,
    encryptor: Arc<dyn Encryptor>,
}

/// Builder for a custody worker.
pub struct CustodyBuilder {
    cache: CacheFile,
    source: Arc<dyn LicenseSource>,
    encryptor: Arc<dyn Encryptor>,
    delegate: Option<Arc<dyn DelegateValidator>>,
    queue_depth: usize,
}

impl CustodyBuilder {
    /// Adds a delegate validator consulted after local checks pass.
    #[must_use]
    pub fn delegate(mut self, delegate: Arc<dyn DelegateValidator>) -> Self {
        self.delegate = Some(delegate);
        self
    }

    /// Sets the command queue depth.
    #[must_use]
    pub fn queue_depth(mut self, depth: usize) -> Self {
        self.queue_depth = depth.max(1);
        self
    }

    /// Spawns the worker on the current tokio runtime and returns a handle.
    pub fn spawn(self) -> Custody {
        let (commands, rx) = mpsc::channel(self.queue_depth);
        let worker = CustodyWorker {
            license: None,
            cache: self.cache,
            source: self.source,
            encryptor: Arc::clone(&self.encryptor),
            delegate: self.delegate,
        };
        tokio::spawn(worker.run(rx));

        Custody {
            commands,
            encryptor: self.encryptor,
        }
    }
}

impl Custody {
    /// Starts building a custody worker.
    pub fn builder(
        cache: CacheFile,
        source: Arc<dyn LicenseSource>,
        encryptor: Arc<dyn Encryptor>,
    ) -> CustodyBuilder {
        CustodyBuilder {
            cache,
            source,
            encryptor,
            delegate: None,
            queue_depth: DEFAULT_QUEUE_DEPTH,
        }
    }

    /// Loads the license from the cache file, fetching it from the
    /// authority if no cache file exists. Does not persist a fetched
    /// license; call [`Custody::save`] for that.
    pub async fn load(&self) -> LicenseResult<()> {
        self.call(|reply| CustodyCommand::Load { reply }).await?
    }

    /// Writes the held license to the cache file.
    ///
    /// Fails with [`LicenseError::NotLoaded`] without touching the file if
    /// no license is held.
    pub async fn save(&self) -> LicenseResult<()> {
        self.call(|reply| CustodyCommand::Save { reply }).await?
    }

    /// Validates access to `service`.
    pub async fn validate(&self, service: &str) -> LicenseResult<()> {
        self.validate_for(service, "").await
    }

    /// Validates access to `service` on behalf of `client`. The client is
    /// only passed on to the delegate validator.
    pub async fn validate_for(&self, service: &str, client: &str) -> LicenseResult<()> {
        self.call(|reply| CustodyCommand::Validate {
            service: service.to_string(),
            client: client.to_string(),
            reply,
        })
        .await?
    }

    /// Drops the held license and deletes the cache file.
    pub async fn remove(&self) -> LicenseResult<()> {
        self.call(|reply| CustodyCommand::Remove { reply }).await?
    }

    /// Returns a copy of the held license, if any.
    pub async fn snapshot(&self) -> LicenseResult<Option<License>> {
        self.call(|reply| CustodyCommand::Snapshot { reply }).await
    }

    /// Answers an encrypted validation request with an encrypted response.
    ///
    /// Validation failures become a 403 response; a request that cannot be
    /// decrypted or parsed is an error.
    pub async fn handle(&self, blob: &[u8]) -> LicenseResult<Vec<u8>> {
        let request = ValidationRequest::open(self.encryptor.as_ref(), blob)?;
        let outcome = self
            .validate_for(&request.service_name, &request.device_id)
            .await;
        if let Err(LicenseError::ChannelClosed) = outcome {
            return Err(LicenseError::ChannelClosed);
        }
        ValidationResponse::from_outcome(&outcome).seal(self.encryptor.as_ref())
    }

    async fn call<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> CustodyCommand,
    ) -> LicenseResult<T> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| LicenseError::ChannelClosed)?;
        response.await.map_err(|_| LicenseError::ChannelClosed)
    }
}

/// State owned by the worker task.
struct CustodyWorker {
    license: Option<License>,
    cache: CacheFile,
    source: Arc<dyn LicenseSource>,
    encryptor: Arc<dyn Encryptor>,
    delegate: Option<Arc<dyn DelegateValidator>>,
}

impl CustodyWorker {
    async fn run(mut self, mut commands: mpsc::Receiver<CustodyCommand>) {
        debug!("Custody worker started for {}", self.cache.path().display());

        while let Some(command) = commands.recv().await {
            match command {
                CustodyCommand::Load { reply } => {
                    let result = self.load().await;
                    if let Err(e) = &result {
                        warn!("License load failed: {e}");
                    }
                    let _ = reply.send(result);
                }
                CustodyCommand::Save { reply } => {
                    let result = self.save().await;
                    if let Err(e) = &result {
                        warn!("License save failed: {e}");
                    }
                    let _ = reply.send(result);
                }
                CustodyCommand::Validate {
                    service,
                    client,
                    reply,
                } => {
                    let result = self.validate(&service, &client).await;
                    if let Err(e) = &result {
                        debug!("Validation of {service} rejected: {e}");
                    }
                    let _ = reply.send(result);
                }
                CustodyCommand::Remove { reply } => {
                    let _ = reply.send(self.remove().await);
                }
                CustodyCommand::Snapshot { reply } => {
                    let _ = reply.send(self.license.clone());
                }
            }
        }

        debug!("Custody worker stopped");
    }

    async fn load(&mut self) -> LicenseResult<()> {
        let data = match self.cache.read().await? {
            Some(data) => {
                debug!("Reading license from {}", self.cache.path().display());
                data
            }
            None => {
                info!("No cached license, fetching from authority");
                self.source.fetch().await?
            }
        };

        let plain = self.encryptor.decrypt(&data)?;
        let license = License::from_json(&plain)?;
        info!("Loaded license {} for device {}", license.id, license.device_id);
        self.license = Some(license);
        Ok(())
    }

    async fn save(&self) -> LicenseResult<()> {
        let license = self.license.as_ref().ok_or(LicenseError::NotLoaded)?;
        let data = self.encryptor.encrypt(&license.to_json()?)?;
        self.cache.write(&data).await?;
        debug!("Saved license {} to {}", license.id, self.cache.path().display());
        Ok(())
    }

    async fn validate(&self, service: &str, client: &str) -> LicenseResult<()> {
        let license = self.license.as_ref().ok_or(LicenseError::NotLoaded)?;
        license.check(service, Utc::now())?;

        if let Some(delegate) = &self.delegate {
            delegate.validate(service, client).await?;
        }
        Ok(())
    }

    async fn remove(&mut self) -> LicenseResult<()> {
        self.cache.remove().await?;
        if let Some(license) = self.license.take() {
            info!("Removed license {}", license.id);
        }
        Ok(())
    }
}
