//! Command-line and environment configuration.

use clap::Parser;
use custodian_crypto::{CipherKey, CryptoError, CryptoResult};
use custodian_license::DeviceFingerprint;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Clone)]
#[command(name = "custodian-agent")]
#[command(about = "Holds the local license and answers validation requests")]
pub struct Config {
    /// URL of the authority's license endpoint
    #[arg(long, env = "CUSTODIAN_AUTHORITY_URL")]
    pub authority_url: String,

    /// Encrypted license cache file
    #[arg(long, env = "CUSTODIAN_CACHE_PATH")]
    pub cache_path: Option<PathBuf>,

    /// Credential presented to the authority (defaults to the device fingerprint)
    #[arg(long, env = "CUSTODIAN_DEVICE_ID")]
    pub device_id: Option<String>,

    /// Hex-encoded 32-byte cipher key
    #[arg(long, env = "CUSTODIAN_KEY", hide_env_values = true, conflicts_with = "key_file")]
    pub key: Option<String>,

    /// File holding the hex-encoded cipher key
    #[arg(long, env = "CUSTODIAN_KEY_FILE")]
    pub key_file: Option<PathBuf>,

    /// HTTP port for the validation endpoint
    #[arg(short, long, env = "CUSTODIAN_HTTP_PORT", default_value = "7070")]
    pub port: u16,

    /// Delay between license load attempts, in milliseconds
    #[arg(long, env = "CUSTODIAN_RETRY_INTERVAL_MS", default_value = "1000")]
    pub retry_interval_ms: u64,

    /// Timeout for outbound HTTP requests, in seconds
    #[arg(long, env = "CUSTODIAN_REQUEST_TIMEOUT_SECS", default_value = "30")]
    pub request_timeout_secs: u64,

    /// Optional secondary validator consulted after local checks pass
    #[arg(long, env = "CUSTODIAN_DELEGATE_URL")]
    pub delegate_url: Option<String>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, env = "CUSTODIAN_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Config {
    /// Resolves the cipher key from `--key` or `--key-file`.
    pub fn cipher_key(&self) -> CryptoResult<CipherKey> {
        match (&self.key, &self.key_file) {
            (Some(hex), _) => CipherKey::from_hex(hex),
            (None, Some(path)) => CipherKey::from_file(path),
            (None, None) => Err(CryptoError::KeyMaterial(
                "no cipher key configured (set --key or --key-file)".to_string(),
            )),
        }
    }

    /// Returns the cache path, defaulting to the platform's local data dir.
    pub fn cache_path(&self) -> PathBuf {
        self.cache_path.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("custodian")
                .join("license.bin")
        })
    }

    /// Returns the configured device id, or this machine's fingerprint.
    pub fn device_id(&self) -> String {
        self.device_id
            .clone()
            .unwrap_or_else(|| DeviceFingerprint::generate().id().to_string())
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("authority_url", &self.authority_url)
            .field("cache_path", &self.cache_path)
            .field("device_id", &self.device_id)
            .field("key", &self.key.as_ref().map(|_| "[REDACTED]"))
            .field("key_file", &self.key_file)
            .field("port", &self.port)
            .field("retry_interval_ms", &self.retry_interval_ms)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("delegate_url", &self.delegate_url)
            .field("log_level", &self.log_level)
            .finish()
    }
}
