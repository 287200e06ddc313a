//! Shared test helpers for license tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration, Utc};
use custodian_crypto::{Cipher, CipherKey, Encryptor};
use custodian_license::{License, LicenseError, LicenseResult, LicenseSecret, LicenseSource};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Returns a cipher with a deterministic key.
pub fn test_cipher() -> Arc<dyn Encryptor> {
    Arc::new(Cipher::new(CipherKey::from_bytes([42u8; 32])))
}

/// Creates an active license issued an hour ago, expiring after `valid_for`.
pub fn license_expiring_in(services: &[&str], valid_for: Duration) -> License {
    let now = Utc::now();
    License {
        id: "lic-1".to_string(),
        key: LicenseSecret::new("shared-secret"),
        issuer: "issuer@example.com".to_string(),
        device_id: "device-1".to_string(),
        active: true,
        created_at: now - Duration::hours(1),
        expires_at: now + valid_for,
        updated_at: now - Duration::hours(1),
        updated_by: "issuer@example.com".to_string(),
        services: services.iter().map(|s| s.to_string()).collect(),
        plan: BTreeMap::new(),
        signature: None,
    }
}

/// Creates an active license valid for one year.
pub fn active_license(services: &[&str]) -> License {
    license_expiring_in(services, Duration::days(365))
}

/// Creates a license that expired yesterday.
pub fn expired_license(services: &[&str]) -> License {
    license_expiring_in(services, Duration::days(-1))
}

/// Serializes and encrypts a license the way the authority and cache do.
pub fn seal_license(license: &License, encryptor: &dyn Encryptor) -> Vec<u8> {
    encryptor.encrypt(&license.to_json().unwrap()).unwrap()
}

/// A license source returning canned bytes and counting calls.
pub struct StaticSource {
    payload: Mutex<LicenseResult<Vec<u8>>>,
    calls: AtomicUsize,
}

impl StaticSource {
    pub fn serving(bytes: Vec<u8>) -> Arc<Self> {
        Arc::new(Self {
            payload: Mutex::new(Ok(bytes)),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            payload: Mutex::new(Err(LicenseError::Fetch {
                status: Some(503),
                message: message.to_string(),
            })),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn set(&self, bytes: Vec<u8>) {
        *self.payload.lock().unwrap() = Ok(bytes);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LicenseSource for StaticSource {
    async fn fetch(&self) -> LicenseResult<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &*self.payload.lock().unwrap() {
            Ok(bytes) => Ok(bytes.clone()),
            Err(LicenseError::Fetch { status, message }) => Err(LicenseError::Fetch {
                status: *status,
                message: message.clone(),
            }),
            Err(e) => Err(LicenseError::Storage(e.to_string())),
        }
    }
}
