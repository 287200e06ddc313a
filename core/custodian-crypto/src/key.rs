//! Cipher key provisioning.
//!
//! Keys are never derived from constants baked into the binary. They come
//! from a hex string, a key file, an environment variable, or the OS RNG.

use crate::error::{CryptoError, CryptoResult};
use rand::RngCore;
use std::path::Path;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Size of cipher keys in bytes (256 bits for ChaCha20).
pub const KEY_SIZE: usize = 32;

/// A symmetric cipher key with automatic zeroization on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct CipherKey {
    bytes: [u8; KEY_SIZE],
}

impl CipherKey {
    /// Creates a key from raw bytes.
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    /// Creates a key from a byte slice, checking its length.
    pub fn from_slice(bytes: &[u8]) -> CryptoResult<Self> {
        let bytes: [u8; KEY_SIZE] = bytes.try_into().map_err(|_| CryptoError::InvalidKeyLength {
            expected: KEY_SIZE,
            actual: bytes.len(),
        })?;
        Ok(Self { bytes })
    }

    /// Parses a hex-encoded key. Surrounding whitespace is ignored.
    pub fn from_hex(encoded: &str) -> CryptoResult<Self> {
        let decoded = Zeroizing::new(hex::decode(encoded.trim())?);
        Self::from_slice(&decoded)
    }

    /// Reads a hex-encoded key from a file.
    pub fn from_file(path: impl AsRef<Path>) -> CryptoResult<Self> {
        let path = path.as_ref();
        let contents = Zeroizing::new(std::fs::read_to_string(path).map_err(|e| {
            CryptoError::KeyMaterial(format!("failed to read {}: {e}", path.display()))
        })?);
        Self::from_hex(&contents)
    }

    /// Reads a hex-encoded key from the named environment variable.
    pub fn from_env(var: &str) -> CryptoResult<Self> {
        let value = Zeroizing::new(
            std::env::var(var)
                .map_err(|e| CryptoError::KeyMaterial(format!("{var}: {e}")))?,
        );
        Self::from_hex(&value)
    }

    /// Generates a random key from the OS RNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Returns the key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }

    /// Hex-encodes the key, e.g. for writing a freshly provisioned key file.
    pub fn to_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(self.bytes))
    }
}

impl std::fmt::Debug for CipherKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CipherKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}
