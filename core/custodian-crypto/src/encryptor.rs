//! Abstract encryption interface.
//!
//! Consumers (the custody actor, the fetch client, the authority) depend on
//! `Arc<dyn Encryptor>` and never see raw keys. [`crate::Cipher`] is the
//! production implementation; tests can use [`PassthroughEncryptor`].

use crate::error::{CryptoError, CryptoResult};

/// Trait for encrypting/decrypting opaque byte slices.
///
/// Implementations own the key material.
pub trait Encryptor: Send + Sync {
    /// Encrypts `plaintext`, returning an opaque ciphertext blob.
    fn encrypt(&self, plaintext: &[u8]) -> CryptoResult<Vec<u8>>;

    /// Decrypts a blob previously produced by `encrypt`.
    fn decrypt(&self, ciphertext: &[u8]) -> CryptoResult<Vec<u8>>;

    /// Encrypts and hex-encodes `plaintext`.
    fn encrypt_hex(&self, plaintext: &[u8]) -> CryptoResult<String> {
        Ok(hex::encode(self.encrypt(plaintext)?))
    }

    /// Hex-decodes and decrypts `encoded`.
    fn decrypt_hex(&self, encoded: &str) -> CryptoResult<Vec<u8>> {
        let bytes = hex::decode(encoded.trim()).map_err(CryptoError::from)?;
        self.decrypt(&bytes)
    }
}

/// No-op encryptor for tests. Data passes through unchanged.
pub struct PassthroughEncryptor;

impl Encryptor for PassthroughEncryptor {
    fn encrypt(&self, plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
        Ok(plaintext.to_vec())
    }

    fn decrypt(&self, ciphertext: &[u8]) -> CryptoResult<Vec<u8>> {
        Ok(ciphertext.to_vec())
    }
}
