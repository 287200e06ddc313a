//! Payload encryption using ChaCha20-Poly1305.
//!
//! Ciphertexts are self-contained: `nonce || ciphertext || tag`. A fresh
//! random nonce is drawn for every call, so encrypting the same plaintext
//! twice never yields the same bytes.

use crate::encryptor::Encryptor;
use crate::error::{CryptoError, CryptoResult};
use crate::key::CipherKey;
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use rand::RngCore;

/// Size of nonce in bytes (96 bits for ChaCha20-Poly1305).
pub const NONCE_SIZE: usize = 12;

/// Size of authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

/// Encrypts plaintext, returning the nonce-prefixed ciphertext.
pub fn encrypt(key: &CipherKey, plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
    let cipher = ChaCha20Poly1305::new(key.as_bytes().into());

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;

    let mut out = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Decrypts a nonce-prefixed ciphertext produced by [`encrypt`].
///
/// Fails if the input is too short to carry a nonce and tag, or if
/// authentication fails (wrong key or tampered data).
pub fn decrypt(key: &CipherKey, data: &[u8]) -> CryptoResult<Vec<u8>> {
    if data.len() < NONCE_SIZE {
        return Err(CryptoError::Decryption(format!(
            "ciphertext too short: {} bytes, nonce alone is {NONCE_SIZE}",
            data.len()
        )));
    }
    if data.len() < NONCE_SIZE + TAG_SIZE {
        return Err(CryptoError::Decryption(
            "ciphertext too short to carry an authentication tag".to_string(),
        ));
    }

    let (nonce_bytes, ciphertext) = data.split_at(NONCE_SIZE);
    let cipher = ChaCha20Poly1305::new(key.as_bytes().into());

    cipher
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|_| {
            CryptoError::Decryption("decryption failed (wrong key or tampered data)".to_string())
        })
}

/// Encrypts plaintext and hex-encodes the result, for header-borne values.
pub fn encrypt_hex(key: &CipherKey, plaintext: &[u8]) -> CryptoResult<String> {
    Ok(hex::encode(encrypt(key, plaintext)?))
}

/// Decodes and decrypts a value produced by [`encrypt_hex`].
pub fn decrypt_hex(key: &CipherKey, encoded: &str) -> CryptoResult<Vec<u8>> {
    let bytes = hex::decode(encoded.trim())?;
    decrypt(key, &bytes)
}

/// An [`Encryptor`] backed by a provisioned [`CipherKey`].
#[derive(Clone, Debug)]
pub struct Cipher {
    key: CipherKey,
}

impl Cipher {
    /// Creates a cipher owning the given key.
    pub fn new(key: CipherKey) -> Self {
        Self { key }
    }
}

impl Encryptor for Cipher {
    fn encrypt(&self, plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
        encrypt(&self.key, plaintext)
    }

    fn decrypt(&self, ciphertext: &[u8]) -> CryptoResult<Vec<u8>> {
        decrypt(&self.key, ciphertext)
    }
}
