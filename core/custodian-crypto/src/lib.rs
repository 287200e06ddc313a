//! Encryption layer for the license custodian.
//!
//! Everything that leaves the agent or lands on disk goes through here:
//! the cached license file, the fetch credential, and validation
//! request/response blobs.
//!
//! # Design Principles
//!
//! - **Provisioned keys**: the symmetric key comes from configuration
//!   (hex string, key file, or environment), never from the binary.
//! - **Fresh nonce per message**: every ciphertext carries its own random
//!   nonce as a prefix.
//! - **Authenticated**: tampered or truncated ciphertexts fail to decrypt.

mod cipher;
mod encryptor;
mod error;
mod key;

pub use cipher::{decrypt, decrypt_hex, encrypt, encrypt_hex, Cipher, NONCE_SIZE, TAG_SIZE};
pub use encryptor::{Encryptor, PassthroughEncryptor};
pub use error::{CryptoError, CryptoResult};
pub use key::{CipherKey, KEY_SIZE};
