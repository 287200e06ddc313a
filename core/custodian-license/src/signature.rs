//! HMAC-SHA256 tags binding a license secret to a device or payload.
//!
//! Verification goes through `Mac::verify_slice`, and raw secrets through
//! `subtle`, so both compare in constant time.

use crate::error::{LicenseError, LicenseResult};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Length of a tag in bytes.
pub const TAG_LEN: usize = 32;

fn mac(key: &[u8]) -> HmacSha256 {
    <HmacSha256 as Mac>::new_from_slice(key).expect("HMAC accepts keys of any length")
}

/// Computes `HMAC-SHA256(key, material)`.
#[must_use]
pub fn sign(key: &[u8], material: &[u8]) -> Vec<u8> {
    let mut mac = mac(key);
    mac.update(material);
    mac.finalize().into_bytes().to_vec()
}

/// Returns true iff `tag` is the MAC of `material` under `key`.
#[must_use]
pub fn verify(key: &[u8], material: &[u8], tag: &[u8]) -> bool {
    let mut mac = mac(key);
    mac.update(material);
    mac.verify_slice(tag).is_ok()
}

/// Verifies a device-binding tag, mapping a mismatch to
/// [`LicenseError::InvalidSignature`].
pub fn verify_device(key: &[u8], device_id: &str, tag: &[u8]) -> LicenseResult<()> {
    if verify(key, device_id.as_bytes(), tag) {
        Ok(())
    } else {
        Err(LicenseError::InvalidSignature)
    }
}

/// Compares two secrets in constant time. Only the lengths may leak.
#[must_use]
pub fn secrets_equal(presented: &[u8], expected: &[u8]) -> bool {
    presented.ct_eq(expected).into()
}

/// Decodes a hex tag as carried on the wire.
pub fn decode_tag(encoded: &str) -> LicenseResult<Vec<u8>> {
    let tag = hex::decode(encoded.trim())
        .map_err(|e| LicenseError::MalformedEntity(format!("invalid tag encoding: {e}")))?;
    if tag.len() != TAG_LEN {
        return Err(LicenseError::MalformedEntity(format!(
            "invalid tag length: expected {TAG_LEN}, got {}",
            tag.len()
        )));
    }
    Ok(tag)
}
