mod common;

use chrono::{Duration, Utc};
use common::test_cipher;
use custodian_license::{
    signature, Authority, License, LicenseDirectory, LicenseDraft, LicenseError, LicenseSecret,
    MemoryDirectory, ValidationRequest, ValidationResponse, STATUS_FORBIDDEN, STATUS_OK,
};
use pretty_assertions::assert_eq;

fn authority() -> Authority<MemoryDirectory> {
    Authority::new(MemoryDirectory::new(), test_cipher())
}

fn draft(device_id: &str) -> LicenseDraft {
    LicenseDraft::new(device_id, Utc::now() + Duration::days(30)).services(["telemetry"])
}

// ── Issuance ────────────────────────────────────────────────────

#[tokio::test]
async fn issue_fills_identity_and_audit_fields() {
    let authority = authority();
    let license = authority.issue("admin", draft("device-1")).await.unwrap();

    assert!(!license.id.is_empty());
    assert!(!license.key.is_empty());
    assert_eq!(license.issuer, "admin");
    assert_eq!(license.updated_by, "admin");
    assert_eq!(license.updated_at, license.created_at);
    assert!(license.active);
    assert_eq!(license.services, vec!["telemetry".to_string()]);

    let stored = authority.directory().by_id(&license.id).await.unwrap();
    assert_eq!(stored, license);
}

#[tokio::test]
async fn issue_keeps_preassigned_id_and_key() {
    let authority = authority();
    let mut d = draft("device-1");
    d.id = Some("lic-fixed".to_string());
    d.key = Some(LicenseSecret::new("preshared"));

    let license = authority.issue("admin", d).await.unwrap();
    assert_eq!(license.id, "lic-fixed");
    assert_eq!(license.key, LicenseSecret::new("preshared"));
}

#[tokio::test]
async fn issue_requires_device() {
    let err = authority().issue("admin", draft("")).await.unwrap_err();
    assert!(matches!(err, LicenseError::MalformedEntity(msg) if msg.contains("device id")));
}

#[tokio::test]
async fn one_license_per_device() {
    let authority = authority();
    authority.issue("admin", draft("device-1")).await.unwrap();
    assert!(matches!(
        authority.issue("admin", draft("device-1")).await,
        Err(LicenseError::Conflict(_))
    ));
}

#[tokio::test]
async fn unknown_lookups_are_not_found() {
    let authority = authority();
    assert!(matches!(
        authority.directory().by_id("missing").await,
        Err(LicenseError::NotFound(_))
    ));
    assert!(matches!(
        authority.directory().by_device("missing").await,
        Err(LicenseError::NotFound(_))
    ));
}

// ── Fetch ───────────────────────────────────────────────────────

#[tokio::test]
async fn fetch_for_device_returns_encrypted_license() {
    let authority = authority();
    let cipher = test_cipher();
    let issued = authority.issue("admin", draft("device-1")).await.unwrap();

    let credential = cipher.encrypt_hex(b"device-1").unwrap();
    let blob = authority.fetch_for_device(&credential).await.unwrap();
    let license = License::from_json(&cipher.decrypt(&blob).unwrap()).unwrap();
    assert_eq!(license, issued);
}

#[tokio::test]
async fn fetch_for_unknown_device_is_not_found() {
    let authority = authority();
    let credential = test_cipher().encrypt_hex(b"device-9").unwrap();
    assert!(matches!(
        authority.fetch_for_device(&credential).await,
        Err(LicenseError::NotFound(_))
    ));
}

#[tokio::test]
async fn fetch_with_garbage_credential_is_crypto_error() {
    assert!(matches!(
        authority().fetch_for_device("not-hex").await,
        Err(LicenseError::Crypto(_))
    ));
}

#[tokio::test]
async fn fetch_for_deactivated_license_is_refused() {
    let authority = authority();
    let mut d = draft("device-1");
    d.active = false;
    authority.issue("admin", d).await.unwrap();

    let credential = test_cipher().encrypt_hex(b"device-1").unwrap();
    assert!(matches!(
        authority.fetch_for_device(&credential).await,
        Err(LicenseError::NotActive)
    ));
}

#[tokio::test]
async fn fetch_with_matching_key_returns_license() {
    let authority = authority();
    let cipher = test_cipher();
    let issued = authority.issue("admin", draft("device-1")).await.unwrap();

    let credential = cipher.encrypt_hex(issued.key.expose()).unwrap();
    let blob = authority.fetch_with_key("device-1", &credential).await.unwrap();
    let license = License::from_json(&cipher.decrypt(&blob).unwrap()).unwrap();
    assert_eq!(license, issued);
}

#[tokio::test]
async fn fetch_with_wrong_key_is_unauthorized() {
    let authority = authority();
    let cipher = test_cipher();
    authority.issue("admin", draft("device-1")).await.unwrap();
    let other = authority.issue("admin", draft("device-2")).await.unwrap();

    let credential = cipher.encrypt_hex(other.key.expose()).unwrap();
    assert!(matches!(
        authority.fetch_with_key("device-1", &credential).await,
        Err(LicenseError::Unauthorized)
    ));

    let empty = cipher.encrypt_hex(b"").unwrap();
    assert!(matches!(
        authority.fetch_with_key("device-1", &empty).await,
        Err(LicenseError::Unauthorized)
    ));
}

#[tokio::test]
async fn fetch_with_key_checks_key_before_validity() {
    let authority = authority();
    let cipher = test_cipher();
    let mut d = draft("device-1");
    d.active = false;
    d.key = Some(LicenseSecret::new("preshared"));
    authority.issue("admin", d).await.unwrap();

    let wrong = cipher.encrypt_hex(b"guess").unwrap();
    assert!(matches!(
        authority.fetch_with_key("device-1", &wrong).await,
        Err(LicenseError::Unauthorized)
    ));

    let right = cipher.encrypt_hex(b"preshared").unwrap();
    assert!(matches!(
        authority.fetch_with_key("device-1", &right).await,
        Err(LicenseError::NotActive)
    ));
}

#[tokio::test]
async fn fetch_with_key_for_unknown_device_is_not_found() {
    let credential = test_cipher().encrypt_hex(b"anything").unwrap();
    assert!(matches!(
        authority().fetch_with_key("device-9", &credential).await,
        Err(LicenseError::NotFound(_))
    ));
}

// ── Validation ──────────────────────────────────────────────────

#[tokio::test]
async fn validate_with_device_tag_returns_envelope() {
    let authority = authority();
    let license = authority.issue("admin", draft("device-1")).await.unwrap();

    let envelope = authority
        .validate("telemetry", "device-1", &license.device_tag())
        .await
        .unwrap();

    let material = license.to_json().unwrap();
    assert!(signature::verify(license.key.expose(), &material, &envelope));
}

#[tokio::test]
async fn validate_rejects_tampered_tag() {
    let authority = authority();
    let license = authority.issue("admin", draft("device-1")).await.unwrap();
    let mut tag = license.device_tag();
    tag[0] ^= 0x80;

    assert!(matches!(
        authority.validate("telemetry", "device-1", &tag).await,
        Err(LicenseError::InvalidSignature)
    ));
}

#[tokio::test]
async fn validate_rejects_unlisted_service() {
    let authority = authority();
    let license = authority.issue("admin", draft("device-1")).await.unwrap();
    assert!(matches!(
        authority
            .validate("billing", "device-1", &license.device_tag())
            .await,
        Err(LicenseError::ServiceNotEntitled(_))
    ));
}

#[tokio::test]
async fn answer_allows_with_signature() {
    let authority = authority();
    let cipher = test_cipher();
    let license = authority.issue("admin", draft("device-1")).await.unwrap();

    let blob = ValidationRequest::new("telemetry", "device-1")
        .with_tag(&license.device_tag())
        .seal(cipher.as_ref())
        .unwrap();
    let answer = ValidationResponse::open(cipher.as_ref(), &authority.answer(&blob).await.unwrap())
        .unwrap();

    assert_eq!(answer.status, STATUS_OK);
    let envelope = signature::decode_tag(answer.signature.as_deref().unwrap()).unwrap();
    assert!(signature::verify(license.key.expose(), &license.to_json().unwrap(), &envelope));
}

#[tokio::test]
async fn answer_forbids_wrong_device_tag() {
    let authority = authority();
    let cipher = test_cipher();
    authority.issue("admin", draft("device-1")).await.unwrap();
    let other = authority.issue("admin", draft("device-2")).await.unwrap();

    let blob = ValidationRequest::new("telemetry", "device-1")
        .with_tag(&other.device_tag())
        .seal(cipher.as_ref())
        .unwrap();
    let answer = ValidationResponse::open(cipher.as_ref(), &authority.answer(&blob).await.unwrap())
        .unwrap();

    assert_eq!(answer.status, STATUS_FORBIDDEN);
    assert_eq!(answer.message, "invalid signature");
    assert!(answer.signature.is_none());
}

#[tokio::test]
async fn answer_requires_tag() {
    let authority = authority();
    let blob = ValidationRequest::new("telemetry", "device-1")
        .seal(test_cipher().as_ref())
        .unwrap();
    assert!(matches!(
        authority.answer(&blob).await,
        Err(LicenseError::MalformedEntity(_))
    ));
}
