use clap::Parser;
use custodian_agent::config::Config;
use custodian_crypto::CipherKey;
use std::path::PathBuf;
use std::time::Duration;

const KEY_HEX: &str = "0101010101010101010101010101010101010101010101010101010101010101";

fn parse(extra: &[&str]) -> Config {
    let mut args = vec!["custodian-agent", "--authority-url", "http://authority.local/licenses"];
    args.extend_from_slice(extra);
    Config::try_parse_from(args).unwrap()
}

#[test]
fn defaults_apply() {
    let config = parse(&[]);

    assert_eq!(config.port, 7070);
    assert_eq!(config.retry_interval(), Duration::from_secs(1));
    assert_eq!(config.request_timeout(), Duration::from_secs(30));
    assert_eq!(config.log_level, "info");
    assert!(config.delegate_url.is_none());
    assert!(config.cache_path().ends_with("custodian/license.bin"));
}

#[test]
fn explicit_values_override_defaults() {
    let config = parse(&[
        "--cache-path",
        "/tmp/custodian/license.bin",
        "--device-id",
        "device-7",
        "--port",
        "9000",
        "--retry-interval-ms",
        "250",
        "--delegate-url",
        "http://delegate.local/validate",
    ]);

    assert_eq!(config.cache_path(), PathBuf::from("/tmp/custodian/license.bin"));
    assert_eq!(config.device_id(), "device-7");
    assert_eq!(config.port, 9000);
    assert_eq!(config.retry_interval(), Duration::from_millis(250));
    assert_eq!(config.delegate_url.as_deref(), Some("http://delegate.local/validate"));
}

#[test]
fn missing_authority_url_is_an_error() {
    assert!(Config::try_parse_from(["custodian-agent"]).is_err());
}

#[test]
fn key_from_hex() {
    let config = parse(&["--key", KEY_HEX]);
    let key = config.cipher_key().unwrap();
    assert_eq!(key.as_bytes(), CipherKey::from_bytes([1u8; 32]).as_bytes());
}

#[test]
fn key_from_file() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("agent.key");
    std::fs::write(&path, format!("{KEY_HEX}\n")).unwrap();

    let config = parse(&["--key-file", path.to_str().unwrap()]);
    let key = config.cipher_key().unwrap();
    assert_eq!(key.as_bytes(), &[1u8; 32]);
}

#[test]
fn key_and_key_file_conflict() {
    let args = [
        "custodian-agent",
        "--authority-url",
        "http://authority.local",
        "--key",
        KEY_HEX,
        "--key-file",
        "agent.key",
    ];
    assert!(Config::try_parse_from(args).is_err());
}

#[test]
fn missing_key_is_reported() {
    let err = parse(&[]).cipher_key().unwrap_err();
    assert!(err.to_string().contains("no cipher key"));
}

#[test]
fn short_key_is_rejected() {
    assert!(parse(&["--key", "abcd"]).cipher_key().is_err());
}

#[test]
fn detected_device_id_is_stable() {
    let config = parse(&[]);
    assert_eq!(config.device_id(), config.device_id());
    assert_eq!(config.device_id().len(), 32);
}

#[test]
fn debug_output_redacts_key() {
    let config = parse(&["--key", KEY_HEX]);
    let debug = format!("{config:?}");
    assert!(!debug.contains(KEY_HEX));
    assert!(debug.contains("[REDACTED]"));
    assert!(debug.contains("authority.local"));
}
