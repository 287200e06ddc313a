//! Device identification for license binding.
//!
//! Generates a stable identifier for this machine, used as the agent's
//! credential towards the authority when none is configured explicitly.

use sha2::{Digest, Sha256};
use std::env;

/// A stable identifier for this device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceFingerprint {
    /// Hex of the first 16 bytes of a SHA-256 over hardware identifiers.
    id: String,
}

impl DeviceFingerprint {
    /// Generates a fingerprint for the current device.
    ///
    /// Combines several identifiers into an id that survives reboots but
    /// changes if the hardware or OS installation changes.
    #[must_use]
    pub fn generate() -> Self {
        let combined = collect_hardware_ids().join("|");
        let hash = Sha256::digest(combined.as_bytes());

        Self {
            id: hex::encode(&hash[..16]),
        }
    }

    /// Returns the fingerprint id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Collects hardware identifiers for fingerprinting.
fn collect_hardware_ids() -> Vec<String> {
    let mut ids = vec![
        env::consts::OS.to_string(),
        env::consts::ARCH.to_string(),
        get_hostname(),
    ];

    if let Some(machine_id) = get_machine_id() {
        ids.push(machine_id);
    }

    if let Some(mac) = get_ethernet_address() {
        ids.push(mac);
    }

    ids
}

/// Gets the machine hostname.
fn get_hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Gets the machine ID (platform-specific unique identifier).
fn get_machine_id() -> Option<String> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("ioreg")
            .args(["-rd1", "-c", "IOPlatformExpertDevice"])
            .output()
            .ok()
            .and_then(|o| String::from_utf8(o.stdout).ok())
            .and_then(|output| {
                output
                    .lines()
                    .find(|l| l.contains("IOPlatformUUID"))
                    .and_then(|l| l.split('"').nth(3))
                    .map(String::from)
            })
    }

    #[cfg(target_os = "linux")]
    {
        std::fs::read_to_string("/etc/machine-id")
            .or_else(|_| std::fs::read_to_string("/var/lib/dbus/machine-id"))
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    {
        None
    }
}

/// Gets the hardware address of the first wired interface (by name).
fn get_ethernet_address() -> Option<String> {
    #[cfg(target_os = "linux")]
    {
        let mut names: Vec<String> = std::fs::read_dir("/sys/class/net")
            .ok()?
            .filter_map(|entry| entry.ok()?.file_name().into_string().ok())
            .filter(|name| name.starts_with('e'))
            .collect();
        names.sort();

        names.iter().find_map(|name| {
            std::fs::read_to_string(format!("/sys/class/net/{name}/address"))
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty() && s != "00:00:00:00:00:00")
        })
    }

    #[cfg(not(target_os = "linux"))]
    {
        None
    }
}
