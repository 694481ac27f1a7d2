//! Device identity for license binding.
//!
//! The HWID is the SHA-256 of the platform machine id, which survives
//! reboots and hostname changes. Machines without a readable machine id
//! fall back to a hash of OS, architecture, hostname and user.

use crate::error::LicenseResult;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::env;
use tracing::warn;

/// Source of the current machine's identifier.
pub trait DeviceIdentity: Send + Sync {
    /// Returns the stable, opaque HWID of this machine.
    fn current(&self) -> LicenseResult<String>;

    /// Returns a human-readable device name for binding records.
    fn device_name(&self) -> String {
        get_hostname()
    }
}

/// Where a machine's HWID was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HwidSource {
    /// The platform machine id.
    MachineId,
    /// OS, architecture, hostname and user.
    HostProperties,
}

/// Diagnostic view of the current device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub os_name: String,
    pub os_version: String,
    pub arch: String,
    pub hostname: String,
    pub hwid_source: HwidSource,
}

impl DeviceInfo {
    /// Collects information about the current device.
    #[must_use]
    pub fn collect() -> Self {
        Self {
            os_name: env::consts::OS.to_string(),
            os_version: get_os_version(),
            arch: env::consts::ARCH.to_string(),
            hostname: get_hostname(),
            hwid_source: hwid_material().0,
        }
    }
}

/// HWID derived from the platform machine id.
#[derive(Debug, Clone, Copy, Default)]
pub struct MachineIdentity;

impl DeviceIdentity for MachineIdentity {
    fn current(&self) -> LicenseResult<String> {
        let (source, material) = hwid_material();
        if source == HwidSource::HostProperties {
            warn!("machine id unavailable; deriving HWID from host properties");
        }

        let mut hasher = Sha256::new();
        hasher.update(material.as_bytes());
        Ok(hex::encode(hasher.finalize()))
    }
}

fn hwid_material() -> (HwidSource, String) {
    match get_machine_id() {
        Some(id) => (HwidSource::MachineId, id),
        None => (HwidSource::HostProperties, host_properties().join("|")),
    }
}

fn host_properties() -> Vec<String> {
    let mut props = vec![
        env::consts::OS.to_string(),
        env::consts::ARCH.to_string(),
        get_hostname(),
    ];
    if let Ok(user) = env::var("USER").or_else(|_| env::var("USERNAME")) {
        props.push(user);
    }
    props
}

fn get_hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string())
}

fn get_os_version() -> String {
    #[cfg(target_os = "macos")]
    {
        command_output("sw_vers", &["-productVersion"])
    }

    #[cfg(target_os = "windows")]
    {
        command_output("cmd", &["/C", "ver"])
    }

    #[cfg(target_os = "linux")]
    {
        std::fs::read_to_string("/etc/os-release")
            .ok()
            .and_then(|release| {
                release
                    .lines()
                    .find_map(|l| l.strip_prefix("VERSION_ID="))
                    .map(|v| v.trim_matches('"').to_string())
            })
            .or_else(|| {
                std::fs::read_to_string("/proc/sys/kernel/osrelease")
                    .ok()
                    .map(|v| v.trim().to_string())
            })
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "unknown".to_string())
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows", target_os = "linux")))]
    {
        "unknown".to_string()
    }
}

#[cfg(any(target_os = "macos", target_os = "windows"))]
fn command_output(program: &str, args: &[&str]) -> String {
    std::process::Command::new(program)
        .args(args)
        .output()
        .ok()
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Gets the platform machine id, if one can be read.
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

    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("reg")
            .args([
                "query",
                r"HKEY_LOCAL_MACHINE\SOFTWARE\Microsoft\Cryptography",
                "/v",
                "MachineGuid",
            ])
            .output()
            .ok()
            .and_then(|o| String::from_utf8(o.stdout).ok())
            .and_then(|output| {
                output
                    .lines()
                    .find(|l| l.contains("MachineGuid"))
                    .and_then(|l| l.split_whitespace().last())
                    .map(|s| s.to_lowercase())
            })
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows", target_os = "linux")))]
    {
        None
    }
}
