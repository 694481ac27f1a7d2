//! License and device-binding records as held by the remote store.
//!
//! Records use the store's snake_case column names:
//! - `license_key`, `status`, `package_type`, `expiry_date`, `email`, `name`
//! - `hwid`, `license_key`, `active`, `device_name`

use crate::error::{LicenseError, LicenseResult};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// The license package tier (aligned with the store's `package_type`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PackageType {
    /// Trial (single device, short duration).
    Trial,
    /// Starter tier.
    Starter,
    /// Pro tier.
    Pro,
    /// Agency tier.
    Agency,
    /// Any tier this build does not recognise.
    #[default]
    Unknown,
}

impl PackageType {
    /// Returns the maximum number of simultaneously active devices.
    ///
    /// Unrecognised tiers get the largest quota.
    #[must_use]
    pub fn device_quota(&self) -> u32 {
        match self {
            Self::Trial => 1,
            Self::Starter => 2,
            Self::Pro => 5,
            Self::Agency => 15,
            Self::Unknown => 15,
        }
    }

    /// Returns the upper-case tier name used by the store.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trial => "TRIAL",
            Self::Starter => "STARTER",
            Self::Pro => "PRO",
            Self::Agency => "AGENCY",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl From<String> for PackageType {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "TRIAL" => Self::Trial,
            "STARTER" => Self::Starter,
            "PRO" => Self::Pro,
            "AGENCY" => Self::Agency,
            _ => Self::Unknown,
        }
    }
}

impl From<PackageType> for String {
    fn from(value: PackageType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for PackageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Administrative status of a license.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LicenseStatus {
    /// License may be used.
    Active,
    /// Anything other than `active`, including no status at all.
    #[default]
    Disabled,
}

impl From<String> for LicenseStatus {
    fn from(value: String) -> Self {
        if value.trim().eq_ignore_ascii_case("active") {
            Self::Active
        } else {
            Self::Disabled
        }
    }
}

impl From<LicenseStatus> for String {
    fn from(value: LicenseStatus) -> Self {
        match value {
            LicenseStatus::Active => "active".to_string(),
            LicenseStatus::Disabled => "disabled".to_string(),
        }
    }
}

/// A license record from the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct License {
    /// Opaque unique key, immutable once issued.
    pub license_key: String,
    /// Administrative status; missing or null reads as disabled.
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: LicenseStatus,
    /// Package tier, which determines the device quota.
    #[serde(default, deserialize_with = "null_as_default")]
    pub package_type: PackageType,
    /// Expiry instant; `None` never expires.
    ///
    /// Accepts RFC 3339, zone-less timestamps and bare dates; the latter
    /// two are taken as UTC.
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub expiry_date: Option<DateTime<Utc>>,
    /// Owner email (display only).
    #[serde(default)]
    pub email: Option<String>,
    /// Owner name (display only).
    #[serde(default)]
    pub name: Option<String>,
}

impl License {
    /// Checks that the license is active and not expired at `now`.
    ///
    /// A license whose expiry equals `now` is already expired.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::LicenseDisabled`] or [`LicenseError::LicenseExpired`].
    pub fn check_usable(&self, now: DateTime<Utc>) -> LicenseResult<()> {
        if self.status != LicenseStatus::Active {
            return Err(LicenseError::LicenseDisabled);
        }
        match self.expiry_date {
            Some(expiry) if expiry <= now => Err(LicenseError::LicenseExpired(expiry)),
            _ => Ok(()),
        }
    }

    /// Returns true if the license is usable at `now`.
    #[must_use]
    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        self.check_usable(now).is_ok()
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    parse_timestamp(raw)
        .map(Some)
        .ok_or_else(|| serde::de::Error::custom(format!("unrecognised timestamp: {raw}")))
}

/// Parses the timestamp shapes a SQL store hands out.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    // Postgres `timestamptz` text form, e.g. `2025-01-01 00:00:00+00`.
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// A device binding record from the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceBinding {
    /// Machine identifier, unique across the table.
    pub hwid: String,
    /// The license this device is bound to.
    pub license_key: String,
    /// Inactive bindings neither count against quota nor authorize use.
    pub active: bool,
    /// Display name, usually the hostname.
    #[serde(default)]
    pub device_name: Option<String>,
}

/// License details exposed to the rest of the application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseInfo {
    pub license_key: String,
    pub package_type: PackageType,
    pub email: Option<String>,
    pub name: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl LicenseInfo {
    /// Name to greet the owner with: name, then email, then "N/A".
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.is_empty() && *n != "N/A")
            .or(self.email.as_deref())
            .unwrap_or("N/A")
    }
}
