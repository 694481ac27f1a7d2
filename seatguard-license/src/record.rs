//! The locally persisted license record.

use crate::license::{License, LicenseInfo, PackageType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Last-known-good license state kept on this machine.
///
/// Field order is the canonical signing order; do not reorder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalCacheRecord {
    pub license_key: String,
    pub package_type: PackageType,
    pub email: Option<String>,
    pub name: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub hwid: String,
    pub activated_at: DateTime<Utc>,
    pub last_validated: DateTime<Utc>,
}

impl LocalCacheRecord {
    /// Builds a freshly activated record for `license` on device `hwid`.
    #[must_use]
    pub fn activated(license: &License, hwid: &str, now: DateTime<Utc>) -> Self {
        Self {
            license_key: license.license_key.clone(),
            package_type: license.package_type,
            email: license.email.clone(),
            name: license.name.clone(),
            expires_at: license.expiry_date,
            hwid: hwid.to_string(),
            activated_at: now,
            last_validated: now,
        }
    }

    /// Marks a successful remote re-check at `now`.
    ///
    /// `last_validated` never moves backwards.
    pub fn mark_validated(&mut self, now: DateTime<Utc>) {
        if now > self.last_validated {
            self.last_validated = now;
        }
    }

    /// Takes tier, owner and expiry from a freshly fetched `license` and
    /// marks it validated at `now`. Key, HWID and activation time stay.
    pub fn refresh(&mut self, license: &License, now: DateTime<Utc>) {
        self.package_type = license.package_type;
        self.email = license.email.clone();
        self.name = license.name.clone();
        self.expires_at = license.expiry_date;
        self.mark_validated(now);
    }

    /// Projects the caller-visible license details.
    #[must_use]
    pub fn info(&self) -> LicenseInfo {
        LicenseInfo {
            license_key: self.license_key.clone(),
            package_type: self.package_type,
            email: self.email.clone(),
            name: self.name.clone(),
            expires_at: self.expires_at,
        }
    }
}

/// On-disk layout: the record's fields followed by its integrity tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedRecord {
    #[serde(flatten)]
    pub record: LocalCacheRecord,
    pub signature: String,
}
