//! Error types for the licensing module.

use crate::store::StoreError;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Licensing-specific errors.
#[derive(Debug, Clone, Error)]
pub enum LicenseError {
    /// No license exists for the supplied key.
    #[error("license not found: {0}")]
    LicenseNotFound(String),

    /// License was disabled by an administrator.
    #[error("license is disabled by administrator")]
    LicenseDisabled,

    /// License has expired.
    #[error("license expired on {}", .0.format("%Y-%m-%d"))]
    LicenseExpired(DateTime<Utc>),

    /// This device's binding exists but was deactivated.
    #[error("device {0} is deactivated by administrator")]
    DeviceDeactivated(String),

    /// Device quota for the license tier is used up.
    #[error("device limit reached ({active}/{quota})")]
    QuotaExceeded { active: u32, quota: u32 },

    /// Cached license belongs to a different machine.
    #[error("HWID mismatch: license is bound to a different machine")]
    HwidMismatch,

    /// The activated license could not be persisted.
    #[error("failed to write license cache: {0}")]
    CacheWriteFailed(String),

    /// Cached license is unreadable or fails its integrity check.
    #[error("license cache corrupted: {0}")]
    CacheCorrupted(String),

    /// Remote store unreachable or returned an opaque fault.
    #[error("transport error: {0}")]
    Transport(StoreError),

    /// Remote store refused the request outright.
    #[error("license server rejected the request: {0}")]
    StoreRejected(StoreError),

    /// Offline grace ran past the configured bound.
    #[error("license not validated since {last_validated}; offline grace exhausted")]
    OfflineGraceExhausted { last_validated: DateTime<Utc> },

    /// No license cache and prompting was not allowed.
    #[error("license not activated")]
    NotActivated,

    /// The key prompt produced no license key.
    #[error("license key is required to run this application")]
    MissingLicenseKey,

    /// The machine identifier could not be determined.
    #[error("failed to get machine HWID: {0}")]
    DeviceIdentity(String),
}

impl LicenseError {
    /// Returns true for failures that must not be retried within this run.
    pub fn is_definitive(&self) -> bool {
        !self.is_recoverable()
    }

    /// Returns true for failures that are absorbed into offline grace.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, LicenseError::Transport(_))
    }
}

impl From<StoreError> for LicenseError {
    fn from(err: StoreError) -> Self {
        if err.is_transport() {
            LicenseError::Transport(err)
        } else {
            LicenseError::StoreRejected(err)
        }
    }
}

/// Result type for license operations.
pub type LicenseResult<T> = Result<T, LicenseError>;
