//! Remote license store interface.
//!
//! The store owns the `licenses` and device-binding tables. This crate only
//! consumes it; `seatguard-cloud` provides the HTTP implementation.

use crate::license::{DeviceBinding, License};
use async_trait::async_trait;
use thiserror::Error;

/// Failures reported by a [`RemoteStore`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Name resolution, connection refused/reset, or any other send failure.
    #[error("connection failed: {0}")]
    Connect(String),

    /// The request did not complete within the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// The store answered with a server-side fault.
    #[error("upstream fault (HTTP {status}): {message}")]
    Upstream { status: u16, message: String },

    /// The response body could not be decoded.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// The store refused the request (bad credentials, bad query).
    #[error("request rejected (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    /// No store is configured, so no request could be made.
    #[error("store not configured: {0}")]
    NotConfigured(String),
}

impl StoreError {
    /// Returns true if this failure is indistinguishable from an outage.
    ///
    /// Malformed and upstream faults count as transport failures, so a
    /// broken store yields offline grace rather than a rejection.
    pub fn is_transport(&self) -> bool {
        !matches!(
            self,
            StoreError::Rejected { .. } | StoreError::NotConfigured(_)
        )
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Remote license and device-binding store.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetches a license by key.
    async fn get_license(&self, license_key: &str) -> StoreResult<Option<License>>;

    /// Fetches the binding for a device, independent of license.
    async fn get_binding(&self, hwid: &str) -> StoreResult<Option<DeviceBinding>>;

    /// Lists the active bindings held by a license.
    async fn get_active_bindings_for_license(
        &self,
        license_key: &str,
    ) -> StoreResult<Vec<DeviceBinding>>;

    /// Creates an active binding between a device and a license.
    async fn create_binding(
        &self,
        hwid: &str,
        license_key: &str,
        device_name: &str,
    ) -> StoreResult<DeviceBinding>;
}
