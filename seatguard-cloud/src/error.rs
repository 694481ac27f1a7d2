//! Cloud client error types.

use seatguard_license::StoreError;
use thiserror::Error;

/// Result type for cloud client setup.
pub type CloudResult<T> = Result<T, CloudError>;

/// Errors raised while building a store client.
#[derive(Debug, Error)]
pub enum CloudError {
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Classifies a failed request the way the validator expects.
pub(crate) fn classify_send_error(err: reqwest::Error) -> StoreError {
    if err.is_timeout() {
        StoreError::Timeout
    } else if err.is_decode() {
        StoreError::Malformed(err.to_string())
    } else {
        StoreError::Connect(err.to_string())
    }
}

/// Classifies a non-success HTTP status.
///
/// Server faults, timeouts and rate limits look like an outage; any other
/// client error means the store refused us.
pub(crate) fn classify_status(status: u16, message: String) -> StoreError {
    match status {
        408 | 429 | 500..=599 => StoreError::Upstream { status, message },
        _ => StoreError::Rejected { status, message },
    }
}
