//! Remote license store client for Seatguard.
//!
//! Talks to a PostgREST-style document store holding two tables:
//! - `licenses`: one row per license key
//! - `hwid`: one row per device binding
//!
//! Failures are classified into [`StoreError`](seatguard_license::StoreError)
//! so the validator can tell an outage from a refusal.

mod client;
mod config;
mod error;

pub use client::RestLicenseStore;
pub use config::RestStoreConfig;
pub use error::{CloudError, CloudResult};
