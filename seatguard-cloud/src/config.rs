//! Store client configuration.

use serde::{Deserialize, Serialize};

/// Connection settings for the remote license store.
///
/// Passed explicitly to [`RestLicenseStore::new`](crate::RestLicenseStore::new);
/// nothing is read from the environment here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestStoreConfig {
    /// Base URL of the store (e.g. `https://db.example.com`).
    pub base_url: String,
    /// API key sent as `apikey` and bearer token.
    pub api_key: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Table holding license rows.
    #[serde(default = "default_licenses_table")]
    pub licenses_table: String,
    /// Table holding device-binding rows.
    #[serde(default = "default_bindings_table")]
    pub bindings_table: String,
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_licenses_table() -> String {
    "licenses".to_string()
}

fn default_bindings_table() -> String {
    "hwid".to_string()
}

impl RestStoreConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            timeout_secs: default_timeout_secs(),
            licenses_table: default_licenses_table(),
            bindings_table: default_bindings_table(),
        }
    }
}
