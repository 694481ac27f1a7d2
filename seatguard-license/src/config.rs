//! Validator configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Cooldown between remote re-checks (one hour).
pub const DEFAULT_COOLDOWN_SECS: u64 = 60 * 60;

/// Tuning for [`LicenseValidator`](crate::LicenseValidator).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// A cache validated within this window is trusted without a remote call.
    pub cooldown: Duration,
    /// Non-interactive worker mode: never re-check remotely once activated.
    pub lean: bool,
    /// Upper bound on offline grace. `None` keeps grace open indefinitely.
    pub max_offline_grace: Option<Duration>,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            cooldown: Duration::from_secs(DEFAULT_COOLDOWN_SECS),
            lean: false,
            max_offline_grace: None,
        }
    }
}
