//! Command-line front end for Seatguard licensing.
//!
//! Argument parsing and command execution live here so they can be driven
//! from tests; `main.rs` only installs logging and calls [`run`].

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use seatguard_cloud::{RestLicenseStore, RestStoreConfig};
use seatguard_license::{
    CanonicalSigner, DeviceBinding, DeviceIdentity, DeviceInfo, KeyProvider, License,
    LicenseCache, LicenseInfo, LicenseValidator, MachineIdentity, NoKey, RemoteStore,
    StoreError, StoreResult, ValidatorConfig, ValidatorState, default_cache_path,
};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "seatguard")]
#[command(about = "Activate and check Seatguard licenses on this machine")]
pub struct Args {
    /// Base URL of the license store
    #[arg(long, env = "SEATGUARD_STORE_URL", global = true)]
    pub store_url: Option<String>,

    /// API key for the license store
    #[arg(long, env = "SEATGUARD_STORE_KEY", global = true, hide_env_values = true)]
    pub store_key: Option<String>,

    /// Path of the local license cache
    #[arg(long, env = "SEATGUARD_CACHE_PATH", global = true)]
    pub cache_path: Option<PathBuf>,

    /// Passphrase the cache signing key is derived from
    #[arg(long, env = "SEATGUARD_LICENSE_SECRET", global = true, hide_env_values = true)]
    pub signing_secret: Option<String>,

    /// Never re-validate a cached license remotely
    #[arg(long, env = "LEAN_WORKER", global = true)]
    pub lean: bool,

    /// Store request timeout in seconds
    #[arg(long, default_value = "10", global = true)]
    pub timeout_secs: u64,

    /// Reject a cached license after this many hours without a successful check
    #[arg(long, global = true)]
    pub max_offline_grace_hours: Option<u64>,

    /// Enable verbose debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Ensure this machine holds a valid license, activating if needed
    Check {
        /// Fail instead of asking for a key when nothing is activated
        #[arg(long)]
        no_prompt: bool,
    },
    /// Activate a license key on this machine
    Activate {
        /// The license key
        key: String,
    },
    /// Show the cached license without contacting the store
    Status,
    /// Delete the local license cache
    Remove,
    /// Print this machine's hardware ID
    Hwid,
}

impl Args {
    /// Validator settings derived from the flags.
    pub fn validator_config(&self) -> ValidatorConfig {
        ValidatorConfig {
            lean: self.lean,
            max_offline_grace: self
                .max_offline_grace_hours
                .map(|h| Duration::from_secs(h.saturating_mul(3600))),
            ..ValidatorConfig::default()
        }
    }

    /// Store settings; both URL and key are required.
    pub fn store_config(&self) -> Result<RestStoreConfig> {
        let url = self
            .store_url
            .as_deref()
            .context("license store URL not set (--store-url or SEATGUARD_STORE_URL)")?;
        let key = self
            .store_key
            .as_deref()
            .context("license store key not set (--store-key or SEATGUARD_STORE_KEY)")?;
        let mut config = RestStoreConfig::new(url, key);
        config.timeout_secs = self.timeout_secs;
        Ok(config)
    }

    pub fn signer(&self) -> CanonicalSigner {
        match &self.signing_secret {
            Some(secret) => CanonicalSigner::from_passphrase(secret),
            None => CanonicalSigner::default(),
        }
    }

    pub fn cache(&self) -> LicenseCache {
        let path = self.cache_path.clone().unwrap_or_else(default_cache_path);
        LicenseCache::new(path, self.signer())
    }

    fn rest_store(&self) -> Result<RestLicenseStore> {
        RestLicenseStore::new(self.store_config()?).context("failed to configure license store")
    }

    /// The configured store, or one that fails on first use if the
    /// configuration is incomplete.
    pub fn store(&self) -> Arc<dyn RemoteStore> {
        match self.rest_store() {
            Ok(store) => Arc::new(store),
            Err(e) => Arc::new(UnconfiguredStore(format!("{e:#}"))),
        }
    }

    fn validator(&self, store: Arc<dyn RemoteStore>) -> LicenseValidator {
        LicenseValidator::new(store, Arc::new(MachineIdentity), self.cache())
            .with_config(self.validator_config())
    }
}

/// Stand-in store used when no store is configured.
///
/// A cached license inside its cooldown, or in lean mode, never reaches the
/// store, so `check` can still succeed without credentials.
#[derive(Debug, Clone)]
pub struct UnconfiguredStore(pub String);

impl UnconfiguredStore {
    fn fail<T>(&self) -> StoreResult<T> {
        Err(StoreError::NotConfigured(self.0.clone()))
    }
}

#[async_trait]
impl RemoteStore for UnconfiguredStore {
    async fn get_license(&self, _license_key: &str) -> StoreResult<Option<License>> {
        self.fail()
    }

    async fn get_binding(&self, _hwid: &str) -> StoreResult<Option<DeviceBinding>> {
        self.fail()
    }

    async fn get_active_bindings_for_license(
        &self,
        _license_key: &str,
    ) -> StoreResult<Vec<DeviceBinding>> {
        self.fail()
    }

    async fn create_binding(
        &self,
        _hwid: &str,
        _license_key: &str,
        _device_name: &str,
    ) -> StoreResult<DeviceBinding> {
        self.fail()
    }
}

/// Asks for a license key on the terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptKey;

impl KeyProvider for PromptKey {
    fn license_key(&self) -> Option<String> {
        eprint!("Enter license key: ");
        io::stderr().flush().ok()?;
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line).ok()?;
        let key = line.trim();
        (!key.is_empty()).then(|| key.to_string())
    }
}

/// Line printed for a valid license.
pub fn valid_line(info: &LicenseInfo) -> String {
    format!(
        "License valid for {} ({})",
        info.display_name(),
        info.package_type
    )
}

/// Multi-line summary of a cached license.
pub fn status_lines(info: &LicenseInfo) -> Vec<String> {
    let expires = info
        .expires_at
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "never".to_string());
    vec![
        valid_line(info),
        format!("  Key:     {}", info.license_key),
        format!("  Expires: {expires}"),
    ]
}

/// Executes the parsed command, writing user-facing output to `out`.
///
/// # Errors
///
/// Configuration problems and every license rejection.
pub async fn run<W: Write>(args: &Args, out: &mut W) -> Result<()> {
    match &args.command {
        Command::Check { no_prompt } => {
            let validator = args.validator(args.store());
            let mut validator = if *no_prompt {
                validator.with_key_provider(NoKey)
            } else {
                validator.with_key_provider(PromptKey)
            };
            let info = validator
                .ensure_license(!no_prompt)
                .await
                .context("license check failed")?;
            if validator.state() == ValidatorState::OfflineGrace {
                writeln!(out, "using cached license, offline mode")?;
            }
            writeln!(out, "{}", valid_line(&info))?;
        }
        Command::Activate { key } => {
            let store = Arc::new(args.rest_store()?);
            let mut validator = args.validator(store);
            let info = validator
                .activate(key)
                .await
                .context("license activation failed")?;
            writeln!(out, "{}", valid_line(&info))?;
        }
        Command::Status => match args.cache().read() {
            Some(record) => {
                for line in status_lines(&record.info()) {
                    writeln!(out, "{line}")?;
                }
                writeln!(
                    out,
                    "  Last validated: {}",
                    record.last_validated.format("%Y-%m-%d %H:%M UTC")
                )?;
            }
            None => writeln!(out, "no license activated")?,
        },
        Command::Remove => {
            let cache = args.cache();
            cache.remove().context("failed to remove license cache")?;
            writeln!(out, "license cache removed: {}", cache.path().display())?;
        }
        Command::Hwid => {
            let hwid = MachineIdentity
                .current()
                .context("could not determine hardware ID")?;
            let device = DeviceInfo::collect();
            writeln!(out, "{hwid}")?;
            writeln!(out, "{}", serde_json::to_string_pretty(&device)?)?;
        }
    }
    Ok(())
}
