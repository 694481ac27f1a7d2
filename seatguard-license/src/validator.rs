//! The license validation state machine.
//!
//! `ensure_license` is called once at process start:
//!
//! - No usable cache: activate with a key from the [`KeyProvider`]
//!   (store lookup, usability, HWID, quota, cache write).
//! - Cache present: the HWID must match, then a remote re-check runs only
//!   once the cooldown has passed. Transport failures fall back to the
//!   cached record (offline grace); definitive answers reject.
//!
//! A rejection is final for the process. The cache file is left in place
//! so the last good activation survives for diagnosis.

use crate::audit::AuditKind;
use crate::cache::LicenseCache;
use crate::clock::{Clock, SystemClock};
use crate::config::ValidatorConfig;
use crate::device::DeviceIdentity;
use crate::enforcer::BindingEnforcer;
use crate::error::{LicenseError, LicenseResult};
use crate::license::LicenseInfo;
use crate::record::LocalCacheRecord;
use crate::store::{RemoteStore, StoreError};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Where the validator stands in the current process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidatorState {
    Unactivated,
    Activating,
    Active,
    OfflineGrace,
    Rejected,
}

/// Supplies a license key when activation is needed.
pub trait KeyProvider: Send + Sync {
    /// Returns the key to activate with, or `None` if the user gave none.
    fn license_key(&self) -> Option<String>;
}

/// A key passed in up front.
#[derive(Debug, Clone)]
pub struct StaticKey(pub String);

impl KeyProvider for StaticKey {
    fn license_key(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

/// No key source; activation always reports a missing key.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoKey;

impl KeyProvider for NoKey {
    fn license_key(&self) -> Option<String> {
        None
    }
}

/// Orchestrates activation and periodic validation.
pub struct LicenseValidator {
    store: Arc<dyn RemoteStore>,
    identity: Arc<dyn DeviceIdentity>,
    cache: LicenseCache,
    clock: Arc<dyn Clock>,
    keys: Box<dyn KeyProvider>,
    config: ValidatorConfig,
    state: ValidatorState,
    rejection: Option<LicenseError>,
}

impl LicenseValidator {
    pub fn new(
        store: Arc<dyn RemoteStore>,
        identity: Arc<dyn DeviceIdentity>,
        cache: LicenseCache,
    ) -> Self {
        Self {
            store,
            identity,
            cache,
            clock: Arc::new(SystemClock),
            keys: Box::new(NoKey),
            config: ValidatorConfig::default(),
            state: ValidatorState::Unactivated,
            rejection: None,
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: ValidatorConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_key_provider(mut self, keys: impl KeyProvider + 'static) -> Self {
        self.keys = Box::new(keys);
        self
    }

    pub fn state(&self) -> ValidatorState {
        self.state
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    pub fn cache(&self) -> &LicenseCache {
        &self.cache
    }

    /// Returns the cached license details without contacting the store.
    pub fn cached_info(&self) -> Option<LicenseInfo> {
        self.cache.read().map(|r| r.info())
    }

    /// Proves this process holds a valid license bound to this machine.
    ///
    /// With no usable cache, activation runs if `prompt_if_missing` is set;
    /// otherwise this fails with [`LicenseError::NotActivated`].
    ///
    /// # Errors
    ///
    /// Any definitive rejection. Transport failures against an existing
    /// cache are absorbed into offline grace and return the cached info.
    pub async fn ensure_license(&mut self, prompt_if_missing: bool) -> LicenseResult<LicenseInfo> {
        if let Some(err) = &self.rejection {
            return Err(err.clone());
        }

        let cached = self.cache.read();
        match cached {
            Some(record) => self.revalidate(record).await,
            None => {
                self.state = ValidatorState::Unactivated;
                if !prompt_if_missing {
                    return Err(LicenseError::NotActivated);
                }
                let key = self
                    .keys
                    .license_key()
                    .map(|k| k.trim().to_string())
                    .filter(|k| !k.is_empty())
                    .ok_or(LicenseError::MissingLicenseKey)?;
                self.activate(&key).await
            }
        }
    }

    /// Activates `license_key` on this machine and writes a fresh cache.
    ///
    /// # Errors
    ///
    /// Lookup, usability, HWID and quota failures, or
    /// [`LicenseError::CacheWriteFailed`] if the cache cannot be persisted.
    pub async fn activate(&mut self, license_key: &str) -> LicenseResult<LicenseInfo> {
        if let Some(err) = &self.rejection {
            return Err(err.clone());
        }

        self.state = ValidatorState::Activating;
        let outcome = self.run_activation(license_key.trim()).await;
        match outcome {
            Ok(record) => {
                self.state = ValidatorState::Active;
                info!(
                    "license activated for {} ({})",
                    record.info().display_name(),
                    record.package_type
                );
                Ok(record.info())
            }
            Err(e) => Err(self.reject(e)),
        }
    }

    /// Deletes the local cache at the user's request.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::CacheWriteFailed`] if the file cannot be removed.
    pub fn remove_cache(&mut self) -> LicenseResult<()> {
        self.cache.remove()?;
        if self.state != ValidatorState::Rejected {
            self.state = ValidatorState::Unactivated;
        }
        info!("license cache removed: {:?}", self.cache.path());
        Ok(())
    }

    async fn run_activation(&self, license_key: &str) -> LicenseResult<LocalCacheRecord> {
        let now = self.clock.now();

        let license = self
            .store
            .get_license(license_key)
            .await?
            .ok_or_else(|| LicenseError::LicenseNotFound(license_key.to_string()))?;
        license.check_usable(now)?;

        let hwid = self.identity.current()?;

        BindingEnforcer::new(Arc::clone(&self.store), self.identity.device_name())
            .register_or_confirm(&hwid, &license.license_key, license.package_type)
            .await?;

        let record = LocalCacheRecord::activated(&license, &hwid, now);
        self.cache.write(&record)?;
        Ok(record)
    }

    async fn revalidate(&mut self, mut record: LocalCacheRecord) -> LicenseResult<LicenseInfo> {
        let current = self.identity.current();
        let current = match current {
            Ok(hwid) => hwid,
            Err(e) => return Err(self.reject(e)),
        };
        if current != record.hwid {
            return Err(self.reject(LicenseError::HwidMismatch));
        }

        let now = self.clock.now();
        let elapsed = (now - record.last_validated).to_std().unwrap_or_default();

        if self.config.lean || elapsed <= self.config.cooldown {
            debug!("license validated {:?} ago; skipping remote check", elapsed);
            self.state = ValidatorState::Active;
            return Ok(record.info());
        }

        let lookup = self.store.get_license(&record.license_key).await;
        let license = match lookup {
            Ok(Some(license)) => license,
            Ok(None) => {
                return Err(self.reject(LicenseError::LicenseNotFound(record.license_key.clone())));
            }
            Err(e) if e.is_transport() => return self.enter_grace(&record, elapsed, e),
            Err(e) => return Err(self.reject(LicenseError::StoreRejected(e))),
        };

        if let Err(e) = license.check_usable(now) {
            return Err(self.reject(e));
        }

        record.refresh(&license, now);
        if let Err(e) = self.cache.write(&record) {
            warn!("license valid but cache refresh failed: {e}");
        }
        self.state = ValidatorState::Active;
        debug!("license re-validated for {}", record.info().display_name());
        Ok(record.info())
    }

    fn enter_grace(
        &mut self,
        record: &LocalCacheRecord,
        elapsed: Duration,
        cause: StoreError,
    ) -> LicenseResult<LicenseInfo> {
        self.cache
            .audit_log()
            .record(AuditKind::ValidationError, &cause.to_string());

        if let Some(max) = self.config.max_offline_grace {
            if elapsed > max {
                return Err(self.reject(LicenseError::OfflineGraceExhausted {
                    last_validated: record.last_validated,
                }));
            }
        }

        warn!("validation error: {cause}; using cached license, offline mode");
        self.state = ValidatorState::OfflineGrace;
        Ok(record.info())
    }

    fn reject(&mut self, err: LicenseError) -> LicenseError {
        warn!("license rejected: {err}");
        self.cache
            .audit_log()
            .record(AuditKind::ValidationError, &err.to_string());
        self.state = ValidatorState::Rejected;
        self.rejection = Some(err.clone());
        err
    }
}
