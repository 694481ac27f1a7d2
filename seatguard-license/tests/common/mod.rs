//! Shared test helpers for license tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use seatguard_license::{
    CanonicalSigner, Clock, DeviceBinding, DeviceIdentity, License, LicenseCache, LicenseResult,
    LicenseStatus, PackageType, RemoteStore, StoreError, StoreResult,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Fixed reference instant for deterministic tests.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 1, 9, 0, 0).unwrap()
}

/// Builds an active license row.
pub fn license(key: &str, package_type: PackageType, expiry: Option<DateTime<Utc>>) -> License {
    License {
        license_key: key.to_string(),
        status: LicenseStatus::Active,
        package_type,
        expiry_date: expiry,
        email: Some("owner@example.com".to_string()),
        name: Some("Test Owner".to_string()),
    }
}

/// Builds an active binding row.
pub fn binding(hwid: &str, key: &str) -> DeviceBinding {
    DeviceBinding {
        hwid: hwid.to_string(),
        license_key: key.to_string(),
        active: true,
        device_name: Some(format!("host-{hwid}")),
    }
}

/// In-memory remote store with injectable failures.
#[derive(Default)]
pub struct MemoryStore {
    licenses: Mutex<HashMap<String, License>>,
    bindings: Mutex<Vec<DeviceBinding>>,
    failure: Mutex<Option<StoreError>>,
    calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_license(self, license: License) -> Self {
        self.put_license(license);
        self
    }

    pub fn with_binding(self, binding: DeviceBinding) -> Self {
        self.bindings.lock().unwrap().push(binding);
        self
    }

    pub fn put_license(&self, license: License) {
        self.licenses
            .lock()
            .unwrap()
            .insert(license.license_key.clone(), license);
    }

    pub fn remove_license(&self, key: &str) {
        self.licenses.lock().unwrap().remove(key);
    }

    /// Makes every subsequent call fail with `err`.
    pub fn fail_with(&self, err: StoreError) {
        *self.failure.lock().unwrap() = Some(err);
    }

    pub fn recover(&self) {
        *self.failure.lock().unwrap() = None;
    }

    /// Number of store calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn bindings(&self) -> Vec<DeviceBinding> {
        self.bindings.lock().unwrap().clone()
    }

    pub fn active_count(&self, key: &str) -> usize {
        self.bindings()
            .iter()
            .filter(|b| b.license_key == key && b.active)
            .count()
    }

    fn enter(&self) -> StoreResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.failure.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn get_license(&self, license_key: &str) -> StoreResult<Option<License>> {
        self.enter()?;
        Ok(self.licenses.lock().unwrap().get(license_key).cloned())
    }

    async fn get_binding(&self, hwid: &str) -> StoreResult<Option<DeviceBinding>> {
        self.enter()?;
        Ok(self
            .bindings
            .lock()
            .unwrap()
            .iter()
            .find(|b| b.hwid == hwid)
            .cloned())
    }

    async fn get_active_bindings_for_license(
        &self,
        license_key: &str,
    ) -> StoreResult<Vec<DeviceBinding>> {
        self.enter()?;
        Ok(self
            .bindings
            .lock()
            .unwrap()
            .iter()
            .filter(|b| b.license_key == license_key && b.active)
            .cloned()
            .collect())
    }

    async fn create_binding(
        &self,
        hwid: &str,
        license_key: &str,
        device_name: &str,
    ) -> StoreResult<DeviceBinding> {
        self.enter()?;
        let created = DeviceBinding {
            hwid: hwid.to_string(),
            license_key: license_key.to_string(),
            active: true,
            device_name: Some(device_name.to_string()),
        };
        self.bindings.lock().unwrap().push(created.clone());
        Ok(created)
    }
}

/// Settable clock.
pub struct FixedClock(Mutex<DateTime<Utc>>);

impl FixedClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.0.lock().unwrap();
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

/// Device identity with a fixed HWID.
pub struct FixedIdentity(pub String);

impl FixedIdentity {
    pub fn new(hwid: &str) -> Self {
        Self(hwid.to_string())
    }
}

impl DeviceIdentity for FixedIdentity {
    fn current(&self) -> LicenseResult<String> {
        Ok(self.0.clone())
    }

    fn device_name(&self) -> String {
        format!("host-{}", self.0)
    }
}

/// A cache inside a fresh temp directory. Keep the `TempDir` alive.
pub fn temp_cache() -> (tempfile::TempDir, LicenseCache) {
    let dir = tempfile::tempdir().unwrap();
    let cache = LicenseCache::new(dir.path().join("license.json"), CanonicalSigner::default());
    (dir, cache)
}

/// Overwrites a (possibly read-only) file.
pub fn overwrite(path: &PathBuf, contents: &str) {
    if let Ok(meta) = std::fs::metadata(path) {
        let mut perms = meta.permissions();
        #[allow(clippy::permissions_set_readonly_false)]
        perms.set_readonly(false);
        std::fs::set_permissions(path, perms).unwrap();
    }
    std::fs::write(path, contents).unwrap();
}
