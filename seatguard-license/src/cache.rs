//! Local persistence of the last-known-good license.
//!
//! The cache file holds a [`SignedRecord`]. Anything that fails to parse or
//! verify is reported to callers as "no license", so a damaged cache forces
//! re-activation instead of failing the run.

use crate::audit::{AuditKind, AuditLog};
use crate::error::{LicenseError, LicenseResult};
use crate::record::{LocalCacheRecord, SignedRecord};
use crate::signer::CanonicalSigner;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Directory name under the platform data directory.
const APP_DIR: &str = "seatguard";
/// Cache file name.
const CACHE_FILE: &str = "license.json";
/// Audit log file name, kept next to the cache.
const AUDIT_FILE: &str = "license-access.log";

/// Outcome of loading the cache file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLoad {
    /// No cache file.
    Missing,
    /// Present but unreadable or not a signed record.
    Unreadable(String),
    /// Parsed, but the signature does not match.
    Tampered,
    /// Present and verified.
    Valid(LocalCacheRecord),
}

/// Signed license cache on local disk.
#[derive(Debug, Clone)]
pub struct LicenseCache {
    path: PathBuf,
    signer: CanonicalSigner,
    audit: AuditLog,
}

impl LicenseCache {
    /// Creates a cache at `path` with the audit log beside it.
    pub fn new(path: impl Into<PathBuf>, signer: CanonicalSigner) -> Self {
        let path = path.into();
        let audit = AuditLog::new(path.with_file_name(AUDIT_FILE));
        Self {
            path,
            signer,
            audit,
        }
    }

    /// Creates a cache in the platform's local data directory.
    pub fn in_default_location(signer: CanonicalSigner) -> Self {
        Self::new(default_cache_path(), signer)
    }

    /// Replaces the audit log.
    #[must_use]
    pub fn with_audit_log(mut self, audit: AuditLog) -> Self {
        self.audit = audit;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn audit_log(&self) -> &AuditLog {
        &self.audit
    }

    /// Returns true if a cache file exists, valid or not.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Loads and classifies the cache file.
    pub fn load(&self) -> CacheLoad {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return CacheLoad::Missing,
            Err(e) => return CacheLoad::Unreadable(e.to_string()),
        };

        let signed: SignedRecord = match serde_json::from_slice(&bytes) {
            Ok(signed) => signed,
            Err(e) => return CacheLoad::Unreadable(format!("malformed: {e}")),
        };

        if self.signer.verify(&signed.record, &signed.signature) {
            CacheLoad::Valid(signed.record)
        } else {
            CacheLoad::Tampered
        }
    }

    /// Reads the cached record.
    ///
    /// Returns `None` when the file is missing or fails verification. The
    /// latter is written to the audit log.
    pub fn read(&self) -> Option<LocalCacheRecord> {
        match self.load() {
            CacheLoad::Valid(record) => Some(record),
            CacheLoad::Missing => {
                debug!("no license cache at {:?}", self.path);
                None
            }
            CacheLoad::Unreadable(reason) => {
                self.demote(AuditKind::CacheUnreadable, reason);
                None
            }
            CacheLoad::Tampered => {
                self.demote(AuditKind::CacheTampered, "signature mismatch".to_string());
                None
            }
        }
    }

    fn demote(&self, kind: AuditKind, reason: String) {
        let err = LicenseError::CacheCorrupted(reason);
        warn!("{err}; treating license as not activated");
        self.audit
            .record(kind, &format!("{} ({})", err, self.path.display()));
    }

    /// Signs and atomically persists `record`.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::CacheWriteFailed`] if the file cannot be written.
    pub fn write(&self, record: &LocalCacheRecord) -> LicenseResult<()> {
        let signed = SignedRecord {
            record: record.clone(),
            signature: self.signer.sign(record),
        };
        let json = serde_json::to_vec_pretty(&signed)
            .map_err(|e| LicenseError::CacheWriteFailed(e.to_string()))?;

        self.write_atomic(&json)
            .map_err(|e| LicenseError::CacheWriteFailed(format!("{}: {e}", self.path.display())))
    }

    /// Deletes the cache file. Succeeds if it is already gone.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::CacheWriteFailed`] if the file exists but cannot be removed.
    pub fn remove(&self) -> LicenseResult<()> {
        match remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(LicenseError::CacheWriteFailed(format!(
                "{}: {e}",
                self.path.display()
            ))),
        }
    }

    fn write_atomic(&self, bytes: &[u8]) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp = self.temp_path();
        // A crash may have left a read-only temp file behind.
        let _ = fs::remove_file(&tmp);
        let result = (|| {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(bytes)?;
            file.sync_all()?;
            drop(file);

            if let Err(e) = restrict_permissions(&tmp) {
                warn!("could not restrict permissions on {:?}: {}", self.path, e);
            }

            replace(&tmp, &self.path)
        })();

        if result.is_err() {
            let _ = fs::remove_file(&tmp);
        }
        result
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

/// Default cache path: `<local data dir>/seatguard/license.json`.
pub fn default_cache_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join(CACHE_FILE)
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o400))
}

#[cfg(not(unix))]
fn restrict_permissions(path: &Path) -> io::Result<()> {
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_readonly(true);
    fs::set_permissions(path, perms)
}

#[cfg(unix)]
fn remove_file(path: &Path) -> io::Result<()> {
    fs::remove_file(path)
}

#[cfg(not(unix))]
fn remove_file(path: &Path) -> io::Result<()> {
    make_writable(path)?;
    fs::remove_file(path)
}

#[cfg(unix)]
fn replace(from: &Path, to: &Path) -> io::Result<()> {
    fs::rename(from, to)
}

#[cfg(not(unix))]
fn replace(from: &Path, to: &Path) -> io::Result<()> {
    // Renaming onto a read-only file fails on Windows.
    make_writable(to)?;
    fs::rename(from, to)
}

#[cfg(not(unix))]
fn make_writable(path: &Path) -> io::Result<()> {
    match fs::metadata(path) {
        Ok(meta) if meta.permissions().readonly() => {
            let mut perms = meta.permissions();
            #[allow(clippy::permissions_set_readonly_false)]
            perms.set_readonly(false);
            fs::set_permissions(path, perms)
        }
        Ok(_) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
