//! Append-only audit trail for license cache and validation events.
//!
//! Writes are best-effort: a failing audit log never affects licensing.

use chrono::Utc;
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Kinds of audited events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditKind {
    /// Cache present but its signature does not match.
    CacheTampered,
    /// Cache present but unreadable or not a license record.
    CacheUnreadable,
    /// Remote validation failed.
    ValidationError,
}

impl fmt::Display for AuditKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::CacheTampered => "CACHE_TAMPERED",
            Self::CacheUnreadable => "CACHE_UNREADABLE",
            Self::ValidationError => "VALIDATION_ERROR",
        })
    }
}

/// A plain-text audit log file.
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends `<timestamp> - <KIND>: <detail>`.
    pub fn record(&self, kind: AuditKind, detail: &str) {
        if let Err(e) = self.append(kind, detail) {
            debug!("audit log write to {:?} failed: {}", self.path, e);
        }
    }

    fn append(&self, kind: AuditKind, detail: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{} - {}: {}", Utc::now().to_rfc3339(), kind, detail)
    }
}
