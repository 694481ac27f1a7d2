//! License activation and device binding for Seatguard.
//!
//! This crate handles:
//! - Activation of a license key against the remote license store
//! - Per-tier device quotas enforced at registration time
//! - A signed local cache so the app keeps working through outages
//! - Periodic re-validation with an hourly cooldown
//!
//! # Design Principles
//!
//! - **Bound to one machine**: the cache records the HWID it was activated on
//!   and is refused anywhere else
//! - **Offline grace**: transport failures fall back to the cached license
//! - **Fail closed on activation**: no persisted cache, no license
//! - **Tamper-evident cache**: edited cache files read as absent
//!
//! # Cache File Format
//!
//! A flat JSON object with `licenseKey`, `packageType`, `email`, `name`,
//! `expiresAt`, `hwid`, `activatedAt`, `lastValidated` and an HMAC-SHA256
//! `signature` over the other fields in that order.

mod audit;
mod cache;
mod clock;
mod config;
mod device;
mod enforcer;
mod error;
mod license;
mod record;
mod signer;
mod store;
mod validator;

pub use audit::{AuditKind, AuditLog};
pub use cache::{default_cache_path, CacheLoad, LicenseCache};
pub use clock::{Clock, SystemClock};
pub use config::{ValidatorConfig, DEFAULT_COOLDOWN_SECS};
pub use device::{DeviceIdentity, DeviceInfo, HwidSource, MachineIdentity};
pub use enforcer::{BindingEnforcer, Confirmation};
pub use error::{LicenseError, LicenseResult};
pub use license::{DeviceBinding, License, LicenseInfo, LicenseStatus, PackageType};
pub use record::{LocalCacheRecord, SignedRecord};
pub use signer::CanonicalSigner;
pub use store::{RemoteStore, StoreError, StoreResult};
pub use validator::{KeyProvider, LicenseValidator, NoKey, StaticKey, ValidatorState};
