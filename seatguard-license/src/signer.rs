//! Integrity tags for the local license cache.
//!
//! The tag is HMAC-SHA256 over the record's canonical form: compact JSON
//! with fields in declaration order. The MAC key is `SHA-256(passphrase)`,
//! so a given build reproduces the same key on every start and caches
//! written by earlier runs stay valid.
//!
//! This detects casual edits of the cache file. It does not hold up against
//! anyone who can read the passphrase out of the binary.

use crate::record::LocalCacheRecord;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// Passphrase baked into this build.
const DEFAULT_PASSPHRASE: &str = "seatguard-license-cache-v2";

/// Signs and verifies [`LocalCacheRecord`]s.
#[derive(Clone)]
pub struct CanonicalSigner {
    key: [u8; 32],
}

impl CanonicalSigner {
    /// Derives the MAC key from a passphrase.
    #[must_use]
    pub fn from_passphrase(passphrase: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(passphrase.as_bytes());
        Self {
            key: hasher.finalize().into(),
        }
    }

    /// Returns the canonical byte form of a record.
    #[must_use]
    pub fn canonical_bytes(record: &LocalCacheRecord) -> Vec<u8> {
        // Struct serialization cannot fail: every field is a string, enum or timestamp.
        serde_json::to_vec(record).unwrap_or_default()
    }

    /// Computes the lowercase hex tag for a record.
    #[must_use]
    pub fn sign(&self, record: &LocalCacheRecord) -> String {
        let mut mac = self.mac();
        mac.update(&Self::canonical_bytes(record));
        hex::encode(mac.finalize().into_bytes())
    }

    /// Returns true iff `tag` is exactly the tag for `record`.
    ///
    /// Malformed tags are treated as tampered.
    #[must_use]
    pub fn verify(&self, record: &LocalCacheRecord, tag: &str) -> bool {
        let Ok(expected) = hex::decode(tag) else {
            return false;
        };
        let mut mac = self.mac();
        mac.update(&Self::canonical_bytes(record));
        mac.verify_slice(&expected).is_ok()
    }

    fn mac(&self) -> HmacSha256 {
        // HMAC accepts keys of any length.
        <HmacSha256 as Mac>::new_from_slice(&self.key).expect("HMAC can take key of any size")
    }
}

impl Default for CanonicalSigner {
    fn default() -> Self {
        Self::from_passphrase(DEFAULT_PASSPHRASE)
    }
}

impl std::fmt::Debug for CanonicalSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CanonicalSigner")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::license::PackageType;
    use chrono::{TimeZone, Utc};

    fn record() -> LocalCacheRecord {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        LocalCacheRecord {
            license_key: "SG-PROE-AAAA-BBBB-CCCC".into(),
            package_type: PackageType::Pro,
            email: Some("owner@example.com".into()),
            name: None,
            expires_at: None,
            hwid: "hwid-1".into(),
            activated_at: at,
            last_validated: at,
        }
    }

    #[test]
    fn canonical_form_has_fixed_field_order() {
        let json = String::from_utf8(CanonicalSigner::canonical_bytes(&record())).unwrap();
        let order = [
            "licenseKey",
            "packageType",
            "email",
            "name",
            "expiresAt",
            "hwid",
            "activatedAt",
            "lastValidated",
        ];
        let positions: Vec<usize> = order.iter().map(|f| json.find(f).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{json}");
        assert!(!json.contains("signature"));
    }

    #[test]
    fn key_is_reproducible() {
        let a = CanonicalSigner::default();
        let b = CanonicalSigner::default();
        assert_eq!(a.sign(&record()), b.sign(&record()));
    }

    #[test]
    fn different_passphrase_rejects() {
        let tag = CanonicalSigner::from_passphrase("one").sign(&record());
        assert!(!CanonicalSigner::from_passphrase("two").verify(&record(), &tag));
    }

    #[test]
    fn debug_redacts_key() {
        let debug = format!("{:?}", CanonicalSigner::default());
        assert!(debug.contains("REDACTED"));
    }
}
