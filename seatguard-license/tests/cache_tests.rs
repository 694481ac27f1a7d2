mod common;

use common::{overwrite, t0, temp_cache};
use pretty_assertions::assert_eq;
use seatguard_license::{
    CacheLoad, CanonicalSigner, LicenseCache, LicenseError, LocalCacheRecord, PackageType,
};
use std::fs;

fn record() -> LocalCacheRecord {
    LocalCacheRecord {
        license_key: "SG-STRT-AAAA-BBBB-CCCC".into(),
        package_type: PackageType::Starter,
        email: Some("owner@example.com".into()),
        name: Some("Owner".into()),
        expires_at: Some(t0() + chrono::Duration::days(30)),
        hwid: "hwid-1".into(),
        activated_at: t0(),
        last_validated: t0(),
    }
}

fn audit_contents(cache: &LicenseCache) -> String {
    fs::read_to_string(cache.audit_log().path()).unwrap_or_default()
}

// ── read / write ─────────────────────────────────────────────────

#[test]
fn write_then_read() {
    let (_dir, cache) = temp_cache();
    cache.write(&record()).unwrap();
    assert_eq!(cache.read(), Some(record()));
}

#[test]
fn missing_file_reads_as_none_without_audit() {
    let (_dir, cache) = temp_cache();
    assert!(!cache.exists());
    assert_eq!(cache.load(), CacheLoad::Missing);
    assert_eq!(cache.read(), None);
    assert!(audit_contents(&cache).is_empty());
}

#[test]
fn persisted_layout_is_flat_with_signature() {
    let (_dir, cache) = temp_cache();
    cache.write(&record()).unwrap();
    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(cache.path()).unwrap()).unwrap();
    let obj = json.as_object().unwrap();
    for field in [
        "licenseKey",
        "packageType",
        "email",
        "name",
        "expiresAt",
        "hwid",
        "activatedAt",
        "lastValidated",
        "signature",
    ] {
        assert!(obj.contains_key(field), "missing {field}");
    }
    assert_eq!(obj["packageType"], "STARTER");
}

#[test]
fn write_creates_parent_directories() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("deeper").join("license.json");
    let cache = LicenseCache::new(&path, CanonicalSigner::default());
    cache.write(&record()).unwrap();
    assert!(path.exists());
}

#[test]
fn no_temp_file_left_behind() {
    let (dir, cache) = temp_cache();
    cache.write(&record()).unwrap();
    let names: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(names, vec!["license.json".to_string()]);
}

#[test]
fn rewrite_over_read_only_file() {
    let (_dir, cache) = temp_cache();
    cache.write(&record()).unwrap();
    let mut updated = record();
    updated.last_validated = t0() + chrono::Duration::hours(3);
    cache.write(&updated).unwrap();
    assert_eq!(cache.read(), Some(updated));
}

#[cfg(unix)]
#[test]
fn cache_file_is_owner_read_only() {
    use std::os::unix::fs::PermissionsExt;
    let (_dir, cache) = temp_cache();
    cache.write(&record()).unwrap();
    let mode = fs::metadata(cache.path()).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o400);
}

#[test]
fn unwritable_location_fails() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, b"not a directory").unwrap();
    let cache = LicenseCache::new(blocker.join("license.json"), CanonicalSigner::default());
    let err = cache.write(&record()).unwrap_err();
    assert!(matches!(err, LicenseError::CacheWriteFailed(_)));
}

// ── tamper detection ─────────────────────────────────────────────

#[test]
fn flipped_signature_byte_reads_as_none() {
    let (_dir, cache) = temp_cache();
    cache.write(&record()).unwrap();

    let mut json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(cache.path()).unwrap()).unwrap();
    let sig = json["signature"].as_str().unwrap().to_string();
    let first = if sig.starts_with('0') { '1' } else { '0' };
    let flipped = format!("{first}{}", &sig[1..]);
    json["signature"] = serde_json::Value::String(flipped);
    overwrite(&cache.path().to_path_buf(), &json.to_string());

    assert_eq!(cache.load(), CacheLoad::Tampered);
    assert_eq!(cache.read(), None);
    assert!(audit_contents(&cache).contains("CACHE_TAMPERED"));
}

#[test]
fn edited_field_reads_as_none() {
    let (_dir, cache) = temp_cache();
    cache.write(&record()).unwrap();
    let contents = fs::read_to_string(cache.path())
        .unwrap()
        .replace("STARTER", "AGENCY");
    overwrite(&cache.path().to_path_buf(), &contents);
    assert_eq!(cache.read(), None);
}

#[test]
fn garbage_file_reads_as_none_and_is_audited() {
    let (_dir, cache) = temp_cache();
    overwrite(&cache.path().to_path_buf(), "{ not json");
    assert!(cache.exists());
    assert!(matches!(cache.load(), CacheLoad::Unreadable(_)));
    assert_eq!(cache.read(), None);
    assert!(audit_contents(&cache).contains("CACHE_UNREADABLE"));
}

#[test]
fn unsigned_record_reads_as_none() {
    let (_dir, cache) = temp_cache();
    let json = serde_json::to_string(&record()).unwrap();
    overwrite(&cache.path().to_path_buf(), &json);
    assert_eq!(cache.read(), None);
}

#[test]
fn cache_from_other_build_secret_reads_as_none() {
    let (dir, cache) = temp_cache();
    cache.write(&record()).unwrap();
    let other = LicenseCache::new(
        dir.path().join("license.json"),
        CanonicalSigner::from_passphrase("another build"),
    );
    assert_eq!(other.read(), None);
}

// ── remove ───────────────────────────────────────────────────────

#[test]
fn remove_is_idempotent() {
    let (_dir, cache) = temp_cache();
    cache.write(&record()).unwrap();
    cache.remove().unwrap();
    assert!(!cache.exists());
    cache.remove().unwrap();
}
