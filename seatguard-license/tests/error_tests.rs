use chrono::{TimeZone, Utc};
use seatguard_license::{LicenseError, StoreError};

#[test]
fn error_display_not_found() {
    let err = LicenseError::LicenseNotFound("SG-XXXX".into());
    let msg = format!("{err}");
    assert!(msg.contains("not found"));
    assert!(msg.contains("SG-XXXX"));
}

#[test]
fn error_display_disabled() {
    assert!(format!("{}", LicenseError::LicenseDisabled).contains("disabled"));
}

#[test]
fn error_display_expired() {
    let at = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    let err = LicenseError::LicenseExpired(at);
    assert_eq!(format!("{err}"), "license expired on 2025-01-01");
}

#[test]
fn error_display_quota() {
    let err = LicenseError::QuotaExceeded { active: 5, quota: 5 };
    let msg = format!("{err}");
    assert!(msg.contains("device limit"));
    assert!(msg.contains("5/5"));
}

#[test]
fn error_display_hwid_mismatch() {
    assert!(format!("{}", LicenseError::HwidMismatch).contains("different machine"));
}

#[test]
fn error_display_device_deactivated() {
    let err = LicenseError::DeviceDeactivated("abc".into());
    assert!(format!("{err}").contains("deactivated"));
}

#[test]
fn transport_errors_are_recoverable() {
    let err: LicenseError = StoreError::Timeout.into();
    assert!(matches!(err, LicenseError::Transport(_)));
    assert!(err.is_recoverable());
    assert!(!err.is_definitive());
}

#[test]
fn upstream_and_malformed_count_as_transport() {
    let upstream = StoreError::Upstream {
        status: 503,
        message: "unavailable".into(),
    };
    assert!(upstream.is_transport());
    assert!(StoreError::Malformed("eof".into()).is_transport());
    assert!(StoreError::Connect("dns".into()).is_transport());
}

#[test]
fn rejected_store_error_is_definitive() {
    let err: LicenseError = StoreError::Rejected {
        status: 401,
        message: "invalid api key".into(),
    }
    .into();
    assert!(matches!(err, LicenseError::StoreRejected(_)));
    assert!(err.is_definitive());
}

#[test]
fn missing_store_configuration_is_definitive() {
    let store_err = StoreError::NotConfigured("no URL".into());
    assert!(!store_err.is_transport());
    let err: LicenseError = store_err.into();
    assert!(matches!(err, LicenseError::StoreRejected(StoreError::NotConfigured(_))));
    assert!(err.to_string().contains("store not configured: no URL"));
}

#[test]
fn rejections_are_definitive() {
    for err in [
        LicenseError::LicenseDisabled,
        LicenseError::HwidMismatch,
        LicenseError::QuotaExceeded { active: 1, quota: 1 },
        LicenseError::CacheWriteFailed("disk full".into()),
        LicenseError::NotActivated,
    ] {
        assert!(err.is_definitive(), "{err}");
    }
}

#[test]
fn error_is_clone_and_debug() {
    let err = LicenseError::MissingLicenseKey;
    let cloned = err.clone();
    let _ = format!("{cloned:?}");
}
