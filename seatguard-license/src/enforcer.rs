//! Per-tier device quota enforcement.

use crate::error::{LicenseError, LicenseResult};
use crate::license::{DeviceBinding, PackageType};
use crate::store::RemoteStore;
use std::sync::Arc;
use tracing::{debug, info};

/// How a device came to be authorized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirmation {
    /// The device already had an active binding.
    AlreadyBound(DeviceBinding),
    /// A new binding was created for the device.
    Registered(DeviceBinding),
}

impl Confirmation {
    pub fn binding(&self) -> &DeviceBinding {
        match self {
            Self::AlreadyBound(b) | Self::Registered(b) => b,
        }
    }
}

/// Registers devices against a license within the tier's quota.
///
/// Lookup, count and insert are separate store calls with no transaction
/// around them. Two machines activating the same license at the same
/// moment can both pass the quota check; the store offers no primitive to
/// close that window and the overshoot is accepted.
pub struct BindingEnforcer {
    store: Arc<dyn RemoteStore>,
    device_name: String,
}

impl BindingEnforcer {
    pub fn new(store: Arc<dyn RemoteStore>, device_name: impl Into<String>) -> Self {
        Self {
            store,
            device_name: device_name.into(),
        }
    }

    /// Confirms an existing binding for `hwid` or creates one under `license_key`.
    ///
    /// An active binding authorizes the device whichever license it names,
    /// since a hwid has at most one binding.
    ///
    /// # Errors
    ///
    /// [`LicenseError::DeviceDeactivated`], [`LicenseError::QuotaExceeded`], or
    /// the store failure mapped through `From<StoreError>`.
    pub async fn register_or_confirm(
        &self,
        hwid: &str,
        license_key: &str,
        package_type: PackageType,
    ) -> LicenseResult<Confirmation> {
        if let Some(existing) = self.store.get_binding(hwid).await? {
            if existing.active {
                debug!("device already bound to {}", existing.license_key);
                return Ok(Confirmation::AlreadyBound(existing));
            }
            return Err(LicenseError::DeviceDeactivated(hwid.to_string()));
        }

        let quota = package_type.device_quota();
        let active = self
            .store
            .get_active_bindings_for_license(license_key)
            .await?
            .iter()
            .filter(|b| b.active)
            .count() as u32;

        if active >= quota {
            return Err(LicenseError::QuotaExceeded { active, quota });
        }

        let binding = self
            .store
            .create_binding(hwid, license_key, &self.device_name)
            .await?;
        info!(
            "device registered: {} ({}/{} for {} license)",
            self.device_name,
            active + 1,
            quota,
            package_type
        );
        Ok(Confirmation::Registered(binding))
    }
}
