//! # Configuration Portal
//!
//! Shared, hot-reloadable view of the bridge configuration. The dispatcher, the
//! OSC callbacks and the reload task all hold the same `Arc<ConfigPortal>`.
//!
//! ## Thread Safety Strategy
//! Each section lives in its own `Arc<RwLock<T>>`. A reload replaces a whole
//! section under the write lock, so readers see either the old or the new
//! section, never a mix of both.
//!
//! ## Lock Contention Handling
//! Reads go through the `try_lock!` macro: up to 5 `try_read` attempts with
//! 10ms between them. If the lock stays busy the accessor logs a warning and
//! returns the section default instead of blocking the haptic loop.

use super::{
    AvatarConfigResetConfig, ConnectionConfig, DeviceSettings, DevicesConfig, ReactivityConfig,
    VRChatConfig,
};
use crate::haptics::HapticRegion;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;

/// Lock retry macro with timeout and logging.
///
/// - `@read_lock_retry` runs `$operation(&T)` and yields its result
/// - `@write_lock_retry` runs `$operation(&mut T)` and yields `()`
///
/// Both evaluate to `Result<_, ConfigError>`; after 5 failed attempts the
/// result is `ConfigError::LockTimeout`.
macro_rules! try_lock {
    (@write_lock_retry, $accessor:expr, $operation:expr) => {{
        let mut attempts = 0;
        const MAX_ATTEMPTS: usize = 5;

        loop {
            match $accessor.try_write() {
                Ok(mut guard) => {
                    $operation(&mut *guard);
                    break Ok(());
                }
                Err(e) => {
                    attempts += 1;
                    tracing::warn!(
                        "Write lock blocked: {} (attempt {}/{})",
                        e,
                        attempts,
                        MAX_ATTEMPTS
                    );

                    if attempts >= MAX_ATTEMPTS {
                        break Err($crate::persistence::config_portal::ConfigError::LockTimeout);
                    }

                    std::thread::sleep(std::time::Duration::from_millis(10));
                }
            }
        }
    }};

    (@read_lock_retry, $accessor:expr, $operation:expr) => {{
        let mut attempts = 0;
        const MAX_ATTEMPTS: usize = 5;

        loop {
            match $accessor.try_read() {
                Ok(guard) => {
                    let result = $operation(&*guard);
                    break Ok(result);
                }
                Err(e) => {
                    attempts += 1;
                    tracing::warn!(
                        "Read lock blocked: {} (attempt {}/{})",
                        e,
                        attempts,
                        MAX_ATTEMPTS
                    );

                    if attempts >= MAX_ATTEMPTS {
                        break Err($crate::persistence::config_portal::ConfigError::LockTimeout);
                    }

                    std::thread::sleep(std::time::Duration::from_millis(10));
                }
            }
        }
    }};
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Timed out waiting for configuration lock")]
    LockTimeout,
}

/// Central hub for the live configuration.
#[derive(Default, Debug)]
pub struct ConfigPortal {
    devices: Arc<RwLock<DevicesConfig>>,
    vrchat: Arc<RwLock<VRChatConfig>>,
    connection: Arc<RwLock<ConnectionConfig>>,
}

impl ConfigPortal {
    pub fn new(
        devices: DevicesConfig,
        vrchat: VRChatConfig,
        connection: ConnectionConfig,
    ) -> Self {
        Self {
            devices: Arc::new(RwLock::new(devices)),
            vrchat: Arc::new(RwLock::new(vrchat)),
            connection: Arc::new(RwLock::new(connection)),
        }
    }

    /// Settings of a region, falling back to enabled/100 on lock timeout
    pub fn device_settings(&self, region: HapticRegion) -> DeviceSettings {
        let result = try_lock!(@read_lock_retry, self.devices, |guard: &DevicesConfig| {
            *guard.settings_for(region)
        });
        result.unwrap_or_else(|e| {
            warn!("Using default settings for {}: {}", region, e);
            DeviceSettings::default()
        })
    }

    pub fn is_enabled(&self, region: HapticRegion) -> bool {
        self.device_settings(region).enabled
    }

    pub fn intensity_for(&self, region: HapticRegion) -> u8 {
        self.device_settings(region).intensity()
    }

    pub fn reactivity(&self) -> ReactivityConfig {
        let result = try_lock!(@read_lock_retry, self.vrchat, |guard: &VRChatConfig| {
            guard.reactivity
        });
        result.unwrap_or_else(|e| {
            warn!("Using default reactivity policy: {}", e);
            ReactivityConfig::default()
        })
    }

    pub fn avatar_config_reset(&self) -> AvatarConfigResetConfig {
        let result = try_lock!(@read_lock_retry, self.vrchat, |guard: &VRChatConfig| {
            guard.avatar_config_reset.clone()
        });
        result.unwrap_or_else(|e| {
            warn!("Using default avatar config reset policy: {}", e);
            AvatarConfigResetConfig::default()
        })
    }

    pub fn devices(&self) -> Result<DevicesConfig, ConfigError> {
        try_lock!(@read_lock_retry, self.devices, |guard: &DevicesConfig| guard.clone())
    }

    pub fn vrchat(&self) -> Result<VRChatConfig, ConfigError> {
        try_lock!(@read_lock_retry, self.vrchat, |guard: &VRChatConfig| guard.clone())
    }

    pub fn connection(&self) -> Result<ConnectionConfig, ConfigError> {
        try_lock!(@read_lock_retry, self.connection, |guard: &ConnectionConfig| guard.clone())
    }

    pub fn write_devices(&self, devices: DevicesConfig) -> Result<(), ConfigError> {
        try_lock!(@write_lock_retry, self.devices, |guard: &mut DevicesConfig| {
            *guard = devices;
        })
    }

    pub fn write_vrchat(&self, vrchat: VRChatConfig) -> Result<(), ConfigError> {
        try_lock!(@write_lock_retry, self.vrchat, |guard: &mut VRChatConfig| {
            *guard = vrchat;
        })
    }

    pub fn write_connection(&self, connection: ConnectionConfig) -> Result<(), ConfigError> {
        try_lock!(@write_lock_retry, self.connection, |guard: &mut ConnectionConfig| {
            *guard = connection;
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_portal_uses_safe_defaults() {
        let portal = ConfigPortal::default();
        for region in HapticRegion::ALL {
            assert!(portal.is_enabled(region));
            assert_eq!(portal.intensity_for(region), 100);
        }
        assert_eq!(portal.reactivity(), ReactivityConfig::default());
        assert!(!portal.avatar_config_reset().enabled);
    }

    #[test]
    fn test_write_is_visible_to_next_read() {
        let portal = ConfigPortal::default();
        let mut devices = DevicesConfig::default();
        devices.upper_arm_left = DeviceSettings {
            enabled: false,
            intensity: 30,
        };

        portal.write_devices(devices.clone()).unwrap();

        assert!(!portal.is_enabled(HapticRegion::UpperArmLeft));
        assert_eq!(portal.intensity_for(HapticRegion::UpperArmLeft), 30);
        assert!(portal.is_enabled(HapticRegion::Torso));
        assert_eq!(portal.devices().unwrap(), devices);
    }

    #[tokio::test]
    async fn test_read_falls_back_to_default_while_write_locked() {
        let mut devices = DevicesConfig::default();
        devices.vest = DeviceSettings {
            enabled: false,
            intensity: 10,
        };
        let portal = ConfigPortal::new(devices, VRChatConfig::default(), ConnectionConfig::default());

        let _guard = portal.devices.write().await;
        assert_eq!(
            portal.device_settings(HapticRegion::Torso),
            DeviceSettings::default()
        );
        assert_eq!(portal.devices(), Err(ConfigError::LockTimeout));
    }

    #[test]
    fn test_write_vrchat_updates_reactivity() {
        let portal = ConfigPortal::default();
        let mut vrchat = VRChatConfig::default();
        vrchat.reactivity.afk = true;
        vrchat.avatar_config_reset.enabled = true;

        portal.write_vrchat(vrchat).unwrap();

        assert!(portal.reactivity().afk);
        assert!(portal.avatar_config_reset().enabled);
    }
}
