//! # Persistence Module
//!
//! ## Why This Module Exists
//! The bridge is configured through three small TOML files that users edit by hand
//! while the bridge is running. This module defines their data models, the shared
//! [`config_portal::ConfigPortal`] the dispatcher reads from, and the
//! [`config_store::ConfigStore`] that loads, reloads and saves the files.
//!
//! ## Key Abstractions
//! - **Devices**: enable flag and intensity per body region
//! - **VRChat**: reactivity policy (AFK / InStation / Seated) and the avatar
//!   OSC config reset switch
//! - **Connection**: where the OSC receiver binds
//!
//! ## Error Handling Strategy
//! Every section has a usable default. Missing or broken files degrade to the
//! defaults with a warning instead of preventing startup.

pub mod avatar_config;
pub mod config_portal;
pub mod config_store;

use crate::haptics::HapticRegion;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

/// Upper bound for configured intensities
pub const MAX_INTENSITY: u8 = 100;

/// Settings of a single body region
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct DeviceSettings {
    pub enabled: bool,
    /// Percentage 0-100, larger values are clamped on read
    pub intensity: u8,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            intensity: MAX_INTENSITY,
        }
    }
}

impl DeviceSettings {
    pub fn intensity(&self) -> u8 {
        self.intensity.min(MAX_INTENSITY)
    }
}

/// Contents of `devices.toml`
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(default)]
pub struct DevicesConfig {
    pub vest: DeviceSettings,
    pub upper_arm_left: DeviceSettings,
    pub upper_arm_right: DeviceSettings,
    pub lower_arm_left: DeviceSettings,
    pub lower_arm_right: DeviceSettings,
    pub upper_leg_left: DeviceSettings,
    pub upper_leg_right: DeviceSettings,
    pub lower_leg_left: DeviceSettings,
    pub lower_leg_right: DeviceSettings,
}

impl DevicesConfig {
    pub fn settings_for(&self, region: HapticRegion) -> &DeviceSettings {
        match region {
            HapticRegion::Torso => &self.vest,
            HapticRegion::UpperArmLeft => &self.upper_arm_left,
            HapticRegion::UpperArmRight => &self.upper_arm_right,
            HapticRegion::LowerArmLeft => &self.lower_arm_left,
            HapticRegion::LowerArmRight => &self.lower_arm_right,
            HapticRegion::UpperLegLeft => &self.upper_leg_left,
            HapticRegion::UpperLegRight => &self.upper_leg_right,
            HapticRegion::LowerLegLeft => &self.lower_leg_left,
            HapticRegion::LowerLegRight => &self.lower_leg_right,
        }
    }

    pub fn settings_for_mut(&mut self, region: HapticRegion) -> &mut DeviceSettings {
        match region {
            HapticRegion::Torso => &mut self.vest,
            HapticRegion::UpperArmLeft => &mut self.upper_arm_left,
            HapticRegion::UpperArmRight => &mut self.upper_arm_right,
            HapticRegion::LowerArmLeft => &mut self.lower_arm_left,
            HapticRegion::LowerArmRight => &mut self.lower_arm_right,
            HapticRegion::UpperLegLeft => &mut self.upper_leg_left,
            HapticRegion::UpperLegRight => &mut self.upper_leg_right,
            HapticRegion::LowerLegLeft => &mut self.lower_leg_left,
            HapticRegion::LowerLegRight => &mut self.lower_leg_right,
        }
    }

    pub fn log_summary(&self) {
        info!("===== Devices =====");
        for region in HapticRegion::ALL {
            let settings = self.settings_for(region);
            info!(
                "[{}  |  Enabled] = {}  [{}  |  Intensity] = {}",
                region,
                settings.enabled,
                region,
                settings.intensity()
            );
        }
    }
}

/// Whether haptics may play while the matching real-world state is active
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct ReactivityConfig {
    pub afk: bool,
    pub in_station: bool,
    pub seated: bool,
}

impl Default for ReactivityConfig {
    fn default() -> Self {
        Self {
            afk: false,
            in_station: true,
            seated: true,
        }
    }
}

/// Deletes VRChat's cached per-avatar OSC config whenever the avatar changes,
/// so newly added contact parameters are picked up.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(default)]
pub struct AvatarConfigResetConfig {
    pub enabled: bool,
    /// Overrides the VRChat OSC directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub osc_directory: Option<PathBuf>,
}

/// Contents of `vrchat.toml`
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(default)]
pub struct VRChatConfig {
    pub reactivity: ReactivityConfig,
    pub avatar_config_reset: AvatarConfigResetConfig,
}

impl VRChatConfig {
    pub fn log_summary(&self) {
        info!("===== VRChat - Reactivity =====");
        info!("[AFK] = {}", self.reactivity.afk);
        info!("[InStation] = {}", self.reactivity.in_station);
        info!("[Seated] = {}", self.reactivity.seated);
        info!("===== VRChat - Avatar OSC Config Reset =====");
        info!("[Enabled] = {}", self.avatar_config_reset.enabled);
        if let Some(dir) = &self.avatar_config_reset.osc_directory {
            info!("[OSC Directory] = {}", dir.display());
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct ReceiverConfig {
    pub address: String,
    pub port: u16,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 9001,
        }
    }
}

/// Contents of `connection.toml`
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ConnectionConfig {
    pub receiver: ReceiverConfig,
}

impl ConnectionConfig {
    pub fn receiver_addr(&self) -> String {
        format!("{}:{}", self.receiver.address, self.receiver.port)
    }

    pub fn log_summary(&self) {
        info!("===== OSC Receiver =====");
        info!("[Address] = {}", self.receiver.address);
        info!("[Port] = {}", self.receiver.port);
    }
}
