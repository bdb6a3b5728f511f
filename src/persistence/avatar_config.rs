//! Removal of VRChat's cached per-avatar OSC configuration
//!
//! VRChat writes `OSC/<user id>/Avatars/<avatar id>.json` the first time an
//! avatar is worn and never refreshes it, so parameters added to the avatar
//! later (new contacts) are not sent. Deleting the file on avatar change forces
//! VRChat to regenerate it.

use super::config_portal::ConfigPortal;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

const VRCHAT_OSC_DIR: &str = "AppData/LocalLow/VRChat/VRChat/OSC";
const AVATARS_DIR: &str = "Avatars";

#[derive(Debug, thiserror::Error)]
pub enum AvatarConfigError {
    #[error("Invalid avatar id: {0}")]
    InvalidAvatarId(String),

    #[error("OSC directory could not be resolved")]
    NoOscDirectory,

    #[error("Failed to remove avatar config: {0}")]
    Io(#[from] std::io::Error),
}

/// Deletes persisted per-avatar overrides
pub trait AvatarConfigStore: Send + Sync + 'static {
    /// Returns how many files were removed
    fn remove_avatar_config(&self, avatar_id: &str) -> Result<usize, AvatarConfigError>;
}

/// File-backed store reading its OSC directory from the live config
pub struct VrchatAvatarConfigs {
    portal: Arc<ConfigPortal>,
}

impl VrchatAvatarConfigs {
    pub fn new(portal: Arc<ConfigPortal>) -> Self {
        Self { portal }
    }

    pub fn default_osc_directory() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(VRCHAT_OSC_DIR))
    }

    fn osc_directory(&self) -> Option<PathBuf> {
        self.portal
            .avatar_config_reset()
            .osc_directory
            .or_else(Self::default_osc_directory)
    }
}

impl AvatarConfigStore for VrchatAvatarConfigs {
    fn remove_avatar_config(&self, avatar_id: &str) -> Result<usize, AvatarConfigError> {
        let osc_dir = self
            .osc_directory()
            .ok_or(AvatarConfigError::NoOscDirectory)?;
        remove_from_dir(&osc_dir, avatar_id)
    }
}

/// Removes `<osc_dir>/*/Avatars/<avatar_id>.json`
pub fn remove_from_dir(osc_dir: &Path, avatar_id: &str) -> Result<usize, AvatarConfigError> {
    if avatar_id.is_empty()
        || avatar_id.contains(['/', '\\'])
        || avatar_id.contains("..")
    {
        return Err(AvatarConfigError::InvalidAvatarId(avatar_id.to_string()));
    }

    if !osc_dir.is_dir() {
        debug!("OSC directory {} does not exist", osc_dir.display());
        return Ok(0);
    }

    let file_name = format!("{}.json", avatar_id);
    let mut removed = 0;
    for entry in std::fs::read_dir(osc_dir)? {
        let user_dir = entry?.path();
        if !user_dir.is_dir() {
            continue;
        }
        let candidate = user_dir.join(AVATARS_DIR).join(&file_name);
        if candidate.is_file() {
            std::fs::remove_file(&candidate)?;
            info!("Removed avatar OSC config {}", candidate.display());
            removed += 1;
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::{ConnectionConfig, DevicesConfig, VRChatConfig};
    use tempfile::tempdir;

    fn write_avatar(root: &Path, user: &str, avatar: &str) -> PathBuf {
        let dir = root.join(user).join(AVATARS_DIR);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(format!("{}.json", avatar));
        std::fs::write(&path, "{}").unwrap();
        path
    }

    #[test]
    fn test_removes_matching_file_for_every_user() {
        let temp = tempdir().unwrap();
        let first = write_avatar(temp.path(), "usr_a", "avtr_1");
        let second = write_avatar(temp.path(), "usr_b", "avtr_1");
        let other = write_avatar(temp.path(), "usr_a", "avtr_2");

        let removed = remove_from_dir(temp.path(), "avtr_1").unwrap();

        assert_eq!(removed, 2);
        assert!(!first.exists());
        assert!(!second.exists());
        assert!(other.exists());
    }

    #[test]
    fn test_rejects_path_like_ids() {
        let temp = tempdir().unwrap();
        for id in ["", "../avtr", "usr/avtr", "a\\b"] {
            assert!(matches!(
                remove_from_dir(temp.path(), id),
                Err(AvatarConfigError::InvalidAvatarId(_))
            ));
        }
    }

    #[test]
    fn test_missing_directory_removes_nothing() {
        let temp = tempdir().unwrap();
        let removed = remove_from_dir(&temp.path().join("missing"), "avtr_1").unwrap();
        assert_eq!(removed, 0);
    }

    #[test]
    fn test_store_uses_configured_directory() {
        let temp = tempdir().unwrap();
        let path = write_avatar(temp.path(), "usr_a", "avtr_9");
        let mut vrchat = VRChatConfig::default();
        vrchat.avatar_config_reset.osc_directory = Some(temp.path().to_path_buf());
        let portal = Arc::new(ConfigPortal::new(
            DevicesConfig::default(),
            vrchat,
            ConnectionConfig::default(),
        ));

        let store = VrchatAvatarConfigs::new(portal);
        assert_eq!(store.remove_avatar_config("avtr_9").unwrap(), 1);
        assert!(!path.exists());
    }
}
