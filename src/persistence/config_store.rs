//! Loading, saving and hot-reloading of the TOML configuration files
//!
//! The reload task polls modification times instead of using a filesystem
//! watcher; users edit these files rarely and a few seconds of latency is fine.

use super::config_portal::ConfigPortal;
use super::{ConnectionConfig, DevicesConfig, VRChatConfig};
use color_eyre::{eyre::eyre, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

const CONFIG_DIR: &str = ".config/shockwave-bridge";
const CONFIG_DIR_ENV: &str = "SHOCKWAVE_BRIDGE_CONFIG_DIR";
pub const DEVICES_FILE: &str = "devices.toml";
pub const VRCHAT_FILE: &str = "vrchat.toml";
pub const CONNECTION_FILE: &str = "connection.toml";

/// Directory holding the three config files
#[derive(Debug, Clone)]
pub struct ConfigStore {
    dir: PathBuf,
}

impl ConfigStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `$SHOCKWAVE_BRIDGE_CONFIG_DIR` or `~/.config/shockwave-bridge`
    pub fn default_dir() -> Result<PathBuf> {
        if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
            return Ok(PathBuf::from(dir));
        }
        let mut dir = dirs::home_dir().ok_or_else(|| eyre!("Could not resolve home directory"))?;
        dir.push(CONFIG_DIR);
        Ok(dir)
    }

    fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    /// Creates the directory and writes defaults for every missing file
    pub async fn ensure_defaults(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| eyre!("Failed to create config directory {}: {}", self.dir.display(), e))?;

        self.write_default_if_missing::<DevicesConfig>(DEVICES_FILE)
            .await?;
        self.write_default_if_missing::<VRChatConfig>(VRCHAT_FILE)
            .await?;
        self.write_default_if_missing::<ConnectionConfig>(CONNECTION_FILE)
            .await?;
        Ok(())
    }

    async fn write_default_if_missing<T: Default + Serialize>(&self, file: &str) -> Result<()> {
        let path = self.path(file);
        let exists = tokio::fs::try_exists(&path)
            .await
            .map_err(|e| eyre!("Failed to check {}: {}", path.display(), e))?;
        if !exists {
            info!("Creating default {}", path.display());
            write_toml(&path, &T::default()).await?;
        }
        Ok(())
    }

    /// Loads all sections; broken files fall back to defaults
    pub async fn load_portal(&self) -> Result<ConfigPortal> {
        let devices = self.load_or_default::<DevicesConfig>(DEVICES_FILE).await;
        let vrchat = self.load_or_default::<VRChatConfig>(VRCHAT_FILE).await;
        let connection = self
            .load_or_default::<ConnectionConfig>(CONNECTION_FILE)
            .await;
        Ok(ConfigPortal::new(devices, vrchat, connection))
    }

    async fn load_or_default<T: Default + DeserializeOwned>(&self, file: &str) -> T {
        let path = self.path(file);
        match read_toml(&path).await {
            Ok(value) => value,
            Err(e) => {
                warn!("{} unavailable, using defaults: {}", file, e);
                T::default()
            }
        }
    }

    /// Persists the current portal contents
    pub async fn save_all(&self, portal: &ConfigPortal) -> Result<()> {
        let devices = portal
            .devices()
            .map_err(|e| eyre!("Failed to read devices config: {}", e))?;
        let vrchat = portal
            .vrchat()
            .map_err(|e| eyre!("Failed to read vrchat config: {}", e))?;
        let connection = portal
            .connection()
            .map_err(|e| eyre!("Failed to read connection config: {}", e))?;

        write_toml(&self.path(DEVICES_FILE), &devices).await?;
        write_toml(&self.path(VRCHAT_FILE), &vrchat).await?;
        write_toml(&self.path(CONNECTION_FILE), &connection).await?;
        info!("Configuration saved to {}", self.dir.display());
        Ok(())
    }

    /// Polls the config files and swaps changed sections into the portal
    ///
    /// Connection changes are additionally published on `connection_tx` so the
    /// OSC receiver can rebind.
    pub fn spawn_reload_task(
        &self,
        portal: Arc<ConfigPortal>,
        connection_tx: watch::Sender<ConnectionConfig>,
        interval_secs: u64,
    ) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(tokio::time::Duration::from_secs(interval_secs.max(1)));
            let mut devices_mtime = store.modified(DEVICES_FILE).await;
            let mut vrchat_mtime = store.modified(VRCHAT_FILE).await;
            let mut connection_mtime = store.modified(CONNECTION_FILE).await;
            info!("Config reload task watching {}", store.dir.display());

            loop {
                interval.tick().await;

                let mtime = store.modified(DEVICES_FILE).await;
                if mtime != devices_mtime {
                    devices_mtime = mtime;
                    store.reload_devices(&portal).await;
                }

                let mtime = store.modified(VRCHAT_FILE).await;
                if mtime != vrchat_mtime {
                    vrchat_mtime = mtime;
                    store.reload_vrchat(&portal).await;
                }

                let mtime = store.modified(CONNECTION_FILE).await;
                if mtime != connection_mtime {
                    connection_mtime = mtime;
                    if let Some(connection) = store.reload_connection(&portal).await {
                        if connection_tx.send(connection).is_err() {
                            debug!("No OSC receiver listening for connection changes");
                        }
                    }
                }
            }
        })
    }

    async fn modified(&self, file: &str) -> Option<SystemTime> {
        tokio::fs::metadata(self.path(file))
            .await
            .and_then(|meta| meta.modified())
            .ok()
    }

    async fn reload_devices(&self, portal: &ConfigPortal) {
        match read_toml::<DevicesConfig>(&self.path(DEVICES_FILE)).await {
            Ok(devices) => {
                info!("{} reloaded", DEVICES_FILE);
                devices.log_summary();
                if let Err(e) = portal.write_devices(devices) {
                    error!("Failed to apply {}: {}", DEVICES_FILE, e);
                }
            }
            Err(e) => warn!("Keeping previous devices config: {}", e),
        }
    }

    async fn reload_vrchat(&self, portal: &ConfigPortal) {
        match read_toml::<VRChatConfig>(&self.path(VRCHAT_FILE)).await {
            Ok(vrchat) => {
                info!("{} reloaded", VRCHAT_FILE);
                vrchat.log_summary();
                if let Err(e) = portal.write_vrchat(vrchat) {
                    error!("Failed to apply {}: {}", VRCHAT_FILE, e);
                }
            }
            Err(e) => warn!("Keeping previous vrchat config: {}", e),
        }
    }

    async fn reload_connection(&self, portal: &ConfigPortal) -> Option<ConnectionConfig> {
        match read_toml::<ConnectionConfig>(&self.path(CONNECTION_FILE)).await {
            Ok(connection) => {
                info!("{} reloaded", CONNECTION_FILE);
                connection.log_summary();
                if let Err(e) = portal.write_connection(connection.clone()) {
                    error!("Failed to apply {}: {}", CONNECTION_FILE, e);
                    return None;
                }
                Some(connection)
            }
            Err(e) => {
                warn!("Keeping previous connection config: {}", e);
                None
            }
        }
    }
}

async fn read_toml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| eyre!("Failed to read {}: {}", path.display(), e))?;
    toml::from_str(&content).map_err(|e| eyre!("Failed to parse {}: {}", path.display(), e))
}

async fn write_toml<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = toml::to_string_pretty(value)
        .map_err(|e| eyre!("Failed to serialize {}: {}", path.display(), e))?;
    tokio::fs::write(path, content)
        .await
        .map_err(|e| eyre!("Failed to write {}: {}", path.display(), e))
}
