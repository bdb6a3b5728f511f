use color_eyre::{eyre::eyre, Result};
use shockwave_bridge::dispatch::{DispatchSettings, DispatcherHandle};
use shockwave_bridge::haptics::{HapticDevice, TracingDevice};
use shockwave_bridge::osc::{vrchat_router, OscReceiver};
use shockwave_bridge::persistence::avatar_config::VrchatAvatarConfigs;
use shockwave_bridge::persistence::config_portal::ConfigPortal;
use shockwave_bridge::persistence::config_store::ConfigStore;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

const CONFIG_RELOAD_INTERVAL_SECS: u64 = 2;

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let (store, config_portal) = setup_config().await?;
    let connection = config_portal
        .connection()
        .map_err(|e| eyre!("Failed to read connection config: {}", e))?;

    // Port belegen bevor irgendetwas startet, zweite Instanz bricht hier ab
    let socket = OscReceiver::bind(&connection)
        .await
        .map_err(|e| eyre!("Failed to bind OSC receiver, is another instance running? {}", e))?;

    let (connection_tx, connection_rx) = watch::channel(connection);
    let reload_handle =
        store.spawn_reload_task(config_portal.clone(), connection_tx, CONFIG_RELOAD_INTERVAL_SECS);

    // Geraet verbinden
    let device: Arc<dyn HapticDevice> = Arc::new(TracingDevice::new());
    device
        .connect()
        .map_err(|e| eyre!("Failed to connect {}: {}", device.name(), e))?;

    let mut dispatcher = DispatcherHandle::new(
        config_portal.clone(),
        device.clone(),
        Arc::new(VrchatAvatarConfigs::new(config_portal.clone())),
        DispatchSettings::default(),
    );

    let router = Arc::new(vrchat_router(dispatcher.sender(), config_portal.clone()));
    let cancel = CancellationToken::new();
    let receiver = OscReceiver::new(router, connection_rx, cancel.clone());
    let receiver_handle = tokio::spawn(receiver.run(socket));

    dispatcher
        .start()
        .await
        .map_err(|e| eyre!("Failed to start dispatcher: {}", e))?;

    info!("Bridge running, press Ctrl+C to exit");
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {}", e);
    }
    info!("Shutting down");

    if let Err(e) = dispatcher.stop().await {
        error!("Dispatcher did not stop cleanly: {}", e);
    }

    cancel.cancel();
    match receiver_handle.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!("OSC receiver failed: {}", e),
        Err(e) => error!("OSC receiver task failed: {}", e),
    }

    if let Err(e) = device.disconnect() {
        warn!("Failed to disconnect {}: {}", device.name(), e);
    }

    // Reload-Task beenden, damit er nicht mit dem Speichern kollidiert
    reload_handle.abort();
    if let Err(e) = reload_handle.await {
        if !e.is_cancelled() {
            error!("Config reload task failed: {}", e);
        }
    }

    if let Err(e) = store.save_all(&config_portal).await {
        error!("Failed to save config: {}", e);
    }

    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}

async fn setup_config() -> Result<(ConfigStore, Arc<ConfigPortal>)> {
    let store = ConfigStore::new(ConfigStore::default_dir()?);

    // Standardkonfiguration anlegen falls Dateien fehlen
    store.ensure_defaults().await?;

    let config_portal = Arc::new(store.load_portal().await?);
    log_config(&config_portal);

    Ok((store, config_portal))
}

fn log_config(config_portal: &ConfigPortal) {
    match config_portal.devices() {
        Ok(devices) => devices.log_summary(),
        Err(e) => warn!("Unable to read devices config: {}", e),
    }
    match config_portal.vrchat() {
        Ok(vrchat) => vrchat.log_summary(),
        Err(e) => warn!("Unable to read vrchat config: {}", e),
    }
    match config_portal.connection() {
        Ok(connection) => connection.log_summary(),
        Err(e) => warn!("Unable to read connection config: {}", e),
    }
}
