//! Dispatcher Handle - lifecycle management for the dispatch loop
//!
//! Owns the dispatcher while it is stopped and the consumer task while it is
//! running. The task hands the machine back when it exits, so contact state
//! and reactivity flags survive a stop/start pair.
//!
//! ```text
//! start() ──► spawn(run_until_shutdown) ──► Running
//! stop()  ──► shutdown_tx ──► poll until finished ──► Stopped
//! ```

use super::engine::{DispatchSettings, HapticDispatcher, Stopped};
use super::error::DispatchError;
use super::event::{event_queue, EventSender};
use crate::haptics::HapticDevice;
use crate::persistence::avatar_config::AvatarConfigStore;
use crate::persistence::config_portal::ConfigPortal;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

const STOP_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Stopped,
    Running,
    Stopping,
}

pub struct DispatcherHandle {
    sender: EventSender,
    state: LifecycleState,
    idle: Option<HapticDispatcher<Stopped>>,
    task_handle: Option<JoinHandle<HapticDispatcher<Stopped>>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl DispatcherHandle {
    pub fn new(
        config: Arc<ConfigPortal>,
        device: Arc<dyn HapticDevice>,
        avatar_configs: Arc<dyn AvatarConfigStore>,
        settings: DispatchSettings,
    ) -> Self {
        let (sender, receiver) = event_queue();
        let dispatcher =
            HapticDispatcher::create(receiver, config, device, avatar_configs, settings);
        Self {
            sender,
            state: LifecycleState::Stopped,
            idle: Some(dispatcher),
            task_handle: None,
            shutdown_tx: None,
        }
    }

    /// Producer handle for protocol callbacks
    pub fn sender(&self) -> EventSender {
        self.sender.clone()
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == LifecycleState::Running
    }

    /// Starts the consumer task; a running task is fully stopped first
    pub async fn start(&mut self) -> Result<(), DispatchError> {
        if self.task_handle.is_some() {
            info!("Dispatcher already running, restarting");
            self.stop().await?;
        }

        let dispatcher = self.idle.take().ok_or_else(|| {
            DispatchError::Unavailable("dispatcher was lost by a failed task".to_string())
        })?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let running = dispatcher.activate();
        let task_handle = tokio::spawn(async move {
            let stopping = running.run_until_shutdown(shutdown_rx).await;
            stopping.shutdown()
        });

        self.shutdown_tx = Some(shutdown_tx);
        self.task_handle = Some(task_handle);
        self.state = LifecycleState::Running;
        info!("Dispatcher started");
        Ok(())
    }

    /// Signals the loop and waits until the task has exited
    ///
    /// Idempotent: stopping a stopped dispatcher is a no-op. Driver panics are
    /// contained inside the loop; any other panic of the task loses the
    /// dispatcher, this returns `TaskError` and later starts fail with
    /// `Unavailable`.
    pub async fn stop(&mut self) -> Result<(), DispatchError> {
        let Some(task_handle) = self.task_handle.take() else {
            debug!("Dispatcher already stopped");
            self.state = LifecycleState::Stopped;
            return Ok(());
        };

        self.state = LifecycleState::Stopping;
        if let Some(tx) = self.shutdown_tx.take() {
            if tx.send(()).is_err() {
                debug!("Dispatch loop already exited");
            }
        }

        while !task_handle.is_finished() {
            debug!("Waiting for dispatch loop to exit");
            tokio::time::sleep(STOP_POLL_INTERVAL).await;
        }

        let result = task_handle.await;
        self.state = LifecycleState::Stopped;
        match result {
            Ok(dispatcher) => {
                self.idle = Some(dispatcher);
                info!("Dispatcher stopped");
                Ok(())
            }
            Err(e) => {
                error!("Dispatch task failed: {}", e);
                Err(DispatchError::TaskError(e.to_string()))
            }
        }
    }
}
