//! Haptic dispatcher with statum state machine
//!
//! The dispatcher is the single consumer of the event queue. Every cycle it
//! drains all queued events, checks the reactivity gate and submits one pulse
//! covering every active, enabled contact.
//!
//! # State Machine
//!
//! ```text
//! Stopped ──► Running ──► Stopping ──► Stopped
//!  (activate)   (deactivate)  (shutdown)
//! ```
//!
//! # Cycle
//!
//! ```text
//! EventReceiver ──► drain ──► [ContactTable, ReactivityFlags]
//!                                  │
//!                             gate check ──► aggregate ──► HapticDevice
//! ```

use super::contacts::ContactTable;
use super::event::{EventReceiver, HapticEvent};
use super::gate::ReactivityFlags;
use crate::haptics::{region_of, HapticDevice, HapticPulse};
use crate::persistence::avatar_config::AvatarConfigStore;
use crate::persistence::config_portal::ConfigPortal;
use crate::persistence::DevicesConfig;
use chrono::{DateTime, Local};
use statum::{machine, state};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

/// Timing of the dispatch loop
#[derive(Clone, Debug)]
pub struct DispatchSettings {
    /// Pause between two cycles
    pub cycle_interval_ms: u64,
    /// Duration of every submitted pulse
    pub pulse_duration_ms: u64,
    /// How often loop statistics are logged
    pub stats_interval_secs: i64,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            cycle_interval_ms: 50,
            pulse_duration_ms: 50,
            stats_interval_secs: 30,
        }
    }
}

/// What a single cycle ended with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// A reactivity flag suppressed emission
    Gated,
    /// Nothing to emit
    Idle,
    /// One pulse with this many contacts was sent
    Submitted(usize),
    /// The device rejected the pulse
    SendFailed,
}

#[derive(Debug, Clone)]
struct DispatchStats {
    cycles: u64,
    events: u64,
    pulses: u64,
    gated: u64,
    last_log: DateTime<Local>,
}

impl Default for DispatchStats {
    fn default() -> Self {
        Self {
            cycles: 0,
            events: 0,
            pulses: 0,
            gated: 0,
            last_log: Local::now(),
        }
    }
}

impl DispatchStats {
    fn record(&mut self, events: usize, outcome: CycleOutcome) {
        self.cycles += 1;
        self.events += events as u64;
        match outcome {
            CycleOutcome::Submitted(_) => self.pulses += 1,
            CycleOutcome::Gated => self.gated += 1,
            CycleOutcome::Idle | CycleOutcome::SendFailed => {}
        }
    }

    fn log_if_due(&mut self, interval_secs: i64) {
        let now = Local::now();
        let elapsed = now - self.last_log;
        if elapsed < chrono::Duration::seconds(interval_secs) {
            return;
        }
        info!(
            "Dispatcher stats: {} cycles, {} events, {} pulses, {} gated in {} seconds",
            self.cycles,
            self.events,
            self.pulses,
            self.gated,
            elapsed.num_seconds()
        );
        *self = Self {
            last_log: now,
            ..Self::default()
        };
    }
}

#[state]
#[derive(Debug, Clone)]
pub enum DispatchState {
    Stopped,
    Running,
    Stopping,
}

#[machine]
pub struct HapticDispatcher<S: DispatchState> {
    events: EventReceiver,
    config: Arc<ConfigPortal>,
    device: Arc<dyn HapticDevice>,
    avatar_configs: Arc<dyn AvatarConfigStore>,
    settings: DispatchSettings,
    contacts: ContactTable,
    flags: ReactivityFlags,
    stats: DispatchStats,
}

impl<S: DispatchState> HapticDispatcher<S> {
    pub fn contacts(&self) -> &ContactTable {
        &self.contacts
    }

    pub fn flags(&self) -> ReactivityFlags {
        self.flags
    }
}

impl HapticDispatcher<Stopped> {
    pub fn create(
        events: EventReceiver,
        config: Arc<ConfigPortal>,
        device: Arc<dyn HapticDevice>,
        avatar_configs: Arc<dyn AvatarConfigStore>,
        settings: DispatchSettings,
    ) -> Self {
        info!(
            "Creating haptic dispatcher for {} with settings: {:?}",
            device.name(),
            settings
        );
        Self::new(
            events,
            config,
            device,
            avatar_configs,
            settings,
            ContactTable::default(),
            ReactivityFlags::default(),
            DispatchStats::default(),
        )
    }

    pub fn activate(self) -> HapticDispatcher<Running> {
        info!("Activating haptic dispatcher");
        self.transition()
    }
}

impl HapticDispatcher<Running> {
    /// Applies every currently queued event, returns how many were applied
    pub fn drain_events(&mut self) -> usize {
        let mut count = 0;
        while let Some(event) = self.events.try_pop() {
            self.apply_event(event);
            count += 1;
        }
        if count > 0 {
            debug!("Drained {} events", count);
        }
        count
    }

    pub fn apply_event(&mut self, event: HapticEvent) {
        match event {
            HapticEvent::AfkChanged(value) => {
                info!("AFK = {}", value);
                self.flags.afk = value;
            }
            HapticEvent::InStationChanged(value) => {
                info!("InStation = {}", value);
                self.flags.in_station = value;
            }
            HapticEvent::SeatedChanged(value) => {
                info!("Seated = {}", value);
                self.flags.seated = value;
            }
            HapticEvent::AvatarChanged(avatar_id) => {
                info!("Avatar changed to {}, resetting contacts", avatar_id);
                self.contacts.clear();
                if self.config.avatar_config_reset().enabled {
                    match self.avatar_configs.remove_avatar_config(&avatar_id) {
                        Ok(0) => debug!("No cached OSC config for {}", avatar_id),
                        Ok(removed) => {
                            info!("Removed {} OSC config file(s) for {}", removed, avatar_id)
                        }
                        Err(e) => warn!("Could not reset OSC config for {}: {}", avatar_id, e),
                    }
                }
            }
            HapticEvent::ContactChanged {
                raw_index,
                intensity,
            } => {
                if intensity > 0 {
                    if let Err(e) = region_of(raw_index) {
                        error!("Dropping contact event: {}", e);
                        return;
                    }
                }
                if let Err(e) = self.contacts.set(raw_index, intensity) {
                    error!("Dropping contact event: {}", e);
                }
            }
        }
    }

    /// Aggregates active contacts of enabled regions into one pulse
    pub fn build_pulse(&self) -> Option<HapticPulse> {
        let devices = self.config.devices().unwrap_or_else(|e| {
            warn!("Using default device settings for this cycle: {}", e);
            DevicesConfig::default()
        });

        let mut pulse = HapticPulse::new(self.settings.pulse_duration_ms);
        for (raw_index, intensity) in self.contacts.active() {
            let region = match region_of(raw_index) {
                Ok(region) => region,
                Err(e) => {
                    warn!("Skipping contact: {}", e);
                    continue;
                }
            };
            if !devices.settings_for(region).enabled {
                continue;
            }
            pulse.push(raw_index, f32::from(intensity) / 100.0);
        }

        if pulse.is_empty() {
            None
        } else {
            Some(pulse)
        }
    }

    /// Drain, gate and submit once
    pub fn run_cycle(&mut self) -> CycleOutcome {
        let drained = self.drain_events();

        let outcome = if !self.flags.allows_haptics(&self.config.reactivity()) {
            debug!("Haptics gated by reactivity flags: {:?}", self.flags);
            CycleOutcome::Gated
        } else {
            match self.build_pulse() {
                None => CycleOutcome::Idle,
                Some(pulse) => self.submit(&pulse),
            }
        };

        self.stats.record(drained, outcome);
        outcome
    }

    /// Hands one pulse to the driver; a panicking driver counts as a failed send
    fn submit(&self, pulse: &HapticPulse) -> CycleOutcome {
        let device = &self.device;
        match panic::catch_unwind(AssertUnwindSafe(|| device.send_pulse(pulse))) {
            Ok(Ok(())) => CycleOutcome::Submitted(pulse.len()),
            Ok(Err(e)) => {
                warn!("Failed to submit pulse: {}", e);
                CycleOutcome::SendFailed
            }
            Err(_) => {
                error!("{} panicked while submitting a pulse", device.name());
                CycleOutcome::SendFailed
            }
        }
    }

    /// Runs cycles until the shutdown signal fires (or its sender is dropped)
    pub async fn run_until_shutdown(
        mut self,
        mut shutdown_rx: oneshot::Receiver<()>,
    ) -> HapticDispatcher<Stopping> {
        info!(
            "Starting dispatch loop with {}ms cycle",
            self.settings.cycle_interval_ms
        );
        let cycle_interval = Duration::from_millis(self.settings.cycle_interval_ms);

        loop {
            self.run_cycle();
            self.stats.log_if_due(self.settings.stats_interval_secs);

            tokio::select! {
                _ = &mut shutdown_rx => {
                    info!("Shutdown signal received by dispatch loop");
                    break;
                }
                _ = tokio::time::sleep(cycle_interval) => {}
            }
        }

        self.deactivate()
    }

    pub fn deactivate(self) -> HapticDispatcher<Stopping> {
        info!("Deactivating haptic dispatcher");
        self.transition()
    }
}

impl HapticDispatcher<Stopping> {
    pub fn shutdown(self) -> HapticDispatcher<Stopped> {
        info!(
            "Haptic dispatcher stopped with {} active contacts",
            self.contacts.active_count()
        );
        self.transition()
    }
}
