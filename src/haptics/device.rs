//! Device driver boundary for the haptic suit
//!
//! The dispatcher only talks to the suit through [`HapticDevice`]. Submissions
//! are fire-and-forget: a failed pulse is logged by the caller and the next
//! cycle naturally re-submits whatever contacts are still active.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::{debug, info, warn};

/// One timed pulse covering every active contact of a cycle
///
/// `indices` and `strengths` always have the same length.
#[derive(Debug, Clone, PartialEq)]
pub struct HapticPulse {
    indices: Vec<usize>,
    strengths: Vec<f32>,
    duration_ms: u64,
}

impl HapticPulse {
    pub fn new(duration_ms: u64) -> Self {
        Self {
            indices: Vec::new(),
            strengths: Vec::new(),
            duration_ms,
        }
    }

    /// Adds a contact, strength is clamped to 0.0..=1.0
    pub fn push(&mut self, raw_index: usize, strength: f32) {
        self.indices.push(raw_index);
        self.strengths.push(strength.clamp(0.0, 1.0));
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn strengths(&self) -> &[f32] {
        &self.strengths
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Strength for a raw index, if it is part of this pulse
    pub fn strength_of(&self, raw_index: usize) -> Option<f32> {
        self.indices
            .iter()
            .position(|i| *i == raw_index)
            .map(|pos| self.strengths[pos])
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("Failed to connect suit: {0}")]
    ConnectionError(String),

    #[error("Suit is not connected")]
    NotConnected,

    #[error("Failed to send pulse: {0}")]
    SendError(String),
}

/// Handle to the physical suit driver
pub trait HapticDevice: Send + Sync + 'static {
    fn connect(&self) -> Result<(), DeviceError>;

    /// Emits one pulse; callers treat this as fire-and-forget
    fn send_pulse(&self, pulse: &HapticPulse) -> Result<(), DeviceError>;

    fn disconnect(&self) -> Result<(), DeviceError>;

    fn name(&self) -> &str {
        "haptic device"
    }
}

/// Dry-run driver that only logs the pulses it receives
///
/// Used when no vendor SDK is linked into the build.
#[derive(Debug, Default)]
pub struct TracingDevice {
    connected: AtomicBool,
    pulses_sent: AtomicU64,
}

impl TracingDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pulses_sent(&self) -> u64 {
        self.pulses_sent.load(Ordering::Relaxed)
    }
}

impl HapticDevice for TracingDevice {
    fn connect(&self) -> Result<(), DeviceError> {
        if self.connected.swap(true, Ordering::SeqCst) {
            debug!("Tracing device already connected");
        } else {
            info!("Tracing device connected (pulses are logged, not emitted)");
        }
        Ok(())
    }

    fn send_pulse(&self, pulse: &HapticPulse) -> Result<(), DeviceError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(DeviceError::NotConnected);
        }
        self.pulses_sent.fetch_add(1, Ordering::Relaxed);
        debug!(
            "Pulse {}ms: indices={:?} strengths={:?}",
            pulse.duration_ms(),
            pulse.indices(),
            pulse.strengths()
        );
        Ok(())
    }

    fn disconnect(&self) -> Result<(), DeviceError> {
        if self.connected.swap(false, Ordering::SeqCst) {
            info!(
                "Tracing device disconnected after {} pulses",
                self.pulses_sent()
            );
        } else {
            warn!("Tracing device disconnect requested while not connected");
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "tracing device"
    }
}
