//! Haptic suit model
//!
//! - [`region`] - static partition of raw contact slots into body regions
//! - [`device`] - driver trait the dispatcher submits pulses to

pub mod device;
pub mod region;

pub use device::{DeviceError, HapticDevice, HapticPulse, TracingDevice};
pub use region::{region_of, HapticRegion, RegionError, HAPTICS_COUNT};
