//! Bridge from VRChat avatar contact parameters to a Shockwave haptic suit
//!
//! ```text
//! osc/          - UDP receiver and VRChat parameter routes
//! dispatch/     - event queue and the 50ms consumer loop
//! haptics/      - region map and device driver boundary
//! persistence/  - TOML configuration and avatar config reset
//! ```

pub mod dispatch;
pub mod haptics;
pub mod osc;
pub mod persistence;
