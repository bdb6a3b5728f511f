//! Haptic event translation & dispatch
//!
//! Implements the single-consumer pipeline between the OSC callbacks and the
//! suit driver:
//!
//! 1. [`event`] - unbounded multi-producer queue of typed events
//! 2. [`contacts`] / [`gate`] - state owned by the consumer
//! 3. [`engine`] - statum state machine running the 50ms cycle
//! 4. [`handle`] - start/stop lifecycle
//!
//! # Architecture
//!
//! ```text
//! OSC callbacks ──► EventSender ──► HapticDispatcher ──► HapticDevice
//!  (any thread)     (unbounded)     (drain, gate, aggregate)
//! ```

pub mod contacts;
pub mod engine;
pub mod error;
pub mod event;
pub mod gate;
pub mod handle;

pub use contacts::ContactTable;
pub use engine::{CycleOutcome, DispatchSettings, HapticDispatcher};
pub use error::DispatchError;
pub use event::{event_queue, EventReceiver, EventSender, HapticEvent};
pub use gate::ReactivityFlags;
pub use handle::{DispatcherHandle, LifecycleState};
