//! # OSC Integration Module
//!
//! Receives avatar parameters from VRChat over Open Sound Control and turns
//! them into dispatcher events.
//!
//! ```text
//! osc/
//! ├── routes.rs    - address → handler table and the VRChat parameter routes
//! └── receiver.rs  - UDP socket task decoding packets with rosc
//! ```
//!
//! Handlers run on the receiver task and only ever push into the event queue,
//! so they never block on the dispatcher.

pub mod receiver;
pub mod routes;

use thiserror::Error;

pub use receiver::OscReceiver;
pub use routes::{vrchat_router, OscRouter};

#[derive(Debug, Error)]
pub enum OscError {
    #[error("Network error: {0}")]
    Network(#[from] std::io::Error),

    #[error("OSC decoding error: {0}")]
    Decoding(String),

    #[error("Invalid OSC address: {0}")]
    InvalidAddress(String),
}

pub type OscResult<T> = Result<T, OscError>;
