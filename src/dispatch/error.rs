//! Error definitions for the dispatch module

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    /// The consumer task died without handing its state back
    #[error("Dispatcher task failed: {0}")]
    TaskError(String),

    /// No stopped dispatcher is available to start
    #[error("Dispatcher unavailable: {0}")]
    Unavailable(String),
}
