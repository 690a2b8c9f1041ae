//! Errors surfaced by the drivers and the CLI.

use ethogram_core::SimError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunError {
    /// Error raised by the core (protocol violation, bad configuration)
    #[error(transparent)]
    Sim(#[from] SimError),

    /// A loop task panicked or was cancelled
    #[error("Loop task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Engine misuse (starting twice, resetting while running)
    #[error("Engine error: {0}")]
    Engine(String),
}

impl RunError {
    pub fn engine(msg: impl Into<String>) -> Self {
        Self::Engine(msg.into())
    }
}

pub type RunResult<T> = Result<T, RunError>;
