//! Error taxonomy of the simulation core.

use ethogram_env::EvaluationError;
use thiserror::Error;

/// Errors raised by the store, the handoff, the networks and the loops.
///
/// # Policy
///
/// - `Evaluation`: caught per behavior and tick, logged, never fatal
/// - `MissingRecord`: the entity is skipped for the rest of the pass
/// - `BufferProtocolViolation`: terminates the compute/display loop
/// - `Configuration`: the mutation is refused, state left unchanged
#[derive(Debug, Error)]
pub enum SimError {
    /// A formula, action script or handler failed
    #[error("Evaluation error: {0}")]
    Evaluation(#[from] EvaluationError),

    /// No record for this entity at this tick (entity removed or joined mid-pass)
    #[error("Missing record for entity {entity} at tick {tick}")]
    MissingRecord { entity: String, tick: usize },

    /// Internal double-buffer invariant broken
    #[error("Buffer protocol violation: {0}")]
    BufferProtocolViolation(String),

    /// Malformed network, document or configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The owning loop was suspended while waiting
    #[error("Loop suspended")]
    Suspended,

    /// Document (de)serialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SimError {
    /// Creates a configuration error.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Creates a protocol violation.
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::BufferProtocolViolation(msg.into())
    }

    /// Creates a missing-record error.
    pub fn missing(entity: impl std::fmt::Display, tick: usize) -> Self {
        Self::MissingRecord {
            entity: entity.to_string(),
            tick,
        }
    }

    /// True for errors that must terminate a loop.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SimError::BufferProtocolViolation(_))
    }
}

/// Convenience alias used throughout the core.
pub type SimResult<T> = Result<T, SimError>;
