//! Error types reported by external collaborators.

use thiserror::Error;

/// Failure of a formula, action script or scripted handler.
///
/// The engine never retries: the failing behavior contributes zero
/// excitation (or no motion) for the tick and the simulation continues.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvaluationError {
    /// Excitation or coefficient formula could not be evaluated
    #[error("Formula error in '{formula}': {reason}")]
    Formula { formula: String, reason: String },

    /// Action script step could not be executed
    #[error("Action error at step {step}: {reason}")]
    Action { step: usize, reason: String },

    /// No handler registered under this name
    #[error("Unknown handler: {0}")]
    UnknownHandler(String),

    /// Handler ran but reported a failure
    #[error("Handler '{handler}' failed: {reason}")]
    Handler { handler: String, reason: String },
}

impl EvaluationError {
    /// Creates a formula error.
    pub fn formula(formula: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Formula {
            formula: formula.into(),
            reason: reason.into(),
        }
    }

    /// Creates an action error.
    pub fn action(step: usize, reason: impl Into<String>) -> Self {
        Self::Action {
            step,
            reason: reason.into(),
        }
    }

    /// Creates a handler failure.
    pub fn handler(handler: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Handler {
            handler: handler.into(),
            reason: reason.into(),
        }
    }
}
