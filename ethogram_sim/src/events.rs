//! Notifications broadcast by the compute and display loops.

use ethogram_core::Buffer;
use serde::Serialize;

/// Which schedule a loop runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopRole {
    Compute,
    Display,
}

impl std::fmt::Display for LoopRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoopRole::Compute => write!(f, "compute"),
            LoopRole::Display => write!(f, "display"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SimEvent {
    /// A full pass of `T` ticks was published
    PassComputed { pass: u64, buffer: Buffer, entities: usize },

    /// A published pass was drained by the display loop
    PassDisplayed { pass: u64, buffer: Buffer },

    /// Entities were inserted or removed while a pass was computed
    PopulationChanged { before: usize, after: usize },

    /// A loop stopped on a fatal error
    LoopTerminated { role: LoopRole, reason: String },
}

/// What a loop did before it returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LoopReport {
    pub role: LoopRole,

    /// Completed passes
    pub passes: u64,

    /// Ticks processed, including those of an interrupted pass
    pub ticks: u64,

    /// Entity steps skipped on missing records
    pub skipped: u64,

    /// Stopped by `suspend` rather than by reaching its pass limit
    pub suspended: bool,
}

impl LoopReport {
    pub fn new(role: LoopRole) -> Self {
        Self {
            role,
            passes: 0,
            ticks: 0,
            skipped: 0,
            suspended: false,
        }
    }
}
