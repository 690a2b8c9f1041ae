//! Scripted dynamics: a compiled handler moves the entity.

use super::TickOutcome;
use crate::context::SimulationContext;
use crate::entity::Entity;
use tracing::warn;

/// Re-invokes one externally compiled zero-argument handler each tick.
///
/// Compiling and verifying `script` is the handler collaborator's job;
/// this mechanism only keeps the text for export and the handler name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SystemDynamics {
    pub handler: String,
    pub script: String,
}

impl SystemDynamics {
    pub fn new(handler: impl Into<String>, script: impl Into<String>) -> Self {
        Self {
            handler: handler.into(),
            script: script.into(),
        }
    }

    pub(super) fn execute(&self, entity: &mut Entity, ctx: &SimulationContext) -> TickOutcome {
        if let Err(e) = ctx.handlers().invoke_handler(entity, &self.handler) {
            warn!(entity = %entity.display_name, handler = %self.handler, "handler failed: {}", e);
        }

        TickOutcome {
            boundary: ctx.environment().confine(entity),
            ..TickOutcome::default()
        }
    }
}
