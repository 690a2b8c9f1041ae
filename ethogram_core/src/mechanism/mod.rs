//! Action-selection mechanisms.
//!
//! Each tick, the owning agent's mechanism turns its behavior network into
//! at most one motion of the entity:
//!
//! | Mechanism          | Selection                                   |
//! |--------------------|---------------------------------------------|
//! | `NoDynamics`       | nothing moves                               |
//! | `MutualInhibition` | one winner after competitive inhibition     |
//! | `Cooperative`      | weighted vector sum of every behavior       |
//! | `SystemDynamics`   | an external handler mutates the entity      |
//!
//! The mechanism is a closed enum: swapping it at runtime replaces the value,
//! copying it is a plain `clone()`.

mod cooperative;
mod mutual_inhibition;
mod system_dynamics;

pub use cooperative::Cooperative;
pub use mutual_inhibition::{MutualInhibition, SelectionPhase};
pub use system_dynamics::SystemDynamics;

use crate::context::SimulationContext;
use crate::entity::Entity;
use crate::environment::Side;
use crate::network::BehaviorNetwork;
use ethogram_env::MotionCommand;

/// What one tick of action selection did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickOutcome {
    /// Index (priority order) of the winning behavior, `None` for NO_BEHAVIOR
    pub winner: Option<usize>,

    /// Motion applied to the entity
    pub command: Option<MotionCommand>,

    /// Boundary side handled after the motion
    pub boundary: Option<Side>,
}

/// The action-selection mechanism owned by one agent.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ActionSelection {
    #[default]
    NoDynamics,
    MutualInhibition(MutualInhibition),
    Cooperative(Cooperative),
    SystemDynamics(SystemDynamics),
}

impl ActionSelection {
    pub fn mutual_inhibition() -> Self {
        ActionSelection::MutualInhibition(MutualInhibition::new())
    }

    pub fn cooperative() -> Self {
        ActionSelection::Cooperative(Cooperative)
    }

    pub fn system_dynamics(handler: impl Into<String>, script: impl Into<String>) -> Self {
        ActionSelection::SystemDynamics(SystemDynamics::new(handler, script))
    }

    pub fn name(&self) -> &'static str {
        match self {
            ActionSelection::NoDynamics => "no_dynamics",
            ActionSelection::MutualInhibition(_) => "mutual_inhibition",
            ActionSelection::Cooperative(_) => "cooperative",
            ActionSelection::SystemDynamics(_) => "system_dynamics",
        }
    }

    /// Runs one tick of action selection on `entity`.
    pub fn execute(
        &mut self,
        entity: &mut Entity,
        network: &mut BehaviorNetwork,
        ctx: &SimulationContext,
    ) -> TickOutcome {
        match self {
            ActionSelection::NoDynamics => TickOutcome::default(),
            ActionSelection::MutualInhibition(m) => m.execute(entity, network, ctx),
            ActionSelection::Cooperative(c) => c.execute(entity, network, ctx),
            ActionSelection::SystemDynamics(s) => s.execute(entity, ctx),
        }
    }

    /// Forgets per-run state (previous winner).
    pub fn reset(&mut self) {
        if let ActionSelection::MutualInhibition(m) = self {
            *m = MutualInhibition::new();
        }
    }
}
