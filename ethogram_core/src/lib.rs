//! Ethogram Core - Behavior-Network Simulation Engine
//!
//! This library covers the two parts of the simulation with real
//! coordination and numeric dynamics:
//! 1. **Trajectory store**: per-entity double buffers of `T` ticks shared by a
//!    compute producer and a display consumer, handed over through a
//!    blocking buffer-switch protocol
//! 2. **Action selection**: each tick, an agent's behavior network is turned
//!    into one motion via mutual inhibition, cooperative aggregation or an
//!    external dynamics handler

pub mod behavior;
pub mod context;
pub mod document;
pub mod entity;
pub mod environment;
pub mod error;
pub mod handoff;
pub mod mechanism;
pub mod network;
pub mod population;
pub mod store;

// Re-export key types for convenience
pub use behavior::{Behavior, BehaviorId, Edge};
pub use context::SimulationContext;
pub use document::{BehaviorDocument, NetworkDocument};
pub use entity::{ActivityState, DisplaySnapshot, Entity, EntityId, EntityKey, EntityRecord, Position};
pub use environment::{BoundaryKind, Environment, Side};
pub use error::{SimError, SimResult};
pub use handoff::{Buffer, BufferSwitch, ComputeLease, LoopControl, SwitchState};
pub use mechanism::{ActionSelection, TickOutcome};
pub use network::BehaviorNetwork;
pub use population::{Agent, AgentTemplate, CategoryRegistry, Population};
pub use store::TrajectoryStore;
