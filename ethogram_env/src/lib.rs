//! Ethogram Environment Abstraction Layer
//!
//! This crate holds everything the simulation core consumes from the
//! outside world through a narrow interface:
//!
//! - Time (`SimClock::now()`, `SimClock::sleep()`)
//! - Excitation formulas (`ExcitationEvaluator`)
//! - Behavior task queues (`ActionPerformer`)
//! - Scripted dynamics handlers (`HandlerInvoker`)
//!
//! The core crate never interprets user text itself, so the presentation
//! and scripting layers can be swapped without touching the engine.
//!
//! # Example
//!
//! ```ignore
//! use ethogram_env::{PropertyEvaluator, StepScriptPerformer, HandlerTable};
//!
//! let evaluator = PropertyEvaluator::new();
//! let performer = StepScriptPerformer::new();
//! let handlers = HandlerTable::new();
//! handlers.register("circle", |e| { e.set_direction(e.direction() + 0.1); Ok(()) });
//! ```

mod clock;
mod collaborators;
mod error;
mod scripted;
mod tokio_impl;
mod types;

pub use clock::SimClock;
pub use collaborators::{ActionPerformer, EntityMut, EntityView, ExcitationEvaluator, HandlerInvoker};
pub use error::EvaluationError;
pub use scripted::{Handler, HandlerTable, PropertyEvaluator, StepScriptPerformer};
pub use tokio_impl::TokioClock;
pub use types::{BehaviorScript, MotionCommand, MoveKind, TaskCursor};
