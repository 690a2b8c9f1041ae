//! Narrow interfaces to the external collaborators of the engine.
//!
//! The engine never parses formulas or runs user code itself. It hands an
//! entity view to one of these traits and consumes the numeric or motion
//! result:
//!
//! ```text
//! mechanism ──evaluate_excitation──► ExcitationEvaluator ──► f64
//!           ──perform_next_action──► ActionPerformer     ──► Option<MotionCommand>
//!           ──invoke_handler───────► HandlerInvoker      ──► entity mutated in place
//! ```

use crate::error::EvaluationError;
use crate::types::{BehaviorScript, MotionCommand, TaskCursor};

/// Read access to an entity's state.
pub trait EntityView {
    /// Looks up a named numeric property.
    fn property(&self, name: &str) -> Option<f64>;

    /// Current position `[x, y]`.
    fn position(&self) -> [f64; 2];

    /// Current heading in radians.
    fn direction(&self) -> f64;

    /// Current speed.
    fn speed(&self) -> f64;
}

/// Write access to an entity's state, granted to task queues and handlers.
pub trait EntityMut: EntityView {
    fn set_position(&mut self, position: [f64; 2]);

    fn set_direction(&mut self, radians: f64);

    fn set_speed(&mut self, speed: f64);

    fn set_property(&mut self, name: &str, value: f64);
}

/// Turns a behavior's textual formulas into numbers.
pub trait ExcitationEvaluator: Send + Sync {
    /// Evaluates the behavior's excitation formula against the entity.
    fn evaluate_excitation(
        &self,
        entity: &dyn EntityView,
        behavior: &BehaviorScript,
    ) -> Result<f64, EvaluationError>;

    /// Evaluates a free-standing formula (dynamic inhibition coefficients).
    fn evaluate_formula(
        &self,
        entity: &dyn EntityView,
        formula: &str,
    ) -> Result<f64, EvaluationError>;
}

/// Executes one step of a behavior's task queue.
pub trait ActionPerformer: Send + Sync {
    /// Runs the step at `cursor` and advances it.
    ///
    /// # Returns
    /// * `Ok(Some(cmd))` - the step produced a motion
    /// * `Ok(None)` - the queue is exhausted (the cursor is marked so)
    fn perform_next_action(
        &self,
        entity: &mut dyn EntityMut,
        action_script: &str,
        cursor: &mut TaskCursor,
    ) -> Result<Option<MotionCommand>, EvaluationError>;
}

/// Runs a compiled zero-argument handler against an entity.
pub trait HandlerInvoker: Send + Sync {
    fn invoke_handler(
        &self,
        entity: &mut dyn EntityMut,
        handler: &str,
    ) -> Result<(), EvaluationError>;
}
