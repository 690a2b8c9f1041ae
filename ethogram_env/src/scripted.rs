//! Reference collaborators driven by tiny text scripts.
//!
//! These are not a scripting language. They give the CLI scenarios and the
//! test suites something deterministic to evaluate:
//!
//! - `PropertyEvaluator`: `0.5`, `hunger`, `hunger * 0.8`
//! - `StepScriptPerformer`: `forward 1.0 0.0; backward 0.5 3.14; hold`
//! - `HandlerTable`: named Rust closures standing in for compiled methods

use crate::collaborators::{ActionPerformer, EntityMut, EntityView, ExcitationEvaluator, HandlerInvoker};
use crate::error::EvaluationError;
use crate::types::{BehaviorScript, MotionCommand, TaskCursor};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Evaluates literals, property names and `term * term` products.
///
/// Besides the entity's named properties, the builtins `x`, `y`, `speed`
/// and `direction` resolve to the entity's kinematic state.
#[derive(Debug, Clone, Copy, Default)]
pub struct PropertyEvaluator;

impl PropertyEvaluator {
    pub fn new() -> Self {
        Self
    }

    fn term(entity: &dyn EntityView, formula: &str, term: &str) -> Result<f64, EvaluationError> {
        let term = term.trim();
        if term.is_empty() {
            return Err(EvaluationError::formula(formula, "empty term"));
        }
        if let Ok(value) = term.parse::<f64>() {
            return Ok(value);
        }
        let value = match term {
            "x" => Some(entity.position()[0]),
            "y" => Some(entity.position()[1]),
            "speed" => Some(entity.speed()),
            "direction" => Some(entity.direction()),
            name => entity.property(name),
        };
        value.ok_or_else(|| EvaluationError::formula(formula, format!("unknown property '{}'", term)))
    }
}

impl ExcitationEvaluator for PropertyEvaluator {
    fn evaluate_excitation(
        &self,
        entity: &dyn EntityView,
        behavior: &BehaviorScript,
    ) -> Result<f64, EvaluationError> {
        self.evaluate_formula(entity, &behavior.excitation_formula)
    }

    fn evaluate_formula(
        &self,
        entity: &dyn EntityView,
        formula: &str,
    ) -> Result<f64, EvaluationError> {
        let mut product = 1.0;
        for term in formula.split('*') {
            product *= Self::term(entity, formula, term)?;
        }
        if product.is_finite() {
            Ok(product)
        } else {
            Err(EvaluationError::formula(formula, "result is not finite"))
        }
    }
}

/// Executes `;`-separated steps, one per call.
#[derive(Debug, Clone, Copy, Default)]
pub struct StepScriptPerformer;

impl StepScriptPerformer {
    pub fn new() -> Self {
        Self
    }

    fn parse_step(
        step_index: usize,
        step: &str,
        heading: f64,
    ) -> Result<MotionCommand, EvaluationError> {
        let mut words = step.split_whitespace();
        let verb = words.next().unwrap_or_default();
        let mut number = |what: &str| -> Result<f64, EvaluationError> {
            let raw = words
                .next()
                .ok_or_else(|| EvaluationError::action(step_index, format!("missing {}", what)))?;
            raw.parse::<f64>()
                .map_err(|_| EvaluationError::action(step_index, format!("bad {} '{}'", what, raw)))
        };

        match verb {
            "forward" => {
                let speed = number("speed")?;
                let direction = number("direction")?;
                Ok(MotionCommand::forward(speed, direction))
            }
            "backward" => {
                let speed = number("speed")?;
                let direction = number("direction")?;
                Ok(MotionCommand::backward(speed, direction))
            }
            "hold" => Ok(MotionCommand::forward(0.0, heading)),
            other => Err(EvaluationError::action(step_index, format!("unknown verb '{}'", other))),
        }
    }
}

impl ActionPerformer for StepScriptPerformer {
    fn perform_next_action(
        &self,
        entity: &mut dyn EntityMut,
        action_script: &str,
        cursor: &mut TaskCursor,
    ) -> Result<Option<MotionCommand>, EvaluationError> {
        let steps: Vec<&str> = action_script
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();

        let index = cursor.position();
        let Some(step) = steps.get(index) else {
            cursor.mark_exhausted();
            return Ok(None);
        };

        let command = Self::parse_step(index, step, entity.direction())?;
        cursor.advance();
        Ok(Some(command))
    }
}

/// Boxed handler body.
pub type Handler = Arc<dyn Fn(&mut dyn EntityMut) -> Result<(), EvaluationError> + Send + Sync>;

/// Registry of named handlers for system-dynamics entities.
#[derive(Clone, Default)]
pub struct HandlerTable {
    handlers: Arc<RwLock<HashMap<String, Handler>>>,
}

impl HandlerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) a handler.
    pub fn register<F>(&self, name: impl Into<String>, handler: F)
    where
        F: Fn(&mut dyn EntityMut) -> Result<(), EvaluationError> + Send + Sync + 'static,
    {
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        handlers.insert(name.into(), Arc::new(handler));
    }

    /// Returns true if a handler is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        let handlers = self.handlers.read().unwrap_or_else(PoisonError::into_inner);
        handlers.contains_key(name)
    }

    /// Registered handler names, sorted.
    pub fn names(&self) -> Vec<String> {
        let handlers = self.handlers.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = handlers.keys().cloned().collect();
        names.sort();
        names
    }
}

impl std::fmt::Debug for HandlerTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerTable")
            .field("handlers", &self.names())
            .finish()
    }
}

impl HandlerInvoker for HandlerTable {
    fn invoke_handler(
        &self,
        entity: &mut dyn EntityMut,
        handler: &str,
    ) -> Result<(), EvaluationError> {
        // Clone out of the lock so a handler may register other handlers
        let body = {
            let handlers = self.handlers.read().unwrap_or_else(PoisonError::into_inner);
            handlers.get(handler).cloned()
        };
        match body {
            Some(body) => body(entity),
            None => Err(EvaluationError::UnknownHandler(handler.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Subject {
        position: [f64; 2],
        direction: f64,
        speed: f64,
        props: HashMap<String, f64>,
    }

    impl EntityView for Subject {
        fn property(&self, name: &str) -> Option<f64> {
            self.props.get(name).copied()
        }
        fn position(&self) -> [f64; 2] {
            self.position
        }
        fn direction(&self) -> f64 {
            self.direction
        }
        fn speed(&self) -> f64 {
            self.speed
        }
    }

    impl EntityMut for Subject {
        fn set_position(&mut self, position: [f64; 2]) {
            self.position = position;
        }
        fn set_direction(&mut self, radians: f64) {
            self.direction = radians;
        }
        fn set_speed(&mut self, speed: f64) {
            self.speed = speed;
        }
        fn set_property(&mut self, name: &str, value: f64) {
            self.props.insert(name.to_string(), value);
        }
    }

    #[test]
    fn test_evaluator_literal_property_and_product() {
        let mut subject = Subject::default();
        subject.set_property("hunger", 0.5);
        subject.position = [3.0, 4.0];
        let eval = PropertyEvaluator::new();

        assert_eq!(eval.evaluate_formula(&subject, "0.25").unwrap(), 0.25);
        assert_eq!(eval.evaluate_formula(&subject, "hunger").unwrap(), 0.5);
        assert_eq!(eval.evaluate_formula(&subject, "hunger * 4").unwrap(), 2.0);
        assert_eq!(eval.evaluate_formula(&subject, "x*y").unwrap(), 12.0);
    }

    #[test]
    fn test_evaluator_unknown_property_fails() {
        let subject = Subject::default();
        let err = PropertyEvaluator::new()
            .evaluate_formula(&subject, "thirst")
            .unwrap_err();
        assert!(matches!(err, EvaluationError::Formula { .. }));
    }

    #[test]
    fn test_performer_walks_steps_then_exhausts() {
        let mut subject = Subject::default();
        let mut cursor = TaskCursor::new();
        let perf = StepScriptPerformer::new();
        let script = "forward 1 0; backward 2 1.5";

        let first = perf.perform_next_action(&mut subject, script, &mut cursor).unwrap();
        assert_eq!(first, Some(MotionCommand::forward(1.0, 0.0)));
        let second = perf.perform_next_action(&mut subject, script, &mut cursor).unwrap();
        assert_eq!(second, Some(MotionCommand::backward(2.0, 1.5)));
        let third = perf.perform_next_action(&mut subject, script, &mut cursor).unwrap();
        assert_eq!(third, None);
        assert!(cursor.is_exhausted());
        assert_eq!(cursor.position(), 2);
    }

    #[test]
    fn test_performer_hold_keeps_heading() {
        let mut subject = Subject::default();
        subject.direction = 1.25;
        let mut cursor = TaskCursor::new();
        let cmd = StepScriptPerformer::new()
            .perform_next_action(&mut subject, "hold", &mut cursor)
            .unwrap()
            .unwrap();
        assert_eq!(cmd.speed, 0.0);
        assert_eq!(cmd.direction, 1.25);
    }

    #[test]
    fn test_performer_rejects_malformed_step() {
        let mut subject = Subject::default();
        let mut cursor = TaskCursor::new();
        let err = StepScriptPerformer::new()
            .perform_next_action(&mut subject, "forward fast", &mut cursor)
            .unwrap_err();
        assert!(matches!(err, EvaluationError::Action { step: 0, .. }));
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn test_handler_table_invokes_registered_handler() {
        let table = HandlerTable::new();
        table.register("spin", |e: &mut dyn EntityMut| {
            let d = e.direction();
            e.set_direction(d + 1.0);
            Ok(())
        });
        let mut subject = Subject::default();

        table.invoke_handler(&mut subject, "spin").unwrap();
        assert_eq!(subject.direction, 1.0);
        assert!(table.contains("spin"));

        let err = table.invoke_handler(&mut subject, "missing").unwrap_err();
        assert_eq!(err, EvaluationError::UnknownHandler("missing".to_string()));
    }
}
