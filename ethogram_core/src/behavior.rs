//! Behaviors and the inhibition edges between them.

use crate::entity::Entity;
use ethogram_env::{ActionPerformer, BehaviorScript, EvaluationError, MotionCommand, TaskCursor};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Number of strength samples kept per behavior.
pub const STRENGTH_HISTORY_LEN: usize = 64;

/// Identifier of a behavior, unique within its network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BehaviorId(pub u32);

impl std::fmt::Display for BehaviorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "b{}", self.0)
    }
}

/// One competing/cooperating behavior of an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Behavior {
    pub id: BehaviorId,

    /// Formulas and action body, handed to the collaborators
    pub script: BehaviorScript,

    /// Contribution factor under the cooperative mechanism
    pub weight: f64,

    /// Keeps its task cursor across ticks while it stays dominant
    pub resumable: bool,

    /// Raw excitation evaluated on the last tick
    activation: f64,

    /// Smoothed strength after inhibition
    strength: f64,

    history: VecDeque<f64>,

    cursor: TaskCursor,
}

impl Behavior {
    pub fn new(id: BehaviorId, script: BehaviorScript) -> Self {
        Self {
            id,
            script,
            weight: 1.0,
            resumable: false,
            activation: 0.0,
            strength: 0.0,
            history: VecDeque::with_capacity(STRENGTH_HISTORY_LEN),
            cursor: TaskCursor::new(),
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn resumable(mut self, resumable: bool) -> Self {
        self.resumable = resumable;
        self
    }

    pub fn name(&self) -> &str {
        &self.script.name
    }

    pub fn activation(&self) -> f64 {
        self.activation
    }

    pub fn strength(&self) -> f64 {
        self.strength
    }

    /// Strength samples, oldest first.
    pub fn history(&self) -> impl Iterator<Item = f64> + '_ {
        self.history.iter().copied()
    }

    pub fn cursor(&self) -> TaskCursor {
        self.cursor
    }

    pub fn set_activation(&mut self, activation: f64) {
        self.activation = activation;
    }

    /// Stores this tick's strength and appends it to the history.
    pub fn record_strength(&mut self, strength: f64) {
        self.strength = strength;
        if self.history.len() == STRENGTH_HISTORY_LEN {
            self.history.pop_front();
        }
        self.history.push_back(strength);
    }

    /// Runs one step of the task queue against `entity`.
    ///
    /// Non-resumable behaviors loop: running past the last step restarts
    /// the queue in the same call. Resumable ones yield `None` once
    /// exhausted and stay finished until `reset_action`.
    pub fn perform_action(
        &mut self,
        entity: &mut Entity,
        performer: &dyn ActionPerformer,
    ) -> Result<Option<MotionCommand>, EvaluationError> {
        if self.cursor.is_exhausted() {
            if self.resumable {
                return Ok(None);
            }
            self.cursor.rewind();
        }

        let mut command = performer.perform_next_action(entity, &self.script.action_script, &mut self.cursor)?;
        if command.is_none() && !self.resumable {
            let restartable = self.cursor.position() > 0;
            self.cursor.rewind();
            if restartable {
                command = performer.perform_next_action(entity, &self.script.action_script, &mut self.cursor)?;
            }
        }
        Ok(command)
    }

    /// Moves the task cursor back to the first step.
    pub fn reset_action(&mut self) {
        self.cursor.rewind();
    }

    /// Clears activation, strength, history and cursor.
    pub fn reset_state(&mut self) {
        self.activation = 0.0;
        self.strength = 0.0;
        self.history.clear();
        self.cursor.rewind();
    }
}

/// Asymmetric mutual inhibition between two behaviors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub from: BehaviorId,
    pub to: BehaviorId,

    /// How strongly `from` inhibits `to`
    pub inhibition_ft: f64,

    /// How strongly `to` inhibits `from`
    pub inhibition_tf: f64,
}

impl Edge {
    pub fn new(from: BehaviorId, to: BehaviorId) -> Self {
        Self {
            from,
            to,
            inhibition_ft: 0.0,
            inhibition_tf: 0.0,
        }
    }

    pub fn touches(&self, id: BehaviorId) -> bool {
        self.from == id || self.to == id
    }

    /// True if this edge joins `a` and `b`, in either orientation.
    pub fn joins(&self, a: BehaviorId, b: BehaviorId) -> bool {
        (self.from == a && self.to == b) || (self.from == b && self.to == a)
    }

    /// Returns the endpoint opposite to `id`.
    pub fn other(&self, id: BehaviorId) -> Option<BehaviorId> {
        if self.from == id {
            Some(self.to)
        } else if self.to == id {
            Some(self.from)
        } else {
            None
        }
    }

    /// Coefficient with which the opposite endpoint inhibits `target`.
    pub fn inhibition_onto(&self, target: BehaviorId) -> f64 {
        if target == self.to {
            self.inhibition_ft
        } else if target == self.from {
            self.inhibition_tf
        } else {
            0.0
        }
    }

    /// Sets the coefficient with which `source` inhibits its partner.
    pub fn set_inhibition_from(&mut self, source: BehaviorId, value: f64) {
        if source == self.from {
            self.inhibition_ft = value;
        } else if source == self.to {
            self.inhibition_tf = value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethogram_env::StepScriptPerformer;

    fn walker(resumable: bool) -> Behavior {
        Behavior::new(
            BehaviorId(1),
            BehaviorScript::new("walk", "1", "forward 1 0; forward 2 0"),
        )
        .resumable(resumable)
    }

    #[test]
    fn test_edge_orientation() {
        let mut edge = Edge::new(BehaviorId(1), BehaviorId(2));
        edge.inhibition_ft = 0.5;
        edge.inhibition_tf = 0.2;

        assert_eq!(edge.inhibition_onto(BehaviorId(2)), 0.5);
        assert_eq!(edge.inhibition_onto(BehaviorId(1)), 0.2);
        assert_eq!(edge.inhibition_onto(BehaviorId(3)), 0.0);
        assert_eq!(edge.other(BehaviorId(2)), Some(BehaviorId(1)));
        assert!(edge.joins(BehaviorId(2), BehaviorId(1)));

        edge.set_inhibition_from(BehaviorId(2), 0.9);
        assert_eq!(edge.inhibition_tf, 0.9);
    }

    #[test]
    fn test_non_resumable_loops_its_queue() {
        let mut behavior = walker(false);
        let mut entity = Entity::new("a", "c");
        let perf = StepScriptPerformer::new();

        assert_eq!(behavior.perform_action(&mut entity, &perf).unwrap().unwrap().speed, 1.0);
        assert_eq!(behavior.perform_action(&mut entity, &perf).unwrap().unwrap().speed, 2.0);
        assert_eq!(behavior.perform_action(&mut entity, &perf).unwrap().unwrap().speed, 1.0);
        assert_eq!(behavior.cursor().position(), 1);
    }

    #[test]
    fn test_empty_queue_yields_nothing() {
        let mut behavior = Behavior::new(BehaviorId(1), BehaviorScript::new("idle", "1", ""));
        let mut entity = Entity::new("a", "c");
        let perf = StepScriptPerformer::new();

        assert_eq!(behavior.perform_action(&mut entity, &perf).unwrap(), None);
        assert_eq!(behavior.cursor(), TaskCursor::new());
    }

    #[test]
    fn test_resumable_stays_finished_until_reset() {
        let mut behavior = walker(true);
        let mut entity = Entity::new("a", "c");
        let perf = StepScriptPerformer::new();

        behavior.perform_action(&mut entity, &perf).unwrap();
        behavior.perform_action(&mut entity, &perf).unwrap();
        assert_eq!(behavior.perform_action(&mut entity, &perf).unwrap(), None);
        assert_eq!(behavior.perform_action(&mut entity, &perf).unwrap(), None);

        behavior.reset_action();
        assert_eq!(behavior.cursor().position(), 0);
        assert_eq!(behavior.perform_action(&mut entity, &perf).unwrap().unwrap().speed, 1.0);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut behavior = walker(false);
        for i in 0..(STRENGTH_HISTORY_LEN + 10) {
            behavior.record_strength(i as f64);
        }
        let history: Vec<f64> = behavior.history().collect();
        assert_eq!(history.len(), STRENGTH_HISTORY_LEN);
        assert_eq!(history[0], 10.0);
        assert_eq!(behavior.strength(), (STRENGTH_HISTORY_LEN + 9) as f64);
    }
}
