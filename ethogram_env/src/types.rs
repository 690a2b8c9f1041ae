//! Common types exchanged between the engine and its collaborators.

use serde::{Deserialize, Serialize};

/// Direction of a single motion step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveKind {
    Forward,
    Backward,
}

impl MoveKind {
    /// Returns +1 for forward moves and -1 for backward moves.
    pub fn sign(&self) -> f64 {
        match self {
            MoveKind::Forward => 1.0,
            MoveKind::Backward => -1.0,
        }
    }
}

/// One atomic motion produced by a behavior's task queue.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionCommand {
    /// Distance covered in one tick
    pub speed: f64,

    /// Heading in radians
    pub direction: f64,

    /// Forward or backward step
    pub kind: MoveKind,
}

impl MotionCommand {
    /// Creates a forward step.
    pub fn forward(speed: f64, direction: f64) -> Self {
        Self {
            speed,
            direction,
            kind: MoveKind::Forward,
        }
    }

    /// Creates a backward step.
    pub fn backward(speed: f64, direction: f64) -> Self {
        Self {
            speed,
            direction,
            kind: MoveKind::Backward,
        }
    }

    /// Returns the displacement `[dx, dy]` this command produces.
    pub fn displacement(&self) -> [f64; 2] {
        let magnitude = self.kind.sign() * self.speed;
        [
            magnitude * self.direction.cos(),
            magnitude * self.direction.sin(),
        ]
    }
}

/// Position of a behavior inside its task queue.
///
/// Pure state: the `ActionPerformer` reads the step at `position` and
/// advances the cursor, the owning behavior decides when to rewind it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCursor {
    position: usize,
    exhausted: bool,
}

impl TaskCursor {
    /// Creates a cursor at the start of the queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the next step to execute.
    pub fn position(&self) -> usize {
        self.position
    }

    /// True once the performer ran past the last step.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Moves to the next step.
    pub fn advance(&mut self) {
        self.position += 1;
    }

    /// Marks the queue as finished.
    pub fn mark_exhausted(&mut self) {
        self.exhausted = true;
    }

    /// Returns to the first step.
    pub fn rewind(&mut self) {
        self.position = 0;
        self.exhausted = false;
    }
}

/// The scripted parts of a behavior, as seen by the collaborators.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BehaviorScript {
    /// Behavior name (for diagnostics)
    pub name: String,

    /// Textual excitation formula
    pub excitation_formula: String,

    /// Textual action body consumed one step per tick
    pub action_script: String,
}

impl BehaviorScript {
    /// Creates a script from its parts.
    pub fn new(
        name: impl Into<String>,
        excitation_formula: impl Into<String>,
        action_script: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            excitation_formula: excitation_formula.into(),
            action_script: action_script.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_backward_displacement_is_negated() {
        let fwd = MotionCommand::forward(2.0, 0.0).displacement();
        let back = MotionCommand::backward(2.0, 0.0).displacement();
        assert_eq!(fwd[0], 2.0);
        assert_eq!(back[0], -2.0);
    }

    #[test]
    fn test_displacement_follows_heading() {
        let d = MotionCommand::forward(1.0, FRAC_PI_2).displacement();
        assert!(d[0].abs() < 1e-12);
        assert!((d[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_cursor_rewind_clears_exhaustion() {
        let mut cursor = TaskCursor::new();
        cursor.advance();
        cursor.advance();
        cursor.mark_exhausted();
        assert_eq!(cursor.position(), 2);
        assert!(cursor.is_exhausted());

        cursor.rewind();
        assert_eq!(cursor, TaskCursor::new());
    }
}
