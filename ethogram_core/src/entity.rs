//! Entities and their per-tick snapshots.

use ethogram_env::{EntityMut, EntityView, MotionCommand};
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::f64::consts::TAU;
use uuid::Uuid;

/// 2D position in environment units.
pub type Position = Vector2<f64>;

/// Insertion-order index of an entity inside its population.
///
/// Re-assigned when an earlier entity is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub usize);

impl EntityId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Stable handle of an entity, unaffected by re-indexing.
///
/// Trajectories are stored under this key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityKey(pub Uuid);

impl EntityKey {
    /// Creates a new random key.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a deterministic key from a seed (for scenarios and tests).
    pub fn from_seed(seed: u64) -> Self {
        let mut bytes = [0u8; 16];
        bytes[0..8].copy_from_slice(&seed.to_le_bytes());
        bytes[8..16].copy_from_slice(&seed.wrapping_mul(0x517cc1b727220a95).to_le_bytes());
        Self(Uuid::from_bytes(bytes))
    }
}

impl Default for EntityKey {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EntityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Show first 8 chars for readability
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

/// Whether an entity takes part in the simulation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityState {
    #[default]
    Active,
    Inactive,
}

/// What the presentation layer needs besides the kinematics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DisplaySnapshot {
    pub visible: bool,

    /// Index of the behavior that drove this tick, if any
    pub active_behavior: Option<usize>,
}

/// Immutable snapshot of one entity at one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    position: Position,
    direction: f64,
    state: ActivityState,
    display: DisplaySnapshot,
}

impl EntityRecord {
    pub fn new(position: Position, direction: f64, state: ActivityState, display: DisplaySnapshot) -> Self {
        Self {
            position,
            direction,
            state,
            display,
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn direction(&self) -> f64 {
        self.direction
    }

    pub fn state(&self) -> ActivityState {
        self.state
    }

    pub fn display(&self) -> &DisplaySnapshot {
        &self.display
    }
}

/// Wraps an angle into `[0, 2pi)`.
pub fn normalize_angle(radians: f64) -> f64 {
    let wrapped = radians.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

/// A simulated entity.
///
/// `Entity` is pure state: the behavior network and the action-selection
/// mechanism live on the owning `Agent`, so cloning an entity yields a
/// scratch copy that never drags its network along.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Insertion-order index (assigned by the population)
    pub id: EntityId,

    /// Stable trajectory key
    pub key: EntityKey,

    pub display_name: String,

    /// Category the entity was created from
    pub category: String,

    pub position: Position,

    /// Heading in radians
    pub direction: f64,

    pub speed: f64,

    pub state: ActivityState,

    pub visible: bool,

    /// Half-width and half-height used for boundary tests
    pub extent: Vector2<f64>,

    /// Named numeric properties read by excitation formulas
    pub properties: BTreeMap<String, f64>,
}

impl Entity {
    /// Creates an active, visible entity at the origin.
    pub fn new(display_name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            id: EntityId(0),
            key: EntityKey::new(),
            display_name: display_name.into(),
            category: category.into(),
            position: Position::zeros(),
            direction: 0.0,
            speed: 0.0,
            state: ActivityState::Active,
            visible: true,
            extent: Vector2::new(1.0, 1.0),
            properties: BTreeMap::new(),
        }
    }

    pub fn with_key(mut self, key: EntityKey) -> Self {
        self.key = key;
        self
    }

    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.position = Position::new(x, y);
        self
    }

    pub fn with_direction(mut self, radians: f64) -> Self {
        self.direction = normalize_angle(radians);
        self
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = speed;
        self
    }

    pub fn with_extent(mut self, half_width: f64, half_height: f64) -> Self {
        self.extent = Vector2::new(half_width, half_height);
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, value: f64) -> Self {
        self.properties.insert(name.into(), value);
        self
    }

    pub fn is_active(&self) -> bool {
        self.state == ActivityState::Active
    }

    /// Applies one forward or backward step and adopts its heading and speed.
    pub fn apply_motion(&mut self, command: &MotionCommand) {
        let [dx, dy] = command.displacement();
        self.position += Vector2::new(dx, dy);
        self.direction = normalize_angle(command.direction);
        self.speed = command.speed;
    }

    /// Translates the entity without touching heading or speed.
    pub fn displace(&mut self, delta: Vector2<f64>) {
        self.position += delta;
    }

    /// Returns to the kinematics, activity and visibility of `record`.
    pub fn restore(&mut self, record: &EntityRecord) {
        self.position = record.position;
        self.direction = record.direction;
        self.state = record.state;
        self.visible = record.display.visible;
    }

    /// Takes the record for the current tick.
    pub fn snapshot(&self, active_behavior: Option<usize>) -> EntityRecord {
        EntityRecord::new(
            self.position,
            self.direction,
            self.state,
            DisplaySnapshot {
                visible: self.visible,
                active_behavior,
            },
        )
    }
}

impl EntityView for Entity {
    fn property(&self, name: &str) -> Option<f64> {
        self.properties.get(name).copied()
    }

    fn position(&self) -> [f64; 2] {
        [self.position.x, self.position.y]
    }

    fn direction(&self) -> f64 {
        self.direction
    }

    fn speed(&self) -> f64 {
        self.speed
    }
}

impl EntityMut for Entity {
    fn set_position(&mut self, position: [f64; 2]) {
        self.position = Position::new(position[0], position[1]);
    }

    fn set_direction(&mut self, radians: f64) {
        self.direction = normalize_angle(radians);
    }

    fn set_speed(&mut self, speed: f64) {
        self.speed = speed;
    }

    fn set_property(&mut self, name: &str, value: f64) {
        self.properties.insert(name.to_string(), value);
    }
}
