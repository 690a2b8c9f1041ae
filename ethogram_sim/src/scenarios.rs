//! Builtin scenarios.

use crate::config::{SimConfig, SpawnSpec};
use ethogram_core::{AgentTemplate, BehaviorDocument, BoundaryKind, Environment, NetworkDocument};
use ethogram_env::{EntityMut, EvaluationError, HandlerTable};

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// Wander vs. seek under mutual inhibition, closed arena
    Forage,

    /// Cooperative sum of three headings, rounded arena
    Flock,

    /// Circling handler under system dynamics, open arena
    Orbit,

    /// No dynamics; trajectories stay constant
    Still,

    /// Two-behavior duel with fixed inhibition coefficients
    InhibitionDemo,
}

/// Turn rate of the `orbit` handler, radians per tick.
pub const ORBIT_TURN: f64 = 0.1;

/// Handlers the builtin scenarios and JSON configs can reference.
///
/// - `orbit`: turns by [`ORBIT_TURN`] and steps forward at the entity's speed
/// - `drift`: steps forward without turning
pub fn standard_handlers() -> HandlerTable {
    let handlers = HandlerTable::new();
    handlers.register("orbit", |entity: &mut dyn EntityMut| {
        entity.set_direction(entity.direction() + ORBIT_TURN);
        step_forward(entity)
    });
    handlers.register("drift", step_forward);
    handlers
}

fn step_forward(entity: &mut dyn EntityMut) -> Result<(), EvaluationError> {
    let [x, y] = entity.position();
    let (speed, direction) = (entity.speed(), entity.direction());
    entity.set_position([x + speed * direction.cos(), y + speed * direction.sin()]);
    Ok(())
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::Forage,
            ScenarioId::Flock,
            ScenarioId::Orbit,
            ScenarioId::Still,
            ScenarioId::InhibitionDemo,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::Forage => "forage",
            ScenarioId::Flock => "flock",
            ScenarioId::Orbit => "orbit",
            ScenarioId::Still => "still",
            ScenarioId::InhibitionDemo => "inhibition_demo",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::Forage => "8 foragers: wander until far enough east, then seek (mutual inhibition)",
            ScenarioId::Flock => "12 boids summing three weighted headings on a torus (cooperative)",
            ScenarioId::Orbit => "4 satellites circling via the 'orbit' handler (system dynamics)",
            ScenarioId::Still => "5 rocks without dynamics; every tick must match the seed",
            ScenarioId::InhibitionDemo => "2 duelists, one per excitation regime, A resumable vs. B",
        }
    }

    /// Builds the scenario's run configuration.
    pub fn config(&self, seed: u64) -> SimConfig {
        let base = SimConfig::default().with_seed(seed);
        match self {
            ScenarioId::Forage => Self::forage(base),
            ScenarioId::Flock => Self::flock(base),
            ScenarioId::Orbit => Self::orbit(base),
            ScenarioId::Still => Self::still(base),
            ScenarioId::InhibitionDemo => Self::inhibition_demo(base),
        }
    }

    fn forage(base: SimConfig) -> SimConfig {
        let network = NetworkDocument::MutualInhibition {
            behaviors: vec![
                BehaviorDocument::new("wander", "0.5", "forward 1 0.4; forward 1 0; forward 1 -0.4"),
                BehaviorDocument::new("seek", "x * 0.01", "forward 2 0; forward 2 0.1; forward 2 -0.1; hold")
                    .resumable(true),
            ],
            coefficients: vec![vec![0.0, 0.3], vec![0.3, 0.0]],
        };
        let template = AgentTemplate::default()
            .with_extent(2.0, 2.0)
            .with_speed(1.0)
            .with_network(network);

        (0..8).fold(
            base.with_environment(Environment::new(200.0, 200.0, BoundaryKind::Closed))
                .with_category("forager", template),
            |config, i| config.spawn(SpawnSpec::new("forager", format!("forager-{}", i))),
        )
    }

    fn flock(base: SimConfig) -> SimConfig {
        let network = NetworkDocument::Cooperative {
            behaviors: vec![
                BehaviorDocument::new("east", "1", "forward 1 0"),
                BehaviorDocument::new("south", "1", "forward 1 1.5708"),
                BehaviorDocument::new("zigzag", "1", "forward 1 3.1416; forward 1 4.7124"),
            ],
            weights: vec![0.5, 0.3, 0.2],
        };
        let template = AgentTemplate::default().with_network(network);

        (0..12).fold(
            base.with_environment(Environment::new(300.0, 300.0, BoundaryKind::Rounded))
                .with_category("boid", template),
            |config, i| config.spawn(SpawnSpec::new("boid", format!("boid-{}", i))),
        )
    }

    fn orbit(base: SimConfig) -> SimConfig {
        let template = AgentTemplate::default()
            .with_speed(2.0)
            .with_network(NetworkDocument::SystemDynamics {
                handler: "orbit".into(),
                script: "turn 0.1; step speed".into(),
            });

        (0..4).fold(
            base.with_environment(Environment::new(400.0, 400.0, BoundaryKind::Open))
                .with_category("satellite", template),
            |config, i| {
                let offset = 80.0 * i as f64;
                config.spawn(SpawnSpec::new("satellite", format!("sat-{}", i)).at(100.0 + offset, 200.0))
            },
        )
    }

    fn still(base: SimConfig) -> SimConfig {
        (0..5).fold(
            base.with_environment(Environment::new(100.0, 100.0, BoundaryKind::Closed))
                .with_category("rock", AgentTemplate::default()),
            |config, i| {
                let at = 10.0 + 15.0 * i as f64;
                config.spawn(SpawnSpec::new("rock", format!("rock-{}", i)).at(at, at))
            },
        )
    }

    fn inhibition_demo(base: SimConfig) -> SimConfig {
        let network = NetworkDocument::MutualInhibition {
            behaviors: vec![
                BehaviorDocument::new("A", "ea", "forward 1 0; forward 1 0; forward 1 0; forward 1 0; forward 1 0")
                    .resumable(true),
                BehaviorDocument::new("B", "eb", "backward 1 0"),
            ],
            coefficients: vec![vec![0.0, 0.5], vec![0.2, 0.0]],
        };
        let favours_a = AgentTemplate::default()
            .with_property("ea", 0.9)
            .with_property("eb", 0.3)
            .with_network(network.clone());
        let favours_b = AgentTemplate::default()
            .with_property("ea", 0.1)
            .with_property("eb", 0.9)
            .with_network(network);

        base.with_ticks(20)
            .with_environment(Environment::new(500.0, 500.0, BoundaryKind::Open))
            .with_category("duelist_a", favours_a)
            .with_category("duelist_b", favours_b)
            .spawn(SpawnSpec::new("duelist_a", "a").at(250.0, 200.0))
            .spawn(SpawnSpec::new("duelist_b", "b").at(250.0, 300.0))
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "forage" => Ok(ScenarioId::Forage),
            "flock" => Ok(ScenarioId::Flock),
            "orbit" => Ok(ScenarioId::Orbit),
            "still" => Ok(ScenarioId::Still),
            "inhibition_demo" | "inhibitiondemo" | "demo" => Ok(ScenarioId::InhibitionDemo),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}
