//! Run configuration: arena, categories and initial population.

use crate::error::RunResult;
use ethogram_core::{Agent, AgentTemplate, CategoryRegistry, Environment, Position, SimError, SimResult};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// One entity to create at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnSpec {
    pub category: String,

    pub name: String,

    /// Scattered deterministically from the seed when absent
    #[serde(default)]
    pub position: Option<[f64; 2]>,

    #[serde(default)]
    pub direction: f64,
}

impl SpawnSpec {
    pub fn new(category: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            name: name.into(),
            position: None,
            direction: 0.0,
        }
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.position = Some([x, y]);
        self
    }

    pub fn heading(mut self, direction: f64) -> Self {
        self.direction = direction;
        self
    }
}

/// Configuration for a simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Master seed for determinism
    pub seed: u64,

    /// Trajectory length `T` per pass
    pub ticks: usize,

    /// Display pacing per tick
    pub display_interval_ms: u64,

    /// Passes to compute and display (0 = until suspended)
    pub passes: u64,

    pub environment: Environment,

    pub categories: BTreeMap<String, AgentTemplate>,

    pub population: Vec<SpawnSpec>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            ticks: 100,
            display_interval_ms: 33,
            passes: 1,
            environment: Environment::default(),
            categories: BTreeMap::new(),
            population: Vec::new(),
        }
    }
}

impl SimConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_ticks(mut self, ticks: usize) -> Self {
        self.ticks = ticks;
        self
    }

    pub fn with_display_interval(mut self, interval: Duration) -> Self {
        self.display_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn with_passes(mut self, passes: u64) -> Self {
        self.passes = passes;
        self
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_category(mut self, name: impl Into<String>, template: AgentTemplate) -> Self {
        self.categories.insert(name.into(), template);
        self
    }

    pub fn spawn(mut self, spec: SpawnSpec) -> Self {
        self.population.push(spec);
        self
    }

    pub fn display_interval(&self) -> Duration {
        Duration::from_millis(self.display_interval_ms)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> RunResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: SimConfig = serde_json::from_str(&text).map_err(SimError::from)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> SimResult<()> {
        if self.ticks == 0 {
            return Err(SimError::configuration("ticks must be at least 1"));
        }
        let env = &self.environment;
        if !(env.width > 0.0 && env.height > 0.0) {
            return Err(SimError::configuration(format!(
                "environment must have positive dimensions, got {}x{}",
                env.width, env.height
            )));
        }
        for spec in &self.population {
            if !self.categories.contains_key(&spec.category) {
                return Err(SimError::configuration(format!(
                    "spawn '{}' names unknown category '{}'",
                    spec.name, spec.category
                )));
            }
        }
        Ok(())
    }

    pub fn registry(&self) -> CategoryRegistry {
        self.categories
            .iter()
            .map(|(name, template)| (name.clone(), template.clone()))
            .collect()
    }

    /// Creates the initial agents in spawn order.
    pub fn spawn_agents(&self) -> SimResult<Vec<Agent>> {
        self.validate()?;
        let registry = self.registry();
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);

        self.population
            .iter()
            .map(|spec| {
                let position = match spec.position {
                    Some([x, y]) => Position::new(x, y),
                    None => Position::new(
                        rng.gen_range(0.0..self.environment.width),
                        rng.gen_range(0.0..self.environment.height),
                    ),
                };
                registry.spawn(&spec.category, spec.name.clone(), position, spec.direction)
            })
            .collect()
    }
}
