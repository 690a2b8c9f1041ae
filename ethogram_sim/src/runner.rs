//! Scenario runner - drives a configuration through both loops to completion.

use crate::clock::VirtualClock;
use crate::config::SimConfig;
use crate::display::{RecordingSink, RenderedTick};
use crate::engine::{RunSummary, Simulation};
use crate::error::RunResult;
use crate::exporter::TrajectoryExport;
use crate::scenarios::{standard_handlers, ScenarioId};
use ethogram_env::{SimClock, TokioClock};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, info};

/// Results from running a scenario.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioResult {
    /// Scenario (or config file) that was run
    pub scenario: String,

    /// Seed used
    pub seed: u64,

    /// Whether the run met all of its checks
    pub passed: bool,

    pub passes_computed: u64,

    pub passes_displayed: u64,

    /// Records handed to the render sink
    pub ticks_rendered: usize,

    /// Number of entities at the end
    pub final_entity_count: usize,

    /// Failure message if any
    pub failure_reason: Option<String>,
}

/// Runs scenarios with optional overrides of their configuration.
pub struct ScenarioRunner {
    seed: u64,
    ticks: Option<usize>,
    passes: Option<u64>,
    interval: Option<Duration>,

    /// Pace the display on wall-clock time instead of virtual time
    wall_clock: bool,

    export: Option<PathBuf>,
}

impl ScenarioRunner {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            ticks: None,
            passes: None,
            interval: None,
            wall_clock: false,
            export: None,
        }
    }

    pub fn with_ticks(mut self, ticks: usize) -> Self {
        self.ticks = Some(ticks);
        self
    }

    pub fn with_passes(mut self, passes: u64) -> Self {
        self.passes = Some(passes);
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    pub fn with_wall_clock(mut self, wall_clock: bool) -> Self {
        self.wall_clock = wall_clock;
        self
    }

    pub fn with_export(mut self, path: impl Into<PathBuf>) -> Self {
        self.export = Some(path.into());
        self
    }

    /// Applies the runner's overrides to `config`.
    pub fn configure(&self, mut config: SimConfig) -> SimConfig {
        config.seed = self.seed;
        if let Some(ticks) = self.ticks {
            config.ticks = ticks;
        }
        if let Some(passes) = self.passes {
            config.passes = passes;
        }
        if let Some(interval) = self.interval {
            config = config.with_display_interval(interval);
        }
        config
    }

    pub async fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.seed);
        self.run_config(scenario.name(), scenario.config(self.seed)).await
    }

    /// Runs an arbitrary configuration under `name`.
    pub async fn run_config(&self, name: &str, config: SimConfig) -> ScenarioResult {
        let config = self.configure(config);
        let sink = RecordingSink::new();
        let mut result = ScenarioResult {
            scenario: name.to_string(),
            seed: config.seed,
            passed: false,
            passes_computed: 0,
            passes_displayed: 0,
            ticks_rendered: 0,
            final_entity_count: 0,
            failure_reason: None,
        };

        match self.execute(name, &config, &sink).await {
            Ok((summary, entities)) => {
                result.passes_computed = summary.compute.map_or(0, |r| r.passes);
                result.passes_displayed = summary.display.map_or(0, |r| r.passes);
                result.ticks_rendered = sink.len();
                result.final_entity_count = entities;
                result.failure_reason = check(name, &config, &result, &sink.rendered());
                result.passed = result.failure_reason.is_none();
            }
            Err(e) => result.failure_reason = Some(e.to_string()),
        }
        result
    }

    async fn execute(&self, name: &str, config: &SimConfig, sink: &RecordingSink) -> RunResult<(RunSummary, usize)> {
        let clock: Arc<dyn SimClock> = if self.wall_clock {
            TokioClock::shared()
        } else {
            VirtualClock::shared(config.seed)
        };
        let recorder = self
            .export
            .as_ref()
            .map(|_| Arc::new(Mutex::new(TrajectoryExport::new(name, config.seed, config.ticks))));

        let mut sim = Simulation::from_config(config, standard_handlers(), clock)?.with_sink(Arc::new(sink.clone()));
        if let Some(recorder) = &recorder {
            sim = sim.with_recorder(Arc::clone(recorder));
        }

        sim.start()?;
        let summary = if config.passes == 0 {
            info!("running until interrupted (ctrl-c)");
            tokio::signal::ctrl_c().await?;
            sim.suspend().await?
        } else {
            sim.join().await?
        };
        let entities = sim.context().entity_count();

        if let (Some(path), Some(recorder)) = (&self.export, recorder) {
            let export = recorder.lock().unwrap_or_else(PoisonError::into_inner);
            export.write_to_file(path)?;
            info!("Exported {} frames to {}", export.frames.len(), path.display());
        }
        Ok((summary, entities))
    }
}

/// Checks of a finished run; `None` when it passed.
fn check(name: &str, config: &SimConfig, result: &ScenarioResult, rendered: &[RenderedTick]) -> Option<String> {
    if config.passes > 0 && result.passes_displayed != config.passes {
        return Some(format!(
            "displayed {} of {} passes",
            result.passes_displayed, config.passes
        ));
    }

    let expected = result.passes_displayed as usize * config.ticks * config.population.len();
    if config.passes > 0 && result.ticks_rendered != expected {
        return Some(format!("rendered {} records, expected {}", result.ticks_rendered, expected));
    }

    if name == ScenarioId::Still.name() {
        for tick in rendered {
            let seed = config.population.get(tick.entity.index()).and_then(|s| s.position);
            let position = tick.record.position();
            if seed.is_some_and(|[x, y]| (position.x - x).abs() > 1e-9 || (position.y - y).abs() > 1e-9) {
                return Some(format!("{} moved at tick {}", tick.entity, tick.tick));
            }
        }
    }

    debug!(scenario = name, records = rendered.len(), "checks passed");
    None
}
