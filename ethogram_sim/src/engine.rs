//! The engine: owns the shared context and the two loop tasks.
//!
//! ```text
//!            ┌─────────────── Arc<SimulationContext> ───────────────┐
//!            │  TrajectoryStore (Main | Backup)   Population        │
//!            └────────▲──────────────────────────────────▲──────────┘
//!                     │ store()                          │ get_record()
//!              ┌──────┴──────┐   BufferSwitch     ┌──────┴──────┐
//!              │ ComputeLoop │ ─── done flags ──► │ DisplayLoop │ ──► RenderSink
//!              └─────────────┘                    └─────────────┘
//! ```

use crate::compute::ComputeLoop;
use crate::config::SimConfig;
use crate::display::{DisplayLoop, RenderSink, TracingSink};
use crate::error::{RunError, RunResult};
use crate::events::{LoopReport, LoopRole, SimEvent};
use crate::exporter::TrajectoryExport;
use ethogram_core::{Agent, EntityId, LoopControl, Position, SimResult, SimulationContext};
use ethogram_env::{HandlerTable, SimClock};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, warn};

const EVENT_CAPACITY: usize = 256;

struct LoopHandle {
    control: LoopControl,
    task: JoinHandle<SimResult<LoopReport>>,
}

impl LoopHandle {
    fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

/// Reports of the loops that were joined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub compute: Option<LoopReport>,
    pub display: Option<LoopReport>,
}

async fn finished(slot: &mut Option<LoopHandle>) -> RunResult<LoopReport> {
    match slot {
        Some(handle) => Ok((&mut handle.task).await??),
        None => std::future::pending().await,
    }
}

/// A running (or startable) simulation.
pub struct Simulation {
    ctx: Arc<SimulationContext>,
    clock: Arc<dyn SimClock>,
    sink: Arc<dyn RenderSink>,
    events: broadcast::Sender<SimEvent>,
    interval: Duration,

    /// Passes per loop (0 = until suspended)
    passes: u64,

    recorder: Option<Arc<Mutex<TrajectoryExport>>>,
    compute: Option<LoopHandle>,
    display: Option<LoopHandle>,
}

impl Simulation {
    pub fn new(ctx: Arc<SimulationContext>, clock: Arc<dyn SimClock>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            ctx,
            clock,
            sink: Arc::new(TracingSink),
            events,
            interval: Duration::from_millis(33),
            passes: 0,
            recorder: None,
            compute: None,
            display: None,
        }
    }

    /// Builds the context and initial population of `config`.
    pub fn from_config(config: &SimConfig, handlers: HandlerTable, clock: Arc<dyn SimClock>) -> RunResult<Self> {
        config.validate()?;
        let ctx = SimulationContext::scripted(config.environment, config.ticks, handlers)?;
        for agent in config.spawn_agents()? {
            ctx.insert_agent(agent)?;
        }
        info!(entities = ctx.entity_count(), ticks = config.ticks, "simulation built");

        Ok(Self::new(Arc::new(ctx), clock)
            .with_display_interval(config.display_interval())
            .with_passes(config.passes))
    }

    pub fn with_sink(mut self, sink: Arc<dyn RenderSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_display_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_passes(mut self, passes: u64) -> Self {
        self.passes = passes;
        self
    }

    pub fn with_recorder(mut self, recorder: Arc<Mutex<TrajectoryExport>>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub fn context(&self) -> &Arc<SimulationContext> {
        &self.ctx
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SimEvent> {
        self.events.subscribe()
    }

    pub fn is_running(&self) -> bool {
        [&self.compute, &self.display]
            .into_iter()
            .flatten()
            .any(LoopHandle::is_running)
    }

    /// Spawns both loops on the current tokio runtime.
    pub fn start(&mut self) -> RunResult<()> {
        self.start_compute()?;
        self.start_display()
    }

    /// Spawns (or restarts after termination) the compute loop.
    pub fn start_compute(&mut self) -> RunResult<()> {
        if self.compute.as_ref().is_some_and(LoopHandle::is_running) {
            return Err(RunError::engine("compute loop already running"));
        }
        let control = LoopControl::new();
        let task = ComputeLoop::new(Arc::clone(&self.ctx), control.clone(), self.events.clone())
            .with_max_passes(self.passes)
            .run();
        self.compute = Some(LoopHandle {
            control,
            task: tokio::spawn(task),
        });
        Ok(())
    }

    /// Spawns (or restarts after termination) the display loop.
    pub fn start_display(&mut self) -> RunResult<()> {
        if self.display.as_ref().is_some_and(LoopHandle::is_running) {
            return Err(RunError::engine("display loop already running"));
        }
        let control = LoopControl::new();
        let mut display = DisplayLoop::new(
            Arc::clone(&self.ctx),
            control.clone(),
            self.events.clone(),
            Arc::clone(&self.sink),
            Arc::clone(&self.clock),
        )
        .with_interval(self.interval)
        .with_max_passes(self.passes);
        if let Some(recorder) = &self.recorder {
            display = display.with_recorder(Arc::clone(recorder));
        }
        self.display = Some(LoopHandle {
            control,
            task: tokio::spawn(display.run()),
        });
        Ok(())
    }

    /// Waits for both loops to return.
    ///
    /// A fatal error in one loop suspends the other, so the caller never
    /// waits on a peer that can no longer make progress.
    pub async fn join(&mut self) -> RunResult<RunSummary> {
        let mut compute = self.compute.take();
        let mut display = self.display.take();
        let mut summary = RunSummary::default();
        let mut failure: Option<RunError> = None;

        while compute.is_some() || display.is_some() {
            let (role, result) = tokio::select! {
                result = finished(&mut compute) => (LoopRole::Compute, result),
                result = finished(&mut display) => (LoopRole::Display, result),
            };

            let (slot, peer) = match role {
                LoopRole::Compute => (&mut compute, &display),
                LoopRole::Display => (&mut display, &compute),
            };
            *slot = None;

            match result {
                Ok(report) => match role {
                    LoopRole::Compute => summary.compute = Some(report),
                    LoopRole::Display => summary.display = Some(report),
                },
                Err(e) => {
                    warn!(%role, "loop failed, suspending its peer");
                    if let Some(peer) = peer {
                        peer.control.suspend();
                    }
                    failure.get_or_insert(e);
                }
            }
        }

        match failure {
            Some(e) => Err(e),
            None => Ok(summary),
        }
    }

    /// Asks both loops to stop after their current entity/tick and waits.
    pub async fn suspend(&mut self) -> RunResult<RunSummary> {
        for handle in [&self.compute, &self.display].into_iter().flatten() {
            handle.control.suspend();
        }
        self.join().await
    }

    /// Rewinds to tick 0; refused while a loop is running.
    pub fn reset(&self, initial_positions: &HashMap<EntityId, Position>) -> RunResult<()> {
        if self.is_running() {
            return Err(RunError::engine("suspend the loops before resetting"));
        }
        self.ctx.reset_simulation(initial_positions)?;
        Ok(())
    }

    pub fn insert_agent(&self, agent: Agent) -> RunResult<EntityId> {
        Ok(self.ctx.insert_agent(agent)?)
    }

    pub fn remove_agent(&self, id: EntityId) -> RunResult<Agent> {
        Ok(self.ctx.remove_agent(id)?)
    }

    pub fn populate_positions(&self, tick: usize) -> RunResult<HashMap<EntityId, Position>> {
        Ok(self.ctx.populate_positions(tick)?)
    }
}

impl Drop for Simulation {
    fn drop(&mut self) {
        for handle in [&self.compute, &self.display].into_iter().flatten() {
            handle.control.suspend();
        }
    }
}
