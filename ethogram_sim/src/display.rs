//! The consumer schedule: replays computed passes tick by tick.

use crate::events::{LoopReport, LoopRole, SimEvent};
use crate::exporter::TrajectoryExport;
use ethogram_core::{EntityId, EntityKey, EntityRecord, LoopControl, SimError, SimResult, SimulationContext};
use ethogram_env::SimClock;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, error, info, trace};

/// Receives every record the display loop reads.
pub trait RenderSink: Send + Sync {
    fn render_tick(&self, entity: EntityId, tick: usize, record: &EntityRecord);

    /// Called once a whole pass has been rendered.
    fn finish_pass(&self, _pass: u64) {}
}

/// Logs rendered records at `trace`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl RenderSink for TracingSink {
    fn render_tick(&self, entity: EntityId, tick: usize, record: &EntityRecord) {
        let position = record.position();
        trace!(
            %entity,
            tick,
            x = position.x,
            y = position.y,
            direction = record.direction(),
            behavior = ?record.display().active_behavior,
            "render"
        );
    }
}

/// One rendered record.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedTick {
    pub entity: EntityId,
    pub tick: usize,
    pub record: EntityRecord,
}

/// Keeps every rendered record in memory.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    rendered: Arc<Mutex<Vec<RenderedTick>>>,
    passes: Arc<Mutex<u64>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rendered(&self) -> Vec<RenderedTick> {
        self.rendered.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn len(&self) -> usize {
        self.rendered.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn passes(&self) -> u64 {
        *self.passes.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RenderSink for RecordingSink {
    fn render_tick(&self, entity: EntityId, tick: usize, record: &EntityRecord) {
        self.rendered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RenderedTick { entity, tick, record: record.clone() });
    }

    fn finish_pass(&self, _pass: u64) {
        *self.passes.lock().unwrap_or_else(PoisonError::into_inner) += 1;
    }
}

/// Drains one computed buffer per pass, pacing ticks on the clock.
pub struct DisplayLoop {
    ctx: Arc<SimulationContext>,
    control: LoopControl,
    events: broadcast::Sender<SimEvent>,
    sink: Arc<dyn RenderSink>,
    clock: Arc<dyn SimClock>,
    interval: Duration,

    /// Stop after this many passes (0 = until suspended)
    max_passes: u64,

    recorder: Option<Arc<Mutex<TrajectoryExport>>>,
}

impl DisplayLoop {
    pub fn new(
        ctx: Arc<SimulationContext>,
        control: LoopControl,
        events: broadcast::Sender<SimEvent>,
        sink: Arc<dyn RenderSink>,
        clock: Arc<dyn SimClock>,
    ) -> Self {
        Self {
            ctx,
            control,
            events,
            sink,
            clock,
            interval: Duration::from_millis(33),
            max_passes: 0,
            recorder: None,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_max_passes(mut self, passes: u64) -> Self {
        self.max_passes = passes;
        self
    }

    /// Appends a frame of display-side positions per rendered tick.
    pub fn with_recorder(mut self, recorder: Arc<Mutex<TrajectoryExport>>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub async fn run(self) -> SimResult<LoopReport> {
        info!(interval_ms = self.interval.as_millis() as u64, "display loop started");
        let result = self.drive().await;

        match &result {
            Ok(report) => info!(passes = report.passes, suspended = report.suspended, "display loop stopped"),
            Err(e) => {
                error!("display loop terminated: {}", e);
                let _ = self.events.send(SimEvent::LoopTerminated {
                    role: LoopRole::Display,
                    reason: e.to_string(),
                });
            }
        }
        result
    }

    async fn drive(&self) -> SimResult<LoopReport> {
        let mut report = LoopReport::new(LoopRole::Display);
        let switch = self.ctx.store().switch();

        while self.max_passes == 0 || report.passes < self.max_passes {
            let buffer = match switch.begin_display_pass(&self.control).await {
                Ok(buffer) => buffer,
                Err(SimError::Suspended) => {
                    report.suspended = true;
                    return Ok(report);
                }
                Err(e) => return Err(e),
            };

            let mut skipped: HashSet<EntityKey> = HashSet::new();
            for tick in 0..self.ctx.ticks() {
                if self.control.is_suspended() {
                    report.suspended = true;
                    return Ok(report);
                }

                for (id, key) in self.ctx.roster() {
                    if self.control.is_suspended() {
                        report.suspended = true;
                        return Ok(report);
                    }
                    if skipped.contains(&key) {
                        continue;
                    }
                    match self.ctx.store().get_record(key, tick) {
                        Ok(record) => self.sink.render_tick(id, tick, &record),
                        Err(SimError::MissingRecord { .. }) => {
                            debug!(entity = %id, tick, "no record yet, skipping for this pass");
                            skipped.insert(key);
                            report.skipped += 1;
                        }
                        Err(e) => return Err(e),
                    }
                }
                self.record_frame(tick)?;

                report.ticks += 1;
                self.clock.sleep(self.interval).await;
            }

            switch.finish_display_pass(buffer)?;
            report.passes += 1;
            self.sink.finish_pass(report.passes);
            debug!(pass = report.passes, ?buffer, "pass displayed");
            let _ = self.events.send(SimEvent::PassDisplayed {
                pass: report.passes,
                buffer,
            });
        }

        Ok(report)
    }

    fn record_frame(&self, tick: usize) -> SimResult<()> {
        let Some(recorder) = &self.recorder else {
            return Ok(());
        };
        let positions = self.ctx.populate_positions(tick)?;
        recorder
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_frame(tick, positions);
        Ok(())
    }
}
