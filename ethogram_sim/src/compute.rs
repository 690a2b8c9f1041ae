//! The producer schedule: computes whole passes into the free buffer.

use crate::events::{LoopReport, LoopRole, SimEvent};
use ethogram_core::{EntityKey, LoopControl, SimError, SimResult, SimulationContext};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Fills one trajectory buffer per pass, `T` ticks for every entity.
pub struct ComputeLoop {
    ctx: Arc<SimulationContext>,
    control: LoopControl,
    events: broadcast::Sender<SimEvent>,

    /// Stop after this many passes (0 = until suspended)
    max_passes: u64,
}

impl ComputeLoop {
    pub fn new(ctx: Arc<SimulationContext>, control: LoopControl, events: broadcast::Sender<SimEvent>) -> Self {
        Self {
            ctx,
            control,
            events,
            max_passes: 0,
        }
    }

    pub fn with_max_passes(mut self, passes: u64) -> Self {
        self.max_passes = passes;
        self
    }

    /// Runs until the pass limit, a suspension or a fatal error.
    pub async fn run(self) -> SimResult<LoopReport> {
        info!(ticks = self.ctx.ticks(), passes = self.max_passes, "compute loop started");
        let result = self.drive().await;

        match &result {
            Ok(report) => info!(passes = report.passes, suspended = report.suspended, "compute loop stopped"),
            Err(e) => {
                error!("compute loop terminated: {}", e);
                let _ = self.events.send(SimEvent::LoopTerminated {
                    role: LoopRole::Compute,
                    reason: e.to_string(),
                });
            }
        }
        result
    }

    async fn drive(&self) -> SimResult<LoopReport> {
        let mut report = LoopReport::new(LoopRole::Compute);
        let switch = self.ctx.store().switch();
        let mut known = self.ctx.entity_count();

        while self.max_passes == 0 || report.passes < self.max_passes {
            let lease = match switch.begin_compute_pass(&self.control).await {
                Ok(lease) => lease,
                Err(SimError::Suspended) => {
                    report.suspended = true;
                    return Ok(report);
                }
                Err(e) => return Err(e),
            };
            self.ctx.rewind_to_committed(lease.first_tick());

            let mut skipped: HashSet<EntityKey> = HashSet::new();

            for tick in lease.first_tick()..self.ctx.ticks() {
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
                    match self.ctx.advance_entity(key, id, tick) {
                        Ok(_) => {}
                        Err(SimError::MissingRecord { entity, tick }) => {
                            warn!(%entity, tick, "entity vanished mid-pass, skipping");
                            skipped.insert(key);
                            report.skipped += 1;
                        }
                        Err(e) => return Err(e),
                    }
                }

                report.ticks += 1;
                tokio::task::yield_now().await;
            }

            let pass = switch.finish_compute_pass(lease)?;
            report.passes += 1;

            let after = self.ctx.entity_count();
            debug!(pass, buffer = ?lease.buffer, entities = after, "pass computed");
            // Compared with the previous pass end, so inserts between passes count too
            if after != known {
                let _ = self.events.send(SimEvent::PopulationChanged { before: known, after });
                known = after;
            }
            let _ = self.events.send(SimEvent::PassComputed {
                pass,
                buffer: lease.buffer,
                entities: after,
            });
        }

        Ok(report)
    }
}
