//! Cooperative selection: every behavior contributes a weighted step.

use super::TickOutcome;
use crate::context::SimulationContext;
use crate::entity::{normalize_angle, Entity};
use crate::network::BehaviorNetwork;
use nalgebra::Vector2;
use tracing::warn;

/// Weighted vector-sum mechanism.
///
/// Each behavior runs one step of its task queue against a scratch clone of
/// the entity; only the aggregated displacement reaches the real entity.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Cooperative;

impl Cooperative {
    /// Sums `weight * speed * (cos dir, sin dir)` over all behaviors.
    ///
    /// Excitations are evaluated and stored as activations for
    /// observability; they do not weight the sum.
    pub fn aggregate(
        &self,
        entity: &Entity,
        network: &mut BehaviorNetwork,
        ctx: &SimulationContext,
    ) -> Vector2<f64> {
        let mut delta = Vector2::zeros();

        for behavior in network.behaviors_mut() {
            let mut scratch = entity.clone();

            let excitation = ctx
                .evaluator()
                .evaluate_excitation(&scratch, &behavior.script)
                .unwrap_or_else(|e| {
                    warn!(entity = %entity.display_name, behavior = behavior.name(), "excitation failed: {}", e);
                    0.0
                });
            behavior.set_activation(excitation);
            behavior.record_strength(excitation);

            match behavior.perform_action(&mut scratch, ctx.performer()) {
                Ok(Some(command)) => {
                    let [dx, dy] = command.displacement();
                    delta += behavior.weight * Vector2::new(dx, dy);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(entity = %entity.display_name, behavior = behavior.name(), "action failed: {}", e);
                }
            }
        }

        delta
    }

    pub(super) fn execute(
        &self,
        entity: &mut Entity,
        network: &mut BehaviorNetwork,
        ctx: &SimulationContext,
    ) -> TickOutcome {
        let delta = self.aggregate(entity, network, ctx);

        entity.displace(delta);
        let magnitude = delta.norm();
        if magnitude > 0.0 {
            entity.direction = normalize_angle(delta.y.atan2(delta.x));
        }
        entity.speed = magnitude;

        TickOutcome {
            winner: None,
            command: None,
            boundary: ctx.environment().confine(entity),
        }
    }
}
