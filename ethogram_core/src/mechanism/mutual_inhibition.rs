//! Winner-take-all selection through asymmetric mutual inhibition.

use super::TickOutcome;
use crate::behavior::BehaviorId;
use crate::context::SimulationContext;
use crate::entity::Entity;
use crate::network::BehaviorNetwork;
use tracing::{trace, warn};

/// Stage of the competitive state machine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SelectionPhase {
    #[default]
    Idle,
    Evaluating,
    WinnerSelected,
    Acting,
}

/// Competitive mechanism: exactly one behavior acts per tick.
///
/// # Strength update
///
/// With persistence `p`, raw excitation `e_i` and last tick's strengths `s'`:
///
/// ```text
/// s_i = max(0, p * s'_i + (1 - p) * e_i - sum_j c_ji * s'_j)
/// ```
///
/// `c_ji` comes from the edge between `j` and `i` oriented onto `i`, or
/// from the network's dynamic formula when it has one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MutualInhibition {
    /// Winner of the last tick, `None` before the first tick
    pub previous_winner: Option<BehaviorId>,

    phase: SelectionPhase,
}

impl MutualInhibition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> SelectionPhase {
        self.phase
    }

    fn enter(&mut self, phase: SelectionPhase) {
        trace!(from = ?self.phase, to = ?phase, "selection phase");
        self.phase = phase;
    }

    pub(super) fn execute(
        &mut self,
        entity: &mut Entity,
        network: &mut BehaviorNetwork,
        ctx: &SimulationContext,
    ) -> TickOutcome {
        self.enter(SelectionPhase::Evaluating);
        self.update_strengths(entity, network, ctx);

        self.enter(SelectionPhase::WinnerSelected);
        let winner = select_winner(network);
        let winner_id = winner.map(|i| network.behaviors()[i].id);

        if winner_id != self.previous_winner {
            // A resumable behavior only keeps its cursor while it keeps winning
            for id in [winner_id, self.previous_winner].into_iter().flatten() {
                if let Some(behavior) = network.behavior_mut(id) {
                    if behavior.resumable {
                        behavior.reset_action();
                    }
                }
            }
        }
        self.previous_winner = winner_id;

        let mut outcome = TickOutcome {
            winner,
            ..TickOutcome::default()
        };

        if let Some(index) = winner {
            self.enter(SelectionPhase::Acting);
            let behavior = &mut network.behaviors_mut()[index];
            trace!(entity = %entity.display_name, behavior = behavior.name(), "winner");

            match behavior.perform_action(entity, ctx.performer()) {
                Ok(Some(command)) => {
                    entity.apply_motion(&command);
                    outcome.command = Some(command);
                    outcome.boundary = ctx.environment().confine(entity);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(entity = %entity.display_name, behavior = behavior.name(), "action failed: {}", e);
                }
            }
        }

        self.enter(SelectionPhase::Idle);
        outcome
    }

    fn update_strengths(&self, entity: &Entity, network: &mut BehaviorNetwork, ctx: &SimulationContext) {
        let evaluator = ctx.evaluator();

        let dynamic = network.dynamic_formula().map(|formula| {
            evaluator.evaluate_formula(entity, formula).unwrap_or_else(|e| {
                warn!(entity = %entity.display_name, "dynamic coefficient failed: {}", e);
                0.0
            })
        });

        let excitations: Vec<f64> = network
            .behaviors()
            .iter()
            .map(|b| {
                evaluator.evaluate_excitation(entity, &b.script).unwrap_or_else(|e| {
                    warn!(entity = %entity.display_name, behavior = b.name(), "excitation failed: {}", e);
                    0.0
                })
            })
            .collect();

        let previous: Vec<(BehaviorId, f64)> = network
            .behaviors()
            .iter()
            .map(|b| (b.id, b.strength()))
            .collect();
        let p = network.persistence;

        let strengths: Vec<f64> = previous
            .iter()
            .zip(&excitations)
            .map(|(&(id, own), &excitation)| {
                let inhibition: f64 = previous
                    .iter()
                    .filter(|(other, _)| *other != id)
                    .map(|&(other, s)| dynamic.unwrap_or_else(|| network.inhibition(other, id)) * s)
                    .sum();
                (p * own + (1.0 - p) * excitation - inhibition).max(0.0)
            })
            .collect();

        for ((behavior, excitation), strength) in network
            .behaviors_mut()
            .iter_mut()
            .zip(excitations)
            .zip(strengths)
        {
            behavior.set_activation(excitation);
            behavior.record_strength(strength);
        }
    }
}

/// First behavior with the maximum strength above the threshold.
fn select_winner(network: &BehaviorNetwork) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, behavior) in network.behaviors().iter().enumerate() {
        let s = behavior.strength();
        if s <= network.activation_threshold {
            continue;
        }
        match best {
            Some((_, top)) if s <= top => {}
            _ => best = Some((i, s)),
        }
    }
    best.map(|(i, _)| i)
}
