//! The shared simulation context passed to both loops and every mechanism.

use crate::entity::{EntityId, EntityKey, Position};
use crate::environment::Environment;
use crate::error::{SimError, SimResult};
use crate::mechanism::TickOutcome;
use crate::population::{Agent, Population};
use crate::store::TrajectoryStore;
use ethogram_env::{ActionPerformer, ExcitationEvaluator, HandlerInvoker, HandlerTable, PropertyEvaluator, StepScriptPerformer};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, trace};

/// Store, population, bounds and collaborators of one simulation.
///
/// Lock order is population before store; store methods never call back
/// into the population.
pub struct SimulationContext {
    store: TrajectoryStore,
    population: RwLock<Population>,
    environment: Environment,
    evaluator: Arc<dyn ExcitationEvaluator>,
    performer: Arc<dyn ActionPerformer>,
    handlers: Arc<dyn HandlerInvoker>,
}

impl std::fmt::Debug for SimulationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationContext")
            .field("ticks", &self.store.ticks())
            .field("entities", &self.entity_count())
            .field("environment", &self.environment)
            .finish_non_exhaustive()
    }
}

impl SimulationContext {
    pub fn new(
        environment: Environment,
        ticks: usize,
        evaluator: Arc<dyn ExcitationEvaluator>,
        performer: Arc<dyn ActionPerformer>,
        handlers: Arc<dyn HandlerInvoker>,
    ) -> SimResult<Self> {
        Ok(Self {
            store: TrajectoryStore::new(ticks)?,
            population: RwLock::new(Population::new()),
            environment,
            evaluator,
            performer,
            handlers,
        })
    }

    /// Context wired to the scripted reference collaborators.
    pub fn scripted(environment: Environment, ticks: usize, handlers: HandlerTable) -> SimResult<Self> {
        Self::new(
            environment,
            ticks,
            Arc::new(PropertyEvaluator::new()),
            Arc::new(StepScriptPerformer::new()),
            Arc::new(handlers),
        )
    }

    pub fn evaluator(&self) -> &dyn ExcitationEvaluator {
        self.evaluator.as_ref()
    }

    pub fn performer(&self) -> &dyn ActionPerformer {
        self.performer.as_ref()
    }

    pub fn handlers(&self) -> &dyn HandlerInvoker {
        self.handlers.as_ref()
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn store(&self) -> &TrajectoryStore {
        &self.store
    }

    pub fn ticks(&self) -> usize {
        self.store.ticks()
    }

    pub fn population(&self) -> RwLockReadGuard<'_, Population> {
        self.population.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn population_mut(&self) -> RwLockWriteGuard<'_, Population> {
        self.population.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn entity_count(&self) -> usize {
        self.population().len()
    }

    /// `(id, key)` of every agent, in id order.
    pub fn roster(&self) -> Vec<(EntityId, EntityKey)> {
        self.population().iter().map(|a| (a.id(), a.key())).collect()
    }

    /// Adds an agent and seeds tick 0 of its trajectory.
    pub fn insert_agent(&self, agent: Agent) -> SimResult<EntityId> {
        let mut population = self.population_mut();
        self.store.add(agent.key(), agent.entity.snapshot(None))?;
        let id = population.insert(agent);
        debug!(entity = %id, "agent inserted");
        Ok(id)
    }

    /// Removes an agent with its trajectory; later agents are re-numbered.
    pub fn remove_agent(&self, id: EntityId) -> SimResult<Agent> {
        let mut population = self.population_mut();
        let agent = population.remove(id)?;
        self.store.remove(agent.key())?;
        debug!(entity = %id, "agent removed");
        Ok(agent)
    }

    /// Runs one tick of the agent `key` and stores its record.
    ///
    /// `hint` is the id the agent had when the pass started; it is only
    /// trusted while it still names the same key.
    pub fn advance_entity(&self, key: EntityKey, hint: EntityId, tick: usize) -> SimResult<TickOutcome> {
        let mut population = self.population_mut();
        let id = match population.get(hint) {
            Some(agent) if agent.key() == key => hint,
            _ => population.find_key(key).ok_or_else(|| SimError::missing(key, tick))?,
        };
        let agent = population
            .get_mut(id)
            .ok_or_else(|| SimError::missing(key, tick))?;

        let outcome = agent.act(self);
        self.store.store(key, agent.record(&outcome), tick)?;
        trace!(entity = %id, tick, winner = ?outcome.winner, "entity advanced");
        Ok(outcome)
    }

    /// Returns every agent to the record preceding `first_tick`.
    ///
    /// A pass always replays from the last committed step, so ticks an
    /// abandoned pass already applied to the agents are not counted twice.
    /// Agents without such a record keep their state. Returns the number
    /// of agents restored.
    pub fn rewind_to_committed(&self, first_tick: usize) -> usize {
        let mut population = self.population_mut();
        let mut restored = 0;
        for agent in population.iter_mut() {
            if let Ok(record) = self.store.get_previous_record(agent.key(), first_tick) {
                agent.entity.restore(&record);
                restored += 1;
            }
        }
        trace!(first_tick, restored, "agents rewound to committed records");
        restored
    }

    /// Puts the simulation back to tick 0.
    ///
    /// Listed entities move to their new positions; every mechanism and
    /// behavior forgets its run state and tick 0 is re-seeded.
    pub fn reset_simulation(&self, initial_positions: &HashMap<EntityId, Position>) -> SimResult<()> {
        let mut population = self.population_mut();
        self.store.reset();

        for agent in population.iter_mut() {
            if let Some(position) = initial_positions.get(&agent.id()) {
                agent.entity.position = *position;
            }
            agent.reset_state();
            self.store.seed(agent.key(), agent.entity.snapshot(None))?;
        }
        debug!(entities = population.len(), "simulation reset");
        Ok(())
    }

    /// Display-side position of every entity at `tick`.
    pub fn populate_positions(&self, tick: usize) -> SimResult<HashMap<EntityId, Position>> {
        let population = self.population();
        let by_key = self.store.populate_positions(tick)?;
        Ok(population
            .iter()
            .filter_map(|agent| by_key.get(&agent.key()).map(|p| (agent.id(), *p)))
            .collect())
    }
}

#[cfg(test)]
pub(crate) fn test_context(environment: Environment) -> SimulationContext {
    test_context_with_handlers(environment, HandlerTable::new())
}

#[cfg(test)]
pub(crate) fn test_context_with_handlers(environment: Environment, handlers: HandlerTable) -> SimulationContext {
    SimulationContext::scripted(environment, 8, handlers).expect("8 ticks is a valid length")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{BehaviorDocument, NetworkDocument};
    use crate::entity::{ActivityState, Entity};
    use crate::environment::BoundaryKind;
    use crate::handoff::Buffer;
    use approx::assert_relative_eq;

    fn walker(name: &str, x: f64) -> Agent {
        let entity = Entity::new(name, "walker").with_position(x, 10.0);
        Agent::from_document(
            entity,
            NetworkDocument::Cooperative {
                behaviors: vec![BehaviorDocument::new("east", "1", "forward 1 0")],
                weights: vec![1.0],
            },
        )
        .unwrap()
    }

    fn open() -> Environment {
        Environment::new(100.0, 100.0, BoundaryKind::Open)
    }

    fn publish(ctx: &SimulationContext) {
        let lease = ctx.store().switch().try_begin_compute_pass().unwrap();
        ctx.store().switch().finish_compute_pass(lease).unwrap();
    }

    #[test]
    fn test_insert_seeds_trajectory() {
        let ctx = test_context(open());
        let id = ctx.insert_agent(walker("w", 5.0)).unwrap();
        assert_eq!(id, EntityId(0));
        assert_eq!(ctx.entity_count(), 1);

        publish(&ctx);
        let positions = ctx.populate_positions(0).unwrap();
        assert_relative_eq!(positions[&id].x, 5.0);
    }

    #[test]
    fn test_advance_moves_and_stores() {
        let ctx = test_context(open());
        ctx.insert_agent(walker("w", 5.0)).unwrap();
        let (id, key) = ctx.roster()[0];

        ctx.advance_entity(key, id, 1).unwrap();
        ctx.advance_entity(key, id, 2).unwrap();
        assert_eq!(ctx.store().slot_pass(key, Buffer::Main, 2), Some(0));

        publish(&ctx);
        assert_relative_eq!(ctx.populate_positions(2).unwrap()[&id].x, 7.0);
    }

    #[test]
    fn test_advance_follows_reindexed_key() {
        let ctx = test_context(open());
        ctx.insert_agent(walker("a", 1.0)).unwrap();
        ctx.insert_agent(walker("b", 2.0)).unwrap();
        let roster = ctx.roster();

        ctx.remove_agent(EntityId(0)).unwrap();
        let (stale_id, key_b) = roster[1];
        ctx.advance_entity(key_b, stale_id, 1).unwrap();
        assert_relative_eq!(ctx.population().get(EntityId(0)).unwrap().entity.position.x, 3.0);

        let (id_a, key_a) = roster[0];
        assert!(matches!(
            ctx.advance_entity(key_a, id_a, 1),
            Err(SimError::MissingRecord { .. })
        ));
    }

    #[test]
    fn test_reset_moves_and_reseeds() {
        let ctx = test_context(open());
        ctx.insert_agent(walker("w", 5.0)).unwrap();
        let (id, key) = ctx.roster()[0];
        ctx.advance_entity(key, id, 1).unwrap();
        publish(&ctx);

        let positions = HashMap::from([(id, Position::new(40.0, 40.0))]);
        ctx.reset_simulation(&positions).unwrap();

        assert_eq!(ctx.store().switch().pass(), 0);
        assert_eq!(ctx.store().switch().compute_buffer(), Buffer::Main);
        publish(&ctx);
        assert_relative_eq!(ctx.populate_positions(0).unwrap()[&id].x, 40.0);
    }

    #[test]
    fn test_rewind_replays_from_last_committed_step() {
        let ctx = test_context(open());
        ctx.insert_agent(walker("w", 5.0)).unwrap();
        let (id, key) = ctx.roster()[0];

        // Abandoned pass: three steps applied, then given up
        for tick in 1..4 {
            ctx.advance_entity(key, id, tick).unwrap();
        }
        assert_eq!(ctx.rewind_to_committed(1), 1);
        assert_relative_eq!(ctx.population().get(id).unwrap().entity.position.x, 5.0);

        for tick in 1..8 {
            ctx.advance_entity(key, id, tick).unwrap();
        }
        publish(&ctx);

        // Second pass continues from tick 7 of the first
        ctx.advance_entity(key, id, 0).unwrap();
        assert_eq!(ctx.rewind_to_committed(0), 1);
        assert_relative_eq!(ctx.population().get(id).unwrap().entity.position.x, 12.0);
    }

    #[test]
    fn test_rewind_keeps_agents_without_records() {
        let ctx = test_context(open());
        ctx.insert_agent(walker("w", 5.0)).unwrap();
        publish(&ctx);
        assert_eq!(ctx.rewind_to_committed(0), 0);
        assert_relative_eq!(ctx.population().get(EntityId(0)).unwrap().entity.position.x, 5.0);
    }

    #[test]
    fn test_inactive_agent_holds_position() {
        let ctx = test_context(open());
        let mut agent = walker("w", 5.0);
        agent.entity.state = ActivityState::Inactive;
        ctx.insert_agent(agent).unwrap();
        let (id, key) = ctx.roster()[0];

        let outcome = ctx.advance_entity(key, id, 1).unwrap();
        assert_eq!(outcome, TickOutcome::default());
        assert_eq!(ctx.store().slot_pass(key, Buffer::Main, 1), Some(0));

        publish(&ctx);
        let record = ctx.store().get_record(key, 1).unwrap();
        assert_relative_eq!(record.position().x, 5.0);
        assert_eq!(record.state(), ActivityState::Inactive);
    }

    #[test]
    fn test_remove_unknown_is_refused() {
        let ctx = test_context(open());
        ctx.insert_agent(walker("w", 5.0)).unwrap();
        assert!(ctx.remove_agent(EntityId(3)).is_err());
        assert_eq!(ctx.entity_count(), 1);
    }
}
