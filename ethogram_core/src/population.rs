//! Agents, the population they live in and the category factory.

use crate::context::SimulationContext;
use crate::document::NetworkDocument;
use crate::entity::{Entity, EntityId, EntityKey, EntityRecord, Position};
use crate::error::{SimError, SimResult};
use crate::mechanism::{ActionSelection, TickOutcome};
use crate::network::BehaviorNetwork;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An entity together with the network and mechanism that drive it.
#[derive(Debug, Clone)]
pub struct Agent {
    pub entity: Entity,
    pub network: BehaviorNetwork,
    pub mechanism: ActionSelection,
}

impl Agent {
    /// An agent that never moves.
    pub fn new(entity: Entity) -> Self {
        Self {
            entity,
            network: BehaviorNetwork::new(),
            mechanism: ActionSelection::NoDynamics,
        }
    }

    pub fn with_network(mut self, network: BehaviorNetwork, mechanism: ActionSelection) -> Self {
        self.network = network;
        self.mechanism = mechanism;
        self
    }

    pub fn from_document(entity: Entity, document: NetworkDocument) -> SimResult<Self> {
        let (network, mechanism) = document.into_parts()?;
        Ok(Self::new(entity).with_network(network, mechanism))
    }

    pub fn id(&self) -> EntityId {
        self.entity.id
    }

    pub fn key(&self) -> EntityKey {
        self.entity.key
    }

    /// Runs the mechanism for one tick; inactive agents sit the tick out.
    pub fn act(&mut self, ctx: &SimulationContext) -> TickOutcome {
        if !self.entity.is_active() {
            return TickOutcome::default();
        }
        self.mechanism.execute(&mut self.entity, &mut self.network, ctx)
    }

    /// Swaps the mechanism; the network keeps its behaviors but loses run state.
    pub fn set_mechanism(&mut self, mechanism: ActionSelection) {
        self.mechanism = mechanism;
        self.network.reset_state();
    }

    pub fn record(&self, outcome: &TickOutcome) -> EntityRecord {
        self.entity.snapshot(outcome.winner)
    }

    pub fn reset_state(&mut self) {
        self.network.reset_state();
        self.mechanism.reset();
    }

    pub fn document(&self) -> NetworkDocument {
        NetworkDocument::export(&self.network, &self.mechanism)
    }
}

/// Agents in insertion order, indexed by category.
///
/// `EntityId` is the position in insertion order, so removing an agent
/// re-numbers every agent after it.
#[derive(Debug, Clone, Default)]
pub struct Population {
    agents: Vec<Agent>,
    categories: BTreeMap<String, Vec<EntityId>>,
}

impl Population {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Appends an agent and assigns it the next id.
    pub fn insert(&mut self, mut agent: Agent) -> EntityId {
        let id = EntityId(self.agents.len());
        agent.entity.id = id;
        self.categories
            .entry(agent.entity.category.clone())
            .or_default()
            .push(id);
        self.agents.push(agent);
        id
    }

    pub fn remove(&mut self, id: EntityId) -> SimResult<Agent> {
        if id.index() >= self.agents.len() {
            return Err(SimError::configuration(format!("no entity {} to remove", id)));
        }
        let removed = self.agents.remove(id.index());
        self.reindex();
        Ok(removed)
    }

    fn reindex(&mut self) {
        self.categories.clear();
        for (index, agent) in self.agents.iter_mut().enumerate() {
            agent.entity.id = EntityId(index);
            self.categories
                .entry(agent.entity.category.clone())
                .or_default()
                .push(agent.entity.id);
        }
    }

    pub fn get(&self, id: EntityId) -> Option<&Agent> {
        self.agents.get(id.index())
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Agent> {
        self.agents.get_mut(id.index())
    }

    pub fn find_key(&self, key: EntityKey) -> Option<EntityId> {
        self.agents.iter().find(|a| a.key() == key).map(Agent::id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Agent> {
        self.agents.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Agent> {
        self.agents.iter_mut()
    }

    pub fn category(&self, name: &str) -> &[EntityId] {
        self.categories.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn categories(&self) -> impl Iterator<Item = (&str, usize)> {
        self.categories.iter().map(|(name, ids)| (name.as_str(), ids.len()))
    }
}

fn default_extent() -> [f64; 2] {
    [1.0, 1.0]
}

/// Everything needed to create an agent of one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentTemplate {
    /// Half width and half height
    #[serde(default = "default_extent")]
    pub extent: [f64; 2],

    #[serde(default)]
    pub speed: f64,

    #[serde(default)]
    pub properties: BTreeMap<String, f64>,

    /// `None` creates agents without dynamics
    #[serde(default)]
    pub network: Option<NetworkDocument>,
}

impl Default for AgentTemplate {
    fn default() -> Self {
        Self {
            extent: default_extent(),
            speed: 0.0,
            properties: BTreeMap::new(),
            network: None,
        }
    }
}

impl AgentTemplate {
    pub fn with_network(mut self, network: NetworkDocument) -> Self {
        self.network = Some(network);
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, value: f64) -> Self {
        self.properties.insert(name.into(), value);
        self
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = speed;
        self
    }

    pub fn with_extent(mut self, half_width: f64, half_height: f64) -> Self {
        self.extent = [half_width, half_height];
        self
    }
}

/// Category name to template.
#[derive(Debug, Clone, Default)]
pub struct CategoryRegistry {
    templates: BTreeMap<String, AgentTemplate>,
}

impl CategoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, category: impl Into<String>, template: AgentTemplate) {
        self.templates.insert(category.into(), template);
    }

    pub fn contains(&self, category: &str) -> bool {
        self.templates.contains_key(category)
    }

    pub fn template(&self, category: &str) -> Option<&AgentTemplate> {
        self.templates.get(category)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    /// Creates an agent of `category`; the id is assigned on insertion.
    pub fn spawn(
        &self,
        category: &str,
        display_name: impl Into<String>,
        position: Position,
        direction: f64,
    ) -> SimResult<Agent> {
        let template = self
            .templates
            .get(category)
            .ok_or_else(|| SimError::configuration(format!("unknown category '{}'", category)))?;

        let mut entity = Entity::new(display_name, category)
            .with_position(position.x, position.y)
            .with_direction(direction)
            .with_speed(template.speed)
            .with_extent(template.extent[0], template.extent[1]);
        entity.properties = template.properties.clone();

        match &template.network {
            Some(document) => Agent::from_document(entity, document.clone()),
            None => Ok(Agent::new(entity)),
        }
    }
}

impl FromIterator<(String, AgentTemplate)> for CategoryRegistry {
    fn from_iter<I: IntoIterator<Item = (String, AgentTemplate)>>(iter: I) -> Self {
        Self {
            templates: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::BehaviorDocument;

    fn agent(name: &str, category: &str) -> Agent {
        Agent::new(Entity::new(name, category))
    }

    #[test]
    fn test_insert_assigns_sequential_ids() {
        let mut population = Population::new();
        assert_eq!(population.insert(agent("a", "ant")), EntityId(0));
        assert_eq!(population.insert(agent("b", "bee")), EntityId(1));
        assert_eq!(population.insert(agent("c", "ant")), EntityId(2));

        assert_eq!(population.category("ant"), &[EntityId(0), EntityId(2)]);
        assert!(population.category("wasp").is_empty());
    }

    #[test]
    fn test_remove_reindexes() {
        let mut population = Population::new();
        for (name, category) in [("a", "ant"), ("b", "bee"), ("c", "ant")] {
            population.insert(agent(name, category));
        }
        let key_c = population.get(EntityId(2)).unwrap().key();

        let removed = population.remove(EntityId(0)).unwrap();
        assert_eq!(removed.entity.display_name, "a");

        assert_eq!(population.len(), 2);
        assert_eq!(population.get(EntityId(1)).unwrap().entity.display_name, "c");
        assert_eq!(population.find_key(key_c), Some(EntityId(1)));
        assert_eq!(population.category("ant"), &[EntityId(1)]);
        assert!(population.remove(EntityId(5)).is_err());
    }

    #[test]
    fn test_spawn_from_template() {
        let mut registry = CategoryRegistry::new();
        registry.register(
            "grazer",
            AgentTemplate::default()
                .with_speed(1.5)
                .with_extent(2.0, 3.0)
                .with_property("hunger", 0.4)
                .with_network(NetworkDocument::Cooperative {
                    behaviors: vec![BehaviorDocument::new("walk", "1", "forward 1 0")],
                    weights: vec![0.5],
                }),
        );

        let spawned = registry.spawn("grazer", "g1", Position::new(3.0, 4.0), 1.0).unwrap();
        assert_eq!(spawned.entity.category, "grazer");
        assert_eq!(spawned.entity.speed, 1.5);
        assert_eq!(spawned.entity.extent, Position::new(2.0, 3.0));
        assert_eq!(spawned.entity.properties["hunger"], 0.4);
        assert_eq!(spawned.mechanism.name(), "cooperative");
        assert_eq!(spawned.network.behaviors()[0].weight, 0.5);

        assert!(matches!(
            registry.spawn("ghost", "x", Position::zeros(), 0.0),
            Err(SimError::Configuration(_))
        ));
    }

    #[test]
    fn test_set_mechanism_clears_run_state() {
        let (network, _) = NetworkDocument::Cooperative {
            behaviors: vec![BehaviorDocument::new("walk", "1", "forward 1 0")],
            weights: vec![1.0],
        }
        .into_parts()
        .unwrap();
        let mut agent = agent("a", "ant").with_network(network, ActionSelection::cooperative());
        agent.network.behaviors_mut()[0].record_strength(3.0);

        agent.set_mechanism(ActionSelection::mutual_inhibition());
        assert_eq!(agent.network.behaviors()[0].strength(), 0.0);
        assert_eq!(agent.document().kind(), "mutual_inhibition");
    }
}
