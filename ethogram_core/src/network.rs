//! Behavior networks: the behaviors of one agent and their inhibition edges.

use crate::behavior::{Behavior, BehaviorId, Edge};
use crate::error::{SimError, SimResult};
use serde::{Deserialize, Serialize};

/// Default self-excitation decay factor.
pub const DEFAULT_PERSISTENCE: f64 = 0.1;

/// Behaviors of one agent in priority order plus a dense edge set.
///
/// Every mutation validates before applying, so a refused mutation leaves
/// the network exactly as it was.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorNetwork {
    behaviors: Vec<Behavior>,

    /// One edge per unordered pair of behaviors
    edges: Vec<Edge>,

    /// Coefficient formula when inhibition is computed instead of fixed
    dynamic: Option<String>,

    /// A winner must be strictly above this strength
    pub activation_threshold: f64,

    /// Weight of last tick's strength in the strength update
    pub persistence: f64,
}

impl Default for BehaviorNetwork {
    fn default() -> Self {
        Self::new()
    }
}

impl BehaviorNetwork {
    pub fn new() -> Self {
        Self {
            behaviors: Vec::new(),
            edges: Vec::new(),
            dynamic: None,
            activation_threshold: 0.0,
            persistence: DEFAULT_PERSISTENCE,
        }
    }

    pub fn behaviors(&self) -> &[Behavior] {
        &self.behaviors
    }

    pub fn behaviors_mut(&mut self) -> &mut [Behavior] {
        &mut self.behaviors
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.behaviors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.behaviors.is_empty()
    }

    pub fn is_dynamic(&self) -> bool {
        self.dynamic.is_some()
    }

    pub fn dynamic_formula(&self) -> Option<&str> {
        self.dynamic.as_deref()
    }

    /// Position of a behavior in priority order.
    pub fn index_of(&self, id: BehaviorId) -> Option<usize> {
        self.behaviors.iter().position(|b| b.id == id)
    }

    pub fn behavior(&self, id: BehaviorId) -> Option<&Behavior> {
        self.behaviors.iter().find(|b| b.id == id)
    }

    pub fn behavior_mut(&mut self, id: BehaviorId) -> Option<&mut Behavior> {
        self.behaviors.iter_mut().find(|b| b.id == id)
    }

    pub fn edge(&self, a: BehaviorId, b: BehaviorId) -> Option<&Edge> {
        self.edges.iter().find(|e| e.joins(a, b))
    }

    /// One past the largest id in use (0 for an empty network).
    pub fn next_id(&self) -> BehaviorId {
        let max = self.behaviors.iter().map(|b| b.id.0).max();
        BehaviorId(max.map_or(0, |m| m + 1))
    }

    /// Appends a behavior and creates zero-coefficient edges to all others.
    pub fn add_behavior(&mut self, behavior: Behavior) -> SimResult<()> {
        if self.index_of(behavior.id).is_some() {
            return Err(SimError::configuration(format!(
                "behavior id {} already used in network",
                behavior.id
            )));
        }
        if !behavior.weight.is_finite() {
            return Err(SimError::configuration(format!(
                "behavior '{}' has non-finite weight",
                behavior.name()
            )));
        }

        for existing in &self.behaviors {
            self.edges.push(Edge::new(existing.id, behavior.id));
        }
        self.behaviors.push(behavior);
        Ok(())
    }

    /// Removes a behavior and every edge touching it.
    pub fn remove_behavior(&mut self, id: BehaviorId) -> SimResult<Behavior> {
        let index = self
            .index_of(id)
            .ok_or_else(|| SimError::configuration(format!("no behavior {} to remove", id)))?;
        self.edges.retain(|e| !e.touches(id));
        Ok(self.behaviors.remove(index))
    }

    /// Sets how strongly `from` inhibits `to` and vice versa.
    pub fn set_inhibition(
        &mut self,
        from: BehaviorId,
        to: BehaviorId,
        inhibition_ft: f64,
        inhibition_tf: f64,
    ) -> SimResult<()> {
        if from == to {
            return Err(SimError::configuration(format!("self edge on {}", from)));
        }
        for id in [from, to] {
            if self.index_of(id).is_none() {
                return Err(SimError::configuration(format!("edge references unknown behavior {}", id)));
            }
        }
        if !inhibition_ft.is_finite() || !inhibition_tf.is_finite() {
            return Err(SimError::configuration("inhibition coefficients must be finite"));
        }

        let edge = self
            .edges
            .iter_mut()
            .find(|e| e.joins(from, to))
            .ok_or_else(|| SimError::protocol(format!("dense edge set lacks {}-{}", from, to)))?;
        edge.set_inhibition_from(from, inhibition_ft);
        edge.set_inhibition_from(to, inhibition_tf);
        Ok(())
    }

    /// Coefficient with which `source` inhibits `target` under fixed coefficients.
    pub fn inhibition(&self, source: BehaviorId, target: BehaviorId) -> f64 {
        if source == target {
            return 0.0;
        }
        self.edge(source, target)
            .map_or(0.0, |e| e.inhibition_onto(target))
    }

    pub fn set_weight(&mut self, id: BehaviorId, weight: f64) -> SimResult<()> {
        if !weight.is_finite() {
            return Err(SimError::configuration("weight must be finite"));
        }
        let behavior = self
            .behavior_mut(id)
            .ok_or_else(|| SimError::configuration(format!("no behavior {}", id)))?;
        behavior.weight = weight;
        Ok(())
    }

    /// Switches between fixed coefficients (`None`) and a coefficient formula.
    pub fn set_dynamic(&mut self, formula: Option<String>) -> SimResult<()> {
        if let Some(f) = &formula {
            if f.trim().is_empty() {
                return Err(SimError::configuration("dynamic formula is empty"));
            }
        }
        self.dynamic = formula;
        Ok(())
    }

    /// Clears every behavior's activation, strength and cursor.
    pub fn reset_state(&mut self) {
        for behavior in &mut self.behaviors {
            behavior.reset_state();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethogram_env::BehaviorScript;

    fn behavior(id: u32, name: &str) -> Behavior {
        Behavior::new(BehaviorId(id), BehaviorScript::new(name, "0", "hold"))
    }

    fn three() -> BehaviorNetwork {
        let mut net = BehaviorNetwork::new();
        net.add_behavior(behavior(0, "a")).unwrap();
        net.add_behavior(behavior(1, "b")).unwrap();
        net.add_behavior(behavior(2, "c")).unwrap();
        net
    }

    #[test]
    fn test_edges_are_dense() {
        let net = three();
        assert_eq!(net.edges().len(), 3);
        assert!(net.edge(BehaviorId(2), BehaviorId(0)).is_some());
        assert_eq!(net.next_id(), BehaviorId(3));
    }

    #[test]
    fn test_id_collision_is_refused() {
        let mut net = three();
        let before = net.clone();
        let err = net.add_behavior(behavior(1, "dup")).unwrap_err();

        assert!(matches!(err, SimError::Configuration(_)));
        assert_eq!(net, before);
    }

    #[test]
    fn test_dangling_edge_is_refused() {
        let mut net = three();
        let before = net.clone();

        assert!(net.set_inhibition(BehaviorId(0), BehaviorId(9), 0.5, 0.5).is_err());
        assert!(net.set_inhibition(BehaviorId(0), BehaviorId(0), 0.5, 0.5).is_err());
        assert!(net.set_inhibition(BehaviorId(0), BehaviorId(1), f64::NAN, 0.5).is_err());
        assert_eq!(net, before);
    }

    #[test]
    fn test_set_inhibition_is_oriented() {
        let mut net = three();
        // stored edge is (0 -> 2); set it from the other side
        net.set_inhibition(BehaviorId(2), BehaviorId(0), 0.7, 0.1).unwrap();

        assert_eq!(net.inhibition(BehaviorId(2), BehaviorId(0)), 0.7);
        assert_eq!(net.inhibition(BehaviorId(0), BehaviorId(2)), 0.1);
        assert_eq!(net.inhibition(BehaviorId(0), BehaviorId(0)), 0.0);
    }

    #[test]
    fn test_remove_behavior_drops_edges() {
        let mut net = three();
        let removed = net.remove_behavior(BehaviorId(1)).unwrap();

        assert_eq!(removed.name(), "b");
        assert_eq!(net.edges().len(), 1);
        assert!(net.remove_behavior(BehaviorId(1)).is_err());
    }

    #[test]
    fn test_dynamic_formula_toggle() {
        let mut net = three();
        assert!(!net.is_dynamic());
        net.set_dynamic(Some("0.3".into())).unwrap();
        assert_eq!(net.dynamic_formula(), Some("0.3"));
        assert!(net.set_dynamic(Some("  ".into())).is_err());
        assert!(net.is_dynamic());
        net.set_dynamic(None).unwrap();
        assert!(!net.is_dynamic());
    }
}
