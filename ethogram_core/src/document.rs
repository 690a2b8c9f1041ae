//! Interchange documents for behavior networks.
//!
//! Four shapes, tagged by `"kind"`:
//!
//! ```json
//! { "kind": "mutual_inhibition", "behaviors": [...], "coefficients": [[0.0, 0.5], [0.2, 0.0]] }
//! { "kind": "cooperative",       "behaviors": [...], "weights": [0.5, 1.0] }
//! { "kind": "dynamic",           "behaviors": [...], "formula": "fear * 0.5" }
//! { "kind": "system_dynamics",   "handler": "orbit", "script": "..." }
//! ```

use crate::behavior::{Behavior, BehaviorId};
use crate::error::{SimError, SimResult};
use crate::mechanism::ActionSelection;
use crate::network::BehaviorNetwork;
use ethogram_env::BehaviorScript;
use serde::{Deserialize, Serialize};

/// One behavior as it appears in a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorDocument {
    pub name: String,

    #[serde(default)]
    pub resumable: bool,

    pub excitation_formula: String,

    #[serde(default)]
    pub action_script: String,
}

impl BehaviorDocument {
    pub fn new(
        name: impl Into<String>,
        excitation_formula: impl Into<String>,
        action_script: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            resumable: false,
            excitation_formula: excitation_formula.into(),
            action_script: action_script.into(),
        }
    }

    pub fn resumable(mut self, resumable: bool) -> Self {
        self.resumable = resumable;
        self
    }

    fn into_behavior(self, id: BehaviorId) -> SimResult<Behavior> {
        if self.name.trim().is_empty() {
            return Err(SimError::configuration(format!("behavior {} has no name", id)));
        }
        let script = BehaviorScript::new(self.name, self.excitation_formula, self.action_script);
        Ok(Behavior::new(id, script).resumable(self.resumable))
    }
}

impl From<&Behavior> for BehaviorDocument {
    fn from(behavior: &Behavior) -> Self {
        Self {
            name: behavior.script.name.clone(),
            resumable: behavior.resumable,
            excitation_formula: behavior.script.excitation_formula.clone(),
            action_script: behavior.script.action_script.clone(),
        }
    }
}

/// Serialized behavior network plus the mechanism that drives it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NetworkDocument {
    /// `coefficients[i][j]` is how strongly behavior `i` inhibits `j`
    MutualInhibition {
        behaviors: Vec<BehaviorDocument>,
        coefficients: Vec<Vec<f64>>,
    },
    Cooperative {
        behaviors: Vec<BehaviorDocument>,
        weights: Vec<f64>,
    },
    Dynamic {
        behaviors: Vec<BehaviorDocument>,
        formula: String,
    },
    SystemDynamics {
        handler: String,
        script: String,
    },
}

impl NetworkDocument {
    pub fn kind(&self) -> &'static str {
        match self {
            NetworkDocument::MutualInhibition { .. } => "mutual_inhibition",
            NetworkDocument::Cooperative { .. } => "cooperative",
            NetworkDocument::Dynamic { .. } => "dynamic",
            NetworkDocument::SystemDynamics { .. } => "system_dynamics",
        }
    }

    /// Builds a validated network and its mechanism.
    pub fn into_parts(self) -> SimResult<(BehaviorNetwork, ActionSelection)> {
        match self {
            NetworkDocument::MutualInhibition {
                behaviors,
                coefficients,
            } => {
                let n = behaviors.len();
                if coefficients.len() != n || coefficients.iter().any(|row| row.len() != n) {
                    return Err(SimError::configuration(format!(
                        "coefficient matrix must be {}x{}",
                        n, n
                    )));
                }
                let mut network = build_network(behaviors)?;
                let ids: Vec<BehaviorId> = network.behaviors().iter().map(|b| b.id).collect();
                for i in 0..n {
                    for j in (i + 1)..n {
                        network.set_inhibition(ids[i], ids[j], coefficients[i][j], coefficients[j][i])?;
                    }
                }
                Ok((network, ActionSelection::mutual_inhibition()))
            }
            NetworkDocument::Cooperative { behaviors, weights } => {
                if weights.len() != behaviors.len() {
                    return Err(SimError::configuration(format!(
                        "{} weights for {} behaviors",
                        weights.len(),
                        behaviors.len()
                    )));
                }
                let mut network = build_network(behaviors)?;
                let ids: Vec<BehaviorId> = network.behaviors().iter().map(|b| b.id).collect();
                for (id, weight) in ids.into_iter().zip(weights) {
                    network.set_weight(id, weight)?;
                }
                Ok((network, ActionSelection::cooperative()))
            }
            NetworkDocument::Dynamic { behaviors, formula } => {
                let mut network = build_network(behaviors)?;
                network.set_dynamic(Some(formula))?;
                Ok((network, ActionSelection::mutual_inhibition()))
            }
            NetworkDocument::SystemDynamics { handler, script } => {
                if handler.trim().is_empty() {
                    return Err(SimError::configuration("system dynamics document names no handler"));
                }
                Ok((BehaviorNetwork::new(), ActionSelection::system_dynamics(handler, script)))
            }
        }
    }

    /// Produces the shape matching `mechanism`.
    ///
    /// `NoDynamics` has no shape of its own and exports as `cooperative`
    /// with zero weights.
    pub fn export(network: &BehaviorNetwork, mechanism: &ActionSelection) -> Self {
        let behaviors: Vec<BehaviorDocument> = network.behaviors().iter().map(BehaviorDocument::from).collect();

        match mechanism {
            ActionSelection::SystemDynamics(s) => NetworkDocument::SystemDynamics {
                handler: s.handler.clone(),
                script: s.script.clone(),
            },
            ActionSelection::MutualInhibition(_) => match network.dynamic_formula() {
                Some(formula) => NetworkDocument::Dynamic {
                    behaviors,
                    formula: formula.to_string(),
                },
                None => {
                    let ids: Vec<BehaviorId> = network.behaviors().iter().map(|b| b.id).collect();
                    let coefficients = ids
                        .iter()
                        .map(|source| ids.iter().map(|target| network.inhibition(*source, *target)).collect())
                        .collect();
                    NetworkDocument::MutualInhibition {
                        behaviors,
                        coefficients,
                    }
                }
            },
            ActionSelection::Cooperative(_) => NetworkDocument::Cooperative {
                weights: network.behaviors().iter().map(|b| b.weight).collect(),
                behaviors,
            },
            ActionSelection::NoDynamics => NetworkDocument::Cooperative {
                weights: vec![0.0; behaviors.len()],
                behaviors,
            },
        }
    }

    pub fn from_json(json: &str) -> SimResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> SimResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn build_network(behaviors: Vec<BehaviorDocument>) -> SimResult<BehaviorNetwork> {
    let mut network = BehaviorNetwork::new();
    for (index, doc) in behaviors.into_iter().enumerate() {
        network.add_behavior(doc.into_behavior(BehaviorId(index as u32))?)?;
    }
    Ok(network)
}
