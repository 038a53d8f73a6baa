//! Declarative scenario templates and their resolution into one action list.

use crate::prng::Prng;
use crate::result::{EngineError, EngineResult};
use crate::slot::Slot;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Whether a plan's action list keeps its order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanMode {
    /// Run slots in declaration order
    #[default]
    Sequential,
    /// Shuffle slots every time the plan is resolved
    Random,
}

/// A named scenario template
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    /// Actor name to actor type
    #[serde(default)]
    pub actors: BTreeMap<String, String>,
    /// Ordered action slots
    #[serde(default)]
    pub actions: Vec<Slot>,
    /// Ordering mode
    #[serde(default)]
    pub mode: PlanMode,
}

impl Plan {
    /// Create an empty sequential plan
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an actor
    #[must_use]
    pub fn actor(mut self, name: impl Into<String>, kind: impl Into<String>) -> Self {
        self.actors.insert(name.into(), kind.into());
        self
    }

    /// Append a slot
    #[must_use]
    pub fn slot(mut self, slot: Slot) -> Self {
        self.actions.push(slot);
        self
    }

    /// Set the ordering mode
    #[must_use]
    pub const fn mode(mut self, mode: PlanMode) -> Self {
        self.mode = mode;
        self
    }
}

/// Actors and action list produced from one or more plans
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedScenario {
    /// Actor name to actor type, later plans overriding earlier ones
    pub actors: BTreeMap<String, String>,
    /// Concatenated action slots, in plan-list order
    pub actions: Vec<Slot>,
}

/// Merge `names` in order into one scenario.
///
/// Random-mode plans are shuffled with `rng` before being appended.
pub fn resolve_plans(
    plans: &BTreeMap<String, Plan>,
    names: &[String],
    rng: &mut Prng,
) -> EngineResult<ResolvedScenario> {
    names.iter().try_fold(ResolvedScenario::default(), |mut acc, name| {
        let plan = plans
            .get(name)
            .ok_or_else(|| EngineError::UnknownPlan { name: name.clone() })?;
        acc.actors
            .extend(plan.actors.iter().map(|(k, v)| (k.clone(), v.clone())));
        match plan.mode {
            PlanMode::Random => acc.actions.extend(rng.shuffle(&plan.actions)),
            PlanMode::Sequential => acc.actions.extend(plan.actions.iter().cloned()),
        }
        tracing::debug!(plan = %name, mode = ?plan.mode, slots = plan.actions.len(), "resolved plan");
        Ok(acc)
    })
}

/// A named collection of plans, as stored in a plan document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanBook {
    /// Plans by name
    pub plans: BTreeMap<String, Plan>,
}

impl PlanBook {
    /// Parse a YAML (or JSON) plan document
    pub fn from_yaml_str(source: &str) -> EngineResult<Self> {
        Ok(serde_yaml_ng::from_str(source)?)
    }

    /// Read and parse a plan document from disk
    pub fn load(path: &Path) -> EngineResult<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&source)
    }

    /// Plan names, sorted
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.plans.keys().map(String::as_str).collect()
    }
}
