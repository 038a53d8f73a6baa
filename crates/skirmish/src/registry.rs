//! Name-keyed lookup tables for actor factories, actions, plans and alerters.
//!
//! The environment fills a [`Registry`] once; the engine only reads it.

use crate::action::Action;
use crate::actor::{ActorFactory, Target};
use crate::alert::Alerter;
use crate::plan::{Plan, PlanBook};
use crate::result::{EngineError, EngineResult};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Lookup tables supplied to the engine
pub struct Registry<T: Target> {
    actors: BTreeMap<String, Arc<dyn ActorFactory<T>>>,
    actions: BTreeMap<String, Arc<dyn Action<T>>>,
    plans: BTreeMap<String, Plan>,
    alerters: BTreeMap<String, Arc<dyn Alerter>>,
}

impl<T: Target> Default for Registry<T> {
    fn default() -> Self {
        Self {
            actors: BTreeMap::new(),
            actions: BTreeMap::new(),
            plans: BTreeMap::new(),
            alerters: BTreeMap::new(),
        }
    }
}

impl<T: Target> std::fmt::Debug for Registry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("actors", &self.actors.keys().collect::<Vec<_>>())
            .field("actions", &self.actions.keys().collect::<Vec<_>>())
            .field("plans", &self.plans.keys().collect::<Vec<_>>())
            .field("alerters", &self.alerters.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<T: Target> Registry<T> {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an actor type
    #[must_use]
    pub fn with_actor(mut self, kind: impl Into<String>, factory: impl ActorFactory<T> + 'static) -> Self {
        self.actors.insert(kind.into(), Arc::new(factory));
        self
    }

    /// Register an action
    #[must_use]
    pub fn with_action(mut self, name: impl Into<String>, action: impl Action<T> + 'static) -> Self {
        self.actions.insert(name.into(), Arc::new(action));
        self
    }

    /// Register a plan
    #[must_use]
    pub fn with_plan(mut self, name: impl Into<String>, plan: Plan) -> Self {
        self.plans.insert(name.into(), plan);
        self
    }

    /// Register every plan of a plan book, replacing same-named ones
    #[must_use]
    pub fn with_plan_book(mut self, book: PlanBook) -> Self {
        self.plans.extend(book.plans);
        self
    }

    /// Register an alerter
    #[must_use]
    pub fn with_alerter(mut self, name: impl Into<String>, alerter: impl Alerter + 'static) -> Self {
        self.alerters.insert(name.into(), Arc::new(alerter));
        self
    }

    /// Actor factory for `kind`
    #[must_use]
    pub fn actor_factory(&self, kind: &str) -> Option<Arc<dyn ActorFactory<T>>> {
        self.actors.get(kind).cloned()
    }

    /// Action registered as `name`
    pub fn action(&self, name: &str) -> EngineResult<Arc<dyn Action<T>>> {
        self.actions
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::UnknownAction {
                name: name.to_string(),
            })
    }

    /// Alerter registered as `name`
    pub fn alerter(&self, name: &str) -> EngineResult<Arc<dyn Alerter>> {
        self.alerters
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::UnknownAlerter {
                name: name.to_string(),
            })
    }

    /// All plans
    #[must_use]
    pub const fn plans(&self) -> &BTreeMap<String, Plan> {
        &self.plans
    }

    /// Whether an action is registered
    #[must_use]
    pub fn has_action(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    /// Registered actor type names
    pub fn actor_kinds(&self) -> impl Iterator<Item = &str> {
        self.actors.keys().map(String::as_str)
    }

    /// Registered action names
    pub fn action_names(&self) -> impl Iterator<Item = &str> {
        self.actions.keys().map(String::as_str)
    }

    /// Registered alerter names
    pub fn alerter_names(&self) -> impl Iterator<Item = &str> {
        self.alerters.keys().map(String::as_str)
    }

    /// Check a plan against the registry without running it.
    ///
    /// Every actor type must be registered, every action named in a slot must
    /// be registered, and every actor a slot refers to must be declared.
    pub fn validate_plan(&self, name: &str) -> EngineResult<()> {
        let plan = self.plans.get(name).ok_or_else(|| EngineError::UnknownPlan {
            name: name.to_string(),
        })?;
        for (actor, kind) in &plan.actors {
            if !self.actors.contains_key(kind) {
                return Err(EngineError::UnknownActor {
                    name: format!("{actor}: {kind}"),
                });
            }
        }
        for spec in plan.actions.iter().flat_map(crate::slot::Slot::specs) {
            for actor in spec.actor.names() {
                if !plan.actors.contains_key(actor) {
                    return Err(EngineError::UnknownActor {
                        name: actor.to_string(),
                    });
                }
            }
            for action in spec.action.candidates() {
                if !self.has_action(&action.name) {
                    return Err(EngineError::UnknownAction {
                        name: action.name.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}
