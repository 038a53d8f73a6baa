//! Actors, actor factories, and the target-system handle they act against.

use crate::options::EngineOptions;
use crate::result::HookResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Handle to the live system under test.
///
/// The engine holds one target per run and lends it to every hook. Actors
/// carrying an address have it activated before any of their hooks run.
pub trait Target: Send {
    /// Make `address` the identity subsequent calls are issued as
    fn activate_credential(&mut self, address: &str) -> HookResult<()>;

    /// Short human-readable description used in logs
    fn description(&self) -> String {
        std::any::type_name::<Self>().to_string()
    }
}

/// Target that only remembers which credential is active
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NullTarget {
    active: Option<String>,
    activations: usize,
}

impl NullTarget {
    /// Create a target with no active credential
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently active credential
    #[must_use]
    pub fn active_credential(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Number of activations performed
    #[must_use]
    pub const fn activations(&self) -> usize {
        self.activations
    }
}

impl Target for NullTarget {
    fn activate_credential(&mut self, address: &str) -> HookResult<()> {
        self.active = Some(address.to_string());
        self.activations += 1;
        Ok(())
    }

    fn description(&self) -> String {
        "null target".to_string()
    }
}

/// An identity used to perform actions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    /// Name the actor was imported under
    pub name: String,
    /// Actor type it was created from
    pub kind: String,
    /// Credential activated on the target before each action
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Free-form data for actions to read
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attributes: Map<String, Value>,
}

impl Actor {
    /// Create an actor without a credential
    #[must_use]
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            address: None,
            attributes: Map::new(),
        }
    }

    /// Attach a credential
    #[must_use]
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Attach an attribute
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// Creates actors of one type.
///
/// Factories run once per actor name per run, in actor-name order.
#[async_trait]
pub trait ActorFactory<T: Target>: Send + Sync {
    /// Build the actor imported as `name`
    async fn create(&self, name: &str, target: &mut T, options: &EngineOptions) -> HookResult<Actor>;
}

#[async_trait]
impl<T, F> ActorFactory<T> for F
where
    T: Target + 'static,
    F: Fn(&str, &EngineOptions) -> HookResult<Actor> + Send + Sync,
{
    async fn create(&self, name: &str, _target: &mut T, options: &EngineOptions) -> HookResult<Actor> {
        self(name, options)
    }
}
