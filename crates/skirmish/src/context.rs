//! Run-wide shared state and per-slot action configuration.
//!
//! The engine owns exactly one [`Context`] per run and lends it mutably to
//! each hook in turn. Hooks must not hold on to it beyond their own call.

use crate::result::{EngineError, EngineResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Reserved configuration key carrying a candidate's selection weight
pub const WEIGHT_KEY: &str = "weight";

/// Keyed store shared by every action of a run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Context {
    values: BTreeMap<String, Value>,
}

impl Context {
    /// Create an empty context
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw value for `key`
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Deserialize the value stored under `key`
    pub fn get_as<D: DeserializeOwned>(&self, key: &str) -> EngineResult<Option<D>> {
        self.values
            .get(key)
            .map(|v| serde_json::from_value(v.clone()))
            .transpose()
            .map_err(EngineError::from)
    }

    /// Store a serializable value, returning the previous one
    pub fn set(&mut self, key: impl Into<String>, value: impl Serialize) -> EngineResult<Option<Value>> {
        let value = serde_json::to_value(value)?;
        Ok(self.values.insert(key.into(), value))
    }

    /// Mutate the value under `key` in place, inserting `Null` first if absent
    pub fn update<R>(&mut self, key: &str, f: impl FnOnce(&mut Value) -> R) -> R {
        f(self.values.entry(key.to_string()).or_insert(Value::Null))
    }

    /// Remove a key
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    /// Whether `key` is present
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Number of stored keys
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether nothing is stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Drop all keys
    pub fn clear(&mut self) {
        self.values.clear();
    }
}

/// Configuration attached to one action reference in a slot.
///
/// Stored as a JSON object so plan documents stay free-form; actions turn it
/// into their own typed struct with [`ActionConfig::parse`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionConfig(Map<String, Value>);

impl ActionConfig {
    /// Create an empty configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a JSON object
    #[must_use]
    pub const fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Build from a JSON value, which must be an object (or null)
    pub fn from_value(value: Value) -> EngineResult<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Ok(Self::default()),
            other => Err(EngineError::config(format!(
                "action configuration must be an object, got {other}"
            ))),
        }
    }

    /// Set a key (builder style)
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Raw value for `key`
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Selection weight; 1 when unset
    #[must_use]
    pub fn weight(&self) -> f64 {
        self.0.get(WEIGHT_KEY).and_then(Value::as_f64).unwrap_or(1.0)
    }

    /// Overlay `self` on top of `defaults`: keys set here win
    #[must_use]
    pub fn merged_over(&self, defaults: &Self) -> Self {
        let mut out = defaults.0.clone();
        for (k, v) in &self.0 {
            out.insert(k.clone(), v.clone());
        }
        Self(out)
    }

    /// Deserialize into a typed configuration struct
    pub fn parse<C: DeserializeOwned>(&self) -> EngineResult<C> {
        Ok(serde_json::from_value(Value::Object(self.0.clone()))?)
    }

    /// Whether no key is set
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the underlying map
    #[must_use]
    pub const fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}
