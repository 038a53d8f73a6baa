//! Action slots: the entries of a scenario's action list.
//!
//! Plan documents write slots in a compact array notation:
//!
//! ```yaml
//! actions:
//!   - [alice, open]                          # literal pair
//!   - [alice, [open, { collateral: 2 }]]     # parametrized action
//!   - [[[alice, open], [bob, close]]]        # group: shuffled in place
//!   - [[[alice, 2], bob], [open, [close, { weight: 3 }]]]   # weighted choice
//! ```
//!
//! On the action side, `[name, {..}]` is one parametrized action; any other
//! array is a candidate list. Groups expand exactly one level, which the
//! types enforce: a [`Slot::Group`] holds [`SlotSpec`]s, not slots.

use crate::context::{ActionConfig, WEIGHT_KEY};
use crate::result::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Actor candidate with a selection weight
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedName {
    /// Actor name
    pub name: String,
    /// Relative weight (default 1)
    pub weight: f64,
}

impl WeightedName {
    /// Candidate with weight 1
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            weight: 1.0,
        }
    }

    /// Candidate with an explicit weight
    #[must_use]
    pub fn weighted(name: impl Into<String>, weight: f64) -> Self {
        Self {
            name: name.into(),
            weight,
        }
    }
}

/// Which actor performs a slot
#[derive(Debug, Clone, PartialEq)]
pub enum ActorSpec {
    /// A fixed actor
    Named(String),
    /// Weighted choice among actors
    Choice(Vec<WeightedName>),
}

impl ActorSpec {
    /// Fixed actor
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    /// Weighted choice among `(name, weight)` pairs
    #[must_use]
    pub fn weighted<N: Into<String>>(candidates: impl IntoIterator<Item = (N, f64)>) -> Self {
        Self::Choice(
            candidates
                .into_iter()
                .map(|(n, w)| WeightedName::weighted(n, w))
                .collect(),
        )
    }

    /// Every actor name this spec can resolve to
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        match self {
            Self::Named(name) => vec![name.as_str()],
            Self::Choice(candidates) => candidates.iter().map(|c| c.name.as_str()).collect(),
        }
    }
}

impl From<&str> for ActorSpec {
    fn from(name: &str) -> Self {
        Self::named(name)
    }
}

impl From<String> for ActorSpec {
    fn from(name: String) -> Self {
        Self::Named(name)
    }
}

/// Reference to a registered action, with its slot configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ActionRef {
    /// Registered action name
    pub name: String,
    /// Slot configuration; the `weight` key doubles as selection weight
    pub config: ActionConfig,
}

impl ActionRef {
    /// Reference without configuration
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: ActionConfig::new(),
        }
    }

    /// Attach a configuration
    #[must_use]
    pub fn with_config(mut self, config: ActionConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the selection weight
    #[must_use]
    pub fn weighted(mut self, weight: f64) -> Self {
        self.config = self.config.with(WEIGHT_KEY, weight);
        self
    }

    /// Selection weight (default 1)
    #[must_use]
    pub fn weight(&self) -> f64 {
        self.config.weight()
    }
}

impl From<&str> for ActionRef {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Which action a slot runs
#[derive(Debug, Clone, PartialEq)]
pub enum ActionSpec {
    /// One action
    Single(ActionRef),
    /// Weighted choice among actions whose precondition holds
    Choice(Vec<ActionRef>),
}

impl ActionSpec {
    /// Single action reference
    #[must_use]
    pub fn single(action: impl Into<ActionRef>) -> Self {
        Self::Single(action.into())
    }

    /// Candidate list
    #[must_use]
    pub fn choice<A: Into<ActionRef>>(candidates: impl IntoIterator<Item = A>) -> Self {
        Self::Choice(candidates.into_iter().map(Into::into).collect())
    }

    /// Candidates in declaration order (a single action is a list of one)
    #[must_use]
    pub fn candidates(&self) -> &[ActionRef] {
        match self {
            Self::Single(action) => std::slice::from_ref(action),
            Self::Choice(list) => list,
        }
    }
}

impl From<&str> for ActionSpec {
    fn from(name: &str) -> Self {
        Self::single(name)
    }
}

impl From<ActionRef> for ActionSpec {
    fn from(action: ActionRef) -> Self {
        Self::Single(action)
    }
}

/// An `(actor, action)` slot before resolution
#[derive(Debug, Clone, PartialEq)]
pub struct SlotSpec {
    /// Actor side
    pub actor: ActorSpec,
    /// Action side
    pub action: ActionSpec,
}

impl SlotSpec {
    /// Create a slot spec
    #[must_use]
    pub fn new(actor: impl Into<ActorSpec>, action: impl Into<ActionSpec>) -> Self {
        Self {
            actor: actor.into(),
            action: action.into(),
        }
    }

    /// Whether both sides are fixed
    #[must_use]
    pub const fn is_literal(&self) -> bool {
        matches!(
            (&self.actor, &self.action),
            (ActorSpec::Named(_), ActionSpec::Single(_))
        )
    }
}

/// One entry of an action list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub enum Slot {
    /// Literal pair or weighted choice
    Step(SlotSpec),
    /// Sub-list shuffled into place when reached
    Group(Vec<SlotSpec>),
}

impl Slot {
    /// Literal `(actor, action)` pair
    #[must_use]
    pub fn step(actor: &str, action: &str) -> Self {
        Self::Step(SlotSpec::new(actor, action))
    }

    /// Literal pair with a parametrized action
    #[must_use]
    pub fn step_with(actor: &str, action: &str, config: ActionConfig) -> Self {
        Self::Step(SlotSpec::new(actor, ActionRef::new(action).with_config(config)))
    }

    /// Weighted choice slot
    #[must_use]
    pub fn choice(actor: impl Into<ActorSpec>, action: impl Into<ActionSpec>) -> Self {
        Self::Step(SlotSpec::new(actor, action))
    }

    /// Group slot
    #[must_use]
    pub fn group(specs: Vec<SlotSpec>) -> Self {
        Self::Group(specs)
    }

    /// Slot specs contained in this slot
    #[must_use]
    pub fn specs(&self) -> &[SlotSpec] {
        match self {
            Self::Step(spec) => std::slice::from_ref(spec),
            Self::Group(specs) => specs,
        }
    }

    /// Parse the array notation
    pub fn from_value(value: &Value) -> EngineResult<Self> {
        let items = value
            .as_array()
            .ok_or_else(|| malformed("slot", value, "expected an array"))?;
        match items.as_slice() {
            [Value::Array(inner)] => {
                let specs = inner
                    .iter()
                    .map(|v| {
                        if matches!(v.as_array().map(Vec::len), Some(1)) {
                            Err(malformed("slot", v, "nested group slots are not supported"))
                        } else {
                            parse_spec(v)
                        }
                    })
                    .collect::<EngineResult<Vec<_>>>()?;
                Ok(Self::Group(specs))
            }
            [_, _] => parse_spec(value).map(Self::Step),
            _ => Err(malformed(
                "slot",
                value,
                "expected [actor, action] or a single-element group",
            )),
        }
    }

    /// Render back to the array notation
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Step(spec) => spec_to_value(spec),
            Self::Group(specs) => json!([specs.iter().map(spec_to_value).collect::<Vec<_>>()]),
        }
    }
}

impl TryFrom<Value> for Slot {
    type Error = EngineError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(&value)
    }
}

impl From<Slot> for Value {
    fn from(slot: Slot) -> Self {
        slot.to_value()
    }
}

/// A slot after resolution: the concrete pair that ran
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedPair {
    /// Actor name
    pub actor: String,
    /// Action name
    pub action: String,
    /// Configuration the action ran with
    #[serde(default, skip_serializing_if = "ActionConfig::is_empty")]
    pub config: ActionConfig,
}

impl ResolvedPair {
    /// Create a resolved pair
    #[must_use]
    pub fn new(actor: impl Into<String>, action: impl Into<String>, config: ActionConfig) -> Self {
        Self {
            actor: actor.into(),
            action: action.into(),
            config,
        }
    }
}

impl std::fmt::Display for ResolvedPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.actor, self.action)
    }
}

fn malformed(what: &str, value: &Value, reason: &str) -> EngineError {
    EngineError::config(format!("malformed {what} {value}: {reason}"))
}

fn parse_spec(value: &Value) -> EngineResult<SlotSpec> {
    match value.as_array().map(Vec::as_slice) {
        Some([actor, action]) => Ok(SlotSpec {
            actor: parse_actor(actor)?,
            action: parse_action(action)?,
        }),
        _ => Err(malformed("slot", value, "expected [actor, action]")),
    }
}

fn parse_weight(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Object(map) => Some(map.get(WEIGHT_KEY).and_then(Value::as_f64).unwrap_or(1.0)),
        _ => None,
    }
}

fn check_weight(weight: f64, value: &Value) -> EngineResult<f64> {
    if weight.is_finite() && weight >= 0.0 {
        Ok(weight)
    } else {
        Err(malformed("weight", value, "weights must be finite and non-negative"))
    }
}

fn parse_actor(value: &Value) -> EngineResult<ActorSpec> {
    match value {
        Value::String(name) => Ok(ActorSpec::Named(name.clone())),
        Value::Array(candidates) if !candidates.is_empty() => candidates
            .iter()
            .map(|candidate| match candidate {
                Value::String(name) => Ok(WeightedName::new(name.clone())),
                Value::Array(pair) => match pair.as_slice() {
                    [Value::String(name), weight] => {
                        let w = parse_weight(weight)
                            .ok_or_else(|| malformed("actor candidate", candidate, "bad weight"))?;
                        Ok(WeightedName::weighted(name.clone(), check_weight(w, candidate)?))
                    }
                    _ => Err(malformed("actor candidate", candidate, "expected [name, weight]")),
                },
                _ => Err(malformed("actor candidate", candidate, "expected a name")),
            })
            .collect::<EngineResult<Vec<_>>>()
            .map(ActorSpec::Choice),
        _ => Err(malformed(
            "actor",
            value,
            "expected a name or a non-empty candidate list",
        )),
    }
}

fn parse_action_ref(value: &Value) -> EngineResult<ActionRef> {
    match value {
        Value::String(name) => Ok(ActionRef::new(name.clone())),
        Value::Array(pair) => match pair.as_slice() {
            [Value::String(name), Value::Object(config)] => {
                let action = ActionRef::new(name.clone())
                    .with_config(ActionConfig::from_map(config.clone()));
                check_weight(action.weight(), value)?;
                Ok(action)
            }
            [Value::String(name), Value::Number(weight)] => {
                let w = weight.as_f64().unwrap_or(1.0);
                Ok(ActionRef::new(name.clone()).weighted(check_weight(w, value)?))
            }
            _ => Err(malformed("action", value, "expected [name, config]")),
        },
        _ => Err(malformed("action", value, "expected a name")),
    }
}

fn parse_action(value: &Value) -> EngineResult<ActionSpec> {
    match value {
        Value::String(_) => parse_action_ref(value).map(ActionSpec::Single),
        Value::Array(items) => match items.as_slice() {
            [Value::String(_), Value::Object(_)] => parse_action_ref(value).map(ActionSpec::Single),
            [] => Err(malformed("action", value, "empty candidate list")),
            _ => items
                .iter()
                .map(parse_action_ref)
                .collect::<EngineResult<Vec<_>>>()
                .map(ActionSpec::Choice),
        },
        _ => Err(malformed("action", value, "expected a name or a list")),
    }
}

fn action_ref_to_value(action: &ActionRef) -> Value {
    if action.config.is_empty() {
        json!(action.name)
    } else {
        json!([action.name, action.config])
    }
}

fn spec_to_value(spec: &SlotSpec) -> Value {
    let actor = match &spec.actor {
        ActorSpec::Named(name) => json!(name),
        ActorSpec::Choice(candidates) => Value::Array(
            candidates
                .iter()
                .map(|c| {
                    if (c.weight - 1.0).abs() < f64::EPSILON {
                        json!(c.name)
                    } else {
                        json!([c.name, c.weight])
                    }
                })
                .collect(),
        ),
    };
    let action = match &spec.action {
        ActionSpec::Single(action) => action_ref_to_value(action),
        ActionSpec::Choice(list) => Value::Array(list.iter().map(action_ref_to_value).collect()),
    };
    json!([actor, action])
}
