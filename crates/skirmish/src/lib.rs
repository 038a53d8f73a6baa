//! Skirmish: scenario-driven orchestration of actors against a live system
//!
//! A run takes a set of named *actors* (identities with credentials), a list
//! of *action slots*, and drives each slot through a lifecycle of hooks
//! against a shared target handle. Slots may name a literal pair, a weighted
//! random choice, or a group shuffled into place; all randomness flows from
//! one seedable source, so a failing run replays exactly from its seed.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐   ┌──────────┐
//! │ Plans /      │──►│ Resolver     │──►│ Session      │──►│ Report   │
//! │ inline slots │   │ (per slot,   │   │ before → op  │   │ + alerts │
//! │              │   │  late)       │   │ → after      │   │          │
//! └──────────────┘   └──────────────┘   └──────────────┘   └──────────┘
//!        ▲                  ▲                  │
//!        │            ┌─────┴─────┐      ┌─────▼─────┐
//!     Registry        │ Prng(seed)│      │ Target +  │
//!                     └───────────┘      │ Context   │
//!                                        └───────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use skirmish::{Engine, EngineOptions, NullTarget, Registry, Seed, Slot};
//!
//! # async fn demo(registry: Registry<NullTarget>) -> skirmish::EngineResult<()> {
//! let options = EngineOptions::builder()
//!     .actors([("alice", "user")])
//!     .actions(vec![Slot::step("alice", "deposit")])
//!     .seed(Seed::from_u64(42))
//!     .build()?;
//! let mut engine = Engine::new(options, registry, NullTarget::new());
//! let report = engine.run().await?;
//! println!("{report}");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod action;
mod actor;
mod alert;
mod context;
mod engine;
mod options;
mod plan;
mod prng;
mod registry;
mod report;
mod result;
mod selector;
mod session;
mod slot;

pub use action::{Action, StepContext};
pub use actor::{Actor, ActorFactory, NullTarget, Target};
pub use alert::{format_report, AlertLevel, Alerter, LogAlerter, WriterAlerter};
pub use context::{ActionConfig, Context, WEIGHT_KEY};
pub use engine::{Engine, StopHandle};
pub use options::{EngineOptions, EngineOptionsBuilder, FailurePolicy, Iterations, Scenario};
pub use plan::{resolve_plans, Plan, PlanBook, PlanMode, ResolvedScenario};
pub use prng::{Prng, Seed};
pub use registry::Registry;
pub use report::{Report, ReportError, SlotOutcome, SETUP_ERROR_INDEX};
pub use result::{EngineError, EngineResult, ErrorKind, HookError, HookResult, Phase};
pub use slot::{ActionRef, ActionSpec, ActorSpec, ResolvedPair, Slot, SlotSpec, WeightedName};

/// Prelude for action and actor authors
pub mod prelude {
    pub use crate::{
        Action, ActionConfig, Actor, ActorFactory, Context, EngineOptions, HookResult, Prng,
        StepContext, Target,
    };
    pub use async_trait::async_trait;
    pub use serde_json::{json, Value};
}
