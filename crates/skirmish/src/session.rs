//! Hook invocation for one iteration of a run.
//!
//! A [`Session`] borrows the engine's mutable state (target, context, random
//! source) for the duration of one action list and drives individual hooks,
//! applying credential activation and the optional per-hook timeout.

use crate::action::{Action, StepContext};
use crate::actor::{Actor, Target};
use crate::context::{ActionConfig, Context};
use crate::prng::Prng;
use crate::registry::Registry;
use crate::result::{EngineError, EngineResult, HookError, HookResult, Phase};
use crate::slot::ResolvedPair;
use serde_json::Value;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Mutable state lent to hooks while an action list executes
pub(crate) struct Session<'a, T: Target> {
    pub(crate) registry: &'a Registry<T>,
    pub(crate) actors: &'a BTreeMap<String, Actor>,
    pub(crate) target: &'a mut T,
    pub(crate) context: &'a mut Context,
    pub(crate) rng: &'a mut Prng,
    pub(crate) hook_timeout: Option<Duration>,
}

async fn bounded<R>(
    limit: Option<Duration>,
    action: &str,
    phase: Phase,
    hook: impl Future<Output = HookResult<R>>,
) -> EngineResult<HookResult<R>> {
    match limit {
        None => Ok(hook.await),
        Some(limit) => tokio::time::timeout(limit, hook)
            .await
            .map_err(|_| EngineError::Timeout {
                action: action.to_string(),
                phase,
                ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
            }),
    }
}

fn hook_failure(action: &str, actor: &str, phase: Phase, err: &HookError) -> EngineError {
    let message = err.to_string();
    if phase == Phase::Precondition {
        EngineError::Precondition {
            action: action.to_string(),
            actor: actor.to_string(),
            message,
        }
    } else {
        EngineError::Action {
            action: action.to_string(),
            actor: actor.to_string(),
            phase,
            message,
        }
    }
}

impl<'a, T: Target + 'static> Session<'a, T> {
    /// Imported actor by name
    pub(crate) fn actor(&self, name: &str) -> EngineResult<&'a Actor> {
        self.actors.get(name).ok_or_else(|| EngineError::UnknownActor {
            name: name.to_string(),
        })
    }

    fn activate(&mut self, actor: &Actor, action: &str, phase: Phase) -> EngineResult<()> {
        if let Some(address) = &actor.address {
            self.target
                .activate_credential(address)
                .map_err(|e| hook_failure(action, &actor.name, phase, &e))?;
        }
        Ok(())
    }

    /// Evaluate a candidate's precondition for `actor` against live state
    pub(crate) async fn precondition(
        &mut self,
        action: &Arc<dyn Action<T>>,
        name: &str,
        actor: &Actor,
        config: &ActionConfig,
    ) -> EngineResult<bool> {
        if !action.has_precondition() {
            return Ok(true);
        }
        self.activate(actor, name, Phase::Precondition)?;
        let limit = self.hook_timeout;
        let mut ctx = StepContext {
            target: &mut *self.target,
            context: &mut *self.context,
            config,
            last_result: None,
            rng: &mut *self.rng,
        };
        bounded(limit, name, Phase::Precondition, action.precondition(actor, &mut ctx))
            .await?
            .map_err(|e| hook_failure(name, &actor.name, Phase::Precondition, &e))
    }

    /// Run `before`, `operation` and `after` for a resolved pair.
    ///
    /// Returns the `operation` value; the `after` value is discarded.
    pub(crate) async fn execute(&mut self, pair: &ResolvedPair) -> EngineResult<Value> {
        let action = self.registry.action(&pair.action)?;
        let actor = self.actor(&pair.actor)?;
        self.activate(actor, &pair.action, Phase::Before)?;

        let limit = self.hook_timeout;
        let name = pair.action.as_str();
        let fail = |phase: Phase| move |e: HookError| hook_failure(name, &actor.name, phase, &e);
        let mut ctx = StepContext {
            target: &mut *self.target,
            context: &mut *self.context,
            config: &pair.config,
            last_result: None,
            rng: &mut *self.rng,
        };

        ctx.last_result = bounded(limit, name, Phase::Before, action.before(actor, &mut ctx))
            .await?
            .map_err(fail(Phase::Before))?;
        let result = bounded(limit, name, Phase::Operation, action.operation(actor, &mut ctx))
            .await?
            .map_err(fail(Phase::Operation))?;
        ctx.last_result = Some(result.clone());
        bounded(limit, name, Phase::After, action.after(actor, &mut ctx))
            .await?
            .map_err(fail(Phase::After))?;
        Ok(result)
    }
}
