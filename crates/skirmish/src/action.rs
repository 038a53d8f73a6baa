//! The action contract: lifecycle hooks run by the engine for one slot.
//!
//! An action is a stateless template. The engine calls it with a different
//! actor and configuration every time, in this order:
//!
//! 1. `precondition`, while the slot is being resolved; a `false` removes
//!    the action from the slot's candidates
//! 2. `before`, with no last result
//! 3. `operation`, receiving the `before` result
//! 4. `after`, receiving the `operation` result
//!
//! Only `operation` is required. Its value is what the report records.

use crate::actor::{Actor, Target};
use crate::context::{ActionConfig, Context};
use crate::prng::Prng;
use crate::result::HookResult;
use async_trait::async_trait;
use serde_json::Value;

/// Everything a hook may read or mutate besides its actor
#[derive(Debug)]
pub struct StepContext<'a, T> {
    /// Shared handle to the system under test
    pub target: &'a mut T,
    /// Run-wide shared state
    pub context: &'a mut Context,
    /// Configuration of this slot, already merged over the action defaults
    pub config: &'a ActionConfig,
    /// Value returned by the previous lifecycle hook
    pub last_result: Option<Value>,
    /// The run's random source
    pub rng: &'a mut Prng,
}

/// A named, reusable operation bundle
#[async_trait]
pub trait Action<T: Target>: Send + Sync {
    /// Grouping metadata, unused by the engine
    fn category(&self) -> Option<&str> {
        None
    }

    /// Configuration every slot referencing this action starts from
    fn default_config(&self) -> ActionConfig {
        ActionConfig::new()
    }

    /// Whether [`Action::precondition`] is meaningful for this action.
    ///
    /// When `false` the engine skips the call and the credential activation
    /// that precedes it.
    fn has_precondition(&self) -> bool {
        false
    }

    /// Decide whether the action may run for `actor` right now
    async fn precondition(&self, _actor: &Actor, _ctx: &mut StepContext<'_, T>) -> HookResult<bool> {
        Ok(true)
    }

    /// Prepare the operation; the result is handed to `operation`
    async fn before(&self, _actor: &Actor, _ctx: &mut StepContext<'_, T>) -> HookResult<Option<Value>> {
        Ok(None)
    }

    /// Perform the action
    async fn operation(&self, actor: &Actor, ctx: &mut StepContext<'_, T>) -> HookResult<Value>;

    /// Clean up or verify; receives the `operation` result
    async fn after(&self, _actor: &Actor, _ctx: &mut StepContext<'_, T>) -> HookResult<()> {
        Ok(())
    }
}
