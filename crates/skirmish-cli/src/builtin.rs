//! Built-in diagnostic actors and actions.
//!
//! They exercise plan books end to end without a real system under test:
//! every action works against any [`Target`], keeps its state in the run
//! context, and reads a typed config parsed from the slot.

use serde::Deserialize;
use sha2::{Digest, Sha256};
use skirmish::prelude::*;
use skirmish::{NullTarget, Registry};
use std::fmt::Write as _;
use std::time::Duration;

/// Context key shared by `counter` and `counter-below`
pub const COUNTER_KEY: &str = "counter";

const CATEGORY: &str = "diagnostic";

/// Deterministic 20-byte hex address for an account name
#[must_use]
pub fn account_address(name: &str) -> String {
    Sha256::digest(name.as_bytes())[..20]
        .iter()
        .fold(String::from("0x"), |mut out, byte| {
            let _ = write!(out, "{byte:02x}");
            out
        })
}

fn anonymous(name: &str, _options: &EngineOptions) -> HookResult<Actor> {
    Ok(Actor::new(name, "anonymous"))
}

fn account(name: &str, options: &EngineOptions) -> HookResult<Actor> {
    let actor = Actor::new(name, "account").with_address(account_address(name));
    Ok(match &options.url {
        Some(url) => actor.with_attribute("url", url.as_str()),
        None => actor,
    })
}

/// Registry with every built-in actor type and action
#[must_use]
pub fn registry() -> Registry<NullTarget> {
    Registry::new()
        .with_actor("anonymous", anonymous)
        .with_actor("account", account)
        .with_action("noop", Noop)
        .with_action("sleep", Sleep)
        .with_action("fail", Fail)
        .with_action("flaky", Flaky)
        .with_action("counter", Counter)
        .with_action("counter-below", CounterBelow)
}

/// Does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct Noop;

#[async_trait]
impl<T: Target + 'static> Action<T> for Noop {
    fn category(&self) -> Option<&str> {
        Some(CATEGORY)
    }

    async fn operation(&self, _actor: &Actor, _ctx: &mut StepContext<'_, T>) -> HookResult<Value> {
        Ok(Value::Null)
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct SleepConfig {
    ms: u64,
}

impl Default for SleepConfig {
    fn default() -> Self {
        Self { ms: 10 }
    }
}

/// Sleeps for `ms` milliseconds (default 10)
#[derive(Debug, Clone, Copy, Default)]
pub struct Sleep;

#[async_trait]
impl<T: Target + 'static> Action<T> for Sleep {
    fn category(&self) -> Option<&str> {
        Some(CATEGORY)
    }

    async fn operation(&self, _actor: &Actor, ctx: &mut StepContext<'_, T>) -> HookResult<Value> {
        let SleepConfig { ms } = ctx.config.parse()?;
        tokio::time::sleep(Duration::from_millis(ms)).await;
        Ok(json!(ms))
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct FailConfig {
    message: String,
}

impl Default for FailConfig {
    fn default() -> Self {
        Self {
            message: "configured failure".to_string(),
        }
    }
}

/// Always fails with `message`
#[derive(Debug, Clone, Copy, Default)]
pub struct Fail;

#[async_trait]
impl<T: Target + 'static> Action<T> for Fail {
    fn category(&self) -> Option<&str> {
        Some(CATEGORY)
    }

    async fn operation(&self, _actor: &Actor, ctx: &mut StepContext<'_, T>) -> HookResult<Value> {
        let FailConfig { message } = ctx.config.parse()?;
        Err(message.into())
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct FlakyConfig {
    rate: f64,
}

impl Default for FlakyConfig {
    fn default() -> Self {
        Self { rate: 0.5 }
    }
}

/// Fails with probability `rate`, drawn from the run's random source
#[derive(Debug, Clone, Copy, Default)]
pub struct Flaky;

#[async_trait]
impl<T: Target + 'static> Action<T> for Flaky {
    fn category(&self) -> Option<&str> {
        Some(CATEGORY)
    }

    async fn operation(&self, actor: &Actor, ctx: &mut StepContext<'_, T>) -> HookResult<Value> {
        let FlakyConfig { rate } = ctx.config.parse()?;
        if ctx.rng.chance(rate) {
            return Err(format!("{} hit a flaky failure (rate {rate})", actor.name).into());
        }
        Ok(json!("ok"))
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct CounterConfig {
    step: i64,
    limit: i64,
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self { step: 1, limit: 3 }
    }
}

fn bump(context: &mut Context, step: i64) -> HookResult<Value> {
    let value = context.get_as::<i64>(COUNTER_KEY)?.unwrap_or(0) + step;
    context.set(COUNTER_KEY, value)?;
    Ok(json!(value))
}

/// Adds `step` (default 1) to the shared counter and returns the new value
#[derive(Debug, Clone, Copy, Default)]
pub struct Counter;

#[async_trait]
impl<T: Target + 'static> Action<T> for Counter {
    fn category(&self) -> Option<&str> {
        Some(CATEGORY)
    }

    async fn operation(&self, _actor: &Actor, ctx: &mut StepContext<'_, T>) -> HookResult<Value> {
        let config: CounterConfig = ctx.config.parse()?;
        bump(ctx.context, config.step)
    }
}

/// Like `counter`, but only eligible while the counter is below `limit`
/// (default 3)
#[derive(Debug, Clone, Copy, Default)]
pub struct CounterBelow;

#[async_trait]
impl<T: Target + 'static> Action<T> for CounterBelow {
    fn category(&self) -> Option<&str> {
        Some(CATEGORY)
    }

    fn has_precondition(&self) -> bool {
        true
    }

    async fn precondition(&self, _actor: &Actor, ctx: &mut StepContext<'_, T>) -> HookResult<bool> {
        let config: CounterConfig = ctx.config.parse()?;
        Ok(ctx.context.get_as::<i64>(COUNTER_KEY)?.unwrap_or(0) < config.limit)
    }

    async fn operation(&self, _actor: &Actor, ctx: &mut StepContext<'_, T>) -> HookResult<Value> {
        let config: CounterConfig = ctx.config.parse()?;
        bump(ctx.context, config.step)
    }
}
