//! The engine: resolves a scenario, imports actors, and drives every slot
//! through its action's lifecycle while recording a [`Report`].
//!
//! Execution is strictly sequential. Slot `n + 1` never starts before slot
//! `n`'s `after` hook has returned, so the shared context, the target handle
//! and the random source are only ever touched by one hook at a time.
//!
//! # Example
//!
//! ```ignore
//! let options = EngineOptions::builder().plans(["smoke"]).seed(Seed::from_u64(42)).build()?;
//! let mut engine = Engine::new(options, registry, NullTarget::new());
//! let report = engine.run().await?;
//! engine.alert(AlertLevel::Error, &["log"]).await?;
//! ```

use crate::actor::{Actor, Target};
use crate::alert::AlertLevel;
use crate::context::{ActionConfig, Context};
use crate::options::{EngineOptions, FailurePolicy, Scenario};
use crate::plan::{resolve_plans, ResolvedScenario};
use crate::prng::{Prng, Seed};
use crate::registry::Registry;
use crate::report::Report;
use crate::result::{EngineError, EngineResult};
use crate::selector::{resolve_slot, SlotQueue};
use crate::session::Session;
use crate::slot::{ResolvedPair, Slot, SlotSpec};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use uuid::Uuid;

#[derive(Debug, Default)]
struct StopState {
    requested: AtomicBool,
    notify: Notify,
}

/// Cloneable handle that asks a running engine to stop.
///
/// The run ends at the next slot boundary, or immediately if it is sleeping
/// between iterations. A hook already in flight is not interrupted.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    state: Arc<StopState>,
}

impl StopHandle {
    /// Request a stop
    pub fn stop(&self) {
        self.state.requested.store(true, Ordering::SeqCst);
        self.state.notify.notify_waiters();
    }

    /// Whether a stop was requested
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.state.requested.load(Ordering::SeqCst)
    }

    async fn stopped(&self) {
        loop {
            let notified = self.state.notify.notified();
            if self.is_stopped() {
                return;
            }
            notified.await;
        }
    }

    fn reset(&self) {
        self.state.requested.store(false, Ordering::SeqCst);
    }
}

/// Scenario-driven orchestration engine
pub struct Engine<T: Target + 'static> {
    options: EngineOptions,
    registry: Arc<Registry<T>>,
    target: T,
    context: Context,
    rng: Prng,
    report: Option<Report>,
    stop: StopHandle,
}

impl<T: Target + 'static> std::fmt::Debug for Engine<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("options", &self.options)
            .field("registry", &self.registry)
            .field("target", &self.target.description())
            .field("seed", &self.rng.seed())
            .finish_non_exhaustive()
    }
}

impl<T: Target + 'static> Engine<T> {
    /// Create an engine. The random source is seeded here, once.
    pub fn new(options: EngineOptions, registry: impl Into<Arc<Registry<T>>>, target: T) -> Self {
        let rng = Prng::from_optional(options.seed);
        tracing::debug!(seed = %rng.seed(), target = %target.description(), "engine created");
        Self {
            options,
            registry: registry.into(),
            target,
            context: Context::new(),
            rng,
            report: None,
            stop: StopHandle::default(),
        }
    }

    /// Seed of the random source
    #[must_use]
    pub const fn seed(&self) -> Seed {
        self.rng.seed()
    }

    /// Options the engine was built with
    #[must_use]
    pub const fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Report of the last run
    #[must_use]
    pub const fn report(&self) -> Option<&Report> {
        self.report.as_ref()
    }

    /// Shared context as left by the last run
    #[must_use]
    pub const fn context(&self) -> &Context {
        &self.context
    }

    /// Target handle
    #[must_use]
    pub const fn target(&self) -> &T {
        &self.target
    }

    /// Mutable target handle
    pub fn target_mut(&mut self) -> &mut T {
        &mut self.target
    }

    /// Handle for stopping a run from another task
    #[must_use]
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Run the configured scenario.
    ///
    /// Setup failures (unknown plan, unknown actor type, failing actor
    /// factory) come back as an `Ok` report with `success = false` and error
    /// index -1. Slot failures, including a slot naming an unregistered
    /// actor or action, follow the failure policy. Precondition failures and
    /// degenerate weights abort the run and are returned as `Err`; the
    /// partial report stays available via [`Engine::report`].
    ///
    /// A stop requested before the run starts ends it at the first slot
    /// boundary. The request is cleared once the run returns.
    pub async fn run(&mut self) -> EngineResult<Report> {
        let run_id = Uuid::new_v4().to_string();
        tracing::info!(run_id = %run_id, seed = %self.rng.seed(), "running...");

        self.context.clear();
        let mut report = Report::new(run_id, self.rng.seed());
        let outcome = self.drive(&mut report).await;
        self.stop.reset();

        tracing::info!(
            run_id = %report.run_id,
            success = report.success,
            slots = report.completed.len(),
            failed = report.failed_count(),
            iterations = report.iterations_completed,
            "run finished"
        );
        self.report = Some(report.clone());
        outcome.map(|()| report)
    }

    async fn drive(&mut self, report: &mut Report) -> EngineResult<()> {
        if !self.options.iterations.allows(0) {
            return Ok(());
        }

        let (actors, first_actions) = match self.setup().await {
            Ok(ready) => ready,
            Err(err) => {
                tracing::error!(error = %err, "setup failed");
                report.fail_setup(&err);
                return Ok(());
            }
        };

        let mut pending = Some(first_actions);
        let mut done = 0u64;
        while self.options.iterations.allows(done) {
            if done > 0 && !self.options.sleep.is_zero() {
                tokio::select! {
                    () = tokio::time::sleep(self.options.sleep) => {}
                    () = self.stop.stopped() => {}
                }
            }
            if self.stop.is_stopped() {
                report.stopped = true;
                break;
            }

            let actions = match pending.take() {
                Some(actions) => actions,
                None => match self.resolve_scenario() {
                    Ok(scenario) => scenario.actions,
                    Err(err) => {
                        tracing::error!(iteration = done + 1, error = %err, "re-resolving scenario failed");
                        report.fail_setup(&err);
                        return Ok(());
                    }
                },
            };

            tracing::info!(iteration = done + 1, slots = actions.len(), "running actions...");
            self.run_once(actions, &actors, report).await?;
            if !report.success || report.stopped {
                break;
            }
            done += 1;
            report.iterations_completed = done;
        }
        Ok(())
    }

    /// Resolve the scenario and import its actors
    async fn setup(&mut self) -> EngineResult<(BTreeMap<String, Actor>, Vec<Slot>)> {
        let scenario = self.resolve_scenario()?;
        let actors = self.import_actors(&scenario.actors).await?;
        Ok((actors, scenario.actions))
    }

    fn resolve_scenario(&mut self) -> EngineResult<ResolvedScenario> {
        match &self.options.scenario {
            Scenario::Plans(names) => resolve_plans(self.registry.plans(), names, &mut self.rng),
            Scenario::Inline { actors, actions } => Ok(ResolvedScenario {
                actors: actors.clone(),
                actions: actions.clone(),
            }),
        }
    }

    async fn import_actors(
        &mut self,
        declared: &BTreeMap<String, String>,
    ) -> EngineResult<BTreeMap<String, Actor>> {
        tracing::info!(count = declared.len(), "importing actors...");
        let mut imported = BTreeMap::new();
        for (name, kind) in declared {
            let factory = self
                .registry
                .actor_factory(kind)
                .ok_or_else(|| EngineError::UnknownActor {
                    name: format!("{name}: {kind}"),
                })?;
            let actor = factory
                .create(name, &mut self.target, &self.options)
                .await
                .map_err(|e| EngineError::ActorImport {
                    name: name.clone(),
                    message: e.to_string(),
                })?;
            tracing::info!(actor = %name, kind = %kind, "imported actor");
            imported.insert(name.clone(), actor);
        }
        Ok(imported)
    }

    async fn run_once(
        &mut self,
        actions: Vec<Slot>,
        actors: &BTreeMap<String, Actor>,
        report: &mut Report,
    ) -> EngineResult<()> {
        let policy = self.options.failure_policy;
        let mut queue = SlotQueue::new(actions);
        let mut session = Session {
            registry: &self.registry,
            actors,
            target: &mut self.target,
            context: &mut self.context,
            rng: &mut self.rng,
            hook_timeout: self.options.hook_timeout,
        };

        while report.success {
            if self.stop.is_stopped() {
                report.stopped = true;
                break;
            }
            let Some(spec) = queue.next_spec(session.rng) else {
                break;
            };

            let pair = match resolve_slot(&spec, &mut session).await {
                Ok(Some(pair)) => pair,
                Ok(None) => {
                    report.dropped_slots += 1;
                    tracing::warn!(slot = report.results.len(), "no eligible action; slot dropped");
                    continue;
                }
                Err(err @ (EngineError::UnknownActor { .. } | EngineError::UnknownAction { .. })) => {
                    record_failure(policy, report, unresolved_pair(&spec, &err), &err);
                    continue;
                }
                Err(err) => {
                    tracing::error!(slot = report.results.len(), error = %err, "slot resolution failed");
                    report.fail_here(&err);
                    return Err(err);
                }
            };

            tracing::debug!(slot = report.results.len(), actor = %pair.actor, action = %pair.action, "executing");
            match session.execute(&pair).await {
                Ok(value) => report.push_ok(pair, value),
                Err(err) => record_failure(policy, report, pair, &err),
            }
        }
        Ok(())
    }

    /// Fan the last report out to the named alerters, in order
    pub async fn alert(&self, level: AlertLevel, alerters: &[&str]) -> EngineResult<()> {
        let report = self
            .report
            .as_ref()
            .ok_or_else(|| EngineError::config("Nothing to alert on yet"))?;
        for name in alerters {
            let alerter = self.registry.alerter(name)?;
            alerter
                .alert(level, report)
                .await
                .map_err(|e| EngineError::Alert {
                    alerter: (*name).to_string(),
                    message: e.to_string(),
                })?;
        }
        Ok(())
    }
}

fn record_failure(policy: FailurePolicy, report: &mut Report, pair: ResolvedPair, err: &EngineError) {
    match policy {
        FailurePolicy::FailFast => {
            tracing::error!(slot = report.results.len(), pair = %pair, error = %err, "action failed; aborting");
            report.fail_here(err);
        }
        FailurePolicy::ContinueOnFailure => {
            tracing::warn!(slot = report.results.len(), pair = %pair, error = %err, "action failed; continuing");
            report.push_failed(pair, err);
        }
    }
}

/// Pair recorded for a slot whose actor or action is not registered
fn unresolved_pair(spec: &SlotSpec, err: &EngineError) -> ResolvedPair {
    let actor = spec.actor.names().first().map_or("", |n| *n).to_string();
    let action = spec
        .action
        .candidates()
        .first()
        .map_or("", |a| a.name.as_str())
        .to_string();
    match err {
        EngineError::UnknownActor { name } => ResolvedPair::new(name.clone(), action, ActionConfig::new()),
        EngineError::UnknownAction { name } => ResolvedPair::new(actor, name.clone(), ActionConfig::new()),
        _ => ResolvedPair::new(actor, action, ActionConfig::new()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::action::{Action, StepContext};
    use crate::actor::{ActorFactory, NullTarget};
    use crate::alert::WriterAlerter;
    use crate::options::Iterations;
    use crate::plan::{Plan, PlanMode};
    use crate::result::{ErrorKind, HookResult};
    use crate::report::{SlotOutcome, SETUP_ERROR_INDEX};
    use crate::slot::{ActionRef, ActionSpec, ActorSpec};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    /// Appends `actor:tag` to the context log; fails when configured to
    struct Record;

    #[async_trait]
    impl Action<NullTarget> for Record {
        async fn operation(&self, actor: &Actor, ctx: &mut StepContext<'_, NullTarget>) -> HookResult<Value> {
            let tag = ctx.config.get("tag").and_then(Value::as_str).unwrap_or("-");
            let entry = format!("{}:{tag}", actor.name);
            if ctx.config.get("fail").and_then(Value::as_bool).unwrap_or(false) {
                return Err(format!("{entry} failed").into());
            }
            ctx.context.update("log", |v| {
                if !v.is_array() {
                    *v = json!([]);
                }
                if let Some(list) = v.as_array_mut() {
                    list.push(json!(entry));
                }
            });
            Ok(json!(entry))
        }
    }

    /// Counts its calls in the context and fails on call `failAt`
    struct Countdown;

    #[async_trait]
    impl Action<NullTarget> for Countdown {
        async fn operation(&self, _actor: &Actor, ctx: &mut StepContext<'_, NullTarget>) -> HookResult<Value> {
            let calls = ctx.context.get("calls").and_then(Value::as_u64).unwrap_or(0) + 1;
            ctx.context.set("calls", calls)?;
            if ctx.config.get("failAt").and_then(Value::as_u64) == Some(calls) {
                return Err("countdown reached".into());
            }
            Ok(json!(calls))
        }
    }

    struct Closed;

    #[async_trait]
    impl Action<NullTarget> for Closed {
        fn has_precondition(&self) -> bool {
            true
        }

        async fn precondition(&self, _actor: &Actor, _ctx: &mut StepContext<'_, NullTarget>) -> HookResult<bool> {
            Ok(false)
        }

        async fn operation(&self, _actor: &Actor, _ctx: &mut StepContext<'_, NullTarget>) -> HookResult<Value> {
            Ok(Value::Null)
        }
    }

    struct Faulty;

    #[async_trait]
    impl Action<NullTarget> for Faulty {
        fn has_precondition(&self) -> bool {
            true
        }

        async fn precondition(&self, _actor: &Actor, _ctx: &mut StepContext<'_, NullTarget>) -> HookResult<bool> {
            Err("state unavailable".into())
        }

        async fn operation(&self, _actor: &Actor, _ctx: &mut StepContext<'_, NullTarget>) -> HookResult<Value> {
            Ok(Value::Null)
        }
    }

    struct Counting(Arc<AtomicUsize>);

    #[async_trait]
    impl ActorFactory<NullTarget> for Counting {
        async fn create(&self, name: &str, _target: &mut NullTarget, _options: &EngineOptions) -> HookResult<Actor> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(Actor::new(name, "counted"))
        }
    }

    fn user(name: &str, _options: &EngineOptions) -> HookResult<Actor> {
        Ok(Actor::new(name, "user").with_address(format!("0x{name}")))
    }

    fn refusing(name: &str, _options: &EngineOptions) -> HookResult<Actor> {
        Err(format!("no keys for {name}").into())
    }

    fn registry() -> Registry<NullTarget> {
        Registry::new()
            .with_actor("user", user)
            .with_actor("refusing", refusing)
            .with_action("record", Record)
            .with_action("countdown", Countdown)
            .with_action("closed", Closed)
            .with_action("faulty", Faulty)
    }

    fn tagged(tag: &str) -> ActionConfig {
        ActionConfig::new().with("tag", tag)
    }

    fn failing(tag: &str) -> ActionConfig {
        tagged(tag).with("fail", true)
    }

    fn inline(actions: Vec<Slot>) -> crate::options::EngineOptionsBuilder {
        EngineOptions::builder()
            .actors([("alice", "user"), ("bob", "user")])
            .actions(actions)
            .seed(Seed::from_u64(7))
    }

    fn engine(options: crate::options::EngineOptionsBuilder) -> Engine<NullTarget> {
        Engine::new(options.build().unwrap(), registry(), NullTarget::new())
    }

    fn abc(second_fails: bool) -> Vec<Slot> {
        vec![
            Slot::step_with("alice", "record", tagged("a")),
            Slot::step_with("alice", "record", if second_fails { failing("b") } else { tagged("b") }),
            Slot::step_with("bob", "record", tagged("c")),
        ]
    }

    mod execution_tests {
        use super::*;

        #[tokio::test]
        async fn test_all_slots_run_in_order() {
            let mut engine = engine(inline(abc(false)));
            let report = engine.run().await.unwrap();

            assert!(report.is_clean());
            assert_eq!(report.iterations_completed, 1);
            let values: Vec<_> = report.results.iter().filter_map(|r| r.value().cloned()).collect();
            assert_eq!(values, vec![json!("alice:a"), json!("alice:b"), json!("bob:c")]);
            assert_eq!(engine.target().active_credential(), Some("0xbob"));
            assert_eq!(engine.context().get("log"), Some(&json!(["alice:a", "alice:b", "bob:c"])));
        }

        #[tokio::test]
        async fn test_fail_fast_stops_at_failing_slot() {
            let mut engine = engine(inline(abc(true)));
            let report = engine.run().await.unwrap();

            assert!(!report.success);
            assert_eq!(report.error_index, Some(1));
            assert_eq!(report.results.len(), 1);
            assert_eq!(report.error.as_ref().unwrap().kind, ErrorKind::Action);
            assert_eq!(engine.context().get("log"), Some(&json!(["alice:a"])));
            assert_eq!(report.iterations_completed, 0);
        }

        #[tokio::test]
        async fn test_continue_on_failure_runs_every_slot() {
            let mut engine = engine(inline(abc(true)).continue_on_failure(true));
            let report = engine.run().await.unwrap();

            assert!(report.success);
            assert!(!report.is_clean());
            assert_eq!(report.results.len(), 3);
            assert_eq!(report.completed.len(), 3);
            assert!(!report.results[1].is_ok());
            assert_eq!(report.failed_count(), 1);
            assert_eq!(engine.context().get("log"), Some(&json!(["alice:a", "bob:c"])));
        }

        #[tokio::test]
        async fn test_group_runs_each_member_once() {
            let group = Slot::group(vec![
                SlotSpec::new("alice", ActionRef::new("record").with_config(tagged("x"))),
                SlotSpec::new("alice", ActionRef::new("record").with_config(tagged("y"))),
                SlotSpec::new("bob", ActionRef::new("record").with_config(tagged("z"))),
            ]);
            let mut engine = engine(inline(vec![group, Slot::step_with("bob", "record", tagged("end"))]));
            let report = engine.run().await.unwrap();

            assert_eq!(report.results.len(), 4);
            let mut first_three: Vec<_> = report.results[..3]
                .iter()
                .filter_map(|r| r.value().and_then(Value::as_str).map(str::to_string))
                .collect();
            first_three.sort();
            assert_eq!(first_three, vec!["alice:x", "alice:y", "bob:z"]);
            assert_eq!(report.results[3].value(), Some(&json!("bob:end")));
        }

        #[tokio::test]
        async fn test_ineligible_slot_is_dropped() {
            let actions = vec![
                Slot::choice("alice", ActionSpec::choice(["closed"])),
                Slot::step_with("bob", "record", tagged("after")),
            ];
            let mut engine = engine(inline(actions));
            let report = engine.run().await.unwrap();

            assert!(report.is_clean());
            assert_eq!(report.dropped_slots, 1);
            assert_eq!(report.results.len(), 1);
        }

        #[tokio::test]
        async fn test_precondition_error_aborts_run() {
            let actions = vec![
                Slot::step_with("alice", "record", tagged("a")),
                Slot::choice("alice", ActionSpec::choice(["record", "faulty"])),
            ];
            let mut engine = engine(inline(actions));
            let err = engine.run().await.unwrap_err();

            assert!(matches!(err, EngineError::Precondition { .. }));
            let report = engine.report().unwrap();
            assert!(!report.success);
            assert_eq!(report.error_index, Some(1));
        }

        #[tokio::test]
        async fn test_same_seed_same_run() {
            let actions = vec![
                Slot::choice(
                    ActorSpec::weighted([("alice", 1.0), ("bob", 2.0)]),
                    ActionSpec::single(ActionRef::new("record").with_config(tagged("r"))),
                ),
                Slot::group(vec![SlotSpec::new("alice", "countdown"), SlotSpec::new("bob", "countdown")]),
            ];
            let mut completed = Vec::new();
            for _ in 0..2 {
                let mut engine = engine(inline(actions.clone()).iterations(Iterations::Count(6)));
                completed.push(engine.run().await.unwrap().completed);
            }
            assert_eq!(completed[0].len(), 18);
            assert_eq!(completed[0], completed[1]);
        }
    }

    mod iteration_tests {
        use super::*;

        #[tokio::test]
        async fn test_runs_requested_iterations() {
            let mut engine = engine(inline(abc(false)).iterations(Iterations::Count(3)));
            let report = engine.run().await.unwrap();
            assert_eq!(report.iterations_completed, 3);
            assert_eq!(report.results.len(), 9);
        }

        #[tokio::test]
        async fn test_zero_iterations_runs_nothing() {
            let mut engine = engine(inline(abc(true)).iterations(Iterations::Count(0)));
            let report = engine.run().await.unwrap();
            assert!(report.is_clean());
            assert!(report.results.is_empty());
            assert_eq!(report.iterations_completed, 0);
        }

        #[tokio::test]
        async fn test_fail_fast_ends_later_iteration() {
            let actions = vec![Slot::step_with("alice", "countdown", ActionConfig::new().with("failAt", 2))];
            let mut engine = engine(inline(actions).iterations(Iterations::Count(5)));
            let report = engine.run().await.unwrap();

            assert_eq!(report.iterations_completed, 1);
            assert_eq!(report.error_index, Some(1));
            assert_eq!(engine.context().get("calls"), Some(&json!(2)));
        }

        #[tokio::test]
        async fn test_actors_imported_once_per_run() {
            let created = Arc::new(AtomicUsize::new(0));
            let registry = registry().with_actor("counted", Counting(Arc::clone(&created)));
            let options = EngineOptions::builder()
                .actors([("carol", "counted"), ("dave", "counted")])
                .actions(vec![Slot::step("carol", "countdown"), Slot::step("dave", "countdown")])
                .iterations(Iterations::Count(4))
                .build()
                .unwrap();
            let mut engine = Engine::new(options, registry, NullTarget::new());
            let report = engine.run().await.unwrap();

            assert_eq!(report.results.len(), 8);
            assert_eq!(created.load(Ordering::SeqCst), 2);
            assert_eq!(engine.target().activations(), 0);
        }

        #[tokio::test]
        async fn test_context_cleared_between_runs() {
            let mut engine = engine(inline(vec![Slot::step("alice", "countdown")]));
            engine.run().await.unwrap();
            engine.run().await.unwrap();
            assert_eq!(engine.context().get("calls"), Some(&json!(1)));
        }

        #[tokio::test(start_paused = true)]
        async fn test_stop_interrupts_sleep() {
            let mut engine = engine(
                inline(vec![Slot::step("alice", "countdown")])
                    .iterations(Iterations::Unbounded)
                    .sleep(Duration::from_secs(10)),
            );
            let stop = engine.stop_handle();
            let (report, ()) = tokio::join!(engine.run(), async {
                tokio::time::sleep(Duration::from_secs(25)).await;
                stop.stop();
            });
            let report = report.unwrap();

            assert!(report.stopped);
            assert!(report.success);
            assert_eq!(report.iterations_completed, 3);
        }

        #[tokio::test]
        async fn test_stop_before_run_is_honored_once() {
            let mut engine = engine(inline(abc(false)));
            engine.stop_handle().stop();
            let report = engine.run().await.unwrap();
            assert!(report.stopped);
            assert!(report.results.is_empty());
            assert_eq!(report.iterations_completed, 0);

            let report = engine.run().await.unwrap();
            assert!(!report.stopped);
            assert_eq!(report.results.len(), 3);
        }
    }

    mod setup_tests {
        use super::*;

        fn plans() -> Registry<NullTarget> {
            registry()
                .with_plan(
                    "first",
                    Plan::new()
                        .actor("alice", "user")
                        .slot(Slot::step_with("alice", "record", tagged("1"))),
                )
                .with_plan(
                    "second",
                    Plan::new()
                        .actor("bob", "user")
                        .slot(Slot::step_with("bob", "record", tagged("2")))
                        .slot(Slot::step_with("bob", "record", tagged("3")))
                        .mode(PlanMode::Random),
                )
        }

        #[tokio::test]
        async fn test_plans_merge_in_order() {
            let options = EngineOptions::builder().plans(["first", "second"]).build().unwrap();
            let mut engine = Engine::new(options, plans(), NullTarget::new());
            let report = engine.run().await.unwrap();

            assert!(report.is_clean());
            assert_eq!(report.results.len(), 3);
            assert_eq!(report.results[0].value(), Some(&json!("alice:1")));
            assert!(report.completed[1..].iter().all(|p| p.actor == "bob"));
        }

        #[tokio::test]
        async fn test_unknown_plan_fails_setup() {
            let options = EngineOptions::builder().plans(["first", "third"]).build().unwrap();
            let mut engine = Engine::new(options, plans(), NullTarget::new());
            let report = engine.run().await.unwrap();

            assert!(!report.success);
            assert_eq!(report.error_index, Some(SETUP_ERROR_INDEX));
            assert_eq!(report.error.unwrap().kind, ErrorKind::UnknownPlan);
        }

        fn with_unknown_second(policy: FailurePolicy) -> crate::options::EngineOptionsBuilder {
            inline(vec![
                Slot::step_with("alice", "record", tagged("a")),
                Slot::step("alice", "dance"),
                Slot::step_with("bob", "record", tagged("c")),
            ])
            .failure_policy(policy)
        }

        #[tokio::test]
        async fn test_unknown_action_fails_fast_at_its_slot() {
            let mut engine = engine(with_unknown_second(FailurePolicy::FailFast));
            let report = engine.run().await.unwrap();

            assert!(!report.success);
            assert_eq!(report.error_index, Some(1));
            assert_eq!(report.results.len(), 1);
            let error = report.error.unwrap();
            assert_eq!(error.kind, ErrorKind::UnknownAction);
            assert!(error.message.contains("dance"));
            assert_eq!(engine.context().get("log"), Some(&json!(["alice:a"])));
        }

        #[tokio::test]
        async fn test_unknown_action_continues_with_sentinel() {
            let mut engine = engine(with_unknown_second(FailurePolicy::ContinueOnFailure));
            let report = engine.run().await.unwrap();

            assert!(report.success);
            assert!(!report.is_clean());
            assert_eq!(report.results.len(), 3);
            assert!(matches!(
                &report.results[1],
                SlotOutcome::Failed { kind: ErrorKind::UnknownAction, .. }
            ));
            assert_eq!(report.completed[1].actor, "alice");
            assert_eq!(report.completed[1].action, "dance");
            assert_eq!(engine.context().get("log"), Some(&json!(["alice:a", "bob:c"])));
        }

        #[tokio::test]
        async fn test_undeclared_actor_follows_policy() {
            let actions = vec![
                Slot::step("mallory", "record"),
                Slot::step_with("alice", "record", tagged("a")),
            ];
            let mut engine = engine(inline(actions.clone()));
            let report = engine.run().await.unwrap();
            assert_eq!(report.error_index, Some(0));
            assert_eq!(report.error.unwrap().kind, ErrorKind::UnknownActor);

            let mut engine = super::engine(inline(actions).failure_policy(FailurePolicy::ContinueOnFailure));
            let report = engine.run().await.unwrap();
            assert!(report.success);
            assert_eq!(report.failed_count(), 1);
            assert_eq!(report.completed[0].actor, "mallory");
            assert_eq!(report.results[1].value(), Some(&json!("alice:a")));
        }

        #[tokio::test]
        async fn test_actor_factory_failure_fails_setup() {
            let options = EngineOptions::builder()
                .actors([("eve", "refusing")])
                .actions(vec![Slot::step("eve", "record")])
                .build()
                .unwrap();
            let mut engine = Engine::new(options, registry(), NullTarget::new());
            let report = engine.run().await.unwrap();

            assert_eq!(report.error_index, Some(SETUP_ERROR_INDEX));
            assert!(report.error.unwrap().message.contains("no keys for eve"));
        }

        #[tokio::test]
        async fn test_unknown_actor_type_fails_setup() {
            let options = EngineOptions::builder()
                .actors([("eve", "ghost")])
                .actions(vec![Slot::step("eve", "record")])
                .build()
                .unwrap();
            let mut engine = Engine::new(options, registry(), NullTarget::new());
            let report = engine.run().await.unwrap();
            assert_eq!(report.error_index, Some(SETUP_ERROR_INDEX));
            assert!(report.error.unwrap().message.contains("eve: ghost"));
        }
    }

    mod alert_tests {
        use super::*;
        use crate::alert::{AlertLevel, LogAlerter};

        #[tokio::test]
        async fn test_alert_before_run_is_an_error() {
            let engine = engine(inline(abc(false)));
            let err = engine.alert(AlertLevel::Info, &["log"]).await.unwrap_err();
            assert!(err.to_string().contains("Nothing to alert on yet"));
        }

        #[tokio::test]
        async fn test_alert_fans_out_in_order() {
            let sink = WriterAlerter::new(Vec::new());
            let registry = registry().with_alerter("sink", sink.clone()).with_alerter("log", LogAlerter);
            let options = inline(abc(true)).build().unwrap();
            let mut engine = Engine::new(options, registry, NullTarget::new());
            engine.run().await.unwrap();

            let err = engine
                .alert(AlertLevel::Error, &["sink", "log", "pager"])
                .await
                .unwrap_err();
            assert!(matches!(err, EngineError::UnknownAlerter { ref name } if name == "pager"));

            let written = String::from_utf8(sink.sink().lock().unwrap().clone()).unwrap();
            assert!(written.starts_with("```"));
            assert!(written.contains("\"errorIndex\": 1"));
        }

        #[tokio::test]
        async fn test_error_level_skips_clean_runs() {
            let sink = WriterAlerter::new(Vec::new());
            let registry = registry().with_alerter("sink", sink.clone());
            let mut engine = Engine::new(inline(abc(false)).build().unwrap(), registry, NullTarget::new());
            engine.run().await.unwrap();

            engine.alert(AlertLevel::Error, &["sink"]).await.unwrap();
            assert!(sink.sink().lock().unwrap().is_empty());
            engine.alert(AlertLevel::Info, &["sink"]).await.unwrap();
            assert!(!sink.sink().lock().unwrap().is_empty());
        }
    }
}
