//! Late resolution of action slots into concrete `(actor, action)` pairs.
//!
//! Slots are resolved one at a time, immediately before they execute, because
//! preconditions read live state that earlier slots of the same run may have
//! changed.

use crate::actor::Target;
use crate::context::ActionConfig;
use crate::prng::Prng;
use crate::result::EngineResult;
use crate::session::Session;
use crate::slot::{ActionSpec, ActorSpec, ResolvedPair, Slot, SlotSpec};
use std::collections::VecDeque;
use std::num::FpCategory;

/// Pending slots of one iteration, expanding groups as they are reached
#[derive(Debug, Clone, Default)]
pub(crate) struct SlotQueue {
    pending: VecDeque<Slot>,
}

impl SlotQueue {
    pub(crate) fn new(slots: Vec<Slot>) -> Self {
        Self {
            pending: slots.into(),
        }
    }

    /// Next slot spec to resolve.
    ///
    /// A group at the head is replaced in place by a shuffled copy of its
    /// members; the members themselves are never expanded again.
    pub(crate) fn next_spec(&mut self, rng: &mut Prng) -> Option<SlotSpec> {
        match self.pending.pop_front()? {
            Slot::Step(spec) => Some(spec),
            Slot::Group(specs) => {
                let mut shuffled = rng.shuffle(&specs).into_iter();
                let first = shuffled.next();
                for spec in shuffled.rev() {
                    self.pending.push_front(Slot::Step(spec));
                }
                first.or_else(|| self.next_spec(rng))
            }
        }
    }
}

/// Pick the actor name for a slot
pub(crate) fn pick_actor(spec: &ActorSpec, rng: &mut Prng) -> EngineResult<String> {
    match spec {
        ActorSpec::Named(name) => Ok(name.clone()),
        ActorSpec::Choice(candidates) => {
            let weights: Vec<f64> = candidates.iter().map(|c| c.weight).collect();
            let index = rng.weighted_index(&weights)?;
            Ok(candidates[index].name.clone())
        }
    }
}

/// Resolve one slot spec.
///
/// Returns `None` when no candidate action's precondition holds for the
/// chosen actor, or when a choice is left with only zero-weight candidates;
/// the slot is then dropped.
pub(crate) async fn resolve_slot<T: Target + 'static>(
    spec: &SlotSpec,
    session: &mut Session<'_, T>,
) -> EngineResult<Option<ResolvedPair>> {
    let actor_name = pick_actor(&spec.actor, session.rng)?;
    let actor = session.actor(&actor_name)?;

    let mut eligible: Vec<(String, ActionConfig)> = Vec::new();
    for candidate in spec.action.candidates() {
        let action = session.registry.action(&candidate.name)?;
        let config = candidate.config.merged_over(&action.default_config());
        if session
            .precondition(&action, &candidate.name, actor, &config)
            .await?
        {
            eligible.push((candidate.name.clone(), config));
        } else {
            tracing::debug!(actor = %actor_name, action = %candidate.name, "precondition not met");
        }
    }

    if eligible.is_empty() {
        return Ok(None);
    }
    let weights: Vec<f64> = eligible.iter().map(|(_, config)| config.weight()).collect();
    let all_zero = weights.iter().all(|w| w.classify() == FpCategory::Zero);
    if all_zero && matches!(spec.action, ActionSpec::Choice(_)) {
        tracing::debug!(actor = %actor_name, "every eligible candidate has weight 0");
        return Ok(None);
    }
    let index = session.rng.weighted_index(&weights)?;
    let (action, config) = eligible.swap_remove(index);
    Ok(Some(ResolvedPair::new(actor_name, action, config)))
}
