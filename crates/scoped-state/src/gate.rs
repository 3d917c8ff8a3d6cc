//! Update gating and one-shot notification suppression.
//!
//! A gate predicate decides whether a proposed state transition is observable.
//! Rejecting a transition still lets the raw state change commit (the
//! container is never "stuck"); only the follow-up notification is withheld.
//! The rejected state is remembered so exactly one subsequent notification is
//! suppressed, then the memo is overwritten by the next gate evaluation.

use crate::State;
use std::sync::Arc;

/// Arguments passed to a `should_update` predicate.
pub struct GateArgs<'a> {
    /// The committed state before the transition.
    pub state: &'a State,
    /// The proposed state after the transition.
    pub next_state: &'a State,
}

/// Predicate deciding whether a proposed transition is observable.
pub type ShouldUpdate = Arc<dyn Fn(GateArgs<'_>) -> bool + Send + Sync>;

/// Optional wrapper around a `should_update` predicate.
///
/// Absent predicate means every transition is accepted.
#[derive(Clone, Default)]
pub struct UpdateGate {
    predicate: Option<ShouldUpdate>,
}

impl UpdateGate {
    /// Create a gate from an optional predicate.
    pub fn new(predicate: Option<ShouldUpdate>) -> Self {
        Self { predicate }
    }

    /// Whether a predicate is configured.
    #[inline]
    pub fn is_configured(&self) -> bool {
        self.predicate.is_some()
    }

    /// Evaluate the predicate for a transition. Default is accept.
    pub fn accepts(&self, state: &State, next_state: &State) -> bool {
        match &self.predicate {
            Some(predicate) => predicate(GateArgs { state, next_state }),
            None => true,
        }
    }
}

/// The ignore-state memo for a single container.
///
/// Comparison uses value equality of the full next-state, not per-field
/// diffing. One rejected state blocks exactly one subsequent notification.
#[derive(Clone, Debug, Default)]
pub struct Suppression {
    ignored: Option<State>,
}

impl Suppression {
    /// Record the outcome of a gate evaluation.
    ///
    /// A rejected transition remembers the proposed state; an accepted one
    /// clears the memo.
    pub fn record(&mut self, accepted: bool, next_state: &State) {
        self.ignored = if accepted {
            None
        } else {
            Some(next_state.clone())
        };
    }

    /// Whether a notification for the committed state should fire.
    pub fn should_notify(&self, committed: &State) -> bool {
        self.ignored.as_ref() != Some(committed)
    }
}
