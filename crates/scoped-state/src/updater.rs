//! Mutation requests: concrete patches or pure functions of current state.

use crate::{Patch, State};
use std::fmt;

/// A normalized mutation request.
///
/// A mutation is described either by a concrete [`Patch`] or by a pure
/// function of the current state that computes one. Resolution invokes the
/// function exactly once with a read-only snapshot and never mutates the
/// input state.
///
/// # Examples
///
/// ```
/// use scoped_state::{Patch, State, Updater};
/// use serde_json::json;
///
/// let state = State::from_value(json!({"count": 2})).unwrap();
///
/// // A plain patch resolves to itself.
/// let patch = Patch::new().with_field("count", 3);
/// assert_eq!(Updater::from(patch.clone()).resolve(&state), patch);
///
/// // A compute updater is applied to the current state.
/// let doubled = Updater::compute(|s: &State| {
///     let count = s.get("count").and_then(|v| v.as_i64()).unwrap_or(0);
///     Patch::new().with_field("count", count * 2)
/// });
/// assert_eq!(doubled.resolve(&state).get("count"), Some(&json!(4)));
/// ```
pub enum Updater {
    /// A concrete partial-state patch, passed through unchanged.
    Patch(Patch),
    /// A pure function of the current state.
    Compute(Box<dyn FnOnce(&State) -> Patch + Send>),
}

impl Updater {
    /// Create an updater from a pure function of the current state.
    pub fn compute(f: impl FnOnce(&State) -> Patch + Send + 'static) -> Self {
        Updater::Compute(Box::new(f))
    }

    /// Resolve this request into a concrete patch against the current state.
    ///
    /// A panicking compute function propagates to the caller; the state it
    /// was given is read-only, so nothing is committed in that case.
    pub fn resolve(self, current: &State) -> Patch {
        match self {
            Updater::Patch(patch) => patch,
            Updater::Compute(f) => f(current),
        }
    }
}

impl From<Patch> for Updater {
    fn from(patch: Patch) -> Self {
        Updater::Patch(patch)
    }
}

impl fmt::Debug for Updater {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Updater::Patch(patch) => f.debug_tuple("Patch").field(patch).finish(),
            Updater::Compute(_) => f.write_str("Compute(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_patch_passes_through() {
        let state = State::from_value(json!({"a": 1})).unwrap();
        let patch = Patch::new().with_field("b", 2);

        assert_eq!(Updater::from(patch.clone()).resolve(&state), patch);
    }

    #[test]
    fn test_compute_receives_current_state() {
        let state = State::from_value(json!({"count": 41})).unwrap();
        let updater = Updater::compute(|s: &State| {
            let count = s.get("count").and_then(|v| v.as_i64()).unwrap_or(0);
            Patch::new().with_field("count", count + 1)
        });

        assert_eq!(updater.resolve(&state).get("count"), Some(&json!(42)));
    }

    #[test]
    fn test_compute_matches_direct_call() {
        let state = State::from_value(json!({"x": 7})).unwrap();
        let f = |s: &State| Patch::new().with_field("y", s.get("x").cloned().unwrap_or(json!(0)));

        assert_eq!(Updater::compute(f).resolve(&state), f(&state));
    }
}
