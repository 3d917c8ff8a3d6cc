//! Action/selector/effect bindings and the callable map built from them.
//!
//! A consumer declares its behaviors once as a [`Bindings`] map from name to
//! one of three kinds of user function:
//!
//! - **Action**: `(args) -> Updater` — describes a mutation, does not apply it.
//! - **Selector**: `(args) -> (state) -> Value` — pure read, re-evaluated
//!   against the current committed state on every invocation, never cached.
//! - **Effect**: `(args) -> (props) -> Value` — performs external work given
//!   `{state, set_state}`; its result is opaque to the core and never awaited.
//!
//! The owning container turns the map into an [`Api`]: the callable surface
//! handed to the view layer, unioned with the current state fields.

use crate::lifecycle::Mutator;
use crate::{ScopeError, ScopeResult, State, Updater};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// A user-defined action: produces a mutation description from call arguments.
pub type ActionFn = Arc<dyn Fn(&[Value]) -> Updater + Send + Sync>;

/// The state-function a selector returns.
pub type SelectorThunk = Box<dyn FnOnce(&State) -> Value>;

/// A user-defined selector.
pub type SelectorFn = Arc<dyn Fn(&[Value]) -> SelectorThunk + Send + Sync>;

/// The runtime dependencies handed to an effect's returned function.
pub struct EffectProps {
    /// Snapshot of the committed state when the effect was invoked.
    pub state: State,
    /// Mutator scoped to the owning container, tagged with the effect's name.
    pub set_state: Mutator,
}

/// The props-function an effect returns.
pub type EffectThunk = Box<dyn FnOnce(EffectProps) -> Value>;

/// A user-defined effect.
pub type EffectFn = Arc<dyn Fn(&[Value]) -> EffectThunk + Send + Sync>;

/// One named behavior: a closed sum over the three function kinds.
///
/// Dispatch is on the variant tag; the core never inspects the shape of the
/// user function itself.
#[derive(Clone)]
pub enum Binding {
    Action(ActionFn),
    Selector(SelectorFn),
    Effect(EffectFn),
}

impl Binding {
    /// The kind of this binding, for logging and diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Binding::Action(_) => "action",
            Binding::Selector(_) => "selector",
            Binding::Effect(_) => "effect",
        }
    }
}

/// A map of named actions, selectors, and effects.
///
/// Names are unique across the three kinds; no iteration-order guarantee is
/// made between distinct entries.
///
/// # Examples
///
/// ```
/// use scoped_state::{Bindings, Patch, State, Updater};
/// use serde_json::Value;
///
/// let bindings = Bindings::new()
///     .action("increment", |args: &[Value]| {
///         let n = args.first().and_then(Value::as_i64).unwrap_or(1);
///         Updater::compute(move |state: &State| {
///             let count = state.get("count").and_then(Value::as_i64).unwrap_or(0);
///             Patch::new().with_field("count", count + n)
///         })
///     })
///     .selector("is_even", |_args: &[Value]| {
///         |state: &State| {
///             let count = state.get("count").and_then(Value::as_i64).unwrap_or(0);
///             Value::Bool(count % 2 == 0)
///         }
///     });
///
/// assert_eq!(bindings.len(), 2);
/// ```
#[derive(Clone, Default)]
pub struct Bindings {
    map: HashMap<String, Binding>,
}

impl Bindings {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an action (builder pattern).
    pub fn action<F, U>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&[Value]) -> U + Send + Sync + 'static,
        U: Into<Updater>,
    {
        self.map.insert(
            name.into(),
            Binding::Action(Arc::new(move |args| f(args).into())),
        );
        self
    }

    /// Register a selector (builder pattern).
    pub fn selector<F, T>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&[Value]) -> T + Send + Sync + 'static,
        T: FnOnce(&State) -> Value + 'static,
    {
        self.map.insert(
            name.into(),
            Binding::Selector(Arc::new(move |args| Box::new(f(args)))),
        );
        self
    }

    /// Register an effect (builder pattern).
    pub fn effect<F, T>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&[Value]) -> T + Send + Sync + 'static,
        T: FnOnce(EffectProps) -> Value + 'static,
    {
        self.map.insert(
            name.into(),
            Binding::Effect(Arc::new(move |args| Box::new(f(args)))),
        );
        self
    }

    /// Look up a binding by name.
    #[inline]
    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.map.get(name)
    }

    /// Check if the map is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Get the number of bindings.
    #[inline]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Iterate over the binding names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.map.keys().map(String::as_str)
    }
}

type StateFn = Arc<dyn Fn() -> State + Send + Sync>;

/// The callable surface exposed to the consumer.
///
/// An `Api` is the union of the container's current state fields with the
/// callable wrappers built from its [`Bindings`]. Wrappers forward all call
/// arguments to the user function unchanged.
pub struct Api {
    bindings: Bindings,
    state: StateFn,
    mutator: Mutator,
}

impl Api {
    pub(crate) fn new(bindings: Bindings, state: StateFn, mutator: Mutator) -> Self {
        Self {
            bindings,
            state,
            mutator,
        }
    }

    /// Snapshot of the owning container's current committed state.
    pub fn state(&self) -> State {
        (self.state)()
    }

    /// Look up a single state field.
    pub fn field(&self, name: &str) -> Option<Value> {
        self.state().get(name).cloned()
    }

    /// Check whether a callable with this name exists.
    pub fn has(&self, name: &str) -> bool {
        self.bindings.get(name).is_some()
    }

    /// Invoke a named callable.
    ///
    /// - Actions submit their resolved mutation to the owning container,
    ///   tagged with the action's name, and yield `Value::Null`.
    /// - Selectors are applied to the current committed state snapshot.
    /// - Effects receive freshly built [`EffectProps`]; their result is
    ///   forwarded as-is (it may represent pending asynchronous work).
    pub fn invoke(&self, name: &str, args: &[Value]) -> ScopeResult<Value> {
        match self.bindings.get(name) {
            None => Err(ScopeError::unknown_callable(name)),
            Some(Binding::Action(action)) => {
                let updater = action(args);
                self.mutator.with_tag(name).set(updater);
                Ok(Value::Null)
            }
            Some(Binding::Selector(selector)) => {
                let thunk = selector(args);
                Ok(thunk(&self.state()))
            }
            Some(Binding::Effect(effect)) => {
                let thunk = effect(args);
                Ok(thunk(EffectProps {
                    state: self.state(),
                    set_state: self.mutator.with_tag(name),
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Patch;
    use serde_json::json;
    use std::sync::Mutex;

    fn fixed_state_api(bindings: Bindings, state: State) -> Api {
        Api::new(bindings, Arc::new(move || state.clone()), Mutator::noop())
    }

    #[test]
    fn test_unknown_callable() {
        let api = fixed_state_api(Bindings::new(), State::new());
        let err = api.invoke("missing", &[]).unwrap_err();
        assert!(matches!(err, ScopeError::UnknownCallable { name } if name == "missing"));
    }

    #[test]
    fn test_selector_forwards_args_unchanged() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_in = Arc::clone(&seen);

        let bindings = Bindings::new().selector("probe", move |args: &[Value]| {
            seen_in.lock().unwrap().push(args.to_vec());
            |_: &State| Value::Null
        });

        let api = fixed_state_api(bindings, State::new());
        api.invoke("probe", &[json!(1), json!("two"), json!([3])])
            .unwrap();

        assert_eq!(
            seen.lock().unwrap()[0],
            vec![json!(1), json!("two"), json!([3])]
        );
    }

    #[test]
    fn test_selector_applies_to_supplied_state() {
        let bindings = Bindings::new().selector("count_plus", |args: &[Value]| {
            let n = args.first().and_then(Value::as_i64).unwrap_or(0);
            move |state: &State| {
                let count = state.get("count").and_then(Value::as_i64).unwrap_or(0);
                json!(count + n)
            }
        });

        let state = State::from_value(json!({"count": 10})).unwrap();
        let api = fixed_state_api(bindings, state);

        assert_eq!(api.invoke("count_plus", &[json!(5)]).unwrap(), json!(15));
    }

    #[test]
    fn test_effect_result_is_forwarded() {
        let bindings = Bindings::new().effect("load", |_args: &[Value]| {
            |props: EffectProps| {
                // Result is opaque to the core; a pending token works too.
                json!({"had_state": !props.state.is_empty()})
            }
        });

        let state = State::from_value(json!({"ready": true})).unwrap();
        let api = fixed_state_api(bindings, state);

        assert_eq!(
            api.invoke("load", &[]).unwrap(),
            json!({"had_state": true})
        );
    }

    #[test]
    fn test_action_yields_null() {
        let bindings =
            Bindings::new().action("noop", |_args: &[Value]| Patch::new());
        let api = fixed_state_api(bindings, State::new());

        assert_eq!(api.invoke("noop", &[]).unwrap(), Value::Null);
    }

    #[test]
    fn test_binding_kinds() {
        let bindings = Bindings::new()
            .action("a", |_: &[Value]| Patch::new())
            .selector("s", |_: &[Value]| |_: &State| Value::Null)
            .effect("e", |_: &[Value]| |_: EffectProps| Value::Null);

        assert_eq!(bindings.get("a").map(Binding::kind), Some("action"));
        assert_eq!(bindings.get("s").map(Binding::kind), Some("selector"));
        assert_eq!(bindings.get("e").map(Binding::kind), Some("effect"));
    }
}
