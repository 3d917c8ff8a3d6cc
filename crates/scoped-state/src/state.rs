//! Flat state values and the merge patches that update them.
//!
//! `State` is a flat, string-keyed mapping from field name to JSON value.
//! The core imposes no nesting contract; consumers choose the shape of each
//! field. State is immutable from the consumer's perspective — every mutation
//! produces a new value via shallow merge, never in-place field assignment.

use crate::{ScopeError, ScopeResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A flat, string-keyed state value.
///
/// # Examples
///
/// ```
/// use scoped_state::{Patch, State};
/// use serde_json::json;
///
/// let state = State::from_value(json!({"count": 0, "name": "counter"})).unwrap();
/// let patch = Patch::new().with_field("count", 1);
///
/// let next = state.merged(&patch);
/// assert_eq!(next.get("count"), Some(&json!(1)));
/// assert_eq!(state.get("count"), Some(&json!(0))); // Original unchanged
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct State {
    fields: Map<String, Value>,
}

impl State {
    /// Create an empty state.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a state from a JSON value. The value must be an object.
    pub fn from_value(value: Value) -> ScopeResult<Self> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(ScopeError::not_an_object(&other)),
        }
    }

    /// Create a state from a serializable type.
    pub fn from_model<T: Serialize>(model: &T) -> ScopeResult<Self> {
        Self::from_value(serde_json::to_value(model)?)
    }

    /// Get a field value.
    #[inline]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Check if a field is present.
    #[inline]
    pub fn contains_field(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Check if the state has no fields.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Get the number of fields.
    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Iterate over the fields.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    /// Produce a new state by shallow-merging a patch over this one.
    ///
    /// Patch fields overwrite state fields key by key; this state is left
    /// untouched.
    pub fn merged(&self, patch: &Patch) -> State {
        let mut fields = self.fields.clone();
        for (k, v) in &patch.fields {
            fields.insert(k.clone(), v.clone());
        }
        State { fields }
    }

    /// Get the state as a JSON value.
    pub fn to_value(&self) -> Value {
        Value::Object(self.fields.clone())
    }

    /// Consume the state and return it as a JSON value.
    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }
}

/// A partial-state merge fragment.
///
/// A patch is unioned into a [`State`] by shallow key overwrite. Patches are
/// what actions and state updaters produce to describe an intended mutation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Patch {
    fields: Map<String, Value>,
}

impl Patch {
    /// Create an empty patch.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a patch from a JSON value. The value must be an object.
    pub fn from_value(value: Value) -> ScopeResult<Self> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(ScopeError::not_an_object(&other)),
        }
    }

    /// Add a field to this patch (builder pattern).
    #[inline]
    pub fn with_field(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    /// Set a field on this patch.
    #[inline]
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
    }

    /// Get a field value.
    #[inline]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Check if this patch is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Get the number of fields in this patch.
    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Iterate over the fields.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }
}

impl From<State> for Patch {
    fn from(state: State) -> Self {
        Patch {
            fields: state.fields,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_state_is_empty() {
        let state = State::new();
        assert!(state.is_empty());
        assert_eq!(state.to_value(), json!({}));
    }

    #[test]
    fn test_from_value_rejects_non_object() {
        let err = State::from_value(json!(42)).unwrap_err();
        assert!(matches!(
            err,
            ScopeError::NotAnObject { found: "number" }
        ));
    }

    #[test]
    fn test_merged_overwrites_shallowly() {
        let state = State::from_value(json!({"a": 1, "b": {"x": 1}})).unwrap();
        let patch = Patch::new().with_field("b", json!({"y": 2})).with_field("c", 3);

        let next = state.merged(&patch);
        assert_eq!(next.get("a"), Some(&json!(1)));
        // Shallow merge: the whole field is replaced, not deep-merged.
        assert_eq!(next.get("b"), Some(&json!({"y": 2})));
        assert_eq!(next.get("c"), Some(&json!(3)));
    }

    #[test]
    fn test_merged_leaves_original_untouched() {
        let state = State::from_value(json!({"count": 0})).unwrap();
        let next = state.merged(&Patch::new().with_field("count", 5));

        assert_eq!(state.get("count"), Some(&json!(0)));
        assert_eq!(next.get("count"), Some(&json!(5)));
    }

    #[test]
    fn test_empty_patch_merge_is_identity() {
        let state = State::from_value(json!({"a": 1})).unwrap();
        assert_eq!(state.merged(&Patch::new()), state);
    }

    #[test]
    fn test_serde_transparent() {
        let state = State::from_value(json!({"name": "cart"})).unwrap();
        let text = serde_json::to_string(&state).unwrap();
        assert_eq!(text, r#"{"name":"cart"}"#);

        let parsed: State = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, state);
    }

    #[test]
    fn test_patch_from_state() {
        let state = State::from_value(json!({"a": 1})).unwrap();
        let patch = Patch::from(state);
        assert_eq!(patch.get("a"), Some(&json!(1)));
    }
}
