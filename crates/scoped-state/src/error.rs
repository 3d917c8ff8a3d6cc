//! Error types for scoped-state operations.

use thiserror::Error;

/// Result type alias for scoped-state operations.
pub type ScopeResult<T> = Result<T, ScopeError>;

/// Errors that can occur during scoped-state operations.
///
/// User-supplied functions (actions, selectors, effects, hooks, updaters)
/// are never caught by the core; a panic in one of them propagates to the
/// caller. The variants here cover structural failures only.
#[derive(Debug, Error)]
pub enum ScopeError {
    /// A state value or table was built from a non-object JSON value.
    #[error("expected a JSON object, found {found}")]
    NotAnObject {
        /// The JSON type that was found instead.
        found: &'static str,
    },

    /// `Api::invoke` was called with a name that has no binding.
    #[error("unknown callable: {name}")]
    UnknownCallable {
        /// The name that was looked up.
        name: String,
    },

    /// A shared container was declared without a context key.
    #[error("shared container declared without a context key")]
    MissingContextKey,

    /// JSON serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ScopeError {
    /// Create a not-an-object error from the offending value.
    #[inline]
    pub fn not_an_object(value: &serde_json::Value) -> Self {
        ScopeError::NotAnObject {
            found: value_type_name(value),
        }
    }

    /// Create an unknown-callable error.
    #[inline]
    pub fn unknown_callable(name: impl Into<String>) -> Self {
        ScopeError::UnknownCallable { name: name.into() }
    }
}

/// Get the type name of a JSON value.
#[inline]
pub fn value_type_name(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_display() {
        let err = ScopeError::not_an_object(&json!([1, 2, 3]));
        assert_eq!(err.to_string(), "expected a JSON object, found array");

        let err = ScopeError::unknown_callable("increment");
        assert!(err.to_string().contains("increment"));
    }

    #[test]
    fn test_value_type_name() {
        assert_eq!(value_type_name(&json!(null)), "null");
        assert_eq!(value_type_name(&json!(true)), "boolean");
        assert_eq!(value_type_name(&json!(42)), "number");
        assert_eq!(value_type_name(&json!("hello")), "string");
        assert_eq!(value_type_name(&json!([])), "array");
        assert_eq!(value_type_name(&json!({})), "object");
    }
}
