//! Devtools bridge: wire types and the inspector seam.
//!
//! The bridge mirrors every accepted shared mutation that carries a type tag
//! to an external inspector, and accepts externally injected `DISPATCH`
//! messages that replace the whole state table (time-travel). This is
//! best-effort observability, not part of the correctness contract.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::trace;

/// Channel name the store registers under, passed to [`Inspector::init`].
pub const INSPECTOR_NAME: &str = "scoped-state";

/// External inspector seam.
///
/// Implementations push the wire messages to whatever developer tooling is
/// attached; the core only requires that the calls never fail.
pub trait Inspector: Send + Sync {
    /// Open the named channel and push the initial state table as the
    /// baseline.
    fn init(&self, channel: &str, state: &Value);

    /// Mirror one accepted mutation.
    fn send(&self, event: &InspectorEvent);

    /// Tear down the connection. Called once on store disposal.
    fn disconnect(&self) {}
}

/// Outbound wire message: one accepted mutation of the shared store.
///
/// Serializes as `{"type": "<context>/<tag>", "state": {...}}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InspectorEvent {
    /// The mutation name: `"<context>/<type>"` for context-scoped mutations,
    /// the bare type otherwise.
    #[serde(rename = "type")]
    pub action: String,
    /// The full state table after the mutation.
    pub state: Value,
}

/// Inbound wire message from the inspector.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InspectorMessage {
    /// Message kind; only [`InspectorMessage::DISPATCH`] is acted on.
    #[serde(rename = "type")]
    pub kind: String,
    /// JSON-encoded replacement table for `DISPATCH` messages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

impl InspectorMessage {
    /// The kind of message that triggers a full-table replacement.
    pub const DISPATCH: &'static str = "DISPATCH";

    /// Build a dispatch message carrying a JSON-encoded table.
    pub fn dispatch(state: impl Into<String>) -> Self {
        Self {
            kind: Self::DISPATCH.to_owned(),
            state: Some(state.into()),
        }
    }
}

/// The store's handle on its inspector, if one is attached.
#[derive(Clone)]
pub(crate) struct DevtoolsBridge {
    inspector: Arc<dyn Inspector>,
}

impl DevtoolsBridge {
    pub(crate) fn new(inspector: Arc<dyn Inspector>) -> Self {
        Self { inspector }
    }

    pub(crate) fn init(&self, state: &Value) {
        trace!(channel = INSPECTOR_NAME, "devtools baseline pushed");
        self.inspector.init(INSPECTOR_NAME, state);
    }

    pub(crate) fn send(&self, action: String, state: Value) {
        trace!(%action, "devtools send");
        self.inspector.send(&InspectorEvent { action, state });
    }

    pub(crate) fn disconnect(&self) {
        trace!(channel = INSPECTOR_NAME, "devtools disconnected");
        self.inspector.disconnect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_wire_shape() {
        let event = InspectorEvent {
            action: "cart/addItem".to_owned(),
            state: json!({"cart": {"items": 1}}),
        };

        let wire = serde_json::to_value(&event).unwrap();
        assert_eq!(
            wire,
            json!({"type": "cart/addItem", "state": {"cart": {"items": 1}}})
        );
    }

    #[test]
    fn test_message_wire_shape() {
        let msg: InspectorMessage =
            serde_json::from_value(json!({"type": "DISPATCH", "state": "{\"cart\":{}}"})).unwrap();

        assert_eq!(msg.kind, InspectorMessage::DISPATCH);
        assert_eq!(msg.state.as_deref(), Some("{\"cart\":{}}"));
    }

    #[test]
    fn test_message_without_state() {
        let msg: InspectorMessage = serde_json::from_value(json!({"type": "START"})).unwrap();
        assert_eq!(msg.kind, "START");
        assert!(msg.state.is_none());

        // Absent state is skipped on the way out as well.
        let wire = serde_json::to_value(&msg).unwrap();
        assert_eq!(wire, json!({"type": "START"}));
    }
}
