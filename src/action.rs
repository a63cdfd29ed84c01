use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A tagged message dispatched to a [`Store`](crate::Store).
///
/// The tag serializes as `"type"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: Value,
}

impl Action {
    /// Create an action with a `null` payload.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            payload: Value::Null,
        }
    }

    /// Create an action carrying `payload`.
    pub fn with_payload(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }

    /// Whether this action has the given type.
    pub fn is(&self, kind: &str) -> bool {
        self.kind == kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tag_serializes_as_type() {
        let action = Action::with_payload("LOAD_USER", json!({ "id": 7 }));
        let value = serde_json::to_value(&action).unwrap();
        assert_eq!(value, json!({ "type": "LOAD_USER", "payload": { "id": 7 } }));
    }

    #[test]
    fn missing_payload_defaults_to_null() {
        let action: Action = serde_json::from_str(r#"{ "type": "RESET" }"#).unwrap();
        assert!(action.is("RESET"));
        assert_eq!(action.payload, Value::Null);
    }
}
