//! Loosely structured IDS alert records.
//!
//! Suricata EVE records carry no guaranteed schema, so [`Alert`] wraps the raw
//! JSON object and exposes every field of interest as an `Option`. Callers
//! pick their own default at the point of use.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Signature used when neither `alert.signature` nor `signature` is present.
pub const UNKNOWN_SIGNATURE: &str = "desconhecido";

/// Default for absent `event_type` / `src_ip` in generated text.
pub const UNKNOWN: &str = "unknown";

/// A single intrusion-detection event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Alert(Map<String, Value>);

impl Alert {
    /// Build an alert from any JSON value. Non-objects yield `None`.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn event_type(&self) -> Option<String> {
        text(self.0.get("event_type"))
    }

    pub fn src_ip(&self) -> Option<String> {
        text(self.0.get("src_ip"))
    }

    pub fn dest_ip(&self) -> Option<String> {
        text(self.0.get("dest_ip"))
    }

    pub fn src_port(&self) -> Option<String> {
        text(self.0.get("src_port"))
    }

    pub fn dest_port(&self) -> Option<String> {
        text(self.0.get("dest_port"))
    }

    pub fn proto(&self) -> Option<String> {
        text(self.0.get("proto"))
    }

    /// `alert.signature`, else a top-level `signature` (aggregated alerts).
    pub fn signature(&self) -> Option<String> {
        text(self.nested("signature")).or_else(|| text(self.0.get("signature")))
    }

    /// [`Alert::signature`] with the `"desconhecido"` default applied.
    pub fn resolved_signature(&self) -> String {
        self.signature()
            .unwrap_or_else(|| UNKNOWN_SIGNATURE.to_string())
    }

    pub fn category(&self) -> Option<String> {
        text(self.nested("category"))
    }

    /// `alert.severity`, else a top-level `severity`.
    pub fn severity(&self) -> Option<String> {
        text(self.nested("severity")).or_else(|| text(self.0.get("severity")))
    }

    /// Numeric severity for storage; Suricata uses 1 (high) to 3 (low).
    pub fn severity_level(&self) -> Option<i64> {
        self.nested("severity")
            .or_else(|| self.0.get("severity"))
            .and_then(integer)
    }

    pub fn src_port_number(&self) -> Option<i64> {
        self.0.get("src_port").and_then(integer)
    }

    pub fn dest_port_number(&self) -> Option<i64> {
        self.0.get("dest_port").and_then(integer)
    }

    pub fn payload_printable(&self) -> Option<String> {
        text(self.0.get("payload_printable"))
    }

    fn nested(&self, key: &str) -> Option<&Value> {
        self.0.get("alert").and_then(|a| a.get(key))
    }
}

impl From<Map<String, Value>> for Alert {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

// Strings render unquoted, other scalars with their JSON text. Null, empty
// strings and containers count as absent.
fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn alert(value: Value) -> Alert {
        Alert::from_value(value).unwrap()
    }

    #[test]
    fn test_nested_signature_wins_over_top_level() {
        let a = alert(json!({
            "signature": "top",
            "alert": { "signature": "nested" }
        }));
        assert_eq!(a.signature().as_deref(), Some("nested"));
    }

    #[test]
    fn test_top_level_signature_fallback() {
        let a = alert(json!({ "signature": "ET SCAN aggregated" }));
        assert_eq!(a.resolved_signature(), "ET SCAN aggregated");
    }

    #[test]
    fn test_missing_signature_defaults() {
        let a = Alert::default();
        assert_eq!(a.signature(), None);
        assert_eq!(a.resolved_signature(), UNKNOWN_SIGNATURE);
    }

    #[test]
    fn test_empty_strings_count_as_absent() {
        let a = alert(json!({ "event_type": "", "src_ip": "   " }));
        assert_eq!(a.event_type(), None);
        assert_eq!(a.src_ip(), None);
    }

    #[test]
    fn test_numbers_render_as_text() {
        let a = alert(json!({ "dest_port": 22, "alert": { "severity": 2 } }));
        assert_eq!(a.dest_port().as_deref(), Some("22"));
        assert_eq!(a.severity().as_deref(), Some("2"));
        assert_eq!(a.severity_level(), Some(2));
        assert_eq!(a.dest_port_number(), Some(22));
    }

    #[test]
    fn test_non_scalar_fields_are_ignored() {
        let a = alert(json!({ "src_ip": ["10.0.0.1"], "alert": "not-an-object" }));
        assert_eq!(a.src_ip(), None);
        assert_eq!(a.signature(), None);
    }

    #[test]
    fn test_from_value_rejects_non_objects() {
        assert!(Alert::from_value(json!([1, 2, 3])).is_none());
        assert!(Alert::from_value(json!("alert")).is_none());
    }
}
