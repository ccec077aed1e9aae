//! Event records rendered into the metadata surface
//!
//! A record is a JSON object whose first key is the `event` tag, followed by
//! payload fields in the order they were merged. Keys merged later overwrite
//! earlier values in place, which keeps the `event` tag first even when a
//! payload carries its own `event` field.

use serde::Serialize;
use serde_json::{Map, Value};

/// Immutable, JSON-serializable snapshot of an emitted event
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct EventRecord {
    fields: Map<String, Value>,
}

impl EventRecord {
    /// Create a record tagged with `event`
    pub fn new(event: impl Into<String>) -> Self {
        let mut fields = Map::new();
        fields.insert("event".to_string(), Value::String(event.into()));
        Self { fields }
    }

    /// Informational record with a message and the URL it refers to
    pub fn info(message: impl Into<String>, url: &str) -> Self {
        Self::new("INFO")
            .with("message", message.into())
            .with("url", url)
    }

    /// Add a field. Values that fail to serialize become `null`.
    pub fn with(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.fields.insert(key.into(), value);
        self
    }

    /// Spread a payload into the record.
    ///
    /// Object payloads contribute their fields; `null` contributes nothing;
    /// any other value is kept under `data`.
    pub fn merge(mut self, payload: Value) -> Self {
        match payload {
            Value::Object(map) => {
                for (key, value) in map {
                    self.fields.insert(key, value);
                }
            }
            Value::Null => {}
            other => {
                self.fields.insert("data".to_string(), other);
            }
        }
        self
    }

    /// The event tag
    pub fn event(&self) -> Option<&str> {
        self.fields.get("event").and_then(Value::as_str)
    }

    /// Look up a field
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// All fields in insertion order
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Two-space indented JSON, the format shown in the metadata log
    pub fn to_pretty(&self) -> String {
        serde_json::to_string_pretty(&self.fields).unwrap_or_else(|_| "{}".to_string())
    }

    /// Single-line JSON
    pub fn to_compact(&self) -> String {
        serde_json::to_string(&self.fields).unwrap_or_else(|_| "{}".to_string())
    }
}

impl From<EventRecord> for Value {
    fn from(record: EventRecord) -> Self {
        Value::Object(record.fields)
    }
}
