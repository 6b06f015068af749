//! Command wrapper over a JSON value
//!
//! A command is a single-key JSON object `{"<Operation>": {<parameters>}}`.
//! A JSON list in command position is an opaque, already-batched
//! sub-transaction and carries no name or body.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Operations whose responses are followed by blobs in the output stream
/// when the request sets `"blobs": true`.
pub const BLOB_RETURNING_COMMANDS: [&str; 5] = [
    "FindImage",
    "FindBlob",
    "FindVideo",
    "FindDescriptor",
    "FindBoundingBox",
];

/// One database command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Command(Value);

impl Command {
    /// Build `{name: body}`.
    pub fn new(name: impl Into<String>, body: Value) -> Self {
        let mut map = Map::with_capacity(1);
        map.insert(name.into(), body);
        Command(Value::Object(map))
    }

    /// True for a list entry (a pre-batched sub-transaction).
    pub fn is_nested(&self) -> bool {
        self.0.is_array()
    }

    /// Operation name, i.e. the first key of the command object.
    pub fn name(&self) -> Option<&str> {
        self.0
            .as_object()
            .and_then(|map| map.keys().next())
            .map(String::as_str)
    }

    /// Parameter object of the operation.
    pub fn body(&self) -> Option<&Map<String, Value>> {
        self.0
            .as_object()
            .and_then(|map| map.values().next())
            .and_then(Value::as_object)
    }

    /// Mutable parameter object of the operation.
    pub fn body_mut(&mut self) -> Option<&mut Map<String, Value>> {
        self.0
            .as_object_mut()
            .and_then(|map| map.values_mut().next())
            .and_then(Value::as_object_mut)
    }

    /// True if this is a retrieval operation that asked for blobs back.
    pub fn returns_blobs(&self) -> bool {
        let Some(name) = self.name() else {
            return false;
        };
        BLOB_RETURNING_COMMANDS.contains(&name)
            && self
                .body()
                .and_then(|body| body.get("blobs"))
                .and_then(Value::as_bool)
                .unwrap_or(false)
    }

    /// Borrow the underlying JSON.
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Consume into the underlying JSON.
    pub fn into_value(self) -> Value {
        self.0
    }
}

impl From<Value> for Command {
    fn from(value: Value) -> Self {
        Command(value)
    }
}
