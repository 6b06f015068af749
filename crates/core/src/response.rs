//! Responses returned by the database for one batch
//!
//! A successful transport call returns a JSON array with one object per
//! command, positionally matching the request. A rejected transaction may
//! instead return a single status object for the whole batch. Anything else
//! is malformed and the executor treats it as a transaction failure.

use std::ops::Range;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Response to one command: `{"<Operation>": {"status": s, ...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandResponse(Value);

impl CommandResponse {
    /// Status codes reported by every entry of this response.
    ///
    /// `None` marks an entry that carries no integer status.
    pub fn statuses(&self) -> Vec<Option<i64>> {
        match &self.0 {
            Value::Object(map) => map
                .values()
                .map(|entry| entry.get("status").and_then(Value::as_i64))
                .collect(),
            _ => vec![None],
        }
    }

    /// Status of the first entry, if any.
    pub fn status(&self) -> Option<i64> {
        self.statuses().into_iter().next().flatten()
    }

    /// True if every entry reports exactly `status`.
    pub fn all_status(&self, status: i64) -> bool {
        self.statuses().iter().all(|s| *s == Some(status))
    }

    /// Number of matched items reported for `operation`.
    pub fn returned(&self, operation: &str) -> Option<i64> {
        self.0
            .get(operation)
            .and_then(|entry| entry.get("returned"))
            .and_then(Value::as_i64)
    }

    /// Borrow the underlying JSON.
    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

impl From<Value> for CommandResponse {
    fn from(value: Value) -> Self {
        CommandResponse(value)
    }
}

/// Everything the database answered for a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Responses {
    /// One response per command
    PerCommand(Vec<CommandResponse>),
    /// A single status object covering the whole transaction
    Whole(Map<String, Value>),
    /// Anything the engine does not understand
    Malformed(Value),
}

impl Responses {
    /// Per-command responses, if the database returned them.
    pub fn per_command(&self) -> Option<&[CommandResponse]> {
        match self {
            Responses::PerCommand(list) => Some(list.as_slice()),
            _ => None,
        }
    }

    /// Status of a whole-transaction response.
    pub fn whole_status(&self) -> Option<i64> {
        match self {
            Responses::Whole(map) => map.get("status").and_then(Value::as_i64),
            _ => None,
        }
    }

    /// View of the responses belonging to `range` of commands.
    ///
    /// Per-command responses are clamped to what the database returned;
    /// other shapes are passed through unsliced.
    pub fn slice(&self, range: Range<usize>) -> ResponseSlice<'_> {
        match self {
            Responses::PerCommand(list) => {
                let end = range.end.min(list.len());
                let start = range.start.min(end);
                ResponseSlice::PerCommand(&list[start..end])
            }
            Responses::Whole(map) => ResponseSlice::Whole(map),
            Responses::Malformed(value) => ResponseSlice::Malformed(value),
        }
    }
}

impl From<Value> for Responses {
    fn from(value: Value) -> Self {
        match value {
            Value::Array(list) => {
                Responses::PerCommand(list.into_iter().map(CommandResponse).collect())
            }
            Value::Object(map) => Responses::Whole(map),
            other => Responses::Malformed(other),
        }
    }
}

/// Borrowed slice of [`Responses`] for one group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResponseSlice<'a> {
    /// Responses for the group's commands
    PerCommand(&'a [CommandResponse]),
    /// The batch-wide status object
    Whole(&'a Map<String, Value>),
    /// Unrecognised response
    Malformed(&'a Value),
}

impl<'a> ResponseSlice<'a> {
    /// Per-command responses of the group, if available.
    pub fn per_command(&self) -> Option<&'a [CommandResponse]> {
        match *self {
            ResponseSlice::PerCommand(list) => Some(list),
            _ => None,
        }
    }
}
