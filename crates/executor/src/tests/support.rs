//! Scripted connection used by the executor tests.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::{json, Value};

use crate::{Blob, Command, Connection, Error, Record, Responses, Result};

/// One scripted answer from the fake database.
pub enum Reply {
    /// Transaction accepted
    Accept(Value, Vec<Blob>),
    /// Transaction rejected as a whole
    Reject(Value),
    /// Transport error
    Fail(String),
}

/// Connection that replays a script and records what it was sent.
pub struct ScriptedConnection {
    script: VecDeque<Reply>,
    sent: Arc<Mutex<Vec<Vec<Command>>>>,
    last_ok: bool,
}

impl ScriptedConnection {
    pub fn new(script: Vec<Reply>) -> Self {
        Self {
            script: script.into(),
            sent: Arc::new(Mutex::new(Vec::new())),
            last_ok: false,
        }
    }

    pub fn sent(&self) -> Vec<Vec<Command>> {
        self.sent.lock().clone()
    }
}

impl Connection for ScriptedConnection {
    fn send(&mut self, commands: &[Command], _blobs: &[Blob]) -> Result<(Responses, Vec<Blob>)> {
        self.sent.lock().push(commands.to_vec());
        match self.script.pop_front() {
            Some(Reply::Accept(responses, blobs)) => {
                self.last_ok = true;
                Ok((Responses::from(responses), blobs))
            }
            Some(Reply::Reject(responses)) => {
                self.last_ok = false;
                Ok((Responses::from(responses), Vec::new()))
            }
            Some(Reply::Fail(reason)) => {
                self.last_ok = false;
                Err(Error::transport(reason))
            }
            None => Err(Error::transport("script exhausted")),
        }
    }

    fn last_call_succeeded(&self) -> bool {
        self.last_ok
    }

    fn last_call_duration(&self) -> Duration {
        Duration::from_millis(5)
    }

    fn duplicate(&self) -> Result<Self> {
        Ok(Self {
            script: VecDeque::new(),
            sent: Arc::clone(&self.sent),
            last_ok: false,
        })
    }

    fn describe(&self) -> String {
        "scripted".to_string()
    }
}

/// A record of `AddImage{_ref: 1}` followed by `FindImage{blobs: true}`
/// pointing at it, with one input blob.
pub fn image_record(tag: u8) -> Record {
    Record::new(
        vec![
            Command::new("AddImage", json!({"_ref": 1, "properties": {"tag": tag}})),
            Command::new("FindImage", json!({"is_connected_to": {"ref": 1}, "blobs": true})),
        ],
        vec![vec![tag]],
    )
}

/// Per-command responses for `image_record`s with the given match counts.
pub fn image_responses(returned: &[i64]) -> Value {
    Value::Array(
        returned
            .iter()
            .flat_map(|n| {
                [
                    json!({"AddImage": {"status": 0}}),
                    json!({"FindImage": {"status": 0, "returned": n}}),
                ]
            })
            .collect(),
    )
}
