//! Batch assembly: merge records into one transaction.
//!
//! Each record numbers its refs locally, starting wherever it likes. Once
//! records are concatenated the refs have to be unique across the whole
//! transaction, so every command that defines a `_ref` gets its own 1-based
//! position as the new value, and every pointer field is rewritten through
//! the local-to-absolute table built so far.
//!
//! ```text
//! record A: AddImage{_ref:1}  AddBoundingBox{image_ref:1}
//! record B: AddImage{_ref:1}  AddBoundingBox{image_ref:1}
//!
//! batch:    AddImage{_ref:1}  AddBoundingBox{image_ref:1}
//!           AddImage{_ref:3}  AddBoundingBox{image_ref:3}
//! ```
//!
//! Pointers may only look backwards. A record that reuses a local ref value
//! shadows the earlier mapping, which is what makes the example above work.

use std::collections::HashMap;

use parquery_core::{limits, Batch, Command, Error, Record, Result, MAX_REF};
use serde_json::{Map, Value};
use tracing::debug;

/// Pointer fields holding a ref directly in the command body.
const DIRECT_POINTERS: [&str; 5] = ["image_ref", "video_ref", "src", "dst", "ref"];

/// Merge `records` into one batch with transaction-wide refs.
///
/// Records are cloned; the caller's data is left as it was.
pub fn assemble_batch(records: &[Record]) -> Result<Batch> {
    let mut commands: Vec<Command> = records
        .iter()
        .flat_map(|record| record.commands.iter().cloned())
        .collect();
    let blobs = records
        .iter()
        .flat_map(|record| record.blobs.iter().cloned())
        .collect();

    renumber_refs(&mut commands)?;

    Ok(Batch {
        commands,
        blobs,
        records: records.len(),
    })
}

/// Rewrite refs in place so they are unique across `commands`.
///
/// A nested (list) command stops renumbering for itself and everything
/// after it: its contents are opaque and later pointers may reference refs
/// it defines.
pub fn renumber_refs(commands: &mut [Command]) -> Result<()> {
    let mut remap = RefTable::default();

    for (i, command) in commands.iter_mut().enumerate() {
        let position = i + 1;
        if command.is_nested() {
            debug!(
                target: "parquery::assembler",
                position,
                "Nested command in batch, refs after it are left unchanged"
            );
            break;
        }
        let Some(body) = command.body_mut() else {
            continue;
        };
        remap.rewrite_command(body, position)?;
    }
    Ok(())
}

/// Local ref value to absolute position.
#[derive(Default)]
struct RefTable {
    positions: HashMap<i64, usize>,
}

impl RefTable {
    fn rewrite_command(&mut self, body: &mut Map<String, Value>, position: usize) -> Result<()> {
        if let Some(slot) = body.get_mut("_ref") {
            let local = ref_value("_ref", slot)?;
            if !limits::ref_in_range(position) {
                return Err(Error::RefLimitExceeded {
                    position,
                    limit: MAX_REF,
                });
            }
            self.positions.insert(local, position);
            *slot = Value::from(position);
        }

        for field in &DIRECT_POINTERS[..2] {
            self.resolve(body.get_mut(*field), field, position)?;
        }

        if let Some(Value::Object(target)) = body.get_mut("is_connected_to") {
            self.resolve(target.get_mut("ref"), "is_connected_to.ref", position)?;
            for op in ["any", "all"] {
                let Some(Value::Array(items)) = target.get_mut(op) else {
                    continue;
                };
                for (idx, item) in items.iter_mut().enumerate() {
                    if let Some(item) = item.as_object_mut() {
                        let field = format!("is_connected_to.{}[{}].ref", op, idx);
                        self.resolve(item.get_mut("ref"), &field, position)?;
                    }
                }
            }
        }

        if let Some(Value::Object(connect)) = body.get_mut("connect") {
            self.resolve(connect.get_mut("ref"), "connect.ref", position)?;
        }

        for field in &DIRECT_POINTERS[2..] {
            self.resolve(body.get_mut(*field), field, position)?;
        }
        Ok(())
    }

    fn resolve(&self, slot: Option<&mut Value>, field: &str, position: usize) -> Result<()> {
        let Some(slot) = slot else {
            return Ok(());
        };
        let local = ref_value(field, slot)?;
        let absolute = self
            .positions
            .get(&local)
            .copied()
            .ok_or_else(|| Error::RefResolution {
                field: field.to_string(),
                reference: local,
                position,
            })?;
        *slot = Value::from(absolute);
        Ok(())
    }
}

fn ref_value(field: &str, value: &Value) -> Result<i64> {
    value
        .as_i64()
        .ok_or_else(|| Error::InvalidRef {
            field: field.to_string(),
            value: value.to_string(),
        })
}
