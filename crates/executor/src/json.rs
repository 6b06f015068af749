//! Lazy JSON rendering for log fields.
//!
//! Batches can be large, so request and response bodies are only serialized
//! when a subscriber actually formats the event.

use std::fmt;

use serde::Serialize;

/// Formats the wrapped value as compact JSON when displayed.
pub struct JsonDisplay<'a, T: ?Sized>(pub &'a T);

impl<T: Serialize + ?Sized> fmt::Display for JsonDisplay<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self.0) {
            Ok(s) => f.write_str(&s),
            Err(e) => write!(f, "<unserializable: {}>", e),
        }
    }
}
