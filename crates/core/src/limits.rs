//! Bounds on reference numbering inside a batch.

/// Exclusive upper bound for an assembled `_ref` value.
///
/// The server reserves refs at or above this value, so a batch whose
/// renumbering reaches it cannot be sent.
pub const MAX_REF: usize = 100_000;

/// Returns true if `position` is a usable absolute ref.
pub fn ref_in_range(position: usize) -> bool {
    position >= 1 && position < MAX_REF
}
