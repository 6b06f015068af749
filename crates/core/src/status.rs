//! Success-status set used to classify command responses

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Status meaning the command succeeded.
pub const STATUS_OK: i64 = 0;

/// Status meaning the object already existed (conditional add matched).
pub const STATUS_EXISTS: i64 = 2;

/// Status codes that count as success for a command.
///
/// The default is `{0, 2}`. The set is a plain value owned by the run
/// configuration, so two runs in one process may use different sets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SuccessStatuses(BTreeSet<i64>);

impl SuccessStatuses {
    /// Build a set from any list of codes.
    pub fn new(codes: impl IntoIterator<Item = i64>) -> Self {
        Self(codes.into_iter().collect())
    }

    /// True if `status` counts as success. A missing status never does.
    pub fn contains(&self, status: Option<i64>) -> bool {
        status.map_or(false, |s| self.0.contains(&s))
    }

    /// Number of codes in the set.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if no code counts as success.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate the codes in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = i64> + '_ {
        self.0.iter().copied()
    }
}

impl Default for SuccessStatuses {
    fn default() -> Self {
        Self::new([STATUS_OK, STATUS_EXISTS])
    }
}
