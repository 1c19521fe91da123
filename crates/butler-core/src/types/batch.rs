//! Batch operation reports

use serde::Serialize;

/// Result of deleting every key matching a pattern.
///
/// `deleted_count` can be lower than `matched_count` when keys expire or are
/// removed between the scan and the delete.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchDeleteReport {
    pub matched_count: usize,
    pub deleted_count: i64,
    pub matched_keys: Vec<String>,
}

/// Result of applying a TTL to every key matching a pattern
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchExpireReport {
    pub matched_count: usize,
    pub affected_count: usize,
    pub matched_keys: Vec<String>,
}

impl BatchDeleteReport {
    pub fn is_empty(&self) -> bool {
        self.matched_keys.is_empty()
    }
}

impl BatchExpireReport {
    pub fn is_empty(&self) -> bool {
        self.matched_keys.is_empty()
    }
}
