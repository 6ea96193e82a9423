//! Usage records: append-only token/cost accounting entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One accounting entry for a single completion.
///
/// Records have no identity beyond their position in the log and are never
/// mutated or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageRecord {
    pub user_id: String,
    pub tokens_input: u32,
    pub tokens_output: u32,
    /// Cost in USD
    pub cost: f64,
    pub timestamp: DateTime<Utc>,
}

impl UsageRecord {
    /// Create a record stamped with the current instant.
    pub fn new(user_id: impl Into<String>, tokens_input: u32, tokens_output: u32, cost: f64) -> Self {
        Self {
            user_id: user_id.into(),
            tokens_input,
            tokens_output,
            cost,
            timestamp: Utc::now(),
        }
    }

    pub fn total_tokens(&self) -> u64 {
        u64::from(self.tokens_input) + u64::from(self.tokens_output)
    }
}
