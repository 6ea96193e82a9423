//! Usage recorder: estimates cost and appends records to the usage log.

use std::sync::Arc;

use agentforge_core::error::Result;
use agentforge_core::store::UsageLog;
use agentforge_core::usage::UsageRecord;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::pricing::{COST_DECIMALS, CostRates, estimate_cost, round_to};

/// Aggregate usage for one user.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSummary {
    pub user_id: String,
    pub requests: usize,
    pub total_tokens_input: u64,
    pub total_tokens_output: u64,
    pub total_cost: f64,
    pub last_recorded_at: Option<DateTime<Utc>>,
}

pub struct UsageRecorder {
    log: Arc<dyn UsageLog>,
    rates: CostRates,
}

impl UsageRecorder {
    pub fn new(log: Arc<dyn UsageLog>) -> Self {
        Self {
            log,
            rates: CostRates::default(),
        }
    }

    pub fn with_rates(mut self, rates: CostRates) -> Self {
        self.rates = rates;
        self
    }

    pub fn rates(&self) -> CostRates {
        self.rates
    }

    /// Cost estimate with this recorder's rates.
    pub fn estimate_cost(&self, tokens_input: u32, tokens_output: u32) -> f64 {
        estimate_cost(tokens_input, tokens_output, &self.rates)
    }

    /// Append a record stamped now. Without an explicit `cost` it is estimated.
    pub async fn record_usage(
        &self,
        user_id: &str,
        tokens_input: u32,
        tokens_output: u32,
        cost: Option<f64>,
    ) -> Result<UsageRecord> {
        let cost = cost.unwrap_or_else(|| self.estimate_cost(tokens_input, tokens_output));
        let record = UsageRecord::new(user_id, tokens_input, tokens_output, cost);
        self.log.append(record.clone()).await?;
        debug!(user_id, tokens_input, tokens_output, cost, "Usage recorded");
        Ok(record)
    }

    /// All records for `user_id`, in append order.
    pub async fn usage_by_user(&self, user_id: &str) -> Result<Vec<UsageRecord>> {
        Ok(self.log.list_by_user(user_id).await?)
    }

    pub async fn summary_for_user(&self, user_id: &str) -> Result<UsageSummary> {
        let records = self.usage_by_user(user_id).await?;
        Ok(summarize(user_id, &records))
    }
}

/// Fold records into totals. Cost is re-rounded to avoid float drift.
pub fn summarize(user_id: &str, records: &[UsageRecord]) -> UsageSummary {
    let total_cost: f64 = records.iter().map(|r| r.cost).sum();
    UsageSummary {
        user_id: user_id.to_string(),
        requests: records.len(),
        total_tokens_input: records.iter().map(|r| u64::from(r.tokens_input)).sum(),
        total_tokens_output: records.iter().map(|r| u64::from(r.tokens_output)).sum(),
        total_cost: round_to(total_cost, COST_DECIMALS),
        last_recorded_at: records.iter().map(|r| r.timestamp).max(),
    }
}
