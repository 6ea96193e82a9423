//! Cost estimation and per-user usage accounting for AgentForge.
//!
//! Every completion is logged as a [`UsageRecord`](agentforge_core::UsageRecord)
//! with an estimated USD cost computed from flat per-thousand-token rates.
//! There is no aggregation store; summaries are folded from the log on demand.

pub mod pricing;
pub mod recorder;

pub use pricing::{CostRates, estimate_cost, round_to};
pub use recorder::{UsageRecorder, UsageSummary, summarize};
