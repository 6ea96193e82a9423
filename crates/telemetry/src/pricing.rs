//! Flat per-thousand-token cost rates.
//!
//! Costs are estimates in USD and are rounded to 6 decimal places, so the
//! values written to the usage log stay short and comparable.

use agentforge_config::PricingConfig;
use serde::{Deserialize, Serialize};

/// Decimal places kept by [`estimate_cost`].
pub const COST_DECIMALS: u32 = 6;

/// USD per 1,000 tokens, split by direction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostRates {
    pub input_per_thousand: f64,
    pub output_per_thousand: f64,
}

impl CostRates {
    pub const fn new(input_per_thousand: f64, output_per_thousand: f64) -> Self {
        Self {
            input_per_thousand,
            output_per_thousand,
        }
    }
}

impl Default for CostRates {
    fn default() -> Self {
        Self::new(0.005, 0.015)
    }
}

impl From<&PricingConfig> for CostRates {
    fn from(config: &PricingConfig) -> Self {
        Self::new(config.input_per_thousand, config.output_per_thousand)
    }
}

/// `(in/1000)·input_rate + (out/1000)·output_rate`, rounded to 6 places.
pub fn estimate_cost(tokens_input: u32, tokens_output: u32, rates: &CostRates) -> f64 {
    let input_cost = (f64::from(tokens_input) / 1000.0) * rates.input_per_thousand;
    let output_cost = (f64::from(tokens_output) / 1000.0) * rates.output_per_thousand;
    round_to(input_cost + output_cost, COST_DECIMALS)
}

/// Round half away from zero to `places` decimals.
pub fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}
