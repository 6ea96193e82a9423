//! `agentforge estimate`: cost of a token count at the configured rates.

use agentforge_config::AppConfig;
use agentforge_telemetry::{CostRates, estimate_cost};

pub fn run(tokens_input: u32, tokens_output: u32) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    let rates = CostRates::from(&config.pricing);
    let cost = estimate_cost(tokens_input, tokens_output, &rates);

    println!(
        "{tokens_input} input + {tokens_output} output tokens = ${cost:.6}  (rates: ${}/1k in, ${}/1k out)",
        rates.input_per_thousand, rates.output_per_thousand
    );

    Ok(())
}
