//! `agentforge usage`: a user's recorded token usage and cost.

use std::sync::Arc;

use agentforge_config::AppConfig;
use agentforge_store::FileUsageLog;
use agentforge_telemetry::{CostRates, UsageRecorder, summarize};

pub async fn run(user_id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    let recorder = UsageRecorder::new(Arc::new(FileUsageLog::new(config.usage_path())))
        .with_rates(CostRates::from(&config.pricing));

    let records = recorder.usage_by_user(user_id).await?;
    let summary = summarize(user_id, &records);

    println!("Usage for {user_id}");
    println!("─────────────────────────────────────────────────────");

    if records.is_empty() {
        println!("  No usage recorded.");
        return Ok(());
    }

    println!(
        "{:<28} {:>10} {:>10} {:>12}",
        "Timestamp", "Input", "Output", "Cost (USD)"
    );
    for r in &records {
        println!(
            "{:<28} {:>10} {:>10} {:>12.6}",
            r.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            r.tokens_input,
            r.tokens_output,
            r.cost
        );
    }

    println!();
    println!("  Requests:      {}", summary.requests);
    println!("  Input tokens:  {}", summary.total_tokens_input);
    println!("  Output tokens: {}", summary.total_tokens_output);
    println!("  Total cost:    ${:.6}", summary.total_cost);

    Ok(())
}
