use clap::Args;
use serde_json::Value;

use portfolio_risk_core::store::{summarize_history, JsonLinesStore, ResultStore};

/// Arguments for reading stored results
#[derive(Args)]
pub struct HistoryArgs {
    /// JSON lines history file
    #[arg(long)]
    pub store: String,

    #[arg(long, default_value = "default")]
    pub tenant: String,

    /// Limit to one portfolio
    #[arg(long)]
    pub portfolio: Option<String>,

    /// Look-back window in days
    #[arg(long, default_value_t = 30)]
    pub since_days: u32,

    /// Aggregate the history instead of listing records
    #[arg(long)]
    pub summary: bool,
}

pub fn run_history(args: HistoryArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let store = JsonLinesStore::open(&args.store)?;
    let records = store.fetch_history(&args.tenant, args.portfolio.as_deref(), args.since_days)?;
    if args.summary {
        return Ok(serde_json::json!({ "result": summarize_history(&records) }));
    }

    let rows: Vec<Value> = records
        .iter()
        .map(|r| {
            serde_json::json!({
                "stored_at": r.stored_at,
                "produced_at": r.record.produced_at(),
                "kind": r.record.kind(),
                "portfolio_id": r.record.portfolio_id(),
                "record": r.record,
            })
        })
        .collect();
    Ok(serde_json::json!({ "results": rows }))
}
