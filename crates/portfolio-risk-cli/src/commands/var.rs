use clap::Args;
use serde_json::Value;

use portfolio_risk_core::engine::RiskEngine;
use portfolio_risk_core::portfolio::Portfolio;
use portfolio_risk_core::var::VaRMethod;

use super::StoreArgs;
use crate::input;

/// Arguments for a single VaR computation
#[derive(Args)]
pub struct VarArgs {
    /// Path to portfolio JSON file
    #[arg(long)]
    pub input: Option<String>,

    /// historical, parametric, monte_carlo or hybrid
    #[arg(long, default_value = "historical")]
    pub method: String,

    /// Confidence level in (0, 1)
    #[arg(long, default_value_t = 0.95)]
    pub confidence: f64,

    /// Horizon in trading days
    #[arg(long, default_value_t = 1)]
    pub horizon: u32,

    #[command(flatten)]
    pub store: StoreArgs,
}

/// Arguments for the method x confidence x horizon grid
#[derive(Args)]
pub struct VarScenariosArgs {
    /// Path to portfolio JSON file
    #[arg(long)]
    pub input: Option<String>,

    /// Comma-separated confidence levels
    #[arg(long, value_delimiter = ',', default_value = "0.95,0.99")]
    pub confidence: Vec<f64>,

    /// Comma-separated horizons in trading days
    #[arg(long, value_delimiter = ',', default_value = "1,10")]
    pub horizon: Vec<u32>,
}

/// Arguments for VaR backtesting
#[derive(Args)]
pub struct BacktestArgs {
    /// Path to portfolio JSON file
    #[arg(long)]
    pub input: Option<String>,

    #[arg(long, default_value = "historical")]
    pub method: String,

    #[arg(long, default_value_t = 0.99)]
    pub confidence: f64,
}

pub fn run_var(engine: &RiskEngine, args: VarArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let portfolio: Portfolio = input::read_input(args.input.as_deref(), "VaR")?;
    let method: VaRMethod = args.method.parse()?;

    let out = match args.store.open()? {
        Some(store) => {
            engine
                .compute_and_store_var(&store, &args.store.tenant, &portfolio, method, args.confidence, args.horizon)?
                .0
        }
        None => engine.compute_var(&portfolio, method, args.confidence, args.horizon)?,
    };
    Ok(serde_json::to_value(out)?)
}

pub fn run_var_scenarios(
    engine: &RiskEngine,
    args: VarScenariosArgs,
) -> Result<Value, Box<dyn std::error::Error>> {
    let portfolio: Portfolio = input::read_input(args.input.as_deref(), "VaR scenarios")?;
    let out = engine.compute_var_scenarios(&portfolio, &args.confidence, &args.horizon)?;
    Ok(serde_json::to_value(out)?)
}

pub fn run_backtest(engine: &RiskEngine, args: BacktestArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let portfolio: Portfolio = input::read_input(args.input.as_deref(), "backtesting")?;
    let var = engine
        .compute_var_named(&portfolio, &args.method, args.confidence, 1)?
        .result;
    let out = engine.backtest(&portfolio, &var)?;
    Ok(serde_json::to_value(out)?)
}
