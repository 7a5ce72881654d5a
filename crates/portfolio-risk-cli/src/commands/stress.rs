use clap::Args;
use serde_json::Value;

use portfolio_risk_core::engine::{RiskEngine, ScenarioRef};
use portfolio_risk_core::portfolio::Portfolio;
use portfolio_risk_core::stress::{CustomScenario, PredefinedScenario};

use super::StoreArgs;
use crate::input;

/// Arguments for a predefined scenario
#[derive(Args)]
pub struct StressArgs {
    /// Path to portfolio JSON file
    #[arg(long)]
    pub input: Option<String>,

    /// Scenario key, e.g. financial_crisis_2008 (see `prisk scenarios`)
    #[arg(long)]
    pub scenario: String,

    #[command(flatten)]
    pub store: StoreArgs,
}

/// Arguments for a custom scenario
#[derive(Args)]
pub struct StressCustomArgs {
    /// Path to portfolio JSON file
    #[arg(long)]
    pub input: Option<String>,

    /// Path to scenario JSON file
    #[arg(long)]
    pub scenario: String,

    #[command(flatten)]
    pub store: StoreArgs,
}

/// Arguments for the full scenario suite
#[derive(Args)]
pub struct StressSuiteArgs {
    /// Path to portfolio JSON file
    #[arg(long)]
    pub input: Option<String>,

    /// Print only the summary instead of every scenario result
    #[arg(long)]
    pub summary_only: bool,
}

pub fn run_stress(engine: &RiskEngine, args: StressArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let scenario: PredefinedScenario = args.scenario.parse()?;
    let portfolio: Portfolio = input::read_input(args.input.as_deref(), "stress testing")?;
    apply(engine, &portfolio, ScenarioRef::Predefined(scenario), &args.store)
}

pub fn run_stress_custom(
    engine: &RiskEngine,
    args: StressCustomArgs,
) -> Result<Value, Box<dyn std::error::Error>> {
    let scenario: CustomScenario = input::read_input(Some(args.scenario.as_str()), "custom scenario")?;
    let portfolio: Portfolio = input::read_input(args.input.as_deref(), "stress testing")?;
    apply(engine, &portfolio, ScenarioRef::Custom(&scenario), &args.store)
}

fn apply(
    engine: &RiskEngine,
    portfolio: &Portfolio,
    scenario: ScenarioRef<'_>,
    store: &StoreArgs,
) -> Result<Value, Box<dyn std::error::Error>> {
    let out = match store.open()? {
        Some(backend) => {
            engine
                .apply_and_store_scenario(&backend, &store.tenant, portfolio, scenario)?
                .0
        }
        None => engine.apply_scenario(portfolio, scenario)?,
    };
    Ok(serde_json::to_value(out)?)
}

pub fn run_stress_suite(
    engine: &RiskEngine,
    args: StressSuiteArgs,
) -> Result<Value, Box<dyn std::error::Error>> {
    let portfolio: Portfolio = input::read_input(args.input.as_deref(), "stress suite")?;
    let out = engine.run_comprehensive_suite(&portfolio)?;
    if args.summary_only {
        return Ok(serde_json::json!({
            "result": out.result.summary,
            "warnings": out.warnings,
            "methodology": out.methodology,
        }));
    }
    Ok(serde_json::to_value(out)?)
}

pub fn run_list_scenarios(engine: &RiskEngine) -> Result<Value, Box<dyn std::error::Error>> {
    let catalog = engine.list_scenarios();
    let rows: Vec<Value> = catalog
        .predefined
        .iter()
        .map(|d| {
            serde_json::json!({
                "key": d.key,
                "name": d.name,
                "severity": d.severity,
                "duration_days": d.duration_days,
                "description": d.description,
            })
        })
        .collect();
    Ok(serde_json::json!({
        "results": rows,
        "severity_levels": catalog.severity_levels,
    }))
}
