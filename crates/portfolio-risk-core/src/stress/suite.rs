use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::debug;

use super::engine::{apply_predefined_scenario, StressTestResult};
use super::factors::StressConfig;
use super::scenarios::PredefinedScenario;
use crate::error::RiskEngineError;
use crate::parallel::maybe_parallel_map;
use crate::portfolio::Portfolio;
use crate::types::{with_metadata, ComputationOutput};
use crate::var::VarConfig;
use crate::RiskEngineResult;

/// Aggregate statistics over a set of stress results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressSuiteSummary {
    pub scenario_count: usize,
    /// Largest percentage loss across the suite
    pub worst_case_loss: f64,
    pub worst_case_scenario: String,
    /// Smallest percentage loss across the suite
    pub best_case_loss: f64,
    pub best_case_scenario: String,
    pub average_loss: f64,
    pub longest_recovery_days: u32,
    pub longest_recovery_scenario: String,
    pub average_recovery_days: f64,
}

/// Every catalog scenario against one portfolio, keyed by scenario key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComprehensiveStressReport {
    pub portfolio_id: String,
    pub results: BTreeMap<String, StressTestResult>,
    pub summary: StressSuiteSummary,
}

/// Run the whole predefined catalog. Scenarios fan out across the rayon
/// pool when the catalog reaches `parallel_threshold`; the summary is only
/// built once every scenario has finished.
pub fn run_comprehensive_suite(
    portfolio: &Portfolio,
    stress: &StressConfig,
    var: &VarConfig,
    parallel_threshold: usize,
) -> RiskEngineResult<ComputationOutput<ComprehensiveStressReport>> {
    let start = Instant::now();
    stress.validate()?;

    let outcomes = maybe_parallel_map(&PredefinedScenario::ALL, parallel_threshold, |s| {
        apply_predefined_scenario(portfolio, *s, stress, var)
    });

    let mut results = BTreeMap::new();
    let mut warnings = Vec::new();
    for outcome in outcomes {
        let out = outcome?;
        for w in out.warnings {
            warnings.push(format!("{}: {}", out.result.scenario_id, w));
        }
        results.insert(out.result.scenario_id.clone(), out.result);
    }

    let summary = summarize(results.values())?;
    debug!(
        portfolio = portfolio.id(),
        scenarios = summary.scenario_count,
        worst = %summary.worst_case_scenario,
        "comprehensive stress suite complete"
    );

    let report = ComprehensiveStressReport {
        portfolio_id: portfolio.id().to_string(),
        results,
        summary,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Comprehensive Stress Suite",
        &serde_json::json!({
            "num_scenarios": PredefinedScenario::ALL.len(),
            "num_positions": portfolio.positions().len(),
            "var_confidence_level": stress.var_confidence_level,
        }),
        warnings,
        elapsed,
        report,
    ))
}

/// Worst/best/average loss and recovery over any set of results.
pub fn summarize<'a, I>(results: I) -> RiskEngineResult<StressSuiteSummary>
where
    I: IntoIterator<Item = &'a StressTestResult>,
{
    let mut iter = results.into_iter();
    let first = iter.next().ok_or_else(|| {
        RiskEngineError::InsufficientData("Cannot summarise an empty set of stress results".into())
    })?;

    let mut summary = StressSuiteSummary {
        scenario_count: 1,
        worst_case_loss: first.percentage_loss,
        worst_case_scenario: first.scenario_id.clone(),
        best_case_loss: first.percentage_loss,
        best_case_scenario: first.scenario_id.clone(),
        average_loss: 0.0,
        longest_recovery_days: first.recovery_time_estimate,
        longest_recovery_scenario: first.scenario_id.clone(),
        average_recovery_days: 0.0,
    };
    let mut loss_total = first.percentage_loss;
    let mut recovery_total = first.recovery_time_estimate as f64;

    for r in iter {
        summary.scenario_count += 1;
        loss_total += r.percentage_loss;
        recovery_total += r.recovery_time_estimate as f64;
        if r.percentage_loss > summary.worst_case_loss {
            summary.worst_case_loss = r.percentage_loss;
            summary.worst_case_scenario = r.scenario_id.clone();
        }
        if r.percentage_loss < summary.best_case_loss {
            summary.best_case_loss = r.percentage_loss;
            summary.best_case_scenario = r.scenario_id.clone();
        }
        if r.recovery_time_estimate > summary.longest_recovery_days {
            summary.longest_recovery_days = r.recovery_time_estimate;
            summary.longest_recovery_scenario = r.scenario_id.clone();
        }
    }

    let n = summary.scenario_count as f64;
    summary.average_loss = loss_total / n;
    summary.average_recovery_days = recovery_total / n;
    Ok(summary)
}
