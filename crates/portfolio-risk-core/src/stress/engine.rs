use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, warn};

use super::factors::StressConfig;
use super::scenarios::{CustomScenario, PredefinedScenario, Severity};
use crate::portfolio::returns::annualise_volatility;
use crate::portfolio::{CorrelationMatrix, Portfolio};
use crate::types::{money_to_f64, to_money, with_metadata, ComputationOutput, Money};
use crate::var::{parametric_kernel, ParametricInputs, VarConfig};
use crate::RiskEngineResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Outcome of applying one scenario to one portfolio.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressTestResult {
    pub scenario_id: String,
    pub portfolio_id: String,
    pub scenario_name: String,
    pub severity: Severity,
    pub pre_stress_value: Money,
    pub post_stress_value: Money,
    /// max(0, pre - post)
    pub absolute_loss: Money,
    /// absolute_loss / pre_stress_value x 100
    pub percentage_loss: f64,
    /// Stressed minus baseline parametric VaR
    pub var_impact: Money,
    /// Stressed minus baseline parametric ES
    pub expected_shortfall_impact: Money,
    /// Heuristic in [0, 1]
    pub liquidity_impact: f64,
    pub recovery_time_estimate: u32,
    /// Per-symbol pre minus post value; negative for positions that gain
    pub component_losses: BTreeMap<String, Money>,
    pub risk_metrics: BTreeMap<String, f64>,
    pub calculated_at: DateTime<Utc>,
}

/// Scenario contents in the shape the engine consumes, whatever the source.
struct ShockSet<'a> {
    id: String,
    name: String,
    severity: Severity,
    market_factors: &'a BTreeMap<String, f64>,
    volatility_factors: &'a BTreeMap<String, f64>,
    correlations: Option<&'a CorrelationMatrix>,
    duration_days: u32,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Apply a catalog scenario.
pub fn apply_predefined_scenario(
    portfolio: &Portfolio,
    scenario: PredefinedScenario,
    stress: &StressConfig,
    var: &VarConfig,
) -> RiskEngineResult<ComputationOutput<StressTestResult>> {
    let start = Instant::now();
    stress.validate()?;

    let def = scenario.definition();
    let shocks = ShockSet {
        id: def.key.clone(),
        name: def.name.clone(),
        severity: def.severity,
        market_factors: &def.market_factors,
        volatility_factors: &def.volatility_factors,
        correlations: None,
        duration_days: def.duration_days,
    };
    let (result, warnings) = run_scenario(portfolio, &shocks, stress, var)?;

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Deterministic Factor Stress Test",
        &stress_assumptions(&shocks, stress),
        warnings,
        elapsed,
        result,
    ))
}

/// Apply a user-defined scenario. Empty or malformed factor maps are
/// rejected with `InvalidScenario`.
pub fn apply_custom_scenario(
    portfolio: &Portfolio,
    scenario: &CustomScenario,
    stress: &StressConfig,
    var: &VarConfig,
) -> RiskEngineResult<ComputationOutput<StressTestResult>> {
    let start = Instant::now();
    scenario.validate()?;
    stress.validate()?;

    let shocks = ShockSet {
        id: scenario.scenario_id(),
        name: scenario.name.clone(),
        severity: scenario.effective_severity(),
        market_factors: &scenario.market_factors,
        volatility_factors: &scenario.volatility_factors,
        correlations: scenario.correlation_matrix.as_ref(),
        duration_days: scenario.duration_days,
    };
    let (result, warnings) = run_scenario(portfolio, &shocks, stress, var)?;

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Deterministic Factor Stress Test (custom scenario)",
        &stress_assumptions(&shocks, stress),
        warnings,
        elapsed,
        result,
    ))
}

// ---------------------------------------------------------------------------
// Internal logic
// ---------------------------------------------------------------------------

fn run_scenario(
    portfolio: &Portfolio,
    shocks: &ShockSet<'_>,
    stress: &StressConfig,
    var: &VarConfig,
) -> RiskEngineResult<(StressTestResult, Vec<String>)> {
    let mapping = &stress.factor_mapping;
    let positions = portfolio.positions();
    let mut warnings = Vec::new();

    let mut post_values: Vec<Money> = Vec::with_capacity(positions.len());
    let mut vol_multipliers: Vec<f64> = Vec::with_capacity(positions.len());
    let mut component_losses = BTreeMap::new();
    let mut max_position_loss_pct: f64 = 0.0;
    let mut hit_factors: Vec<&str> = Vec::new();

    for pos in positions {
        let exposures = mapping.exposures(pos);

        let mut price_move = 0.0;
        let mut mult_num = 0.0;
        let mut mult_den = 0.0;
        for (factor, sensitivity) in &exposures {
            if let Some((name, shock)) = shocks.market_factors.get_key_value(factor) {
                price_move += sensitivity * shock;
                if !hit_factors.contains(&name.as_str()) {
                    hit_factors.push(name.as_str());
                }
            }
            let mult = shocks.volatility_factors.get(factor).copied().unwrap_or(1.0);
            mult_num += sensitivity.abs() * mult;
            mult_den += sensitivity.abs();
        }
        vol_multipliers.push(if mult_den > 0.0 { mult_num / mult_den } else { 1.0 });

        let factor = to_money(1.0 + price_move, "price_shock")?;
        let shocked_price = (pos.current_price * factor).max(Decimal::ZERO);
        let post_value = pos.quantity * shocked_price;
        component_losses.insert(pos.symbol.clone(), pos.market_value - post_value);
        max_position_loss_pct = max_position_loss_pct.max(-price_move * 100.0);
        post_values.push(post_value);
    }

    for factor in shocks.market_factors.keys() {
        if !hit_factors.contains(&factor.as_str()) {
            warnings.push(format!("Factor '{factor}' is not mapped to any position"));
        }
    }

    let pre_stress_value = portfolio.total_value();
    let post_stress_value: Money = post_values.iter().copied().sum();
    let absolute_loss = (pre_stress_value - post_stress_value).max(Decimal::ZERO);
    let percentage_loss = money_to_f64(absolute_loss / pre_stress_value * Decimal::ONE_HUNDRED);
    if post_stress_value.is_zero() {
        warn!(portfolio = portfolio.id(), scenario = %shocks.id, "scenario wipes out portfolio value");
        warnings.push("Post-stress portfolio value is zero".into());
    }

    // Liquidity and recovery heuristics
    let average_factor_shock = if shocks.market_factors.is_empty() {
        0.0
    } else {
        shocks.market_factors.values().map(|s| s.abs()).sum::<f64>()
            / shocks.market_factors.len() as f64
    };
    let liquidity_impact = (shocks.severity.liquidity_weight() * average_factor_shock).min(1.0);
    let recovery_time_estimate = (shocks.severity.base_recovery_days() as f64
        * (1.0 + percentage_loss / 100.0))
        .ceil() as u32;

    // VaR impact: parametric kernel before and after the shock
    let merged;
    let stressed_correlations = match (portfolio.correlations(), shocks.correlations) {
        (Some(base), Some(over)) => {
            merged = base.overlaid_with(over);
            Some(&merged)
        }
        (None, Some(over)) => Some(over),
        (base, None) => base,
    };

    let symbols: Vec<&str> = portfolio.symbols();
    let daily_vols: Vec<f64> = positions.iter().map(|p| p.daily_volatility()).collect();
    let baseline = parametric_kernel(
        &ParametricInputs {
            symbols: symbols.clone(),
            weights: portfolio.weights(),
            daily_vols: daily_vols.clone(),
            correlations: portfolio.correlations(),
            default_correlation: var.default_correlation,
        },
        stress.var_confidence_level,
        1,
    )?;

    let post_f64 = money_to_f64(post_stress_value);
    let stressed_weights: Vec<f64> = post_values
        .iter()
        .map(|v| if post_f64 > 0.0 { money_to_f64(*v) / post_f64 } else { 0.0 })
        .collect();
    let stressed_vols: Vec<f64> = daily_vols
        .iter()
        .zip(vol_multipliers.iter())
        .map(|(v, m)| v * m)
        .collect();
    let stressed = parametric_kernel(
        &ParametricInputs {
            symbols,
            weights: stressed_weights,
            daily_vols: stressed_vols,
            correlations: stressed_correlations,
            default_correlation: var.default_correlation,
        },
        stress.var_confidence_level,
        1,
    )?;

    let pre_f64 = portfolio.total_value_f64();
    let baseline_var = baseline.var_loss * pre_f64;
    let baseline_es = baseline.es_loss.max(baseline.var_loss) * pre_f64;
    let stressed_var = stressed.var_loss * post_f64;
    let stressed_es = stressed.es_loss.max(stressed.var_loss) * post_f64;

    let mut risk_metrics = BTreeMap::new();
    risk_metrics.insert("baseline_var".to_string(), baseline_var);
    risk_metrics.insert("stressed_var".to_string(), stressed_var);
    risk_metrics.insert("baseline_expected_shortfall".to_string(), baseline_es);
    risk_metrics.insert("stressed_expected_shortfall".to_string(), stressed_es);
    risk_metrics.insert(
        "baseline_volatility".to_string(),
        annualise_volatility(baseline.daily_volatility),
    );
    risk_metrics.insert(
        "stressed_volatility".to_string(),
        annualise_volatility(stressed.daily_volatility),
    );
    risk_metrics.insert("average_factor_shock".to_string(), average_factor_shock);
    risk_metrics.insert("max_position_loss_pct".to_string(), max_position_loss_pct);
    risk_metrics.insert("duration_days".to_string(), shocks.duration_days as f64);
    risk_metrics.insert("var_confidence_level".to_string(), stress.var_confidence_level);

    debug!(
        portfolio = portfolio.id(),
        scenario = %shocks.id,
        percentage_loss,
        "stress scenario applied"
    );

    let result = StressTestResult {
        scenario_id: shocks.id.clone(),
        portfolio_id: portfolio.id().to_string(),
        scenario_name: shocks.name.clone(),
        severity: shocks.severity,
        pre_stress_value,
        post_stress_value,
        absolute_loss,
        percentage_loss,
        var_impact: to_money(stressed_var - baseline_var, "var_impact")?,
        expected_shortfall_impact: to_money(stressed_es - baseline_es, "expected_shortfall_impact")?,
        liquidity_impact,
        recovery_time_estimate,
        component_losses,
        risk_metrics,
        calculated_at: Utc::now(),
    };
    Ok((result, warnings))
}

fn stress_assumptions(shocks: &ShockSet<'_>, stress: &StressConfig) -> serde_json::Value {
    serde_json::json!({
        "scenario": shocks.id,
        "severity": shocks.severity.as_str(),
        "market_factors": shocks.market_factors,
        "volatility_factors": shocks.volatility_factors,
        "correlation_override": shocks.correlations.is_some(),
        "default_factor": stress.factor_mapping.default_factor,
        "beta_scaling": stress.factor_mapping.beta_scaling,
        "var_confidence_level": stress.var_confidence_level,
        "var_horizon_days": 1,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
