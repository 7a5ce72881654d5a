use std::time::Instant;
use tracing::warn;

use super::tail::{scaled_loss, tail_returns};
use super::{
    assumptions, build_result, history_quality, validate_parameters, VaRMethod, VaRResult,
    VarConfig, VarEstimate,
};
use crate::portfolio::returns::{
    align_common_history, annualise_volatility, population_std, portfolio_return_series,
};
use crate::portfolio::Portfolio;
use crate::types::{with_metadata, ComputationOutput};
use crate::RiskEngineResult;

/// Historical simulation VaR.
///
/// Builds the realised portfolio return for every day shared by all
/// positions (pairing same-day returns, so co-movement is preserved), then
/// reads the empirical left-tail order statistic. A history shorter than the
/// lookback target is a warning, not an error; fewer than
/// `min_observations` days flags the result as low confidence.
pub fn historical_var(
    portfolio: &Portfolio,
    confidence_level: f64,
    time_horizon_days: u32,
    config: &VarConfig,
) -> RiskEngineResult<ComputationOutput<VaRResult>> {
    let start = Instant::now();
    validate_parameters(confidence_level, time_horizon_days)?;

    let estimate = estimate_historical(portfolio, confidence_level, time_horizon_days, config)?;
    let warnings = estimate.warnings.clone();
    let result = build_result(
        portfolio,
        VaRMethod::Historical,
        confidence_level,
        time_horizon_days,
        &estimate,
        config,
    )?;

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Historical Simulation VaR",
        &assumptions(portfolio, VaRMethod::Historical, confidence_level, time_horizon_days),
        warnings,
        elapsed,
        result,
    ))
}

/// Realised daily portfolio returns over the common history, oldest first.
pub(crate) fn realised_portfolio_returns(portfolio: &Portfolio) -> Vec<f64> {
    let series: Vec<&[f64]> = portfolio
        .positions()
        .iter()
        .map(|p| p.historical_returns.as_slice())
        .collect();
    let aligned = align_common_history(&series);
    portfolio_return_series(&portfolio.weights(), &aligned)
}

pub(crate) fn estimate_historical(
    portfolio: &Portfolio,
    confidence_level: f64,
    time_horizon_days: u32,
    config: &VarConfig,
) -> RiskEngineResult<VarEstimate> {
    let mut returns = realised_portfolio_returns(portfolio);
    let n = returns.len();
    let (low_confidence, mut warnings) = history_quality(n, config);
    if n == 0 {
        // Nothing to simulate: zero loss and volatility, flagged low confidence.
        warn!(portfolio = portfolio.id(), "no common history for historical VaR");
        warnings.push(format!(
            "Insufficient data: portfolio '{}' has no common return history; historical loss reported as zero",
            portfolio.id()
        ));
        return Ok(VarEstimate {
            var_loss: 0.0,
            es_loss: 0.0,
            volatility: 0.0,
            observations: 0,
            low_confidence,
            warnings,
            components: None,
        });
    }

    if !warnings.is_empty() {
        warn!(portfolio = portfolio.id(), observations = n, "short history for historical VaR");
    }

    let volatility = annualise_volatility(population_std(&returns));
    let (var_return, es_return) = tail_returns(&mut returns, confidence_level);

    Ok(VarEstimate {
        var_loss: scaled_loss(var_return, time_horizon_days),
        es_loss: scaled_loss(es_return, time_horizon_days),
        volatility,
        observations: n,
        low_confidence,
        warnings,
        components: None,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
