use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use statrs::distribution::Normal;
use std::time::Instant;
use tracing::{debug, warn};

use super::tail::{scaled_loss, tail_returns};
use super::{
    assumptions, build_result, history_quality, validate_parameters, VaRMethod, VaRResult,
    VarConfig, VarEstimate, MIN_MONTE_CARLO_SIMULATIONS,
};
use crate::error::RiskEngineError;
use crate::portfolio::returns::{annualise_volatility, daily_from_annual, population_std};
use crate::portfolio::Portfolio;
use crate::types::{with_metadata, ComputationOutput};
use crate::RiskEngineResult;

/// Monte Carlo VaR.
///
/// Each draw samples every position's daily return from
/// `Normal(0, annual_vol / sqrt(252))` independently, combines them with the
/// portfolio weights, and the sorted draws go through the same percentile and
/// ES selection as historical simulation. History is only used to estimate
/// each position's volatility.
pub fn monte_carlo_var(
    portfolio: &Portfolio,
    confidence_level: f64,
    time_horizon_days: u32,
    config: &VarConfig,
) -> RiskEngineResult<ComputationOutput<VaRResult>> {
    let start = Instant::now();
    validate_parameters(confidence_level, time_horizon_days)?;

    let estimate = estimate_monte_carlo(portfolio, confidence_level, time_horizon_days, config)?;
    let warnings = estimate.warnings.clone();
    let result = build_result(
        portfolio,
        VaRMethod::MonteCarlo,
        confidence_level,
        time_horizon_days,
        &estimate,
        config,
    )?;

    let mut stated =
        assumptions(portfolio, VaRMethod::MonteCarlo, confidence_level, time_horizon_days);
    stated["num_simulations"] = serde_json::json!(config.monte_carlo_simulations);
    stated["seed"] = serde_json::json!(config.monte_carlo_seed);
    stated["draws"] = serde_json::json!("independent_normal");

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Monte Carlo VaR",
        &stated,
        warnings,
        elapsed,
        result,
    ))
}

pub(crate) fn estimate_monte_carlo(
    portfolio: &Portfolio,
    confidence_level: f64,
    time_horizon_days: u32,
    config: &VarConfig,
) -> RiskEngineResult<VarEstimate> {
    let num_simulations = config.monte_carlo_simulations;
    if num_simulations < MIN_MONTE_CARLO_SIMULATIONS {
        return Err(RiskEngineError::InvalidInput {
            field: "monte_carlo_simulations".into(),
            reason: format!(
                "At least {} simulations required, got {}",
                MIN_MONTE_CARLO_SIMULATIONS, num_simulations
            ),
        });
    }

    let shortest = portfolio.common_history_len();
    let (low_confidence, warnings) = history_quality(shortest, config);
    if low_confidence {
        warn!(portfolio = portfolio.id(), observations = shortest, "Monte Carlo volatilities from short history");
    }

    // Zero-volatility positions contribute nothing and have no valid Normal.
    let mut samplers: Vec<(f64, Normal)> = Vec::with_capacity(portfolio.positions().len());
    for pos in portfolio.positions() {
        let daily_vol = daily_from_annual(pos.volatility);
        if daily_vol > 0.0 {
            let dist = Normal::new(0.0, daily_vol).map_err(|e| RiskEngineError::InvalidInput {
                field: format!("positions.{}.volatility", pos.symbol),
                reason: format!("Invalid Normal parameters: {e}"),
            })?;
            samplers.push((pos.weight, dist));
        }
    }

    let mut rng = match config.monte_carlo_seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };

    let mut draws: Vec<f64> = Vec::with_capacity(num_simulations);
    for _ in 0..num_simulations {
        let r: f64 = samplers
            .iter()
            .map(|(w, dist)| {
                let x: f64 = rng.sample(dist);
                w * x
            })
            .sum();
        draws.push(r);
    }
    debug!(portfolio = portfolio.id(), num_simulations, "Monte Carlo draws complete");

    let volatility = annualise_volatility(population_std(&draws));
    let (var_return, es_return) = tail_returns(&mut draws, confidence_level);

    Ok(VarEstimate {
        var_loss: scaled_loss(var_return, time_horizon_days),
        es_loss: scaled_loss(es_return, time_horizon_days),
        volatility,
        observations: shortest,
        low_confidence,
        warnings,
        components: None,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
