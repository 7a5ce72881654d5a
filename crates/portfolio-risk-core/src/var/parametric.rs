use statrs::distribution::{Continuous, ContinuousCDF, Normal};
use std::time::Instant;
use tracing::warn;

use super::{
    assumptions, build_result, history_quality, validate_parameters, VaRMethod, VaRResult,
    VarConfig, VarEstimate,
};
use crate::error::RiskEngineError;
use crate::portfolio::returns::annualise_volatility;
use crate::portfolio::{CorrelationMatrix, Portfolio};
use crate::types::{with_metadata, ComputationOutput};
use crate::RiskEngineResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Explicit inputs to the variance-covariance kernel. The stress engine
/// feeds shocked weights and volatilities through the same kernel.
#[derive(Debug, Clone)]
pub(crate) struct ParametricInputs<'a> {
    pub symbols: Vec<&'a str>,
    pub weights: Vec<f64>,
    /// Daily standard deviation per position
    pub daily_vols: Vec<f64>,
    pub correlations: Option<&'a CorrelationMatrix>,
    pub default_correlation: f64,
}

/// Kernel output, as fractions of portfolio value.
#[derive(Debug, Clone)]
pub(crate) struct ParametricOutcome {
    /// Daily portfolio standard deviation
    pub daily_volatility: f64,
    pub var_loss: f64,
    pub es_loss: f64,
    /// Per-position share of `var_loss`, summing to it
    pub components: Vec<f64>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Parametric (variance-covariance) VaR under a normal assumption.
///
/// Portfolio variance is `sum_i sum_j w_i w_j rho_ij s_i s_j`, with `rho_ij`
/// taken from the portfolio's correlation override or the configured
/// default correlation. Expected shortfall uses the closed form
/// `phi(z) / (1 - c) * sigma`.
pub fn parametric_var(
    portfolio: &Portfolio,
    confidence_level: f64,
    time_horizon_days: u32,
    config: &VarConfig,
) -> RiskEngineResult<ComputationOutput<VaRResult>> {
    let start = Instant::now();
    validate_parameters(confidence_level, time_horizon_days)?;

    let estimate = estimate_parametric(portfolio, confidence_level, time_horizon_days, config)?;
    let warnings = estimate.warnings.clone();
    let result = build_result(
        portfolio,
        VaRMethod::Parametric,
        confidence_level,
        time_horizon_days,
        &estimate,
        config,
    )?;

    let mut stated =
        assumptions(portfolio, VaRMethod::Parametric, confidence_level, time_horizon_days);
    stated["distribution"] = serde_json::json!("normal");
    stated["default_correlation"] = serde_json::json!(config.default_correlation);
    stated["correlation_overrides"] = serde_json::json!(portfolio.correlations().is_some());

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Parametric (Variance-Covariance) VaR",
        &stated,
        warnings,
        elapsed,
        result,
    ))
}

pub(crate) fn estimate_parametric(
    portfolio: &Portfolio,
    confidence_level: f64,
    time_horizon_days: u32,
    config: &VarConfig,
) -> RiskEngineResult<VarEstimate> {
    let positions = portfolio.positions();
    let shortest = portfolio.common_history_len();
    let (low_confidence, mut warnings) = history_quality(shortest, config);
    if low_confidence {
        warn!(portfolio = portfolio.id(), observations = shortest, "volatility estimated from short history");
    }

    let inputs = ParametricInputs {
        symbols: positions.iter().map(|p| p.symbol.as_str()).collect(),
        weights: portfolio.weights(),
        daily_vols: positions.iter().map(|p| p.daily_volatility()).collect(),
        correlations: portfolio.correlations(),
        default_correlation: config.default_correlation,
    };
    let outcome = parametric_kernel(&inputs, confidence_level, time_horizon_days)?;

    if outcome.daily_volatility == 0.0 {
        warnings.push("Zero portfolio volatility: parametric VaR is zero".into());
    }

    let components = inputs
        .symbols
        .iter()
        .zip(outcome.components.iter())
        .map(|(s, c)| (s.to_string(), *c))
        .collect();

    Ok(VarEstimate {
        var_loss: outcome.var_loss,
        es_loss: outcome.es_loss,
        volatility: annualise_volatility(outcome.daily_volatility),
        observations: shortest,
        low_confidence,
        warnings,
        components: Some(components),
    })
}

/// Variance-covariance VaR and ES for explicit weights and volatilities.
pub(crate) fn parametric_kernel(
    inputs: &ParametricInputs<'_>,
    confidence_level: f64,
    time_horizon_days: u32,
) -> RiskEngineResult<ParametricOutcome> {
    let n = inputs.weights.len();
    if inputs.daily_vols.len() != n || inputs.symbols.len() != n {
        return Err(RiskEngineError::InvalidInput {
            field: "daily_vols".into(),
            reason: format!(
                "Expected {} volatilities and symbols, got {} and {}",
                n,
                inputs.daily_vols.len(),
                inputs.symbols.len()
            ),
        });
    }

    let w = &inputs.weights;
    let s = &inputs.daily_vols;

    let mut variance = 0.0;
    #[allow(clippy::needless_range_loop)]
    for i in 0..n {
        variance += w[i] * w[i] * s[i] * s[i];
        for j in (i + 1)..n {
            let rho = match inputs.correlations {
                Some(m) => m.correlation(inputs.symbols[i], inputs.symbols[j], inputs.default_correlation),
                None => inputs.default_correlation,
            };
            variance += 2.0 * w[i] * w[j] * rho * s[i] * s[j];
        }
    }
    // Negative correlations can push tiny negative variance through rounding.
    let daily_volatility = variance.max(0.0).sqrt();
    let scaled_vol = daily_volatility * (time_horizon_days as f64).sqrt();

    let standard = Normal::new(0.0, 1.0).map_err(|e| RiskEngineError::InvalidInput {
        field: "distribution".into(),
        reason: format!("Invalid Normal parameters: {e}"),
    })?;
    let tail_prob = 1.0 - confidence_level;
    let z = standard.inverse_cdf(tail_prob);

    let var_loss = (-z * scaled_vol).max(0.0);
    let es_loss = standard.pdf(z) / tail_prob * scaled_vol;

    // Component VaR proportional to w_i s_i^2 / s_p, rescaled to total VaR.
    let raw: Vec<f64> = (0..n)
        .map(|i| {
            if daily_volatility == 0.0 {
                0.0
            } else {
                w[i] * s[i] * s[i] / daily_volatility
            }
        })
        .collect();
    let raw_total: f64 = raw.iter().sum();
    let components = raw
        .iter()
        .map(|r| {
            if raw_total == 0.0 {
                0.0
            } else {
                r / raw_total * var_loss
            }
        })
        .collect();

    Ok(ParametricOutcome {
        daily_volatility,
        var_loss,
        es_loss,
        components,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
