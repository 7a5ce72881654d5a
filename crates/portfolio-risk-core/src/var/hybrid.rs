use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::{
    assumptions, build_result, estimate_historical, estimate_monte_carlo, estimate_parametric,
    validate_parameters, VaRMethod, VaRResult, VarConfig, VarEstimate,
};
use crate::error::RiskEngineError;
use crate::portfolio::Portfolio;
use crate::types::{with_metadata, ComputationOutput};
use crate::RiskEngineResult;

/// Blend weights for hybrid VaR. Tunable; they are a configuration choice,
/// not estimated from data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HybridWeights {
    pub historical: f64,
    pub parametric: f64,
    pub monte_carlo: f64,
}

impl Default for HybridWeights {
    fn default() -> Self {
        HybridWeights {
            historical: 0.4,
            parametric: 0.3,
            monte_carlo: 0.3,
        }
    }
}

impl HybridWeights {
    pub fn validate(&self) -> RiskEngineResult<()> {
        let ws = [self.historical, self.parametric, self.monte_carlo];
        if ws.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(RiskEngineError::InvalidInput {
                field: "hybrid_weights".into(),
                reason: "Weights must be finite and non-negative".into(),
            });
        }
        let total: f64 = ws.iter().sum();
        if (total - 1.0).abs() > 1e-9 {
            return Err(RiskEngineError::InvalidInput {
                field: "hybrid_weights".into(),
                reason: format!("Weights must sum to 1, got {total}"),
            });
        }
        Ok(())
    }

    fn blend(&self, h: f64, p: f64, m: f64) -> f64 {
        self.historical * h + self.parametric * p + self.monte_carlo * m
    }
}

/// Hybrid VaR: the weighted blend of historical, parametric and Monte Carlo
/// VaR. The same weights apply to expected shortfall and volatility.
pub fn hybrid_var(
    portfolio: &Portfolio,
    confidence_level: f64,
    time_horizon_days: u32,
    config: &VarConfig,
) -> RiskEngineResult<ComputationOutput<VaRResult>> {
    let start = Instant::now();
    validate_parameters(confidence_level, time_horizon_days)?;

    let estimate = estimate_hybrid(portfolio, confidence_level, time_horizon_days, config)?;
    let warnings = estimate.warnings.clone();
    let result = build_result(
        portfolio,
        VaRMethod::Hybrid,
        confidence_level,
        time_horizon_days,
        &estimate,
        config,
    )?;

    let mut stated = assumptions(portfolio, VaRMethod::Hybrid, confidence_level, time_horizon_days);
    stated["weights"] = serde_json::to_value(config.hybrid_weights)?;

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Hybrid VaR (Historical / Parametric / Monte Carlo blend)",
        &stated,
        warnings,
        elapsed,
        result,
    ))
}

pub(crate) fn estimate_hybrid(
    portfolio: &Portfolio,
    confidence_level: f64,
    time_horizon_days: u32,
    config: &VarConfig,
) -> RiskEngineResult<VarEstimate> {
    let weights = config.hybrid_weights;
    weights.validate()?;

    let hist = estimate_historical(portfolio, confidence_level, time_horizon_days, config)?;
    let param = estimate_parametric(portfolio, confidence_level, time_horizon_days, config)?;
    let mc = estimate_monte_carlo(portfolio, confidence_level, time_horizon_days, config)?;

    let mut warnings = Vec::new();
    for (label, est) in [("historical", &hist), ("parametric", &param), ("monte_carlo", &mc)] {
        for w in &est.warnings {
            let tagged = format!("{label}: {w}");
            if !warnings.contains(&tagged) {
                warnings.push(tagged);
            }
        }
    }

    Ok(VarEstimate {
        var_loss: weights.blend(hist.var_loss, param.var_loss, mc.var_loss),
        es_loss: weights.blend(hist.es_loss, param.es_loss, mc.es_loss),
        volatility: weights.blend(hist.volatility, param.volatility, mc.volatility),
        observations: hist.observations,
        low_confidence: hist.low_confidence || param.low_confidence || mc.low_confidence,
        warnings,
        components: None,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portfolio::{PortfolioInput, PositionInput};
    use crate::types::{money_to_f64, Currency};
    use crate::var::{historical_var, monte_carlo_var, parametric_var};
    use rust_decimal_macros::dec;

    fn pf() -> Portfolio {
        let a: Vec<f64> = (0..300).map(|i| ((i * 37 % 101) as f64 - 50.0) / 2500.0).collect();
        let b: Vec<f64> = (0..300).map(|i| ((i * 53 % 89) as f64 - 44.0) / 3000.0).collect();
        Portfolio::new(PortfolioInput {
            id: "hyb".into(),
            name: "Hybrid".into(),
            positions: vec![
                PositionInput {
                    symbol: "A".into(),
                    quantity: dec!(10),
                    current_price: dec!(100),
                    historical_returns: a,
                    beta: None,
                    asset_class: None,
                },
                PositionInput {
                    symbol: "B".into(),
                    quantity: dec!(20),
                    current_price: dec!(25),
                    historical_returns: b,
                    beta: None,
                    asset_class: None,
                },
            ],
            benchmark: "SPY".into(),
            currency: Currency::USD,
            created_at: None,
            correlations: None,
        })
        .unwrap()
    }

    #[test]
    fn test_blend_matches_components() {
        let p = pf();
        let cfg = VarConfig::default();
        let h = money_to_f64(historical_var(&p, 0.99, 1, &cfg).unwrap().result.var_amount);
        let pa = money_to_f64(parametric_var(&p, 0.99, 1, &cfg).unwrap().result.var_amount);
        let m = money_to_f64(monte_carlo_var(&p, 0.99, 1, &cfg).unwrap().result.var_amount);
        let hy = money_to_f64(hybrid_var(&p, 0.99, 1, &cfg).unwrap().result.var_amount);
        let expected = 0.4 * h + 0.3 * pa + 0.3 * m;
        assert!((hy - expected).abs() < 1e-6, "hybrid {hy} vs {expected}");
    }

    #[test]
    fn test_invalid_weights_rejected() {
        let cfg = VarConfig {
            hybrid_weights: HybridWeights {
                historical: 0.5,
                parametric: 0.5,
                monte_carlo: 0.5,
            },
            ..VarConfig::default()
        };
        assert!(hybrid_var(&pf(), 0.95, 1, &cfg).is_err());
    }

    #[test]
    fn test_no_component_var() {
        let out = hybrid_var(&pf(), 0.95, 1, &VarConfig::default()).unwrap();
        assert!(out.result.component_var.is_none());
        assert_eq!(out.result.method, VaRMethod::Hybrid);
    }
}
