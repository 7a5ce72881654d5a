//! Value at Risk estimators.
//!
//! Four interchangeable methods share one result contract, [`VaRResult`]:
//!
//! - **Historical simulation**: empirical left tail of realised portfolio returns
//! - **Parametric**: variance-covariance under a normal assumption
//! - **Monte Carlo**: simulated normal draws per position
//! - **Hybrid**: fixed-weight blend of the three
//!
//! Losses are always reported as non-negative amounts. A tail quantile that
//! is a gain produces a loss of zero.

mod historical;
mod hybrid;
mod monte_carlo;
mod parametric;
mod tail;

pub use historical::historical_var;
pub use hybrid::{hybrid_var, HybridWeights};
pub use monte_carlo::monte_carlo_var;
pub use parametric::parametric_var;

pub(crate) use historical::{estimate_historical, realised_portfolio_returns};
pub(crate) use monte_carlo::estimate_monte_carlo;
pub(crate) use parametric::{estimate_parametric, parametric_kernel, ParametricInputs};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::backtesting::{self, BacktestResult};
use crate::error::RiskEngineError;
use crate::portfolio::Portfolio;
use crate::types::{money_to_f64, to_money, Money};
use crate::RiskEngineResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// VaR calculation method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VaRMethod {
    /// Historical simulation
    Historical,
    /// Parametric (variance-covariance)
    Parametric,
    /// Monte Carlo simulation
    MonteCarlo,
    /// Weighted blend of the other three
    Hybrid,
}

impl VaRMethod {
    pub const ALL: [VaRMethod; 4] = [
        VaRMethod::Historical,
        VaRMethod::Parametric,
        VaRMethod::MonteCarlo,
        VaRMethod::Hybrid,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VaRMethod::Historical => "historical",
            VaRMethod::Parametric => "parametric",
            VaRMethod::MonteCarlo => "monte_carlo",
            VaRMethod::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for VaRMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VaRMethod {
    type Err = RiskEngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "historical" | "historical_simulation" => Ok(VaRMethod::Historical),
            "parametric" | "variance_covariance" => Ok(VaRMethod::Parametric),
            "monte_carlo" | "montecarlo" => Ok(VaRMethod::MonteCarlo),
            "hybrid" => Ok(VaRMethod::Hybrid),
            _ => Err(RiskEngineError::UnsupportedMethod(s.to_string())),
        }
    }
}

/// Output of one VaR calculation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaRResult {
    pub portfolio_id: String,
    pub method: VaRMethod,
    /// Confidence level in (0, 1), e.g. 0.95
    pub confidence_level: f64,
    pub time_horizon_days: u32,
    /// Loss not expected to be exceeded (positive amount)
    pub var_amount: Money,
    /// Average loss beyond the VaR threshold; never below `var_amount`
    pub expected_shortfall: Money,
    pub portfolio_value: Money,
    /// var_amount / portfolio_value x 100
    pub var_percentage: f64,
    /// Annualised volatility of the portfolio return distribution used
    pub volatility: f64,
    /// Per-symbol contribution to VaR (parametric only); sums to `var_amount`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component_var: Option<BTreeMap<String, Money>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backtest_results: Option<BacktestResult>,
    /// Return observations the estimate rests on
    pub observations: usize,
    /// Set when the history is too short for a reliable estimate
    pub low_confidence: bool,
    pub calculation_date: DateTime<Utc>,
}

/// Estimator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VarConfig {
    /// Target historical window; shorter histories produce a warning
    pub lookback_days: usize,
    /// Below this many observations the result is flagged low confidence
    pub min_observations: usize,
    /// Correlation used between positions with no explicit pair entry
    pub default_correlation: f64,
    pub monte_carlo_simulations: usize,
    /// Fixed seed for reproducible draws; `None` seeds from OS entropy
    pub monte_carlo_seed: Option<u64>,
    pub hybrid_weights: HybridWeights,
    /// Attach a Kupiec backtest to every result with usable history
    pub attach_backtest: bool,
}

pub const MIN_MONTE_CARLO_SIMULATIONS: usize = 1_000;
pub const DEFAULT_MONTE_CARLO_SEED: u64 = 42;

impl Default for VarConfig {
    fn default() -> Self {
        VarConfig {
            lookback_days: 252,
            min_observations: 10,
            default_correlation: crate::portfolio::DEFAULT_CORRELATION,
            monte_carlo_simulations: 10_000,
            monte_carlo_seed: Some(DEFAULT_MONTE_CARLO_SEED),
            hybrid_weights: HybridWeights::default(),
            attach_backtest: true,
        }
    }
}

impl VarConfig {
    pub fn validate(&self) -> RiskEngineResult<()> {
        if self.monte_carlo_simulations < MIN_MONTE_CARLO_SIMULATIONS {
            return Err(RiskEngineError::InvalidInput {
                field: "monte_carlo_simulations".into(),
                reason: format!(
                    "At least {} simulations required, got {}",
                    MIN_MONTE_CARLO_SIMULATIONS, self.monte_carlo_simulations
                ),
            });
        }
        if !self.default_correlation.is_finite()
            || self.default_correlation < -1.0
            || self.default_correlation > 1.0
        {
            return Err(RiskEngineError::InvalidInput {
                field: "default_correlation".into(),
                reason: "Must lie in [-1, 1]".into(),
            });
        }
        self.hybrid_weights.validate()
    }
}

// ---------------------------------------------------------------------------
// Shared estimator plumbing
// ---------------------------------------------------------------------------

/// Method-independent estimate, expressed as fractions of portfolio value.
#[derive(Debug, Clone)]
pub(crate) struct VarEstimate {
    /// Horizon-scaled VaR loss fraction (>= 0)
    pub var_loss: f64,
    /// Horizon-scaled ES loss fraction (>= var_loss)
    pub es_loss: f64,
    /// Annualised volatility
    pub volatility: f64,
    pub observations: usize,
    pub low_confidence: bool,
    pub warnings: Vec<String>,
    /// Per-symbol VaR loss fractions, summing to `var_loss`
    pub components: Option<Vec<(String, f64)>>,
}

/// Reject confidence levels outside (0, 1) and zero horizons.
pub(crate) fn validate_parameters(confidence_level: f64, time_horizon_days: u32) -> RiskEngineResult<()> {
    if !confidence_level.is_finite() || confidence_level <= 0.0 || confidence_level >= 1.0 {
        return Err(RiskEngineError::InvalidInput {
            field: "confidence_level".into(),
            reason: format!("Must be between 0 and 1 exclusive, got {confidence_level}"),
        });
    }
    if time_horizon_days == 0 {
        return Err(RiskEngineError::InvalidInput {
            field: "time_horizon_days".into(),
            reason: "Must be at least 1 day".into(),
        });
    }
    Ok(())
}

/// Warnings and low-confidence flag for a history of `observations` days.
pub(crate) fn history_quality(observations: usize, config: &VarConfig) -> (bool, Vec<String>) {
    let mut warnings = Vec::new();
    if observations < config.lookback_days {
        warnings.push(format!(
            "Insufficient data: {} common observations, shorter than the {}-day lookback target",
            observations, config.lookback_days
        ));
    }
    let low_confidence = observations < config.min_observations;
    if low_confidence {
        warnings.push(format!(
            "Insufficient data: only {} observations, estimate is low confidence",
            observations
        ));
    }
    (low_confidence, warnings)
}

/// Convert an estimate into the persisted result contract.
pub(crate) fn build_result(
    portfolio: &Portfolio,
    method: VaRMethod,
    confidence_level: f64,
    time_horizon_days: u32,
    estimate: &VarEstimate,
    config: &VarConfig,
) -> RiskEngineResult<VaRResult> {
    let value = portfolio.total_value_f64();
    let var_amount = to_money(estimate.var_loss * value, "var_amount")?;
    let expected_shortfall = to_money(estimate.es_loss.max(estimate.var_loss) * value, "expected_shortfall")?;

    let component_var = match estimate.components {
        Some(ref comps) => {
            let mut map = BTreeMap::new();
            for (symbol, frac) in comps {
                map.insert(symbol.clone(), to_money(frac * value, "component_var")?);
            }
            Some(map)
        }
        None => None,
    };

    let backtest_results = if config.attach_backtest {
        let daily_loss = estimate.var_loss / (time_horizon_days as f64).sqrt();
        backtesting::backtest_portfolio(portfolio, -daily_loss, confidence_level)
    } else {
        None
    };

    let var_percentage = if portfolio.total_value().is_zero() {
        0.0
    } else {
        money_to_f64(var_amount / portfolio.total_value()) * 100.0
    };

    Ok(VaRResult {
        portfolio_id: portfolio.id().to_string(),
        method,
        confidence_level,
        time_horizon_days,
        var_amount,
        expected_shortfall,
        portfolio_value: portfolio.total_value(),
        var_percentage,
        volatility: estimate.volatility,
        component_var,
        backtest_results,
        observations: estimate.observations,
        low_confidence: estimate.low_confidence,
        calculation_date: Utc::now(),
    })
}

pub(crate) fn assumptions(
    portfolio: &Portfolio,
    method: VaRMethod,
    confidence_level: f64,
    time_horizon_days: u32,
) -> serde_json::Value {
    serde_json::json!({
        "method": method.as_str(),
        "num_positions": portfolio.positions().len(),
        "confidence_level": confidence_level,
        "time_horizon_days": time_horizon_days,
        "horizon_scaling": "square_root_of_time",
        "portfolio_value": portfolio.total_value().to_string(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
