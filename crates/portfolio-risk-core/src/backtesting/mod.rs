//! VaR backtesting against realised portfolio returns.

mod kupiec;

pub use kupiec::{kupiec_test, BacktestResult, KUPIEC_CRITICAL_VALUE};

use std::time::Instant;
use tracing::warn;

use crate::error::RiskEngineError;
use crate::portfolio::Portfolio;
use crate::types::{money_to_f64, with_metadata, ComputationOutput};
use crate::var::{realised_portfolio_returns, VaRResult};
use crate::RiskEngineResult;

/// Backtest a daily return threshold against the portfolio's realised
/// history. `None` when the positions share no common history or the
/// Kupiec test rejects its inputs; the latter is logged at warn level.
pub(crate) fn backtest_portfolio(
    portfolio: &Portfolio,
    var_threshold: f64,
    confidence_level: f64,
) -> Option<BacktestResult> {
    let returns = realised_portfolio_returns(portfolio);
    if returns.is_empty() {
        return None;
    }
    match kupiec_test(&returns, var_threshold, confidence_level) {
        Ok(bt) => Some(bt),
        Err(e) => {
            warn!(portfolio = portfolio.id(), error = %e, "attached backtest failed");
            None
        }
    }
}

/// Backtest a previously computed VaR result. The result's horizon VaR is
/// brought back to a one-day return threshold by the square-root-of-time
/// rule before comparison with daily returns.
pub fn backtest_var_result(
    portfolio: &Portfolio,
    var: &VaRResult,
) -> RiskEngineResult<ComputationOutput<BacktestResult>> {
    let start = Instant::now();

    if var.portfolio_id != portfolio.id() {
        return Err(RiskEngineError::InvalidInput {
            field: "portfolio_id".into(),
            reason: format!(
                "VaR result belongs to '{}', not '{}'",
                var.portfolio_id,
                portfolio.id()
            ),
        });
    }
    let value = money_to_f64(var.portfolio_value);
    if value <= 0.0 {
        return Err(RiskEngineError::DivisionByZero {
            context: "VaR result portfolio value".into(),
        });
    }
    if var.time_horizon_days == 0 {
        return Err(RiskEngineError::InvalidInput {
            field: "time_horizon_days".into(),
            reason: "Must be at least 1 day".into(),
        });
    }

    let returns = realised_portfolio_returns(portfolio);
    let daily_loss = money_to_f64(var.var_amount) / value / (var.time_horizon_days as f64).sqrt();
    let result = kupiec_test(&returns, -daily_loss, var.confidence_level)?;

    let mut warnings = Vec::new();
    if result.observations < 250 {
        warnings.push(format!(
            "Backtest over {} observations; Kupiec test has low power below one trading year",
            result.observations
        ));
    }

    let assumptions = serde_json::json!({
        "test": "kupiec_pof",
        "method": var.method.as_str(),
        "confidence_level": var.confidence_level,
        "daily_threshold": -daily_loss,
        "critical_value": KUPIEC_CRITICAL_VALUE,
    });

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Kupiec Proportion-of-Failures Backtest",
        &assumptions,
        warnings,
        elapsed,
        result,
    ))
}
