use serde::{Deserialize, Serialize};
use statrs::distribution::{ChiSquared, ContinuousCDF};

use crate::error::RiskEngineError;
use crate::RiskEngineResult;

/// 95% quantile of the chi-square distribution with one degree of freedom.
pub const KUPIEC_CRITICAL_VALUE: f64 = 3.841;

/// Kupiec proportion-of-failures backtest outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub observations: usize,
    /// Days whose realised return fell strictly below the threshold
    pub violations: usize,
    /// `(1 - c) * observations`
    pub expected_violations: f64,
    pub violation_rate: f64,
    pub confidence_level: f64,
    /// Daily return threshold the series was compared against (negative for a loss)
    pub var_threshold: f64,
    pub lr_statistic: f64,
    pub critical_value: f64,
    /// Upper-tail chi-square(1) probability of `lr_statistic`
    pub p_value: f64,
    pub test_passed: bool,
}

/// Kupiec POF test of `returns` against a daily VaR return threshold.
///
/// `LR = 2 [x ln(p/(1-c)) + (N-x) ln((1-p)/c)]` with `p = x/N`. Zero
/// violations give `LR = 0`; when every day is a violation the `(N-x)`
/// term vanishes.
pub fn kupiec_test(
    returns: &[f64],
    var_threshold: f64,
    confidence_level: f64,
) -> RiskEngineResult<BacktestResult> {
    if !confidence_level.is_finite() || confidence_level <= 0.0 || confidence_level >= 1.0 {
        return Err(RiskEngineError::InvalidInput {
            field: "confidence_level".into(),
            reason: format!("Must be between 0 and 1 exclusive, got {confidence_level}"),
        });
    }
    if !var_threshold.is_finite() {
        return Err(RiskEngineError::InvalidInput {
            field: "var_threshold".into(),
            reason: "Threshold must be finite".into(),
        });
    }
    if returns.is_empty() {
        return Err(RiskEngineError::InsufficientData(
            "Kupiec backtest requires at least one realised return".into(),
        ));
    }

    let n = returns.len();
    let x = returns.iter().filter(|r| **r < var_threshold).count();
    let tail_prob = 1.0 - confidence_level;
    let violation_rate = x as f64 / n as f64;

    let lr_statistic = if x == 0 {
        0.0
    } else {
        let breach_term = x as f64 * (violation_rate / tail_prob).ln();
        let clean_term = if x == n {
            0.0
        } else {
            (n - x) as f64 * ((1.0 - violation_rate) / confidence_level).ln()
        };
        (2.0 * (breach_term + clean_term)).max(0.0)
    };

    let chi = ChiSquared::new(1.0).map_err(|e| RiskEngineError::InvalidInput {
        field: "degrees_of_freedom".into(),
        reason: format!("Invalid chi-square parameters: {e}"),
    })?;
    let p_value = 1.0 - chi.cdf(lr_statistic);

    Ok(BacktestResult {
        observations: n,
        violations: x,
        expected_violations: tail_prob * n as f64,
        violation_rate,
        confidence_level,
        var_threshold,
        lr_statistic,
        critical_value: KUPIEC_CRITICAL_VALUE,
        p_value,
        test_passed: lr_statistic < KUPIEC_CRITICAL_VALUE,
    })
}
