//! Empirical left-tail selection shared by historical and Monte Carlo VaR.

use crate::portfolio::returns::sort_ascending;

/// Guards `floor` against representation error such as
/// `(1 - 0.9) * 10 = 0.9999999999999998`.
const RANK_EPSILON: f64 = 1e-9;

/// Zero-indexed order statistic used as the VaR quantile: `floor((1 - c) * n)`,
/// clamped to the last element. No interpolation.
pub(crate) fn var_rank(confidence_level: f64, n: usize) -> usize {
    let raw = ((1.0 - confidence_level) * n as f64 + RANK_EPSILON).floor() as usize;
    raw.min(n.saturating_sub(1))
}

/// Sorts `returns` in place and returns `(var_return, es_return)`: the return
/// at the VaR rank and the mean of every return at or below that rank.
pub(crate) fn tail_returns(returns: &mut [f64], confidence_level: f64) -> (f64, f64) {
    if returns.is_empty() {
        return (0.0, 0.0);
    }
    sort_ascending(returns);
    let idx = var_rank(confidence_level, returns.len());
    let var_return = returns[idx];
    let tail = &returns[..=idx];
    let es_return = tail.iter().sum::<f64>() / tail.len() as f64;
    (var_return, es_return)
}

/// Loss fraction for a (possibly negative) return after sqrt-of-time
/// scaling; gains map to zero loss.
pub(crate) fn scaled_loss(ret: f64, time_horizon_days: u32) -> f64 {
    (-ret * (time_horizon_days as f64).sqrt()).max(0.0)
}
