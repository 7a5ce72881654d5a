//! Return-series statistics shared by the estimators.

/// Trading days used to annualise daily statistics.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divides by N).
pub fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|r| (r - m) * (r - m)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

pub fn annualise_volatility(daily_std: f64) -> f64 {
    daily_std * TRADING_DAYS_PER_YEAR.sqrt()
}

pub fn daily_from_annual(annual_vol: f64) -> f64 {
    annual_vol / TRADING_DAYS_PER_YEAR.sqrt()
}

/// Truncate every series to the shortest common length, keeping the most
/// recent observations, and return them as rows of same-day returns.
///
/// Row `t` holds the return of every series on day `t`, so cross-position
/// co-movement is preserved.
pub fn align_common_history(series: &[&[f64]]) -> Vec<Vec<f64>> {
    let common = series.iter().map(|s| s.len()).min().unwrap_or(0);
    (0..common)
        .map(|t| {
            series
                .iter()
                .map(|s| s[s.len() - common + t])
                .collect()
        })
        .collect()
}

/// Weighted same-day portfolio returns from an aligned matrix.
pub fn portfolio_return_series(weights: &[f64], aligned: &[Vec<f64>]) -> Vec<f64> {
    aligned
        .iter()
        .map(|day| day.iter().zip(weights).map(|(r, w)| r * w).sum())
        .collect()
}

/// Sort ascending, treating NaN as equal (inputs are validated finite).
pub fn sort_ascending(values: &mut [f64]) {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_population_std_alternating() {
        let r: Vec<f64> = (0..252)
            .map(|i| if i % 2 == 0 { 0.01 } else { -0.01 })
            .collect();
        assert!(mean(&r).abs() < 1e-15);
        assert!((population_std(&r) - 0.01).abs() < 1e-12);
    }

    #[test]
    fn test_empty_series_statistics() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(population_std(&[]), 0.0);
    }

    #[test]
    fn test_align_keeps_most_recent() {
        let a = [0.1, 0.2, 0.3, 0.4];
        let b = [-0.3, -0.4];
        let aligned = align_common_history(&[&a, &b]);
        assert_eq!(aligned, vec![vec![0.3, -0.3], vec![0.4, -0.4]]);
    }

    #[test]
    fn test_align_empty_when_any_series_empty() {
        let a = [0.1, 0.2];
        let b: [f64; 0] = [];
        assert!(align_common_history(&[&a, &b]).is_empty());
    }

    #[test]
    fn test_portfolio_series_weights() {
        let aligned = vec![vec![0.02, -0.01], vec![0.0, 0.04]];
        let p = portfolio_return_series(&[0.5, 0.5], &aligned);
        assert!((p[0] - 0.005).abs() < 1e-15);
        assert!((p[1] - 0.02).abs() < 1e-15);
    }

    #[test]
    fn test_annualisation_round_trip() {
        let daily = 0.01;
        assert!((daily_from_annual(annualise_volatility(daily)) - daily).abs() < 1e-15);
    }
}
