use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::RiskEngineError;
use crate::RiskEngineResult;

/// Correlation assumed between two distinct positions when no explicit
/// pair correlation is supplied.
pub const DEFAULT_CORRELATION: f64 = 0.3;

/// Sparse symbol-by-symbol correlation override.
///
/// Pairs are looked up in both orders, so `{"A": {"B": 0.5}}` also answers
/// the `(B, A)` query. Self-correlation is always 1 regardless of content.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationMatrix(BTreeMap<String, BTreeMap<String, f64>>);

impl CorrelationMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion of a single pair.
    #[must_use]
    pub fn with_pair(mut self, a: &str, b: &str, rho: f64) -> Self {
        self.insert(a, b, rho);
        self
    }

    pub fn insert(&mut self, a: &str, b: &str, rho: f64) {
        self.0
            .entry(a.to_string())
            .or_default()
            .insert(b.to_string(), rho);
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(|row| row.is_empty())
    }

    /// Explicit correlation for the pair, if present in either order.
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        if a == b {
            return Some(1.0);
        }
        self.0
            .get(a)
            .and_then(|row| row.get(b))
            .or_else(|| self.0.get(b).and_then(|row| row.get(a)))
            .copied()
    }

    /// Correlation for the pair, falling back to `default` when absent.
    pub fn correlation(&self, a: &str, b: &str, default: f64) -> f64 {
        self.get(a, b).unwrap_or(default)
    }

    /// Overlay `other` on top of `self`; pairs in `other` win.
    #[must_use]
    pub fn overlaid_with(&self, other: &CorrelationMatrix) -> CorrelationMatrix {
        let mut merged = self.clone();
        for (a, row) in &other.0 {
            for (b, rho) in row {
                // Drop any reversed entry so the override is not shadowed.
                if let Some(rev) = merged.0.get_mut(b) {
                    rev.remove(a);
                }
                merged.insert(a, b, *rho);
            }
        }
        merged
    }

    pub fn validate(&self) -> RiskEngineResult<()> {
        for (a, row) in &self.0 {
            for (b, rho) in row {
                if !rho.is_finite() || *rho < -1.0 || *rho > 1.0 {
                    return Err(RiskEngineError::InvalidInput {
                        field: format!("correlations.{a}.{b}"),
                        reason: format!("Correlation {rho} must lie in [-1, 1]"),
                    });
                }
                if a == b && (*rho - 1.0).abs() > 1e-12 {
                    return Err(RiskEngineError::InvalidInput {
                        field: format!("correlations.{a}.{b}"),
                        reason: "Self-correlation must be 1".into(),
                    });
                }
                if let Some(rev) = self.0.get(b).and_then(|r| r.get(a)) {
                    if (rev - rho).abs() > 1e-12 {
                        return Err(RiskEngineError::InvalidInput {
                            field: format!("correlations.{a}.{b}"),
                            reason: format!("Conflicting values {rho} and {rev} for the same pair"),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symmetric_lookup() {
        let m = CorrelationMatrix::new().with_pair("AAPL", "MSFT", 0.8);
        assert_eq!(m.get("AAPL", "MSFT"), Some(0.8));
        assert_eq!(m.get("MSFT", "AAPL"), Some(0.8));
        assert_eq!(m.get("AAPL", "AAPL"), Some(1.0));
        assert_eq!(m.get("AAPL", "XOM"), None);
    }

    #[test]
    fn test_default_fallback_is_named_constant() {
        let m = CorrelationMatrix::new();
        assert_eq!(m.correlation("A", "B", DEFAULT_CORRELATION), 0.3);
    }

    #[test]
    fn test_overlay_replaces_reversed_pair() {
        let base = CorrelationMatrix::new().with_pair("A", "B", 0.2);
        let over = CorrelationMatrix::new().with_pair("B", "A", 0.9);
        let merged = base.overlaid_with(&over);
        assert_eq!(merged.get("A", "B"), Some(0.9));
    }

    #[test]
    fn test_conflicting_reversed_pair_rejected() {
        let m: CorrelationMatrix =
            serde_json::from_str(r#"{"A": {"B": 0.5}, "B": {"A": 0.9}}"#).unwrap();
        match m.validate() {
            Err(RiskEngineError::InvalidInput { field, reason }) => {
                assert_eq!(field, "correlations.A.B");
                assert!(reason.contains("Conflicting"), "{reason}");
            }
            other => panic!("expected conflicting pair rejection, got {other:?}"),
        }

        let agreeing: CorrelationMatrix =
            serde_json::from_str(r#"{"A": {"B": 0.5}, "B": {"A": 0.5}}"#).unwrap();
        assert!(agreeing.validate().is_ok());
    }

    #[test]
    fn test_out_of_range_rejected() {
        let m = CorrelationMatrix::new().with_pair("A", "B", 1.5);
        assert!(m.validate().is_err());
    }

    #[test]
    fn test_serde_transparent_shape() {
        let m: CorrelationMatrix = serde_json::from_str(r#"{"A": {"B": 0.4}}"#).unwrap();
        assert_eq!(m.get("B", "A"), Some(0.4));
    }
}
