use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::correlation::CorrelationMatrix;
use super::returns::{annualise_volatility, population_std};
use crate::error::RiskEngineError;
use crate::types::{money_to_f64, Currency, Money};
use crate::RiskEngineResult;

// ---------------------------------------------------------------------------
// Caller-supplied data
// ---------------------------------------------------------------------------

/// One holding as supplied by the caller. Weights and volatility are never
/// accepted as input; they are derived when the portfolio is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionInput {
    pub symbol: String,
    pub quantity: Decimal,
    pub current_price: Money,
    /// Chronological daily fractional returns (oldest first)
    #[serde(default)]
    pub historical_returns: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beta: Option<f64>,
    /// Optional market-factor label (e.g. "equity", "fixed_income")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_class: Option<String>,
}

/// Portfolio as supplied by the caller, before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioInput {
    pub id: String,
    pub name: String,
    pub positions: Vec<PositionInput>,
    #[serde(default = "default_benchmark")]
    pub benchmark: String,
    #[serde(default)]
    pub currency: Currency,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Pairwise correlation overrides for the parametric estimator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlations: Option<CorrelationMatrix>,
}

fn default_benchmark() -> String {
    "SPY".to_string()
}

// ---------------------------------------------------------------------------
// Validated model
// ---------------------------------------------------------------------------

/// A validated holding with derived analytics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub quantity: Decimal,
    pub current_price: Money,
    /// quantity x current_price
    pub market_value: Money,
    /// market_value / portfolio total value
    pub weight: f64,
    pub historical_returns: Vec<f64>,
    /// Annualised population standard deviation of the returns
    pub volatility: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub beta: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_class: Option<String>,
}

impl Position {
    /// Daily (unannualised) volatility of the position's returns.
    pub fn daily_volatility(&self) -> f64 {
        population_std(&self.historical_returns)
    }
}

/// The unit of analysis. Immutable once built: the engine only ever reads it.
///
/// Deserialising a `Portfolio` goes through [`Portfolio::new`], so an
/// invalid payload is rejected at the boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "PortfolioInput")]
pub struct Portfolio {
    id: String,
    name: String,
    total_value: Money,
    positions: Vec<Position>,
    benchmark: String,
    currency: Currency,
    created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    correlations: Option<CorrelationMatrix>,
}

impl TryFrom<PortfolioInput> for Portfolio {
    type Error = RiskEngineError;

    fn try_from(input: PortfolioInput) -> Result<Self, Self::Error> {
        Portfolio::new(input)
    }
}

impl Portfolio {
    /// Validate caller data and derive market values, weights and volatilities.
    pub fn new(input: PortfolioInput) -> RiskEngineResult<Self> {
        if input.positions.is_empty() {
            return Err(RiskEngineError::InvalidPortfolio(format!(
                "Portfolio '{}' has no positions",
                input.id
            )));
        }

        let mut seen = HashSet::new();
        for pos in &input.positions {
            if pos.symbol.trim().is_empty() {
                return Err(RiskEngineError::InvalidInput {
                    field: "positions.symbol".into(),
                    reason: "Symbol must not be empty".into(),
                });
            }
            if !seen.insert(pos.symbol.as_str()) {
                return Err(RiskEngineError::InvalidInput {
                    field: format!("positions.{}", pos.symbol),
                    reason: "Duplicate symbol".into(),
                });
            }
            if pos.current_price <= Decimal::ZERO {
                return Err(RiskEngineError::InvalidInput {
                    field: format!("positions.{}.current_price", pos.symbol),
                    reason: "Price must be positive".into(),
                });
            }
            if let Some(i) = pos.historical_returns.iter().position(|r| !r.is_finite()) {
                return Err(RiskEngineError::InvalidInput {
                    field: format!("positions.{}.historical_returns[{}]", pos.symbol, i),
                    reason: "Returns must be finite".into(),
                });
            }
        }

        let total_value: Money = input
            .positions
            .iter()
            .map(|p| p.quantity * p.current_price)
            .sum();
        if total_value <= Decimal::ZERO {
            return Err(RiskEngineError::InvalidPortfolio(format!(
                "Portfolio '{}' has non-positive total value {}",
                input.id, total_value
            )));
        }

        if let Some(ref corr) = input.correlations {
            corr.validate()?;
        }

        let positions = input
            .positions
            .into_iter()
            .map(|p| {
                let market_value = p.quantity * p.current_price;
                let volatility = annualise_volatility(population_std(&p.historical_returns));
                Position {
                    weight: money_to_f64(market_value / total_value),
                    symbol: p.symbol,
                    quantity: p.quantity,
                    current_price: p.current_price,
                    market_value,
                    historical_returns: p.historical_returns,
                    volatility,
                    beta: p.beta,
                    asset_class: p.asset_class,
                }
            })
            .collect();

        Ok(Portfolio {
            id: input.id,
            name: input.name,
            total_value,
            positions,
            benchmark: input.benchmark,
            currency: input.currency,
            created_at: input.created_at.unwrap_or_else(Utc::now),
            correlations: input.correlations,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn total_value(&self) -> Money {
        self.total_value
    }

    pub fn total_value_f64(&self) -> f64 {
        money_to_f64(self.total_value)
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn benchmark(&self) -> &str {
        &self.benchmark
    }

    pub fn currency(&self) -> &Currency {
        &self.currency
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn correlations(&self) -> Option<&CorrelationMatrix> {
        self.correlations.as_ref()
    }

    pub fn weights(&self) -> Vec<f64> {
        self.positions.iter().map(|p| p.weight).collect()
    }

    pub fn symbols(&self) -> Vec<&str> {
        self.positions.iter().map(|p| p.symbol.as_str()).collect()
    }

    /// Length of the shortest position history.
    pub fn common_history_len(&self) -> usize {
        self.positions
            .iter()
            .map(|p| p.historical_returns.len())
            .min()
            .unwrap_or(0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn position(symbol: &str, qty: Decimal, price: Decimal) -> PositionInput {
        PositionInput {
            symbol: symbol.into(),
            quantity: qty,
            current_price: price,
            historical_returns: vec![0.01, -0.01, 0.02, -0.02],
            beta: None,
            asset_class: None,
        }
    }

    fn input(positions: Vec<PositionInput>) -> PortfolioInput {
        PortfolioInput {
            id: "pf-1".into(),
            name: "Test".into(),
            positions,
            benchmark: default_benchmark(),
            currency: Currency::USD,
            created_at: None,
            correlations: None,
        }
    }

    #[test]
    fn test_total_value_and_weights() {
        let pf = Portfolio::new(input(vec![
            position("A", dec!(100), dec!(50)),
            position("B", dec!(30), dec!(100)),
        ]))
        .unwrap();
        assert_eq!(pf.total_value(), dec!(8000));
        assert_eq!(pf.positions()[0].market_value, dec!(5000));
        let sum: f64 = pf.weights().iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
        assert!((pf.positions()[0].weight - 0.625).abs() < 1e-12);
    }

    #[test]
    fn test_empty_portfolio_rejected() {
        let err = Portfolio::new(input(vec![])).unwrap_err();
        assert!(matches!(err, RiskEngineError::InvalidPortfolio(_)));
    }

    #[test]
    fn test_zero_value_portfolio_rejected() {
        let err = Portfolio::new(input(vec![position("A", dec!(0), dec!(10))])).unwrap_err();
        assert!(matches!(err, RiskEngineError::InvalidPortfolio(_)));
    }

    #[test]
    fn test_non_positive_price_rejected() {
        assert!(Portfolio::new(input(vec![position("A", dec!(1), dec!(0))])).is_err());
    }

    #[test]
    fn test_duplicate_symbol_rejected() {
        let res = Portfolio::new(input(vec![
            position("A", dec!(1), dec!(10)),
            position("A", dec!(2), dec!(10)),
        ]));
        assert!(res.is_err());
    }

    #[test]
    fn test_non_finite_return_rejected() {
        let mut p = position("A", dec!(1), dec!(10));
        p.historical_returns.push(f64::NAN);
        assert!(Portfolio::new(input(vec![p])).is_err());
    }

    #[test]
    fn test_volatility_is_annualised() {
        let pf = Portfolio::new(input(vec![position("A", dec!(1), dec!(10))])).unwrap();
        let daily = population_std(&[0.01, -0.01, 0.02, -0.02]);
        assert!((pf.positions()[0].volatility - daily * 252f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_deserialize_validates() {
        let json = r#"{"id": "p", "name": "n", "positions": []}"#;
        assert!(serde_json::from_str::<Portfolio>(json).is_err());

        let json = r#"{"id": "p", "name": "n", "positions": [
            {"symbol": "X", "quantity": "100", "current_price": "50"}
        ]}"#;
        let pf: Portfolio = serde_json::from_str(json).unwrap();
        assert_eq!(pf.total_value(), dec!(5000));
        assert_eq!(pf.benchmark(), "SPY");
    }
}
