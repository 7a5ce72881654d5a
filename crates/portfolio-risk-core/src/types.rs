use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::RiskEngineError;
use crate::RiskEngineResult;

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.05 = 5%). Never as percentages.
pub type Rate = f64;

/// Currency code. Carried as metadata only; no FX conversion is performed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    GBP,
    #[default]
    USD,
    EUR,
    CHF,
    JPY,
    CAD,
    AUD,
    HKD,
    SGD,
    Other(String),
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "ieee754_f64_stats/rust_decimal_money".to_string(),
        },
    }
}

/// Convert a statistical f64 amount into Money, rounded to 8 decimal places.
pub fn to_money(value: f64, context: &str) -> RiskEngineResult<Money> {
    if !value.is_finite() {
        return Err(RiskEngineError::InvalidInput {
            field: context.to_string(),
            reason: format!("Non-finite amount {value}"),
        });
    }
    Decimal::from_f64(value)
        .map(|d| d.round_dp(8))
        .ok_or_else(|| RiskEngineError::InvalidInput {
            field: context.to_string(),
            reason: format!("Amount {value} is outside the decimal range"),
        })
}

/// Lossy conversion of Money into f64 for statistical work.
pub fn money_to_f64(value: Money) -> f64 {
    value.to_f64().unwrap_or(0.0)
}
