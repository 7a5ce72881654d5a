use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::scenarios::{
    FACTOR_COMMODITY, FACTOR_CREDIT, FACTOR_CURRENCY, FACTOR_EQUITY, FACTOR_RATES,
    FACTOR_REAL_ESTATE,
};
use crate::error::RiskEngineError;
use crate::portfolio::Position;
use crate::RiskEngineResult;

/// How positions map onto market factors.
///
/// Resolution order per position:
/// 1. `symbol_overrides[symbol]`, a factor -> sensitivity map
/// 2. the position's `asset_class`, through `asset_class_factors`; an
///    unmapped class is used as the factor name itself
/// 3. `default_factor` with unit sensitivity
///
/// With `beta_scaling`, a position resolved onto the default factor by
/// rules 2 or 3 uses its beta (when present) as the sensitivity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactorMapping {
    pub default_factor: String,
    pub asset_class_factors: BTreeMap<String, String>,
    pub symbol_overrides: BTreeMap<String, BTreeMap<String, f64>>,
    pub beta_scaling: bool,
}

impl Default for FactorMapping {
    fn default() -> Self {
        let classes = [
            ("equity", FACTOR_EQUITY),
            ("stock", FACTOR_EQUITY),
            ("etf", FACTOR_EQUITY),
            ("fixed_income", FACTOR_RATES),
            ("bond", FACTOR_RATES),
            ("government_bond", FACTOR_RATES),
            ("credit", FACTOR_CREDIT),
            ("corporate_bond", FACTOR_CREDIT),
            ("high_yield", FACTOR_CREDIT),
            ("commodity", FACTOR_COMMODITY),
            ("currency", FACTOR_CURRENCY),
            ("fx", FACTOR_CURRENCY),
            ("real_estate", FACTOR_REAL_ESTATE),
            ("reit", FACTOR_REAL_ESTATE),
        ];
        FactorMapping {
            default_factor: FACTOR_EQUITY.to_string(),
            asset_class_factors: classes
                .iter()
                .map(|(c, f)| (c.to_string(), f.to_string()))
                .collect(),
            symbol_overrides: BTreeMap::new(),
            beta_scaling: false,
        }
    }
}

impl FactorMapping {
    /// Factor exposures of one position as `(factor, sensitivity)` pairs.
    pub fn exposures(&self, position: &Position) -> Vec<(String, f64)> {
        if let Some(over) = self.symbol_overrides.get(&position.symbol) {
            return over.iter().map(|(f, s)| (f.clone(), *s)).collect();
        }

        let factor = match position.asset_class {
            Some(ref class) => {
                let key = class.trim().to_ascii_lowercase().replace(['-', ' '], "_");
                self.asset_class_factors.get(&key).cloned().unwrap_or(key)
            }
            None => self.default_factor.clone(),
        };

        let sensitivity = match position.beta {
            Some(beta) if self.beta_scaling && factor == self.default_factor => beta,
            _ => 1.0,
        };
        vec![(factor, sensitivity)]
    }

    pub fn validate(&self) -> RiskEngineResult<()> {
        if self.default_factor.trim().is_empty() {
            return Err(RiskEngineError::InvalidInput {
                field: "factor_mapping.default_factor".into(),
                reason: "Default factor must be named".into(),
            });
        }
        for (symbol, over) in &self.symbol_overrides {
            if over.is_empty() {
                return Err(RiskEngineError::InvalidInput {
                    field: format!("factor_mapping.symbol_overrides.{symbol}"),
                    reason: "Override must name at least one factor".into(),
                });
            }
            if over.values().any(|s| !s.is_finite()) {
                return Err(RiskEngineError::InvalidInput {
                    field: format!("factor_mapping.symbol_overrides.{symbol}"),
                    reason: "Sensitivities must be finite".into(),
                });
            }
        }
        Ok(())
    }
}

/// Stress engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StressConfig {
    /// Confidence level of the parametric VaR/ES impact figures
    pub var_confidence_level: f64,
    pub factor_mapping: FactorMapping,
}

pub const DEFAULT_STRESS_VAR_CONFIDENCE: f64 = 0.95;

impl Default for StressConfig {
    fn default() -> Self {
        StressConfig {
            var_confidence_level: DEFAULT_STRESS_VAR_CONFIDENCE,
            factor_mapping: FactorMapping::default(),
        }
    }
}

impl StressConfig {
    pub fn validate(&self) -> RiskEngineResult<()> {
        let c = self.var_confidence_level;
        if !c.is_finite() || c <= 0.0 || c >= 1.0 {
            return Err(RiskEngineError::InvalidInput {
                field: "stress.var_confidence_level".into(),
                reason: format!("Must be between 0 and 1 exclusive, got {c}"),
            });
        }
        self.factor_mapping.validate()
    }
}
