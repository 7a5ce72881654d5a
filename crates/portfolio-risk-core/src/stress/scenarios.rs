use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::RiskEngineError;
use crate::portfolio::CorrelationMatrix;
use crate::RiskEngineResult;

// ---------------------------------------------------------------------------
// Factor names
// ---------------------------------------------------------------------------

pub const FACTOR_EQUITY: &str = "equity";
pub const FACTOR_RATES: &str = "rates";
pub const FACTOR_CREDIT: &str = "credit";
pub const FACTOR_COMMODITY: &str = "commodity";
pub const FACTOR_CURRENCY: &str = "currency";
pub const FACTOR_REAL_ESTATE: &str = "real_estate";

// ---------------------------------------------------------------------------
// Severity
// ---------------------------------------------------------------------------

/// Qualitative intensity tier of a stress scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Mild,
    Moderate,
    Severe,
    Extreme,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Mild,
        Severity::Moderate,
        Severity::Severe,
        Severity::Extreme,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Mild => "mild",
            Severity::Moderate => "moderate",
            Severity::Severe => "severe",
            Severity::Extreme => "extreme",
        }
    }

    /// Multiplier on the mean absolute shock in the liquidity heuristic.
    pub fn liquidity_weight(&self) -> f64 {
        match self {
            Severity::Mild => 0.5,
            Severity::Moderate => 1.0,
            Severity::Severe => 1.5,
            Severity::Extreme => 2.0,
        }
    }

    /// Recovery time before the loss-size adjustment, in calendar days.
    pub fn base_recovery_days(&self) -> u32 {
        match self {
            Severity::Mild => 30,
            Severity::Moderate => 90,
            Severity::Severe => 365,
            Severity::Extreme => 730,
        }
    }

    /// Tier implied by the largest absolute factor shock.
    pub fn from_max_shock(max_abs_shock: f64) -> Severity {
        if max_abs_shock < 0.05 {
            Severity::Mild
        } else if max_abs_shock < 0.15 {
            Severity::Moderate
        } else if max_abs_shock < 0.30 {
            Severity::Severe
        } else {
            Severity::Extreme
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = RiskEngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Severity::ALL
            .into_iter()
            .find(|sev| sev.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| RiskEngineError::InvalidScenario(format!("Unknown severity '{s}'")))
    }
}

/// Severity tier with its derived heuristics, for catalog listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeverityLevel {
    pub severity: Severity,
    pub liquidity_weight: f64,
    pub base_recovery_days: u32,
}

// ---------------------------------------------------------------------------
// Predefined catalog
// ---------------------------------------------------------------------------

/// The fixed stress catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PredefinedScenario {
    #[serde(rename = "black_monday_1987")]
    BlackMonday1987,
    #[serde(rename = "tech_bubble_2000")]
    TechBubble2000,
    #[serde(rename = "financial_crisis_2008")]
    FinancialCrisis2008,
    #[serde(rename = "flash_crash_2010")]
    FlashCrash2010,
    #[serde(rename = "covid_19_pandemic_2020")]
    Covid19Pandemic2020,
    #[serde(rename = "interest_rate_shock")]
    InterestRateShock,
    #[serde(rename = "credit_spread_widening")]
    CreditSpreadWidening,
    #[serde(rename = "equity_market_crash")]
    EquityMarketCrash,
    #[serde(rename = "currency_crisis")]
    CurrencyCrisis,
    #[serde(rename = "geopolitical_crisis")]
    GeopoliticalCrisis,
    #[serde(rename = "inflation_shock")]
    InflationShock,
    #[serde(rename = "commodity_price_shock")]
    CommodityPriceShock,
}

/// Full description of a predefined scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioDefinition {
    pub key: String,
    pub name: String,
    pub description: String,
    pub severity: Severity,
    /// Factor name -> price shock as a fraction (-0.20 = -20%)
    pub market_factors: BTreeMap<String, f64>,
    /// Factor name -> volatility multiplier
    pub volatility_factors: BTreeMap<String, f64>,
    pub duration_days: u32,
}

fn factors(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

impl PredefinedScenario {
    pub const ALL: [PredefinedScenario; 12] = [
        PredefinedScenario::BlackMonday1987,
        PredefinedScenario::TechBubble2000,
        PredefinedScenario::FinancialCrisis2008,
        PredefinedScenario::FlashCrash2010,
        PredefinedScenario::Covid19Pandemic2020,
        PredefinedScenario::InterestRateShock,
        PredefinedScenario::CreditSpreadWidening,
        PredefinedScenario::EquityMarketCrash,
        PredefinedScenario::CurrencyCrisis,
        PredefinedScenario::GeopoliticalCrisis,
        PredefinedScenario::InflationShock,
        PredefinedScenario::CommodityPriceShock,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            PredefinedScenario::BlackMonday1987 => "black_monday_1987",
            PredefinedScenario::TechBubble2000 => "tech_bubble_2000",
            PredefinedScenario::FinancialCrisis2008 => "financial_crisis_2008",
            PredefinedScenario::FlashCrash2010 => "flash_crash_2010",
            PredefinedScenario::Covid19Pandemic2020 => "covid_19_pandemic_2020",
            PredefinedScenario::InterestRateShock => "interest_rate_shock",
            PredefinedScenario::CreditSpreadWidening => "credit_spread_widening",
            PredefinedScenario::EquityMarketCrash => "equity_market_crash",
            PredefinedScenario::CurrencyCrisis => "currency_crisis",
            PredefinedScenario::GeopoliticalCrisis => "geopolitical_crisis",
            PredefinedScenario::InflationShock => "inflation_shock",
            PredefinedScenario::CommodityPriceShock => "commodity_price_shock",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PredefinedScenario::BlackMonday1987 => "Black Monday 1987",
            PredefinedScenario::TechBubble2000 => "Tech Bubble 2000",
            PredefinedScenario::FinancialCrisis2008 => "Financial Crisis 2008",
            PredefinedScenario::FlashCrash2010 => "Flash Crash 2010",
            PredefinedScenario::Covid19Pandemic2020 => "COVID-19 Pandemic 2020",
            PredefinedScenario::InterestRateShock => "Interest Rate Shock",
            PredefinedScenario::CreditSpreadWidening => "Credit Spread Widening",
            PredefinedScenario::EquityMarketCrash => "Equity Market Crash",
            PredefinedScenario::CurrencyCrisis => "Currency Crisis",
            PredefinedScenario::GeopoliticalCrisis => "Geopolitical Crisis",
            PredefinedScenario::InflationShock => "Inflation Shock",
            PredefinedScenario::CommodityPriceShock => "Commodity Price Shock",
        }
    }

    /// Resolve a catalog key. Case-insensitive; `-` and spaces read as `_`,
    /// so both `financial_crisis_2008` and `Financial-Crisis-2008` resolve.
    pub fn from_key(key: &str) -> RiskEngineResult<PredefinedScenario> {
        let normalised = key.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        PredefinedScenario::ALL
            .into_iter()
            .find(|s| s.key() == normalised)
            .ok_or_else(|| RiskEngineError::InvalidScenario(format!("Unknown scenario '{key}'")))
    }

    pub fn severity(&self) -> Severity {
        match self {
            PredefinedScenario::BlackMonday1987 | PredefinedScenario::FinancialCrisis2008 => {
                Severity::Extreme
            }
            PredefinedScenario::TechBubble2000
            | PredefinedScenario::Covid19Pandemic2020
            | PredefinedScenario::EquityMarketCrash
            | PredefinedScenario::CurrencyCrisis => Severity::Severe,
            PredefinedScenario::FlashCrash2010
            | PredefinedScenario::InterestRateShock
            | PredefinedScenario::CreditSpreadWidening
            | PredefinedScenario::GeopoliticalCrisis
            | PredefinedScenario::InflationShock
            | PredefinedScenario::CommodityPriceShock => Severity::Moderate,
        }
    }

    pub fn definition(&self) -> ScenarioDefinition {
        let (description, shocks, vols, duration_days): (&str, &[(&str, f64)], &[(&str, f64)], u32) =
            match self {
                PredefinedScenario::BlackMonday1987 => (
                    "One-day global equity collapse of October 19, 1987",
                    &[
                        (FACTOR_EQUITY, -0.226),
                        (FACTOR_RATES, 0.01),
                        (FACTOR_CREDIT, -0.02),
                        (FACTOR_COMMODITY, -0.05),
                        (FACTOR_CURRENCY, -0.02),
                    ],
                    &[(FACTOR_EQUITY, 3.0), (FACTOR_CREDIT, 1.5), (FACTOR_COMMODITY, 1.5)],
                    1,
                ),
                PredefinedScenario::TechBubble2000 => (
                    "Collapse of technology valuations, March 2000 to October 2002",
                    &[
                        (FACTOR_EQUITY, -0.49),
                        (FACTOR_RATES, 0.06),
                        (FACTOR_CREDIT, -0.05),
                    ],
                    &[(FACTOR_EQUITY, 2.0), (FACTOR_CREDIT, 1.3)],
                    945,
                ),
                PredefinedScenario::FinancialCrisis2008 => (
                    "Global financial crisis following the Lehman Brothers failure",
                    &[
                        (FACTOR_EQUITY, -0.38),
                        (FACTOR_RATES, 0.05),
                        (FACTOR_CREDIT, -0.20),
                        (FACTOR_COMMODITY, -0.35),
                        (FACTOR_REAL_ESTATE, -0.40),
                        (FACTOR_CURRENCY, -0.10),
                    ],
                    &[
                        (FACTOR_EQUITY, 3.0),
                        (FACTOR_CREDIT, 2.5),
                        (FACTOR_COMMODITY, 2.0),
                        (FACTOR_REAL_ESTATE, 2.0),
                    ],
                    517,
                ),
                PredefinedScenario::FlashCrash2010 => (
                    "Intraday liquidity collapse of May 6, 2010",
                    &[(FACTOR_EQUITY, -0.09)],
                    &[(FACTOR_EQUITY, 2.5)],
                    1,
                ),
                PredefinedScenario::Covid19Pandemic2020 => (
                    "Pandemic sell-off of February to March 2020",
                    &[
                        (FACTOR_EQUITY, -0.34),
                        (FACTOR_RATES, 0.03),
                        (FACTOR_CREDIT, -0.12),
                        (FACTOR_COMMODITY, -0.30),
                        (FACTOR_REAL_ESTATE, -0.25),
                    ],
                    &[(FACTOR_EQUITY, 3.5), (FACTOR_CREDIT, 2.0), (FACTOR_COMMODITY, 2.5)],
                    33,
                ),
                PredefinedScenario::InterestRateShock => (
                    "Sharp parallel rise in yields repricing duration assets",
                    &[
                        (FACTOR_RATES, -0.12),
                        (FACTOR_EQUITY, -0.08),
                        (FACTOR_CREDIT, -0.06),
                        (FACTOR_REAL_ESTATE, -0.10),
                    ],
                    &[(FACTOR_RATES, 2.0), (FACTOR_EQUITY, 1.3)],
                    90,
                ),
                PredefinedScenario::CreditSpreadWidening => (
                    "Broad repricing of corporate credit risk",
                    &[
                        (FACTOR_CREDIT, -0.15),
                        (FACTOR_EQUITY, -0.10),
                        (FACTOR_RATES, 0.02),
                    ],
                    &[(FACTOR_CREDIT, 2.0), (FACTOR_EQUITY, 1.5)],
                    60,
                ),
                PredefinedScenario::EquityMarketCrash => (
                    "Hypothetical 20% broad equity decline",
                    &[(FACTOR_EQUITY, -0.20)],
                    &[(FACTOR_EQUITY, 2.5)],
                    30,
                ),
                PredefinedScenario::CurrencyCrisis => (
                    "Disorderly depreciation of the portfolio's foreign exposures",
                    &[
                        (FACTOR_CURRENCY, -0.25),
                        (FACTOR_EQUITY, -0.12),
                        (FACTOR_COMMODITY, -0.05),
                    ],
                    &[(FACTOR_CURRENCY, 3.0), (FACTOR_EQUITY, 1.5)],
                    120,
                ),
                PredefinedScenario::GeopoliticalCrisis => (
                    "Armed conflict driving risk-off flows and an energy spike",
                    &[
                        (FACTOR_EQUITY, -0.12),
                        (FACTOR_COMMODITY, 0.20),
                        (FACTOR_CURRENCY, -0.05),
                        (FACTOR_RATES, 0.02),
                    ],
                    &[(FACTOR_EQUITY, 1.8), (FACTOR_COMMODITY, 2.0)],
                    45,
                ),
                PredefinedScenario::InflationShock => (
                    "Persistent inflation surprise forcing aggressive tightening",
                    &[
                        (FACTOR_RATES, -0.10),
                        (FACTOR_EQUITY, -0.15),
                        (FACTOR_COMMODITY, 0.25),
                        (FACTOR_REAL_ESTATE, -0.05),
                    ],
                    &[(FACTOR_RATES, 1.8), (FACTOR_EQUITY, 1.5)],
                    180,
                ),
                PredefinedScenario::CommodityPriceShock => (
                    "Commodity price collapse on a global demand shock",
                    &[
                        (FACTOR_COMMODITY, -0.40),
                        (FACTOR_EQUITY, -0.05),
                        (FACTOR_CURRENCY, -0.08),
                    ],
                    &[(FACTOR_COMMODITY, 2.5)],
                    90,
                ),
            };

        ScenarioDefinition {
            key: self.key().to_string(),
            name: self.name().to_string(),
            description: description.to_string(),
            severity: self.severity(),
            market_factors: factors(shocks),
            volatility_factors: factors(vols),
            duration_days,
        }
    }
}

impl fmt::Display for PredefinedScenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for PredefinedScenario {
    type Err = RiskEngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PredefinedScenario::from_key(s)
    }
}

// ---------------------------------------------------------------------------
// Custom scenarios
// ---------------------------------------------------------------------------

fn default_duration() -> u32 {
    1
}

/// User-defined scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomScenario {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Factor name -> price shock as a fraction. Must be non-empty.
    pub market_factors: BTreeMap<String, f64>,
    #[serde(default)]
    pub volatility_factors: BTreeMap<String, f64>,
    /// Correlation pairs that replace the portfolio's for VaR impact
    #[serde(default)]
    pub correlation_matrix: Option<CorrelationMatrix>,
    #[serde(default = "default_duration")]
    pub duration_days: u32,
    /// Explicit tier; derived from the largest absolute shock when absent
    #[serde(default)]
    pub severity: Option<Severity>,
}

impl CustomScenario {
    pub fn new(name: &str, market_factors: BTreeMap<String, f64>) -> Self {
        CustomScenario {
            name: name.to_string(),
            description: String::new(),
            market_factors,
            volatility_factors: BTreeMap::new(),
            correlation_matrix: None,
            duration_days: default_duration(),
            severity: None,
        }
    }

    pub fn validate(&self) -> RiskEngineResult<()> {
        if self.name.trim().is_empty() {
            return Err(RiskEngineError::InvalidScenario(
                "Custom scenario name must not be empty".into(),
            ));
        }
        if self.market_factors.is_empty() {
            return Err(RiskEngineError::InvalidScenario(format!(
                "Custom scenario '{}' has no market factors",
                self.name
            )));
        }
        for (factor, shock) in &self.market_factors {
            if !shock.is_finite() || *shock <= -1.0 {
                return Err(RiskEngineError::InvalidScenario(format!(
                    "Shock {shock} for factor '{factor}' must be finite and above -100%"
                )));
            }
        }
        for (factor, mult) in &self.volatility_factors {
            if !mult.is_finite() || *mult <= 0.0 {
                return Err(RiskEngineError::InvalidScenario(format!(
                    "Volatility multiplier {mult} for factor '{factor}' must be positive"
                )));
            }
        }
        if self.duration_days == 0 {
            return Err(RiskEngineError::InvalidScenario(
                "duration_days must be at least 1".into(),
            ));
        }
        if let Some(ref m) = self.correlation_matrix {
            m.validate()
                .map_err(|e| RiskEngineError::InvalidScenario(e.to_string()))?;
        }
        Ok(())
    }

    pub fn effective_severity(&self) -> Severity {
        self.severity.unwrap_or_else(|| {
            let max_abs = self
                .market_factors
                .values()
                .fold(0.0_f64, |acc, s| acc.max(s.abs()));
            Severity::from_max_shock(max_abs)
        })
    }

    /// Stable identifier: `custom:` followed by the slugged name.
    pub fn scenario_id(&self) -> String {
        let mut slug = String::with_capacity(self.name.len());
        let mut pending_sep = false;
        for ch in self.name.trim().chars() {
            if ch.is_ascii_alphanumeric() {
                if pending_sep && !slug.is_empty() {
                    slug.push('_');
                }
                slug.push(ch.to_ascii_lowercase());
                pending_sep = false;
            } else {
                pending_sep = true;
            }
        }
        format!("custom:{slug}")
    }
}

// ---------------------------------------------------------------------------
// Catalog listing
// ---------------------------------------------------------------------------

/// Read-only view of the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioCatalog {
    pub predefined: Vec<ScenarioDefinition>,
    pub severity_levels: Vec<SeverityLevel>,
}

pub fn scenario_catalog() -> ScenarioCatalog {
    ScenarioCatalog {
        predefined: PredefinedScenario::ALL.iter().map(|s| s.definition()).collect(),
        severity_levels: Severity::ALL
            .iter()
            .map(|s| SeverityLevel {
                severity: *s,
                liquidity_weight: s.liquidity_weight(),
                base_recovery_days: s.base_recovery_days(),
            })
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
