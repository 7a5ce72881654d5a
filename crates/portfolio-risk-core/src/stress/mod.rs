//! Deterministic stress testing.
//!
//! A scenario is a set of per-factor price shocks and volatility
//! multipliers. Positions are mapped onto factors by a configurable
//! [`FactorMapping`], shocked, and revalued; the shocked volatilities feed a
//! parametric VaR recomputation that reports the change against the
//! unshocked baseline.

mod engine;
mod factors;
mod scenarios;
mod suite;

pub use engine::{apply_custom_scenario, apply_predefined_scenario, StressTestResult};
pub use factors::{FactorMapping, StressConfig, DEFAULT_STRESS_VAR_CONFIDENCE};
pub use scenarios::{
    scenario_catalog, CustomScenario, PredefinedScenario, ScenarioCatalog, ScenarioDefinition,
    Severity, SeverityLevel, FACTOR_COMMODITY, FACTOR_CREDIT, FACTOR_CURRENCY, FACTOR_EQUITY,
    FACTOR_RATES, FACTOR_REAL_ESTATE,
};
pub use suite::{run_comprehensive_suite, summarize, ComprehensiveStressReport, StressSuiteSummary};
