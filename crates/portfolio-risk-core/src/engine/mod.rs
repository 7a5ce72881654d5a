//! Engine facade.
//!
//! A [`RiskEngine`] is built once from an [`EngineConfig`] and shared by
//! reference. It holds no mutable state, so one instance serves concurrent
//! callers without locking.

mod config;

pub use config::{EngineConfig, DEFAULT_PARALLEL_THRESHOLD};

use std::collections::BTreeMap;
use std::time::Instant;
use tracing::debug;

use crate::backtesting::{backtest_var_result, BacktestResult};
use crate::error::RiskEngineError;
use crate::parallel::maybe_parallel_map;
use crate::portfolio::Portfolio;
use crate::store::{ResultStore, RiskRecord, StoredRecord};
use crate::stress::{
    self, scenario_catalog, ComprehensiveStressReport, CustomScenario, PredefinedScenario,
    ScenarioCatalog, StressTestResult,
};
use crate::types::{with_metadata, ComputationOutput};
use crate::var::{self, VaRMethod, VaRResult};
use crate::RiskEngineResult;

/// A scenario of either kind.
#[derive(Debug, Clone, Copy)]
pub enum ScenarioRef<'a> {
    Predefined(PredefinedScenario),
    Custom(&'a CustomScenario),
}

/// VaR results grouped by method, each list in request order.
pub type VarScenarioGrid = BTreeMap<VaRMethod, Vec<VaRResult>>;

#[derive(Debug, Clone, Default)]
pub struct RiskEngine {
    config: EngineConfig,
}

impl RiskEngine {
    /// Build an engine, rejecting an invalid configuration up front.
    pub fn new(config: EngineConfig) -> RiskEngineResult<Self> {
        config.validate()?;
        Ok(RiskEngine { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // -- VaR --

    pub fn compute_var(
        &self,
        portfolio: &Portfolio,
        method: VaRMethod,
        confidence_level: f64,
        time_horizon_days: u32,
    ) -> RiskEngineResult<ComputationOutput<VaRResult>> {
        debug!(
            portfolio = portfolio.id(),
            method = %method,
            confidence_level,
            time_horizon_days,
            "computing VaR"
        );
        let cfg = &self.config.var;
        match method {
            VaRMethod::Historical => var::historical_var(portfolio, confidence_level, time_horizon_days, cfg),
            VaRMethod::Parametric => var::parametric_var(portfolio, confidence_level, time_horizon_days, cfg),
            VaRMethod::MonteCarlo => var::monte_carlo_var(portfolio, confidence_level, time_horizon_days, cfg),
            VaRMethod::Hybrid => var::hybrid_var(portfolio, confidence_level, time_horizon_days, cfg),
        }
    }

    /// Method given by name; unknown names fail with `UnsupportedMethod`
    /// before any computation.
    pub fn compute_var_named(
        &self,
        portfolio: &Portfolio,
        method: &str,
        confidence_level: f64,
        time_horizon_days: u32,
    ) -> RiskEngineResult<ComputationOutput<VaRResult>> {
        let method: VaRMethod = method.parse()?;
        self.compute_var(portfolio, method, confidence_level, time_horizon_days)
    }

    /// Every method at every confidence level and horizon.
    pub fn compute_var_scenarios(
        &self,
        portfolio: &Portfolio,
        confidence_levels: &[f64],
        time_horizons: &[u32],
    ) -> RiskEngineResult<ComputationOutput<VarScenarioGrid>> {
        let start = Instant::now();
        if confidence_levels.is_empty() || time_horizons.is_empty() {
            return Err(RiskEngineError::InvalidInput {
                field: "confidence_levels/time_horizons".into(),
                reason: "At least one confidence level and one horizon required".into(),
            });
        }
        for &c in confidence_levels {
            for &h in time_horizons {
                var::validate_parameters(c, h)?;
            }
        }

        let mut jobs = Vec::with_capacity(VaRMethod::ALL.len() * confidence_levels.len() * time_horizons.len());
        for method in VaRMethod::ALL {
            for &c in confidence_levels {
                for &h in time_horizons {
                    jobs.push((method, c, h));
                }
            }
        }
        let outcomes = maybe_parallel_map(&jobs, self.config.parallel_threshold, |(m, c, h)| {
            self.compute_var(portfolio, *m, *c, *h)
        });

        let mut grid: VarScenarioGrid = BTreeMap::new();
        let mut warnings = Vec::new();
        for outcome in outcomes {
            let out = outcome?;
            for w in out.warnings {
                let tagged = format!("{}: {}", out.result.method, w);
                if !warnings.contains(&tagged) {
                    warnings.push(tagged);
                }
            }
            grid.entry(out.result.method).or_default().push(out.result);
        }
        debug!(portfolio = portfolio.id(), jobs = jobs.len(), "VaR scenario grid complete");

        let elapsed = start.elapsed().as_micros() as u64;
        Ok(with_metadata(
            "VaR Scenario Grid",
            &serde_json::json!({
                "methods": VaRMethod::ALL.iter().map(|m| m.as_str()).collect::<Vec<_>>(),
                "confidence_levels": confidence_levels,
                "time_horizons": time_horizons,
            }),
            warnings,
            elapsed,
            grid,
        ))
    }

    pub fn backtest(
        &self,
        portfolio: &Portfolio,
        var: &VaRResult,
    ) -> RiskEngineResult<ComputationOutput<BacktestResult>> {
        backtest_var_result(portfolio, var)
    }

    // -- Stress --

    pub fn apply_predefined_scenario(
        &self,
        portfolio: &Portfolio,
        scenario: PredefinedScenario,
    ) -> RiskEngineResult<ComputationOutput<StressTestResult>> {
        debug!(portfolio = portfolio.id(), scenario = scenario.key(), "applying scenario");
        stress::apply_predefined_scenario(portfolio, scenario, &self.config.stress, &self.config.var)
    }

    pub fn apply_custom_scenario(
        &self,
        portfolio: &Portfolio,
        scenario: &CustomScenario,
    ) -> RiskEngineResult<ComputationOutput<StressTestResult>> {
        debug!(portfolio = portfolio.id(), scenario = %scenario.name, "applying custom scenario");
        stress::apply_custom_scenario(portfolio, scenario, &self.config.stress, &self.config.var)
    }

    pub fn apply_scenario(
        &self,
        portfolio: &Portfolio,
        scenario: ScenarioRef<'_>,
    ) -> RiskEngineResult<ComputationOutput<StressTestResult>> {
        match scenario {
            ScenarioRef::Predefined(s) => self.apply_predefined_scenario(portfolio, s),
            ScenarioRef::Custom(s) => self.apply_custom_scenario(portfolio, s),
        }
    }

    pub fn run_comprehensive_suite(
        &self,
        portfolio: &Portfolio,
    ) -> RiskEngineResult<ComputationOutput<ComprehensiveStressReport>> {
        stress::run_comprehensive_suite(
            portfolio,
            &self.config.stress,
            &self.config.var,
            self.config.parallel_threshold,
        )
    }

    /// Read-only catalog query; needs no portfolio.
    pub fn list_scenarios(&self) -> ScenarioCatalog {
        scenario_catalog()
    }

    // -- Compute and persist --

    /// Compute VaR and hand the result to `store`. A store failure is
    /// returned to the caller; the computed result is not.
    pub fn compute_and_store_var(
        &self,
        store: &dyn ResultStore,
        tenant_id: &str,
        portfolio: &Portfolio,
        method: VaRMethod,
        confidence_level: f64,
        time_horizon_days: u32,
    ) -> RiskEngineResult<(ComputationOutput<VaRResult>, StoredRecord)> {
        let out = self.compute_var(portfolio, method, confidence_level, time_horizon_days)?;
        let stored = store.store_result(RiskRecord::Var(out.result.clone()), tenant_id)?;
        Ok((out, stored))
    }

    pub fn apply_and_store_scenario(
        &self,
        store: &dyn ResultStore,
        tenant_id: &str,
        portfolio: &Portfolio,
        scenario: ScenarioRef<'_>,
    ) -> RiskEngineResult<(ComputationOutput<StressTestResult>, StoredRecord)> {
        let out = self.apply_scenario(portfolio, scenario)?;
        let stored = store.store_result(RiskRecord::Stress(out.result.clone()), tenant_id)?;
        Ok((out, stored))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portfolio::{PortfolioInput, PositionInput};
    use crate::store::InMemoryResultStore;
    use crate::types::Currency;
    use rust_decimal_macros::dec;

    fn pf() -> Portfolio {
        let returns: Vec<f64> = (0..260).map(|i| ((i * 29 % 83) as f64 - 41.0) / 3000.0).collect();
        Portfolio::new(PortfolioInput {
            id: "eng".into(),
            name: "Engine".into(),
            positions: vec![PositionInput {
                symbol: "SPY".into(),
                quantity: dec!(20),
                current_price: dec!(500),
                historical_returns: returns,
                beta: None,
                asset_class: None,
            }],
            benchmark: "SPY".into(),
            currency: Currency::USD,
            created_at: None,
            correlations: None,
        })
        .unwrap()
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut cfg = EngineConfig::default();
        cfg.var.monte_carlo_simulations = 10;
        assert!(RiskEngine::new(cfg).is_err());
    }

    #[test]
    fn test_named_method_boundary() {
        let engine = RiskEngine::default();
        let err = engine.compute_var_named(&pf(), "garch", 0.95, 1).unwrap_err();
        assert!(matches!(err, RiskEngineError::UnsupportedMethod(_)));
        assert!(engine.compute_var_named(&pf(), "parametric", 0.95, 1).is_ok());
    }

    #[test]
    fn test_scenario_grid_shape() {
        let engine = RiskEngine::default();
        let out = engine
            .compute_var_scenarios(&pf(), &[0.95, 0.99], &[1, 10])
            .unwrap();
        assert_eq!(out.result.len(), 4);
        for (method, results) in &out.result {
            assert_eq!(results.len(), 4, "{method}");
            assert!(results.iter().all(|r| r.method == *method));
            assert_eq!(results[0].confidence_level, 0.95);
            assert_eq!(results[1].time_horizon_days, 10);
        }
    }

    #[test]
    fn test_scenario_grid_rejects_bad_level() {
        let engine = RiskEngine::default();
        assert!(engine.compute_var_scenarios(&pf(), &[0.95, 1.5], &[1]).is_err());
        assert!(engine.compute_var_scenarios(&pf(), &[], &[1]).is_err());
    }

    #[test]
    fn test_compute_and_store() {
        let engine = RiskEngine::default();
        let store = InMemoryResultStore::new();
        let (out, stored) = engine
            .compute_and_store_var(&store, "acme", &pf(), VaRMethod::Historical, 0.99, 1)
            .unwrap();
        assert_eq!(stored.tenant_id, "acme");
        assert_eq!(store.len(), 1);
        match stored.record {
            RiskRecord::Var(v) => assert_eq!(v.var_amount, out.result.var_amount),
            RiskRecord::Stress(_) => panic!("expected a VaR record"),
        }
    }

    #[test]
    fn test_apply_and_store_custom() {
        let engine = RiskEngine::default();
        let store = InMemoryResultStore::new();
        let mut factors = BTreeMap::new();
        factors.insert("equity".to_string(), -0.1);
        let custom = CustomScenario::new("Dip", factors);
        let (out, _) = engine
            .apply_and_store_scenario(&store, "acme", &pf(), ScenarioRef::Custom(&custom))
            .unwrap();
        assert_eq!(out.result.absolute_loss, dec!(1000));
        let history = store.fetch_history("acme", Some("eng"), 1).unwrap();
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_list_scenarios() {
        let cat = RiskEngine::default().list_scenarios();
        assert_eq!(cat.predefined.len(), PredefinedScenario::ALL.len());
    }
}
