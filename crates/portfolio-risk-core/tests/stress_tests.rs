use portfolio_risk_core::engine::{EngineConfig, RiskEngine};
use portfolio_risk_core::portfolio::{Portfolio, PortfolioInput, PositionInput};
use portfolio_risk_core::stress::{
    CustomScenario, FactorMapping, PredefinedScenario, Severity, FACTOR_EQUITY, FACTOR_RATES,
};
use portfolio_risk_core::{Currency, RiskEngineError};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn returns(amp: f64) -> Vec<f64> {
    (0..120).map(|i| if i % 3 == 0 { -amp } else { amp / 2.0 }).collect()
}

fn position(symbol: &str, qty: Decimal, price: Decimal, class: Option<&str>) -> PositionInput {
    PositionInput {
        symbol: symbol.into(),
        quantity: qty,
        current_price: price,
        historical_returns: returns(0.012),
        beta: None,
        asset_class: class.map(str::to_string),
    }
}

fn portfolio(positions: Vec<PositionInput>) -> Portfolio {
    Portfolio::new(PortfolioInput {
        id: "stress-pf".into(),
        name: "Stress Portfolio".into(),
        positions,
        benchmark: "SPY".into(),
        currency: Currency::USD,
        created_at: None,
        correlations: None,
    })
    .unwrap()
}

fn all_equity() -> Portfolio {
    portfolio(vec![position("SPY", dec!(25), dec!(400), None)])
}

fn balanced() -> Portfolio {
    portfolio(vec![
        position("SPY", dec!(30), dec!(400), Some("equity")),
        position("AGG", dec!(60), dec!(100), Some("bond")),
        position("LQD", dec!(40), dec!(110), Some("credit")),
        position("GLD", dec!(10), dec!(180), Some("commodity")),
        position("VNQ", dec!(20), dec!(85), Some("reit")),
    ])
}

fn shocks(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

// ---------------------------------------------------------------------------
// Predefined scenarios
// ---------------------------------------------------------------------------

#[test]
fn test_equity_market_crash_example() {
    let r = RiskEngine::default()
        .apply_predefined_scenario(&all_equity(), PredefinedScenario::EquityMarketCrash)
        .unwrap()
        .result;
    assert_eq!(r.pre_stress_value, dec!(10000));
    assert_eq!(r.post_stress_value, dec!(8000));
    assert_eq!(r.absolute_loss, dec!(2000));
    assert!((r.percentage_loss - 20.0).abs() < 1e-9);
    assert_eq!(r.scenario_id, "equity_market_crash");
    assert_eq!(r.scenario_name, "Equity Market Crash");
}

#[test]
fn test_every_scenario_satisfies_invariants() {
    let engine = RiskEngine::default();
    let p = balanced();
    for s in PredefinedScenario::ALL {
        let r = engine.apply_predefined_scenario(&p, s).unwrap().result;
        assert!(r.absolute_loss >= Decimal::ZERO, "{}", s.key());
        assert!(r.post_stress_value >= Decimal::ZERO);
        assert!((0.0..=1.0).contains(&r.liquidity_impact));
        assert!(r.recovery_time_estimate >= s.severity().base_recovery_days());
        let component_total: Decimal = r.component_losses.values().copied().sum();
        assert_eq!(component_total, r.pre_stress_value - r.post_stress_value);
    }
}

#[test]
fn test_worse_severity_recovers_slower_for_same_loss() {
    let engine = RiskEngine::default();
    let p = all_equity();
    let mut mild = CustomScenario::new("Mild", shocks(&[(FACTOR_EQUITY, -0.10)]));
    mild.severity = Some(Severity::Mild);
    let mut extreme = mild.clone();
    extreme.name = "Extreme".into();
    extreme.severity = Some(Severity::Extreme);

    let a = engine.apply_custom_scenario(&p, &mild).unwrap().result;
    let b = engine.apply_custom_scenario(&p, &extreme).unwrap().result;
    assert_eq!(a.absolute_loss, b.absolute_loss);
    assert!(b.recovery_time_estimate > a.recovery_time_estimate);
    assert!(b.liquidity_impact > a.liquidity_impact);
    // ceil(30 x 1.1)
    assert_eq!(a.recovery_time_estimate, 33);
    assert!(b.recovery_time_estimate >= 803);
}

// ---------------------------------------------------------------------------
// Custom scenarios
// ---------------------------------------------------------------------------

#[test]
fn test_flat_custom_scenario_has_no_loss() {
    let s = CustomScenario::new("Flat", shocks(&[("equity", 0.0)]));
    let r = RiskEngine::default()
        .apply_custom_scenario(&balanced(), &s)
        .unwrap()
        .result;
    assert_eq!(r.absolute_loss, Decimal::ZERO);
    assert_eq!(r.post_stress_value, r.pre_stress_value);
    assert_eq!(r.percentage_loss, 0.0);
}

#[test]
fn test_empty_custom_scenario_rejected() {
    let s = CustomScenario::new("Nothing", BTreeMap::new());
    let err = RiskEngine::default()
        .apply_custom_scenario(&balanced(), &s)
        .unwrap_err();
    assert!(matches!(err, RiskEngineError::InvalidScenario(_)));
}

#[test]
fn test_custom_scenario_from_json() {
    let s: CustomScenario = serde_json::from_str(
        r#"{
            "name": "Stagflation",
            "description": "Rates up, equities down",
            "market_factors": {"equity": -0.15, "rates": -0.07},
            "volatility_factors": {"equity": 1.8},
            "duration_days": 120
        }"#,
    )
    .unwrap();
    let r = RiskEngine::default()
        .apply_custom_scenario(&balanced(), &s)
        .unwrap()
        .result;
    assert_eq!(r.scenario_id, "custom:stagflation");
    assert_eq!(r.severity, Severity::Severe);
    // SPY 12000 x -15%, AGG 6000 x -7%
    assert_eq!(r.component_losses["SPY"], dec!(1800));
    assert_eq!(r.component_losses["AGG"], dec!(420));
    assert_eq!(r.component_losses["LQD"], Decimal::ZERO);
}

// ---------------------------------------------------------------------------
// Factor mapping
// ---------------------------------------------------------------------------

#[test]
fn test_symbol_override_splits_exposure() {
    let mut cfg = EngineConfig::default();
    cfg.stress.factor_mapping.symbol_overrides.insert(
        "SPY".into(),
        shocks(&[(FACTOR_EQUITY, 0.5), (FACTOR_RATES, 0.5)]),
    );
    let engine = RiskEngine::new(cfg).unwrap();
    let s = CustomScenario::new("Split", shocks(&[(FACTOR_EQUITY, -0.20), (FACTOR_RATES, -0.10)]));
    let r = engine.apply_custom_scenario(&all_equity(), &s).unwrap().result;
    // 0.5 x -20% + 0.5 x -10% = -15%
    assert_eq!(r.absolute_loss, dec!(1500));
}

#[test]
fn test_beta_scaling() {
    let mut input = position("NVDA", dec!(10), dec!(1000), None);
    input.beta = Some(1.5);
    let p = portfolio(vec![input]);

    let plain = RiskEngine::default()
        .apply_predefined_scenario(&p, PredefinedScenario::EquityMarketCrash)
        .unwrap()
        .result;
    assert_eq!(plain.absolute_loss, dec!(2000));

    let cfg = EngineConfig {
        stress: portfolio_risk_core::stress::StressConfig {
            factor_mapping: FactorMapping {
                beta_scaling: true,
                ..FactorMapping::default()
            },
            ..Default::default()
        },
        ..EngineConfig::default()
    };
    let scaled = RiskEngine::new(cfg)
        .unwrap()
        .apply_predefined_scenario(&p, PredefinedScenario::EquityMarketCrash)
        .unwrap()
        .result;
    assert_eq!(scaled.absolute_loss, dec!(3000));
}

#[test]
fn test_price_floored_at_zero() {
    let mut cfg = EngineConfig::default();
    cfg.stress
        .factor_mapping
        .symbol_overrides
        .insert("SPY".into(), shocks(&[(FACTOR_EQUITY, 3.0)]));
    let s = CustomScenario::new("Leveraged crash", shocks(&[(FACTOR_EQUITY, -0.5)]));
    let r = RiskEngine::new(cfg)
        .unwrap()
        .apply_custom_scenario(&all_equity(), &s)
        .unwrap()
        .result;
    assert_eq!(r.post_stress_value, Decimal::ZERO);
    assert_eq!(r.absolute_loss, dec!(10000));
    assert!((r.percentage_loss - 100.0).abs() < 1e-9);
}

// ---------------------------------------------------------------------------
// Comprehensive suite
// ---------------------------------------------------------------------------

#[test]
fn test_suite_has_one_entry_per_scenario() {
    let report = RiskEngine::default()
        .run_comprehensive_suite(&balanced())
        .unwrap()
        .result;
    assert_eq!(report.results.len(), PredefinedScenario::ALL.len());
    assert_eq!(report.summary.scenario_count, PredefinedScenario::ALL.len());
    for s in PredefinedScenario::ALL {
        assert_eq!(report.results[s.key()].scenario_id, s.key());
    }
}

#[test]
fn test_suite_summary_statistics() {
    let report = RiskEngine::default()
        .run_comprehensive_suite(&balanced())
        .unwrap()
        .result;
    let losses: Vec<f64> = report.results.values().map(|r| r.percentage_loss).collect();
    let max = losses.iter().cloned().fold(f64::MIN, f64::max);
    let min = losses.iter().cloned().fold(f64::MAX, f64::min);
    let avg = losses.iter().sum::<f64>() / losses.len() as f64;

    assert_eq!(report.summary.worst_case_loss, max);
    assert_eq!(report.summary.best_case_loss, min);
    assert!((report.summary.average_loss - avg).abs() < 1e-9);
    assert_eq!(
        report.results[&report.summary.worst_case_scenario].percentage_loss,
        max
    );
    let longest = report
        .results
        .values()
        .map(|r| r.recovery_time_estimate)
        .max()
        .unwrap();
    assert_eq!(report.summary.longest_recovery_days, longest);
}

#[test]
fn test_catalog_listing() {
    let catalog = RiskEngine::default().list_scenarios();
    assert_eq!(catalog.predefined.len(), 12);
    let severities: Vec<Severity> = catalog.severity_levels.iter().map(|l| l.severity).collect();
    assert_eq!(
        severities,
        vec![Severity::Mild, Severity::Moderate, Severity::Severe, Severity::Extreme]
    );
    let crash = catalog
        .predefined
        .iter()
        .find(|d| d.key == "equity_market_crash")
        .unwrap();
    assert_eq!(crash.market_factors[FACTOR_EQUITY], -0.20);
}
