use chrono::{Duration, Utc};
use portfolio_risk_core::engine::{RiskEngine, ScenarioRef};
use portfolio_risk_core::portfolio::{Portfolio, PortfolioInput, PositionInput};
use portfolio_risk_core::store::{
    summarize_history, InMemoryResultStore, JsonLinesStore, ResultStore, RiskRecord,
};
use portfolio_risk_core::stress::PredefinedScenario;
use portfolio_risk_core::var::VaRMethod;
use portfolio_risk_core::{Currency, RiskEngineError};
use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;
use std::io::Write;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn portfolio(id: &str) -> Portfolio {
    let returns: Vec<f64> = (0..260).map(|i| ((i * 37 % 101) as f64 - 50.0) / 2500.0).collect();
    Portfolio::new(PortfolioInput {
        id: id.into(),
        name: format!("Portfolio {id}"),
        positions: vec![PositionInput {
            symbol: "QQQ".into(),
            quantity: dec!(40),
            current_price: dec!(450),
            historical_returns: returns,
            beta: None,
            asset_class: Some("equity".into()),
        }],
        benchmark: "SPY".into(),
        currency: Currency::USD,
        created_at: None,
        correlations: None,
    })
    .unwrap()
}

fn var_record(engine: &RiskEngine, p: &Portfolio, method: VaRMethod) -> RiskRecord {
    RiskRecord::Var(engine.compute_var(p, method, 0.95, 1).unwrap().result)
}

fn stress_record(engine: &RiskEngine, p: &Portfolio, s: PredefinedScenario) -> RiskRecord {
    RiskRecord::Stress(engine.apply_predefined_scenario(p, s).unwrap().result)
}

/// Exercise the shared contract against any backend.
fn check_contract(store: &dyn ResultStore) {
    let engine = RiskEngine::default();
    let a = portfolio("pf-a");
    let b = portfolio("pf-b");

    store
        .store_result(var_record(&engine, &a, VaRMethod::Historical), "acme")
        .unwrap();
    store
        .store_result(stress_record(&engine, &a, PredefinedScenario::FinancialCrisis2008), "acme")
        .unwrap();
    store
        .store_result(var_record(&engine, &b, VaRMethod::Parametric), "acme")
        .unwrap();
    store
        .store_result(var_record(&engine, &a, VaRMethod::Parametric), "globex")
        .unwrap();

    let acme = store.fetch_history("acme", None, 30).unwrap();
    assert_eq!(acme.len(), 3);
    assert!(acme.iter().all(|r| r.tenant_id == "acme"));

    let acme_a = store.fetch_history("acme", Some("pf-a"), 30).unwrap();
    assert_eq!(acme_a.len(), 2);
    let kinds: Vec<&str> = acme_a.iter().map(|r| r.record.kind()).collect();
    assert_eq!(kinds, vec!["var", "stress"]);

    assert_eq!(store.fetch_history("globex", None, 30).unwrap().len(), 1);
    assert!(store.fetch_history("initech", None, 30).unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// In-memory backend
// ---------------------------------------------------------------------------

#[test]
fn test_memory_store_contract() {
    let store = InMemoryResultStore::new();
    check_contract(&store);
    assert_eq!(store.len(), 4);
    assert_eq!(store.backend_name(), "memory");
}

#[test]
fn test_memory_store_clear() {
    let store = InMemoryResultStore::new();
    check_contract(&store);
    store.clear().unwrap();
    assert!(store.is_empty());
}

#[test]
fn test_empty_tenant_rejected() {
    let store = InMemoryResultStore::new();
    let engine = RiskEngine::default();
    let rec = var_record(&engine, &portfolio("pf-a"), VaRMethod::Parametric);
    let err = store.store_result(rec, "  ").unwrap_err();
    assert!(matches!(err, RiskEngineError::InvalidInput { .. }));
    assert!(store.fetch_history("", None, 30).is_err());
}

#[test]
fn test_since_days_window() {
    let store = InMemoryResultStore::new();
    let engine = RiskEngine::default();
    let p = portfolio("pf-a");

    let mut old = engine.compute_var(&p, VaRMethod::Parametric, 0.95, 1).unwrap().result;
    old.calculation_date = Utc::now() - Duration::days(45);
    store.store_result(RiskRecord::Var(old), "acme").unwrap();
    store
        .store_result(var_record(&engine, &p, VaRMethod::Historical), "acme")
        .unwrap();

    assert_eq!(store.fetch_history("acme", None, 30).unwrap().len(), 1);
    let all = store.fetch_history("acme", None, 60).unwrap();
    assert_eq!(all.len(), 2);
    // oldest first
    assert!(all[0].record.produced_at() < all[1].record.produced_at());
}

#[test]
fn test_unbounded_window_returns_everything() {
    let store = InMemoryResultStore::new();
    assert!(store.fetch_history("acme", None, u32::MAX).unwrap().is_empty());

    let engine = RiskEngine::default();
    let p = portfolio("pf-a");
    let mut ancient = engine.compute_var(&p, VaRMethod::Parametric, 0.95, 1).unwrap().result;
    ancient.calculation_date = Utc::now() - Duration::days(3650);
    store.store_result(RiskRecord::Var(ancient), "acme").unwrap();

    let dir = tempfile::tempdir().unwrap();
    let file = JsonLinesStore::open(dir.path().join("history.jsonl")).unwrap();
    file.store_result(var_record(&engine, &p, VaRMethod::Historical), "acme")
        .unwrap();

    assert_eq!(store.fetch_history("acme", None, u32::MAX).unwrap().len(), 1);
    assert_eq!(file.fetch_history("acme", Some("pf-a"), u32::MAX).unwrap().len(), 1);
}

// ---------------------------------------------------------------------------
// JSON lines backend
// ---------------------------------------------------------------------------

#[test]
fn test_jsonl_store_contract() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonLinesStore::open(dir.path().join("history.jsonl")).unwrap();
    check_contract(&store);
    assert_eq!(store.backend_name(), "jsonl");
}

#[test]
fn test_jsonl_missing_file_is_empty_history() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonLinesStore::open(dir.path().join("nested/deeper/history.jsonl")).unwrap();
    assert!(store.fetch_history("acme", None, 30).unwrap().is_empty());
    assert!(dir.path().join("nested/deeper").is_dir());
}

#[test]
fn test_jsonl_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.jsonl");
    let engine = RiskEngine::default();
    let p = portfolio("pf-a");

    let stored = {
        let store = JsonLinesStore::open(&path).unwrap();
        store
            .store_result(var_record(&engine, &p, VaRMethod::Parametric), "acme")
            .unwrap()
    };

    let reopened = JsonLinesStore::open(&path).unwrap();
    let history = reopened.fetch_history("acme", Some("pf-a"), 1).unwrap();
    assert_eq!(history.len(), 1);
    match (&history[0].record, &stored.record) {
        (RiskRecord::Var(read), RiskRecord::Var(written)) => {
            assert_eq!(read.var_amount, written.var_amount);
            assert_eq!(read.method, VaRMethod::Parametric);
            assert_eq!(read.component_var, written.component_var);
        }
        _ => panic!("expected a VaR record"),
    }
}

#[test]
fn test_jsonl_corrupt_line_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.jsonl");
    let store = JsonLinesStore::open(&path).unwrap();
    let engine = RiskEngine::default();
    store
        .store_result(var_record(&engine, &portfolio("pf-a"), VaRMethod::Parametric), "acme")
        .unwrap();

    let mut f = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
    writeln!(f, "{{not json").unwrap();

    match store.fetch_history("acme", None, 30) {
        Err(RiskEngineError::SerializationError(msg)) => assert!(msg.contains(":2:"), "{msg}"),
        other => panic!("expected serialization error, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Engine integration and reporting
// ---------------------------------------------------------------------------

#[test]
fn test_engine_store_and_summarize() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonLinesStore::open(dir.path().join("history.jsonl")).unwrap();
    let engine = RiskEngine::default();
    let p = portfolio("pf-a");

    for method in [VaRMethod::Historical, VaRMethod::Parametric, VaRMethod::Parametric] {
        engine
            .compute_and_store_var(&store, "acme", &p, method, 0.99, 1)
            .unwrap();
    }
    let (crash, _) = engine
        .apply_and_store_scenario(
            &store,
            "acme",
            &p,
            ScenarioRef::Predefined(PredefinedScenario::TechBubble2000),
        )
        .unwrap();
    engine
        .apply_and_store_scenario(
            &store,
            "acme",
            &p,
            ScenarioRef::Predefined(PredefinedScenario::FlashCrash2010),
        )
        .unwrap();

    let history = store.fetch_history("acme", Some("pf-a"), 7).unwrap();
    let report = summarize_history(&history);
    assert_eq!(report.record_count, 5);
    assert_eq!(report.var_count, 3);
    assert_eq!(report.stress_count, 2);
    assert_eq!(report.var_methods["parametric"], 2);
    assert_eq!(report.var_methods["historical"], 1);
    assert!(report.average_var_percentage.unwrap() <= report.max_var_percentage.unwrap());
    // Dot-com is deeper than the flash crash for an all-equity book
    assert_eq!(report.worst_stress_scenario.as_deref(), Some("tech_bubble_2000"));
    assert_eq!(report.worst_stress_loss, Some(crash.result.percentage_loss));
    assert!(report.first_produced_at <= report.last_produced_at);
}
