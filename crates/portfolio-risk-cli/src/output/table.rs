use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::Report;

const VAR_COLUMNS: [(&str, &str); 9] = [
    ("Method", "method"),
    ("Confidence", "confidence_level"),
    ("Horizon (d)", "time_horizon_days"),
    ("VaR", "var_amount"),
    ("ES", "expected_shortfall"),
    ("VaR %", "var_percentage"),
    ("Volatility", "volatility"),
    ("Obs", "observations"),
    ("Low confidence", "low_confidence"),
];

const BACKTEST_FIELDS: [&str; 9] = [
    "observations",
    "violations",
    "expected_violations",
    "violation_rate",
    "var_threshold",
    "lr_statistic",
    "critical_value",
    "p_value",
    "test_passed",
];

const STRESS_COLUMNS: [(&str, &str); 9] = [
    ("Scenario", "scenario_id"),
    ("Severity", "severity"),
    ("Pre-stress", "pre_stress_value"),
    ("Post-stress", "post_stress_value"),
    ("Loss", "absolute_loss"),
    ("Loss %", "percentage_loss"),
    ("VaR impact", "var_impact"),
    ("Liquidity", "liquidity_impact"),
    ("Recovery (d)", "recovery_time_estimate"),
];

const CATALOG_COLUMNS: [(&str, &str); 4] = [
    ("Key", "key"),
    ("Name", "name"),
    ("Severity", "severity"),
    ("Duration (d)", "duration_days"),
];

/// A titled block of rows ready for rendering.
#[derive(Debug)]
struct Section {
    title: Option<&'static str>,
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

/// Render a command result as one or more tables, followed by any
/// warnings and the methodology line of its envelope.
pub fn print_table(value: &Value) {
    let sections = sections(&Report::classify(value));
    for (i, section) in sections.iter().enumerate() {
        if i > 0 {
            println!();
        }
        if let Some(title) = section.title {
            println!("{title}");
        }
        if section.rows.is_empty() {
            println!("(no results)");
            continue;
        }
        let mut builder = Builder::default();
        builder.push_record(section.header.clone());
        for row in &section.rows {
            builder.push_record(row.clone());
        }
        println!("{}", Table::from(builder));
    }

    let warnings: Vec<&str> = value
        .get("warnings")
        .and_then(Value::as_array)
        .map(|ws| ws.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    if !warnings.is_empty() {
        println!("\nWarnings:");
        for w in warnings {
            println!("  - {w}");
        }
    }
    if let Some(methodology) = value.get("methodology").and_then(Value::as_str) {
        println!("\nMethodology: {methodology}");
    }
}

fn sections(report: &Report<'_>) -> Vec<Section> {
    match report {
        Report::Var(r) => vec![columns(None, &VAR_COLUMNS, [*r])],
        Report::VarGrid(rows) => vec![columns(None, &VAR_COLUMNS, rows.iter().copied())],
        Report::Backtest(r) => vec![fields(Some("Kupiec backtest"), r, Some(&BACKTEST_FIELDS[..]))],
        Report::Stress(r) => vec![columns(None, &STRESS_COLUMNS, [*r])],
        Report::Suite { rows, summary } => vec![
            columns(Some("Scenarios"), &STRESS_COLUMNS, rows.iter().copied()),
            fields(Some("Summary"), summary, None),
        ],
        Report::SuiteSummary(s) => vec![fields(Some("Summary"), s, None)],
        Report::History(rows) => vec![history(rows)],
        Report::HistorySummary(s) => vec![fields(Some("History summary"), s, None)],
        Report::Catalog(rows) => vec![columns(
            None,
            &CATALOG_COLUMNS,
            rows.iter().filter_map(Value::as_object),
        )],
        Report::Other(v) => match v.get("result").unwrap_or(*v) {
            Value::Object(m) => vec![fields(None, m, None)],
            other => vec![Section {
                title: None,
                header: vec!["Value".into()],
                rows: vec![vec![cell(other)]],
            }],
        },
    }
}

fn columns<'a>(
    title: Option<&'static str>,
    spec: &[(&str, &str)],
    rows: impl IntoIterator<Item = &'a Map<String, Value>>,
) -> Section {
    Section {
        title,
        header: spec.iter().map(|(h, _)| h.to_string()).collect(),
        rows: rows
            .into_iter()
            .map(|r| spec.iter().map(|(_, k)| r.get(*k).map(cell).unwrap_or_default()).collect())
            .collect(),
    }
}

/// Field/value listing, in `order` when given, else in key order.
fn fields(title: Option<&'static str>, map: &Map<String, Value>, order: Option<&[&str]>) -> Section {
    let keys: Vec<&str> = match order {
        Some(order) => order.to_vec(),
        None => map.keys().map(String::as_str).collect(),
    };
    Section {
        title,
        header: vec!["Field".into(), "Value".into()],
        rows: keys
            .into_iter()
            .filter_map(|k| map.get(k).map(|v| vec![k.to_string(), cell(v)]))
            .collect(),
    }
}

fn history(rows: &[Value]) -> Section {
    Section {
        title: None,
        header: ["Stored at", "Kind", "Portfolio", "Headline"]
            .map(String::from)
            .to_vec(),
        rows: rows
            .iter()
            .map(|row| {
                let text = |k: &str| row.get(k).map(cell).unwrap_or_default();
                vec![text("stored_at"), text("kind"), text("portfolio_id"), headline(row)]
            })
            .collect(),
    }
}

/// One-line summary of a stored record: method and VaR, or scenario and loss.
fn headline(row: &Value) -> String {
    let result = row.pointer("/record/result");
    let get = |k: &str| result.and_then(|r| r.get(k)).map(cell).unwrap_or_default();
    match row.get("kind").and_then(Value::as_str) {
        Some("var") => format!(
            "{} VaR {} @ {}",
            get("method"),
            get("var_amount"),
            get("confidence_level")
        ),
        Some("stress") => format!("{} loss {} ({}%)", get("scenario_id"), get("absolute_loss"), get("percentage_loss")),
        _ => String::new(),
    }
}

fn cell(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() => format!("{f:.4}"),
            _ => n.to_string(),
        },
        Value::Bool(b) => b.to_string(),
        Value::Null => "-".to_string(),
        Value::Array(items) => items.iter().map(cell).collect::<Vec<_>>().join(", "),
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
