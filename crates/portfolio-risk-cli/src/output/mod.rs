pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use serde_json::{Map, Value};

use crate::OutputFormat;

/// What a command produced, recognised from the fields of its JSON.
#[derive(Debug)]
pub enum Report<'a> {
    Var(&'a Map<String, Value>),
    /// `var-scenarios`: every method's results, flattened in method order
    VarGrid(Vec<&'a Map<String, Value>>),
    Backtest(&'a Map<String, Value>),
    Stress(&'a Map<String, Value>),
    Suite {
        rows: Vec<&'a Map<String, Value>>,
        summary: &'a Map<String, Value>,
    },
    SuiteSummary(&'a Map<String, Value>),
    History(&'a [Value]),
    HistorySummary(&'a Map<String, Value>),
    Catalog(&'a [Value]),
    Other(&'a Value),
}

impl<'a> Report<'a> {
    pub fn classify(value: &'a Value) -> Report<'a> {
        if let Some(Value::Array(rows)) = value.get("results") {
            let first = rows.first();
            return if first.is_some_and(|r| r.get("key").is_some()) {
                Report::Catalog(rows)
            } else {
                Report::History(rows)
            };
        }
        match value.get("result") {
            Some(Value::Object(result)) => Self::classify_result(result).unwrap_or(Report::Other(value)),
            _ => Report::Other(value),
        }
    }

    fn classify_result(result: &'a Map<String, Value>) -> Option<Report<'a>> {
        let has = |k: &str| result.contains_key(k);
        if has("var_amount") {
            return Some(Report::Var(result));
        }
        if has("lr_statistic") {
            return Some(Report::Backtest(result));
        }
        if has("scenario_id") && has("absolute_loss") {
            return Some(Report::Stress(result));
        }
        if let (Some(Value::Object(by_key)), Some(Value::Object(summary))) =
            (result.get("results"), result.get("summary"))
        {
            let rows = by_key.values().filter_map(Value::as_object).collect();
            return Some(Report::Suite { rows, summary });
        }
        if has("worst_case_loss") {
            return Some(Report::SuiteSummary(result));
        }
        if has("record_count") {
            return Some(Report::HistorySummary(result));
        }
        let mut grid = Vec::new();
        for runs in result.values() {
            let runs = runs.as_array()?;
            for run in runs {
                grid.push(run.as_object().filter(|r| r.contains_key("var_amount"))?);
            }
        }
        (!grid.is_empty()).then_some(Report::VarGrid(grid))
    }
}

/// Print `value` in the requested format.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_grid_is_flattened() {
        let v = json!({"result": {
            "historical": [{"var_amount": "10"}, {"var_amount": "12"}],
            "parametric": [{"var_amount": "11"}],
        }});
        match Report::classify(&v) {
            Report::VarGrid(rows) => assert_eq!(rows.len(), 3),
            other => panic!("expected grid, got {other:?}"),
        }
    }

    #[test]
    fn test_suite_and_summary_only() {
        let full = json!({"result": {
            "portfolio_id": "p",
            "results": {"a": {"scenario_id": "a"}, "b": {"scenario_id": "b"}},
            "summary": {"worst_case_loss": 20.0},
        }});
        assert!(matches!(Report::classify(&full), Report::Suite { ref rows, .. } if rows.len() == 2));

        let summary = json!({"result": {"worst_case_loss": 20.0}, "warnings": []});
        assert!(matches!(Report::classify(&summary), Report::SuiteSummary(_)));
    }

    #[test]
    fn test_list_shapes() {
        let catalog = json!({"results": [{"key": "flash_crash_2010", "name": "Flash Crash"}]});
        assert!(matches!(Report::classify(&catalog), Report::Catalog(_)));
        let history = json!({"results": []});
        assert!(matches!(Report::classify(&history), Report::History(rows) if rows.is_empty()));
        let unknown = json!({"result": {"anything": 1}});
        assert!(matches!(Report::classify(&unknown), Report::Other(_)));
    }
}
