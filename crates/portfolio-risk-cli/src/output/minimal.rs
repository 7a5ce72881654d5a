use serde_json::{Map, Value};

/// Headline fields, most specific first.
const PRIORITY_KEYS: [&str; 5] = [
    "var_amount",
    "absolute_loss",
    "worst_case_loss",
    "test_passed",
    "record_count",
];

/// Print just the headline figure of a result.
///
/// Looks for known headline fields in priority order (also inside a nested
/// `summary`), then falls back to the first field of the result object.
pub fn print_minimal(value: &Value) {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    if let Value::Object(map) = result_obj {
        let summary = map.get("summary").and_then(Value::as_object);
        if let Some(val) = headline(map).or_else(|| summary.and_then(headline)) {
            println!("{}", format_minimal(val));
            return;
        }
        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, format_minimal(val));
            return;
        }
    }

    if let Some(Value::Array(rows)) = value.get("results") {
        println!("{}", rows.len());
        return;
    }
    println!("{}", format_minimal(result_obj));
}

fn headline(map: &Map<String, Value>) -> Option<&Value> {
    PRIORITY_KEYS
        .iter()
        .filter_map(|k| map.get(*k))
        .find(|v| !v.is_null())
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
