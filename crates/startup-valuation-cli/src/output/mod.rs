pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::Value;

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// Flatten nested objects into `parent.child` rows so tabular formats can
/// show an assessment (valuation, score, resolved inputs) in one listing.
/// Arrays stay as a single cell.
pub fn flatten(value: &Value) -> Vec<(String, Value)> {
    let mut rows = Vec::new();
    flatten_into(&mut rows, String::new(), value);
    rows
}

fn flatten_into(rows: &mut Vec<(String, Value)>, prefix: String, value: &Value) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, val) in map {
                let name = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten_into(rows, name, val);
            }
        }
        _ => rows.push((prefix, value.clone())),
    }
}

/// Render a leaf for a table or CSV cell.
pub fn format_cell(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Array(arr) => arr.iter().map(format_cell).collect::<Vec<_>>().join(", "),
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flatten_nested_result() {
        let rows = flatten(&json!({
            "valuation": { "combined_valuation": "1200000", "used_default": false },
            "score": { "tier": "Good" },
            "persistence_failures": [],
        }));
        let mut names: Vec<&str> = rows.iter().map(|(k, _)| k.as_str()).collect();
        names.sort_unstable();
        assert_eq!(
            names,
            vec![
                "persistence_failures",
                "score.tier",
                "valuation.combined_valuation",
                "valuation.used_default",
            ]
        );
    }

    #[test]
    fn test_format_cell() {
        assert_eq!(format_cell(&json!("seed")), "seed");
        assert_eq!(format_cell(&json!(null)), "");
        assert_eq!(format_cell(&json!(["a", 2])), "a, 2");
    }
}
