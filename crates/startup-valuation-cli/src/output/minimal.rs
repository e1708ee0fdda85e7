use serde_json::Value;

use super::format_cell;

/// Headline fields, most specific first. Nested paths cover the assessment
/// output, where the answer lives one level down.
const PRIORITY_PATHS: [&str; 8] = [
    "combined_valuation",
    "valuation/combined_valuation",
    "total_score",
    "score/total_score",
    "geometric_mean",
    "selected_valuation",
    "skipped",
    "reset",
];

/// Print just the headline value of a result.
pub fn print_minimal(value: &Value) {
    println!("{}", minimal_line(value));
}

fn minimal_line(value: &Value) -> String {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    for path in PRIORITY_PATHS {
        let pointer = format!("/{path}");
        if let Some(val) = result_obj.pointer(&pointer) {
            if !val.is_null() {
                return with_tier(result_obj, path, format_cell(val));
            }
        }
    }

    match result_obj {
        Value::Object(map) => match map.iter().next() {
            Some((key, val)) => format!("{key}: {}", format_cell(val)),
            None => String::new(),
        },
        other => format_cell(other),
    }
}

/// Scores read better with their tier: `57.25 (Good)`.
fn with_tier(result: &Value, path: &str, headline: String) -> String {
    let tier_path = match path {
        "total_score" => "/tier",
        "score/total_score" => "/score/tier",
        _ => return headline,
    };
    match result.pointer(tier_path).and_then(Value::as_str) {
        Some(tier) => format!("{headline} ({tier})"),
        None => headline,
    }
}
