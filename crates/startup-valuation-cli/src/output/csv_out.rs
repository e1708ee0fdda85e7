use serde_json::Value;
use std::io;

use super::{flatten, format_cell};

/// Write output as CSV to stdout.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    let rows = match value {
        Value::Object(map) => match (map.get("results"), map.get("result")) {
            (Some(Value::Array(results)), _) => {
                write_array_csv(&mut wtr, results);
                None
            }
            (_, Some(result)) => Some(flatten(result)),
            _ => Some(flatten(value)),
        },
        Value::Array(arr) => {
            write_array_csv(&mut wtr, arr);
            None
        }
        _ => {
            let _ = wtr.write_record([format_cell(value)]);
            None
        }
    };

    if let Some(rows) = rows {
        let _ = wtr.write_record(["field", "value"]);
        for (key, val) in rows {
            let _ = wtr.write_record([key, format_cell(&val)]);
        }
    }

    let _ = wtr.flush();
}

fn write_array_csv<W: io::Write>(wtr: &mut csv::Writer<W>, arr: &[Value]) {
    let Some(Value::Object(first)) = arr.first() else {
        for item in arr {
            let _ = wtr.write_record([format_cell(item)]);
        }
        return;
    };

    let headers: Vec<&str> = first.keys().map(String::as_str).collect();
    let _ = wtr.write_record(&headers);
    for item in arr {
        if let Value::Object(map) = item {
            let row: Vec<String> = headers
                .iter()
                .map(|h| map.get(*h).map(format_cell).unwrap_or_default())
                .collect();
            let _ = wtr.write_record(&row);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_array_rows_share_first_row_headers() {
        let mut wtr = csv::Writer::from_writer(Vec::new());
        write_array_csv(
            &mut wtr,
            &[
                json!({ "metric": "avg_revenue", "value": "350000" }),
                json!({ "metric": "avg_team_size", "value": "15" }),
            ],
        );
        let text = String::from_utf8(wtr.into_inner().unwrap()).unwrap();
        assert_eq!(text, "metric,value\navg_revenue,350000\navg_team_size,15\n");
    }
}
