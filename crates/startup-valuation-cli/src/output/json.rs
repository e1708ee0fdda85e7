use serde_json::Value;

/// Default `--output json` rendering: the full result envelope, warnings
/// included, indented for reading.
pub fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(rendered) => println!("{rendered}"),
        Err(e) => eprintln!("Could not render result as JSON: {e}"),
    }
}
