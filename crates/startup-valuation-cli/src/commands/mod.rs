pub mod assess;
pub mod benchmarks;
pub mod scoring;
pub mod valuation;

use std::path::PathBuf;

use startup_valuation_core::config::EngineConfig;

use crate::store::JsonDirStore;

/// Settings shared by every subcommand.
pub struct Context {
    pub config: EngineConfig,
    pub store_dir: PathBuf,
}

impl Context {
    pub fn store(&self) -> JsonDirStore {
        JsonDirStore::new(&self.store_dir)
    }
}

/// Serialize a typed engine output into the value the formatters print.
pub fn to_value<T: serde::Serialize>(output: &T) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
    Ok(serde_json::to_value(output)?)
}

/// Prepend warnings raised outside the engine call (benchmark loading) to
/// the envelope's own list.
pub fn prepend_warnings(mut value: serde_json::Value, extra: Vec<String>) -> serde_json::Value {
    if extra.is_empty() {
        return value;
    }
    if let Some(map) = value.as_object_mut() {
        let mut all: Vec<serde_json::Value> = extra.into_iter().map(serde_json::Value::String).collect();
        if let Some(serde_json::Value::Array(existing)) = map.remove("warnings") {
            all.extend(existing);
        }
        map.insert("warnings".to_string(), serde_json::Value::Array(all));
    }
    value
}
