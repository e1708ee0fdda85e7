use startup_valuation_core::config::EngineConfig;
use tracing::debug;

use crate::input;

/// Load the engine configuration from `--config`, or the built-in defaults.
/// The loaded file is validated before any command runs.
pub fn load_config(path: Option<&str>) -> Result<EngineConfig, Box<dyn std::error::Error>> {
    let config = match path {
        Some(path) => {
            debug!(path, "Loading engine configuration");
            input::file::read_structured::<EngineConfig>(path)?
        }
        None => EngineConfig::default(),
    };
    config.validate()?;
    Ok(config)
}
