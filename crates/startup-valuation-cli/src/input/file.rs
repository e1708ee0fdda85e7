use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};

/// Read a JSON file and deserialise into a typed struct.
pub fn read_json<T: DeserializeOwned>(path: &str) -> Result<T, Box<dyn std::error::Error>> {
    let (canonical, contents) = read_text(path)?;
    let value: T = serde_json::from_str(&contents)
        .map_err(|e| format!("Failed to parse '{}': {}", canonical.display(), e))?;
    Ok(value)
}

/// Read a JSON or YAML file, chosen by extension (`.yaml`/`.yml` are YAML,
/// anything else is JSON).
pub fn read_structured<T: DeserializeOwned>(path: &str) -> Result<T, Box<dyn std::error::Error>> {
    let (canonical, contents) = read_text(path)?;
    let is_yaml = matches!(
        canonical.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    let parsed = if is_yaml {
        serde_yaml::from_str(&contents).map_err(|e| e.to_string())
    } else {
        serde_json::from_str(&contents).map_err(|e| e.to_string())
    };
    parsed
        .map_err(|e| format!("Failed to parse '{}': {}", canonical.display(), e).into())
}

fn read_text(path: &str) -> Result<(PathBuf, String), Box<dyn std::error::Error>> {
    let canonical = resolve_path(path)?;
    let contents = fs::read_to_string(&canonical)
        .map_err(|e| format!("Failed to read '{}': {}", canonical.display(), e))?;
    Ok((canonical, contents))
}

/// Resolve the path against the working directory and check it is a file.
fn resolve_path(path: &str) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let p = Path::new(path);
    let canonical = if p.is_absolute() {
        p.to_path_buf()
    } else {
        std::env::current_dir()?.join(p)
    };

    if !canonical.exists() {
        return Err(format!("File not found: {}", canonical.display()).into());
    }
    if !canonical.is_file() {
        return Err(format!("Not a file: {}", canonical.display()).into());
    }

    Ok(canonical)
}

#[cfg(test)]
mod tests {
    use super::*;
    use startup_valuation_core::config::EngineConfig;
    use std::io::Write;

    #[test]
    fn test_yaml_and_json_by_extension() {
        let dir = tempfile::tempdir().unwrap();

        let yaml = dir.path().join("engine.yaml");
        let mut f = fs::File::create(&yaml).unwrap();
        writeln!(f, "investment_pct: \"0.2\"\ndcf:\n  projection_years: 7").unwrap();
        let cfg: EngineConfig = read_structured(yaml.to_str().unwrap()).unwrap();
        assert_eq!(cfg.dcf.projection_years, 7);
        assert_eq!(cfg.investment_pct.to_string(), "0.2");

        let json = dir.path().join("engine.json");
        fs::write(&json, r#"{"methods": {"default_industry_multiple": "12"}}"#).unwrap();
        let cfg: EngineConfig = read_structured(json.to_str().unwrap()).unwrap();
        assert_eq!(cfg.methods.default_industry_multiple.to_string(), "12");
        assert_eq!(cfg.dcf.projection_years, 5);
    }

    #[test]
    fn test_missing_file_is_reported() {
        let err = read_json::<serde_json::Value>("/definitely/not/here.json").unwrap_err();
        assert!(err.to_string().contains("File not found"));
    }
}
