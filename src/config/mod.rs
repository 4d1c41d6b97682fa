//! Configuration types and loading.

mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    Ok(config)
}

/// Load config from the given path or return the default config when no path
/// is supplied or the file does not exist.
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    match custom_path {
        Some(path) if path.exists() => load_config(path),
        Some(path) => {
            tracing::warn!(path = ?path, "Config file not found, using defaults");
            Ok(Config::default())
        }
        None => Ok(Config::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_no_path_given() {
        let config = load_config_or_default(None).unwrap();
        assert_eq!(config.sync.batch_size, 100);
        assert_eq!(config.cache.max_size, 1000);
    }

    #[test]
    fn parses_partial_toml() {
        let toml_str = r#"
            [server]
            base_url = "http://media.local:32400"
            token = "secret"

            [sync]
            batch_size = 50
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.base_url, "http://media.local:32400");
        assert_eq!(config.server.token, "secret");
        assert_eq!(config.sync.batch_size, 50);
        // Unspecified sections fall back to defaults.
        assert_eq!(config.sync.worker_count, 3);
        assert_eq!(config.cache.ttl_widget_secs, 300);
    }
}
