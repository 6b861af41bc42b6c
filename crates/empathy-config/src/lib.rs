//! EmpathyBot configuration system.
//!
//! Provides TOML-based configuration with full validation. All config
//! sections use sensible defaults so partial configs work out of the box.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use empathy_config::{load_config, config_to_json};
//!
//! let config = load_config(None).expect("failed to load config");
//! let json = config_to_json(&config);
//! println!("{json}");
//! ```

pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use schema::{EmpathyConfig, CONFIG_SCHEMA_VERSION};

use empathy_common::ConfigError;
use std::path::Path;

/// Load config from `path`, or from the platform default path when `None`.
///
/// The default path is created with a commented template if missing; an
/// explicit path must exist. The result is validated.
pub fn load_config(path: Option<&Path>) -> Result<EmpathyConfig, ConfigError> {
    let config = match path {
        Some(path) => toml_loader::load_from_path(path)?,
        None => toml_loader::load_default()?,
    };

    validation::validate(&config)?;
    Ok(config)
}

/// Serialize a config to a pretty-printed JSON string.
pub fn config_to_json(config: &EmpathyConfig) -> String {
    serde_json::to_string_pretty(config)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize config: {e}\"}}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_to_json_contains_all_sections() {
        let config = EmpathyConfig::default();
        let json = config_to_json(&config);
        assert!(json.contains("\"model\""));
        assert!(json.contains("\"generation\""));
        assert!(json.contains("\"session\""));
        assert!(json.contains("\"logging\""));
        assert!(json.contains("\"microsoft/DialoGPT-medium\""));
    }

    #[test]
    fn config_schema_version_is_1() {
        assert_eq!(CONFIG_SCHEMA_VERSION, 1);
    }

    #[test]
    fn default_config_round_trips_through_json() {
        let config = EmpathyConfig::default();
        let json = config_to_json(&config);
        let parsed: EmpathyConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.generation.max_length, 1000);
        assert_eq!(parsed.session.greeting, config.session.greeting);
    }

    #[test]
    fn load_config_from_explicit_path_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[generation]\nmax_length = 4\n").unwrap();

        let err = load_config(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn load_config_from_missing_explicit_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");

        let err = load_config(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }
}
