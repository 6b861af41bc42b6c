//! Full configuration validation.
//!
//! Validates numeric ranges and cross-field constraints. Each section has
//! its own submodule; this orchestrator calls them all and collects
//! errors into a single `ConfigError`.

mod generation;
mod helpers;
mod session;


use crate::schema::EmpathyConfig;
use empathy_common::ConfigError;

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &EmpathyConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    generation::validate_generation(&mut errors, config);
    session::validate_session(&mut errors, config);
    session::validate_model(&mut errors, config);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}
