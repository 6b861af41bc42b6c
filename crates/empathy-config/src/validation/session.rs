//! Validation for the `[session]` and `[model]` sections.

use crate::schema::{EmpathyConfig, OverflowMode};

use super::helpers::check_not_blank;

pub(crate) fn validate_session(errors: &mut Vec<String>, config: &EmpathyConfig) {
    let reserve = config.session.reserve_tokens;
    let max_length = config.generation.max_length;

    if config.session.overflow == OverflowMode::SlidingWindow && reserve >= max_length {
        errors.push(format!(
            "session.reserve_tokens = {reserve} must be smaller than generation.max_length = {max_length}"
        ));
    }
}

pub(crate) fn validate_model(errors: &mut Vec<String>, config: &EmpathyConfig) {
    if config.model.path.is_none() && config.model.repo.trim().is_empty() {
        errors.push("model.repo must be set when model.path is not".into());
    }
    check_not_blank(errors, "model.revision", &config.model.revision);
}
