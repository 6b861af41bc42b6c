//! Validation for the `[generation]` section.

use crate::schema::EmpathyConfig;

use super::helpers::{check_optional_range, check_range};

pub(crate) fn validate_generation(errors: &mut Vec<String>, config: &EmpathyConfig) {
    let generation = &config.generation;

    check_range(errors, "generation.max_length", generation.max_length, 16..=4096);
    check_range(errors, "generation.timeout_secs", generation.timeout_secs, 0..=3600);
    check_range(
        errors,
        "generation.repeat_penalty",
        generation.repeat_penalty,
        1.0..=2.0,
    );
    check_optional_range(errors, "generation.temperature", generation.temperature, 0.0..=5.0);
    check_optional_range(errors, "generation.top_p", generation.top_p, 0.0..=1.0);

    if generation.top_p.is_some() && generation.temperature.is_none() {
        errors.push("generation.top_p has no effect without generation.temperature".into());
    }
}
