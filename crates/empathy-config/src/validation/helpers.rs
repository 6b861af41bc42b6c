//! Building blocks for the section validators. Each one appends a
//! message to `errors` instead of failing, so every problem in a file is
//! reported at once.

use std::fmt::Display;
use std::ops::RangeInclusive;

/// `name` must lie inside `bounds`. NaN never does.
pub(crate) fn check_range<T>(errors: &mut Vec<String>, name: &str, value: T, bounds: RangeInclusive<T>)
where
    T: PartialOrd + Display,
{
    if !bounds.contains(&value) {
        errors.push(format!(
            "{name} = {value} is out of range [{}, {}]",
            bounds.start(),
            bounds.end()
        ));
    }
}

/// Optional settings are only checked when present.
pub(crate) fn check_optional_range<T>(
    errors: &mut Vec<String>,
    name: &str,
    value: Option<T>,
    bounds: RangeInclusive<T>,
) where
    T: PartialOrd + Display,
{
    if let Some(value) = value {
        check_range(errors, name, value, bounds);
    }
}

pub(crate) fn check_not_blank(errors: &mut Vec<String>, name: &str, value: &str) {
    if value.trim().is_empty() {
        errors.push(format!("{name} must not be empty"));
    }
}
