//! Session options and state types.

use std::sync::Arc;
use std::time::Duration;

use empathy_config::schema::{EmpathyConfig, OverflowMode};

use super::manager::Session;

/// A session that several tasks can submit to. The mutex queues callers so
/// only one generation runs per session at a time.
pub type SharedSession = Arc<tokio::sync::Mutex<Session>>;

/// Whether the model has produced any context yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Empty,
    Active,
}

/// How the session keeps its input under the generation length bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Never truncate; the model decides what to do with an over-long input.
    Passthrough,
    /// Fail the turn with `ContextExhausted` when the input reaches the bound.
    Reject,
    /// Drop the oldest whole turns until input plus `reserve` fits.
    SlidingWindow { reserve: usize },
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Maximum total sequence length handed to the model.
    pub max_length: usize,
    pub overflow: OverflowPolicy,
    /// Display-only assistant turn seeded into a fresh session.
    pub greeting: Option<String>,
    pub timeout: Option<Duration>,
}

pub const DEFAULT_GREETING: &str = "Hi there. I'm listening. How are you feeling today?";

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            max_length: 1000,
            overflow: OverflowPolicy::Passthrough,
            greeting: Some(DEFAULT_GREETING.to_string()),
            timeout: None,
        }
    }
}

impl SessionOptions {
    pub fn from_config(config: &EmpathyConfig) -> Self {
        let overflow = match config.session.overflow {
            OverflowMode::Passthrough => OverflowPolicy::Passthrough,
            OverflowMode::Reject => OverflowPolicy::Reject,
            OverflowMode::SlidingWindow => OverflowPolicy::SlidingWindow {
                reserve: config.session.reserve_tokens as usize,
            },
        };
        let greeting = Some(config.session.greeting.clone()).filter(|g| !g.trim().is_empty());
        let timeout = match config.generation.timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(u64::from(secs))),
        };

        Self {
            max_length: config.generation.max_length as usize,
            overflow,
            greeting,
            timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_original_bot() {
        let options = SessionOptions::default();
        assert_eq!(options.max_length, 1000);
        assert_eq!(options.overflow, OverflowPolicy::Passthrough);
        assert_eq!(options.greeting.as_deref(), Some(DEFAULT_GREETING));
        assert!(options.timeout.is_none());
    }

    #[test]
    fn from_default_config_equals_defaults() {
        let options = SessionOptions::from_config(&EmpathyConfig::default());
        let defaults = SessionOptions::default();
        assert_eq!(options.max_length, defaults.max_length);
        assert_eq!(options.overflow, defaults.overflow);
        assert_eq!(options.greeting, defaults.greeting);
        assert_eq!(options.timeout, defaults.timeout);
    }

    #[test]
    fn from_config_maps_every_field() {
        let mut config = EmpathyConfig::default();
        config.generation.max_length = 512;
        config.generation.timeout_secs = 45;
        config.session.greeting = "   ".into();
        config.session.overflow = OverflowMode::SlidingWindow;
        config.session.reserve_tokens = 64;

        let options = SessionOptions::from_config(&config);
        assert_eq!(options.max_length, 512);
        assert_eq!(options.timeout, Some(Duration::from_secs(45)));
        assert!(options.greeting.is_none());
        assert_eq!(
            options.overflow,
            OverflowPolicy::SlidingWindow { reserve: 64 }
        );
    }
}
