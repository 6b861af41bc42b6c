//! Conversation session behavior.

use serde::{Deserialize, Serialize};

/// What the session does when the accumulated context reaches the
/// generation length bound.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum OverflowMode {
    /// Hand the full context to the model unchanged.
    #[default]
    Passthrough,
    /// Fail the turn before the model is called.
    Reject,
    /// Drop the oldest whole turns until the input fits.
    SlidingWindow,
}

/// Session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Assistant message shown when a conversation starts. Empty disables it.
    pub greeting: String,
    pub overflow: OverflowMode,
    /// Room left for the reply when `overflow = "sliding_window"`.
    pub reserve_tokens: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            greeting: "Hi there. I'm listening. How are you feeling today?".into(),
            overflow: OverflowMode::Passthrough,
            reserve_tokens: 200,
        }
    }
}
