//! Decoding parameters handed to the language model.

use serde::{Deserialize, Serialize};

/// Generation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Upper bound on the total sequence length, context included
    /// (valid range: 16-4096).
    pub max_length: u32,
    /// Sampling temperature. Unset means greedy decoding.
    pub temperature: Option<f64>,
    /// Nucleus sampling cutoff, only used together with `temperature`.
    pub top_p: Option<f64>,
    /// 1.0 disables the penalty (valid range: 1.0-2.0).
    pub repeat_penalty: f32,
    pub repeat_last_n: u32,
    pub seed: u64,
    /// Seconds before a generation call is abandoned; 0 waits forever.
    pub timeout_secs: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_length: 1000,
            temperature: None,
            top_p: None,
            repeat_penalty: 1.0,
            repeat_last_n: 64,
            seed: 299_792_458,
            timeout_secs: 0,
        }
    }
}
