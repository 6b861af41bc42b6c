//! Token usage tracking for a conversation session.

use crate::TokenUsage;

/// Tracks cumulative token usage across the generation calls of a session.
#[derive(Debug, Clone)]
pub struct TokenTracker {
    /// Total usage across all calls.
    total: TokenUsage,
    /// Number of successful generation calls.
    call_count: u64,
    /// Longest context handed to the model so far.
    peak_context: usize,
}

impl TokenTracker {
    pub fn new() -> Self {
        Self {
            total: TokenUsage::default(),
            call_count: 0,
            peak_context: 0,
        }
    }

    /// Record one generation: `prompt_len` tokens in, `generated` tokens out.
    pub fn record(&mut self, prompt_len: usize, generated: usize) {
        self.total.prompt_tokens += prompt_len as u64;
        self.total.generated_tokens += generated as u64;
        self.call_count += 1;
        self.peak_context = self.peak_context.max(prompt_len + generated);
    }

    /// Get total token usage.
    pub fn total(&self) -> &TokenUsage {
        &self.total
    }

    /// Get total tokens (prompt + generated).
    pub fn total_tokens(&self) -> u64 {
        self.total.total_tokens()
    }

    /// Get number of generation calls.
    pub fn call_count(&self) -> u64 {
        self.call_count
    }

    pub fn peak_context(&self) -> usize {
        self.peak_context
    }

    /// Reset all counters.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for TokenTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_empty() {
        let tracker = TokenTracker::new();
        assert_eq!(tracker.total_tokens(), 0);
        assert_eq!(tracker.call_count(), 0);
        assert_eq!(tracker.peak_context(), 0);
    }

    #[test]
    fn record_accumulates() {
        let mut tracker = TokenTracker::new();
        tracker.record(10, 5);
        tracker.record(20, 3);
        assert_eq!(tracker.total().prompt_tokens, 30);
        assert_eq!(tracker.total().generated_tokens, 8);
        assert_eq!(tracker.total_tokens(), 38);
        assert_eq!(tracker.call_count(), 2);
        assert_eq!(tracker.peak_context(), 23);
    }

    #[test]
    fn reset_clears_everything() {
        let mut tracker = TokenTracker::new();
        tracker.record(10, 5);
        tracker.reset();
        assert_eq!(tracker.total_tokens(), 0);
        assert_eq!(tracker.call_count(), 0);
        assert_eq!(tracker.peak_context(), 0);
    }
}
