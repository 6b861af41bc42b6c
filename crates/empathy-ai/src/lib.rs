//! Conversation engine for EmpathyBot.
//!
//! Provides:
//! - The `TextTokenizer` / `LanguageModel` collaborator seams
//! - `Session`: turn log plus accumulated token context
//! - A GPT-2 backend (DialoGPT) running on candle
//! - Load-once engine initialization
//! - Token usage tracking

pub mod engine;
pub mod gpt2;
pub mod hub;
pub mod session;
pub mod token_tracker;
pub mod tokenizer;

use std::time::Duration;

pub use engine::{shared_engine, Engine, EngineCell};
pub use gpt2::{Gpt2Generator, SamplingConfig};
pub use session::{OverflowPolicy, Session, SessionOptions, SessionState, SharedSession};
pub use token_tracker::TokenTracker;
pub use tokenizer::BpeTokenizer;

/// Index into the model vocabulary.
pub type TokenId = u32;

/// Text <-> token conversion.
pub trait TextTokenizer: Send + Sync {
    fn encode(&self, text: &str) -> Result<Vec<TokenId>, GenerationError>;

    /// Decode tokens to text. With `skip_special` set, special tokens such
    /// as the end-of-turn marker are left out of the result.
    fn decode(&self, tokens: &[TokenId], skip_special: bool) -> Result<String, GenerationError>;

    /// The token that closes a turn. Also used as the padding token.
    fn end_of_turn(&self) -> TokenId;
}

/// Next-token generation.
///
/// Implementations only ever append: the returned sequence starts with
/// `input` verbatim and is at most `max_length` long, unless `input` is
/// already at least that long, in which case it comes back unchanged.
pub trait LanguageModel: Send + Sync {
    fn generate(
        &self,
        input: &[TokenId],
        max_length: usize,
        pad_token: TokenId,
    ) -> Result<Vec<TokenId>, GenerationError>;

    /// Longest sequence the model can attend over, if it has a fixed one.
    /// Sessions never ask for more than this.
    fn max_positions(&self) -> Option<usize> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One message in the human-readable log.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Turn {
    role: Role,
    text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub generated_tokens: u64,
}

impl TokenUsage {
    pub fn total_tokens(&self) -> u64 {
        self.prompt_tokens.saturating_add(self.generated_tokens)
    }
}

/// Any failure of the tokenizer or model collaborators.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("tokenizer error: {0}")]
    Tokenizer(String),
    #[error("model error: {0}")]
    Model(String),
    #[error("model output broke the append-only contract: {0}")]
    Contract(String),
    #[error("context of {len} tokens does not fit the {max}-token limit")]
    ContextExhausted { len: usize, max: usize },
    #[error("generation timed out after {0:?}")]
    Timeout(Duration),
    #[error("model unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("message is empty")]
    EmptyMessage,
    #[error(transparent)]
    Generation(#[from] GenerationError),
}

impl From<ChatError> for empathy_common::EmpathyError {
    fn from(err: ChatError) -> Self {
        empathy_common::EmpathyError::Ai(err.to_string())
    }
}

impl From<GenerationError> for empathy_common::EmpathyError {
    fn from(err: GenerationError) -> Self {
        empathy_common::EmpathyError::Ai(err.to_string())
    }
}
