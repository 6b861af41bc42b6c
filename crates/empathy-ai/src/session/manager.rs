//! Session struct and conversation state management.

use std::sync::Arc;
use std::time::Duration;

use empathy_common::SessionId;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::engine::Engine;
use crate::token_tracker::TokenTracker;
use crate::{GenerationError, Role, TokenId, Turn};

use super::types::{OverflowPolicy, SessionOptions, SessionState, SharedSession};

/// A model call running on the blocking pool.
pub(super) type GenerationTask = JoinHandle<Result<Vec<TokenId>, GenerationError>>;

/// One interactive conversation.
///
/// `turns` is what the user sees. `context` is the exact token stream the
/// model has consumed and produced, its own past replies included; it is
/// never rebuilt from `turns`.
pub struct Session {
    pub(super) id: SessionId,
    pub(super) turns: Vec<Turn>,
    pub(super) context: Option<Vec<TokenId>>,
    pub(super) engine: Arc<Engine>,
    pub(super) options: SessionOptions,
    pub(super) tracker: TokenTracker,
    /// A generation that outlived its timeout. It must finish before the
    /// next one starts.
    pub(super) abandoned: Option<GenerationTask>,
}

impl Session {
    /// Start an empty conversation, seeded with the greeting if one is set.
    pub fn new(engine: Arc<Engine>) -> Self {
        Self::with_options(engine, SessionOptions::default())
    }

    pub fn with_options(engine: Arc<Engine>, mut options: SessionOptions) -> Self {
        options.max_length = clamp_to_model(&engine, options.max_length);
        let mut session = Self {
            id: SessionId::new(),
            turns: Vec::new(),
            context: None,
            engine,
            options,
            tracker: TokenTracker::new(),
            abandoned: None,
        };
        session.seed_greeting();
        debug!(session = %session.id.short(), "session created");
        session
    }

    pub fn with_greeting(mut self, greeting: impl Into<String>) -> Self {
        self.options.greeting = Some(greeting.into());
        self.reseed_if_fresh();
        self
    }

    pub fn without_greeting(mut self) -> Self {
        self.options.greeting = None;
        self.reseed_if_fresh();
        self
    }

    /// Capped at the model's position limit, if it reports one.
    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.options.max_length = clamp_to_model(&self.engine, max_length);
        self
    }

    pub fn with_overflow(mut self, overflow: OverflowPolicy) -> Self {
        self.options.overflow = overflow;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = Some(timeout);
        self
    }

    /// Wrap the session so concurrent callers are serialized.
    pub fn into_shared(self) -> SharedSession {
        Arc::new(tokio::sync::Mutex::new(self))
    }

    fn seed_greeting(&mut self) {
        if let Some(greeting) = &self.options.greeting {
            self.turns.push(Turn::assistant(greeting.clone()));
        }
    }

    fn reseed_if_fresh(&mut self) {
        if self.context.is_none() && self.turns.iter().all(|t| t.role() == Role::Assistant) {
            self.turns.clear();
            self.seed_greeting();
        }
    }

    /// Snapshot of every turn, greeting included, in display order.
    pub fn history(&self) -> Vec<Turn> {
        self.turns.clone()
    }

    /// Borrowing view of the turn log.
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// The token stream the model has seen, if any exchange happened yet.
    pub fn context(&self) -> Option<&[TokenId]> {
        self.context.as_deref()
    }

    pub fn state(&self) -> SessionState {
        if self.context.is_some() {
            SessionState::Active
        } else {
            SessionState::Empty
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Get the token tracker.
    pub fn tracker(&self) -> &TokenTracker {
        &self.tracker
    }

    /// Number of turns in the log.
    pub fn turn_count(&self) -> usize {
        self.turns.len()
    }

    /// Forget the conversation and start over with a fresh greeting.
    pub fn reset(&mut self) {
        self.turns.clear();
        self.context = None;
        self.tracker.reset();
        self.seed_greeting();
        debug!(session = %self.id.short(), "session reset");
    }
}

/// `requested`, or the model's position limit when that is smaller.
fn clamp_to_model(engine: &Engine, requested: usize) -> usize {
    match engine.model().max_positions() {
        Some(limit) if requested > limit => {
            warn!(requested, limit, "max_length exceeds the model's positions, clamping");
            limit
        }
        _ => requested,
    }
}
