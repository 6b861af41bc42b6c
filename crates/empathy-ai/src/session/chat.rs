//! Running one user turn through the model.

use tracing::{debug, info, warn};

use crate::{ChatError, GenerationError, TokenId, Turn};

use super::manager::Session;
use super::window::build_input;

impl Session {
    /// Submit a user message and return the model's reply.
    ///
    /// Blank messages are rejected without touching the session. On any
    /// collaborator failure the user turn stays in the log but the token
    /// context keeps its previous value. An empty reply is a success.
    pub async fn submit(&mut self, user_text: &str) -> Result<String, ChatError> {
        if user_text.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        self.turns.push(Turn::user(user_text));

        let tokenizer = self.engine.tokenizer().clone();
        let end_of_turn = tokenizer.end_of_turn();

        let mut new_tokens = tokenizer.encode(user_text)?;
        new_tokens.push(end_of_turn);

        let input = build_input(
            self.context.as_deref(),
            new_tokens,
            end_of_turn,
            self.options.max_length,
            self.options.overflow,
        )?;

        debug!(
            session = %self.id.short(),
            input_len = input.len(),
            max_length = self.options.max_length,
            "generating reply"
        );

        let output = self.run_model(input.clone(), end_of_turn).await?;
        check_output(&input, &output, self.options.max_length)?;

        let reply_tokens = &output[input.len()..];
        let reply = tokenizer.decode(reply_tokens, true)?;

        self.tracker.record(input.len(), reply_tokens.len());
        info!(
            session = %self.id.short(),
            context_len = output.len(),
            generated = reply_tokens.len(),
            "reply generated"
        );

        self.context = Some(output);
        self.turns.push(Turn::assistant(reply.clone()));
        Ok(reply)
    }

    /// Call the model on a blocking thread, bounded by the configured timeout.
    ///
    /// A call that times out keeps running in the background; it is parked
    /// in `abandoned` and awaited before the next call starts, so the model
    /// never runs twice at once for one session.
    async fn run_model(
        &mut self,
        input: Vec<TokenId>,
        pad_token: TokenId,
    ) -> Result<Vec<TokenId>, GenerationError> {
        self.wait_for_abandoned().await?;

        let model = self.engine.model().clone();
        let max_length = self.options.max_length;
        let mut task =
            tokio::task::spawn_blocking(move || model.generate(&input, max_length, pad_token));

        let joined = match self.options.timeout {
            Some(limit) => match tokio::time::timeout(limit, &mut task).await {
                Ok(joined) => joined,
                Err(_) => {
                    warn!(session = %self.id.short(), "generation timed out after {limit:?}");
                    self.abandoned = Some(task);
                    return Err(GenerationError::Timeout(limit));
                }
            },
            None => task.await,
        };

        joined.map_err(|e| GenerationError::Unavailable(format!("generation task failed: {e}")))?
    }

    /// Let a previously timed-out call finish. Its result is discarded.
    /// Waiting is bounded by the same timeout; if the old call is still
    /// running after that, this turn times out too.
    async fn wait_for_abandoned(&mut self) -> Result<(), GenerationError> {
        let Some(mut task) = self.abandoned.take() else {
            return Ok(());
        };
        debug!(session = %self.id.short(), "waiting for abandoned generation");

        match self.options.timeout {
            Some(limit) => {
                if tokio::time::timeout(limit, &mut task).await.is_err() {
                    warn!(session = %self.id.short(), "previous generation still running");
                    self.abandoned = Some(task);
                    return Err(GenerationError::Timeout(limit));
                }
            }
            None => {
                let _ = task.await;
            }
        }
        Ok(())
    }
}

/// The model may only append, and may not exceed `max_length` unless the
/// input already did.
fn check_output(
    input: &[TokenId],
    output: &[TokenId],
    max_length: usize,
) -> Result<(), GenerationError> {
    if output.len() < input.len() {
        return Err(GenerationError::Contract(format!(
            "output has {} tokens, input had {}",
            output.len(),
            input.len()
        )));
    }
    if let Some(pos) = input.iter().zip(output).position(|(a, b)| a != b) {
        return Err(GenerationError::Contract(format!(
            "output diverges from input at position {pos}"
        )));
    }
    if input.len() < max_length && output.len() > max_length {
        return Err(GenerationError::Contract(format!(
            "output has {} tokens, limit is {max_length}",
            output.len()
        )));
    }
    if input.len() >= max_length && output.len() > input.len() {
        return Err(GenerationError::Contract(format!(
            "input was already at the {max_length}-token limit but output grew"
        )));
    }
    Ok(())
}
