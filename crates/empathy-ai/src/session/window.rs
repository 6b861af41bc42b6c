//! Building the model input from the stored context and a new user turn.

use crate::{GenerationError, TokenId};

use super::types::OverflowPolicy;

/// Concatenate `context` and `new_tokens` under `policy`.
///
/// `new_tokens` always ends with `end_of_turn`, so the markers split the
/// context into whole turns; the sliding window only ever drops complete
/// leading segments.
pub(super) fn build_input(
    context: Option<&[TokenId]>,
    new_tokens: Vec<TokenId>,
    end_of_turn: TokenId,
    max_length: usize,
    policy: OverflowPolicy,
) -> Result<Vec<TokenId>, GenerationError> {
    let context = context.unwrap_or_default();

    match policy {
        OverflowPolicy::Passthrough => Ok(concat(context, new_tokens)),
        OverflowPolicy::Reject => {
            let len = context.len() + new_tokens.len();
            if len >= max_length {
                return Err(GenerationError::ContextExhausted {
                    len,
                    max: max_length,
                });
            }
            Ok(concat(context, new_tokens))
        }
        OverflowPolicy::SlidingWindow { reserve } => {
            let budget = max_length.saturating_sub(reserve).max(1);
            if new_tokens.len() > budget {
                return Err(GenerationError::ContextExhausted {
                    len: new_tokens.len(),
                    max: budget,
                });
            }
            let kept = trim_leading_turns(context, budget - new_tokens.len(), end_of_turn);
            Ok(concat(kept, new_tokens))
        }
    }
}

fn concat(context: &[TokenId], new_tokens: Vec<TokenId>) -> Vec<TokenId> {
    let mut input = Vec::with_capacity(context.len() + new_tokens.len());
    input.extend_from_slice(context);
    input.extend(new_tokens);
    input
}

/// Drop segments ending at `end_of_turn` from the front until at most
/// `room` tokens remain.
fn trim_leading_turns(context: &[TokenId], room: usize, end_of_turn: TokenId) -> &[TokenId] {
    let mut start = 0;
    while context.len() - start > room {
        match context[start..].iter().position(|&t| t == end_of_turn) {
            Some(offset) => start += offset + 1,
            None => return &[],
        }
    }
    &context[start..]
}
