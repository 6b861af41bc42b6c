//! GPT-2 byte-level BPE tokenizer backed by the `tokenizers` crate.

use std::path::Path;

use tokenizers::Tokenizer;

use crate::hub::TokenizerFiles;
use crate::{GenerationError, TextTokenizer, TokenId};

/// GPT-2's end-of-text token, which DialoGPT uses to close every turn.
pub const END_OF_TEXT: &str = "<|endoftext|>";

pub struct BpeTokenizer {
    inner: Tokenizer,
    end_of_turn: TokenId,
}

impl BpeTokenizer {
    pub fn from_files(files: &TokenizerFiles) -> Result<Self, GenerationError> {
        match files {
            TokenizerFiles::Json(path) => Self::from_file(path),
            TokenizerFiles::VocabMerges { vocab, merges } => Self::from_vocab_merges(vocab, merges),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, GenerationError> {
        let inner = Tokenizer::from_file(path).map_err(|e| {
            GenerationError::Tokenizer(format!("failed to load {}: {e}", path.display()))
        })?;
        Self::new(inner)
    }

    /// Assemble the tokenizer from the older `vocab.json` + `merges.txt`
    /// pair, which is all some GPT-2 checkpoints ship.
    pub fn from_vocab_merges(vocab: &Path, merges: &Path) -> Result<Self, GenerationError> {
        let read = |path: &Path| {
            std::fs::read_to_string(path).map_err(|e| {
                GenerationError::Tokenizer(format!("failed to read {}: {e}", path.display()))
            })
        };

        let vocab: serde_json::Value = serde_json::from_str(&read(vocab)?)
            .map_err(|e| GenerationError::Tokenizer(format!("invalid vocab.json: {e}")))?;
        let merges: Vec<String> = read(merges)?
            .lines()
            .filter(|line| !line.is_empty() && !line.starts_with("#version"))
            .map(str::to_string)
            .collect();

        let end_of_text_id = vocab
            .get(END_OF_TEXT)
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| {
                GenerationError::Tokenizer(format!("vocab.json has no {END_OF_TEXT} entry"))
            })?;

        let spec = serde_json::json!({
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": [{
                "id": end_of_text_id,
                "content": END_OF_TEXT,
                "single_word": false,
                "lstrip": false,
                "rstrip": false,
                "normalized": true,
                "special": true
            }],
            "normalizer": null,
            "pre_tokenizer": {
                "type": "ByteLevel",
                "add_prefix_space": false,
                "trim_offsets": true,
                "use_regex": true
            },
            "post_processor": null,
            "decoder": {
                "type": "ByteLevel",
                "add_prefix_space": true,
                "trim_offsets": true,
                "use_regex": true
            },
            "model": {
                "type": "BPE",
                "dropout": null,
                "unk_token": null,
                "continuing_subword_prefix": "",
                "end_of_word_suffix": "",
                "fuse_unk": false,
                "byte_fallback": false,
                "vocab": vocab,
                "merges": merges
            }
        });

        let inner = Tokenizer::from_bytes(spec.to_string().as_bytes())
            .map_err(|e| GenerationError::Tokenizer(format!("failed to build BPE: {e}")))?;
        Self::new(inner)
    }

    fn new(inner: Tokenizer) -> Result<Self, GenerationError> {
        let end_of_turn = inner.token_to_id(END_OF_TEXT).ok_or_else(|| {
            GenerationError::Tokenizer(format!("tokenizer has no {END_OF_TEXT} token"))
        })?;
        Ok(Self { inner, end_of_turn })
    }
}

impl TextTokenizer for BpeTokenizer {
    fn encode(&self, text: &str) -> Result<Vec<TokenId>, GenerationError> {
        let encoding = self
            .inner
            .encode(text, false)
            .map_err(|e| GenerationError::Tokenizer(format!("encode failed: {e}")))?;
        Ok(encoding.get_ids().to_vec())
    }

    fn decode(&self, tokens: &[TokenId], skip_special: bool) -> Result<String, GenerationError> {
        self.inner
            .decode(tokens, skip_special)
            .map_err(|e| GenerationError::Tokenizer(format!("decode failed: {e}")))
    }

    fn end_of_turn(&self) -> TokenId {
        self.end_of_turn
    }
}
