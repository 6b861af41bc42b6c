//! The subset of a Hugging Face GPT-2 `config.json` the model needs.

use std::path::Path;

use serde::Deserialize;

use crate::GenerationError;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Gpt2Config {
    pub vocab_size: usize,
    pub n_positions: usize,
    pub n_embd: usize,
    pub n_layer: usize,
    pub n_head: usize,
    #[serde(default = "default_layer_norm_epsilon")]
    pub layer_norm_epsilon: f64,
    #[serde(default)]
    pub eos_token_id: Option<u32>,
    #[serde(default)]
    pub architectures: Vec<String>,
}

fn default_layer_norm_epsilon() -> f64 {
    1e-5
}

impl Gpt2Config {
    pub fn from_file(path: &Path) -> Result<Self, GenerationError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            GenerationError::Unavailable(format!("failed to read {}: {e}", path.display()))
        })?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| GenerationError::Unavailable(format!("invalid config.json: {e}")))?;
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<(), GenerationError> {
        if !self.architectures.is_empty()
            && !self.architectures.iter().any(|a| a == "GPT2LMHeadModel")
        {
            return Err(GenerationError::Unavailable(format!(
                "unsupported architecture {:?}, expected GPT2LMHeadModel",
                self.architectures
            )));
        }
        if self.n_head == 0 || self.n_embd % self.n_head != 0 {
            return Err(GenerationError::Unavailable(format!(
                "n_embd = {} is not divisible by n_head = {}",
                self.n_embd, self.n_head
            )));
        }
        Ok(())
    }

    pub fn head_dim(&self) -> usize {
        self.n_embd / self.n_head
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIALOGPT_MEDIUM: &str = r#"{
        "activation_function": "gelu_new",
        "architectures": ["GPT2LMHeadModel"],
        "bos_token_id": 50256,
        "eos_token_id": 50256,
        "layer_norm_epsilon": 1e-05,
        "model_type": "gpt2",
        "n_ctx": 1024,
        "n_embd": 1024,
        "n_head": 16,
        "n_layer": 24,
        "n_positions": 1024,
        "vocab_size": 50257
    }"#;

    #[test]
    fn parses_dialogpt_config() {
        let config: Gpt2Config = serde_json::from_str(DIALOGPT_MEDIUM).unwrap();
        assert!(config.check().is_ok());
        assert_eq!(config.vocab_size, 50257);
        assert_eq!(config.n_positions, 1024);
        assert_eq!(config.n_layer, 24);
        assert_eq!(config.head_dim(), 64);
        assert_eq!(config.eos_token_id, Some(50256));
    }

    #[test]
    fn rejects_other_architectures() {
        let json = DIALOGPT_MEDIUM.replace("GPT2LMHeadModel", "LlamaForCausalLM");
        let config: Gpt2Config = serde_json::from_str(&json).unwrap();
        let err = config.check().unwrap_err();
        assert!(err.to_string().contains("LlamaForCausalLM"));
    }

    #[test]
    fn rejects_uneven_heads() {
        let json = DIALOGPT_MEDIUM.replace("\"n_head\": 16", "\"n_head\": 7");
        let config: Gpt2Config = serde_json::from_str(&json).unwrap();
        assert!(config.check().is_err());
    }

    #[test]
    fn from_file_reports_missing_file() {
        let err = Gpt2Config::from_file(Path::new("/nonexistent/config.json")).unwrap_err();
        assert!(matches!(err, GenerationError::Unavailable(_)));
    }
}
