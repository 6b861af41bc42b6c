//! DialoGPT / GPT-2 text generation on candle.

mod config;
mod model;

use std::path::Path;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::generation::LogitsProcessor;
use empathy_config::schema::GenerationConfig;
use tracing::{debug, info};

use crate::hub::WeightsFile;
use crate::{GenerationError, LanguageModel, TokenId};

pub use config::Gpt2Config;
use model::Gpt2;

/// How the next token is picked from the logits.
///
/// With no temperature the choice is greedy (argmax), which makes
/// generation deterministic for a given input.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingConfig {
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    pub repeat_penalty: f32,
    pub repeat_last_n: usize,
    pub seed: u64,
}

impl SamplingConfig {
    pub fn greedy() -> Self {
        Self {
            temperature: None,
            top_p: None,
            repeat_penalty: 1.0,
            repeat_last_n: 64,
            seed: 0,
        }
    }

    pub fn from_config(config: &GenerationConfig) -> Self {
        Self {
            temperature: config.temperature,
            top_p: config.top_p,
            repeat_penalty: config.repeat_penalty,
            repeat_last_n: config.repeat_last_n as usize,
            seed: config.seed,
        }
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self::greedy()
    }
}

pub struct Gpt2Generator {
    model: Gpt2,
    device: Device,
    sampling: SamplingConfig,
}

impl Gpt2Generator {
    pub fn load(
        config_path: &Path,
        weights: &WeightsFile,
        device: &Device,
        sampling: SamplingConfig,
    ) -> Result<Self, GenerationError> {
        let config = Gpt2Config::from_file(config_path)?;
        let vb = match weights {
            WeightsFile::Safetensors(path) => {
                // SAFETY: the file is not modified while mapped.
                unsafe { VarBuilder::from_mmaped_safetensors(&[path], DType::F32, device) }
            }
            WeightsFile::Pytorch(path) => VarBuilder::from_pth(path, DType::F32, device),
        }
        .map_err(|e| GenerationError::Unavailable(format!("failed to read weights: {e}")))?;

        let generator = Self::from_var_builder(&config, vb, device, sampling)?;
        info!(
            layers = config.n_layer,
            n_embd = config.n_embd,
            n_positions = config.n_positions,
            "gpt2 model loaded"
        );
        Ok(generator)
    }

    pub fn from_var_builder(
        config: &Gpt2Config,
        vb: VarBuilder,
        device: &Device,
        sampling: SamplingConfig,
    ) -> Result<Self, GenerationError> {
        let model = Gpt2::load(config, vb)
            .map_err(|e| GenerationError::Unavailable(format!("failed to build gpt2: {e}")))?;
        Ok(Self {
            model,
            device: device.clone(),
            sampling,
        })
    }

    pub fn config(&self) -> &Gpt2Config {
        self.model.config()
    }

    fn run(
        &self,
        input: &[TokenId],
        max_length: usize,
        pad_token: TokenId,
    ) -> candle_core::Result<Vec<TokenId>> {
        let limit = max_length.min(self.model.config().n_positions);
        let mut tokens = input.to_vec();
        if tokens.len() >= limit {
            debug!(len = tokens.len(), limit, "input already at length limit");
            return Ok(tokens);
        }

        let eos = self.model.config().eos_token_id;
        let mut processor = LogitsProcessor::new(
            self.sampling.seed,
            self.sampling.temperature,
            self.sampling.top_p,
        );
        let mut cache = self.model.empty_cache();
        // number of tokens already in the cache
        let mut fed = 0;

        while tokens.len() < limit {
            let step = Tensor::new(&tokens[fed..], &self.device)?.unsqueeze(0)?;
            let logits = self.model.forward(&step, fed, &mut cache)?;
            fed = tokens.len();

            let logits = logits.to_dtype(DType::F32)?;
            let logits = if self.sampling.repeat_penalty == 1.0 {
                logits
            } else {
                let start = tokens.len().saturating_sub(self.sampling.repeat_last_n);
                candle_transformers::utils::apply_repeat_penalty(
                    &logits,
                    self.sampling.repeat_penalty,
                    &tokens[start..],
                )?
            };

            let next = processor.sample(&logits)?;
            tokens.push(next);
            if next == pad_token || Some(next) == eos {
                break;
            }
        }

        debug!(
            prompt = input.len(),
            generated = tokens.len() - input.len(),
            "generation finished"
        );
        Ok(tokens)
    }
}

impl LanguageModel for Gpt2Generator {
    fn generate(
        &self,
        input: &[TokenId],
        max_length: usize,
        pad_token: TokenId,
    ) -> Result<Vec<TokenId>, GenerationError> {
        if input.is_empty() {
            return Err(GenerationError::Model("cannot generate from empty input".into()));
        }
        self.run(input, max_length, pad_token)
            .map_err(|e| GenerationError::Model(e.to_string()))
    }

    fn max_positions(&self) -> Option<usize> {
        Some(self.model.config().n_positions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const VOCAB: usize = 11;
    // never produced, so generation only stops at the length limit
    const NO_PAD: TokenId = 1_000;

    fn tiny_config() -> Gpt2Config {
        serde_json::from_str(
            r#"{
                "architectures": ["GPT2LMHeadModel"],
                "vocab_size": 11,
                "n_positions": 16,
                "n_embd": 8,
                "n_layer": 2,
                "n_head": 2
            }"#,
        )
        .unwrap()
    }

    fn random(shape: &[usize]) -> Tensor {
        Tensor::randn(0f32, 0.5f32, shape, &Device::Cpu).unwrap()
    }

    /// Randomly initialised weights laid out like a GPT2LMHeadModel checkpoint.
    fn tiny_weights(config: &Gpt2Config) -> HashMap<String, Tensor> {
        let d = config.n_embd;
        let mut weights = HashMap::new();
        let mut put = |name: String, shape: &[usize]| {
            weights.insert(format!("transformer.{name}"), random(shape));
        };

        put("wte.weight".into(), &[config.vocab_size, d]);
        put("wpe.weight".into(), &[config.n_positions, d]);
        for i in 0..config.n_layer {
            for ln in ["ln_1", "ln_2"] {
                put(format!("h.{i}.{ln}.weight"), &[d]);
                put(format!("h.{i}.{ln}.bias"), &[d]);
            }
            put(format!("h.{i}.attn.c_attn.weight"), &[d, 3 * d]);
            put(format!("h.{i}.attn.c_attn.bias"), &[3 * d]);
            put(format!("h.{i}.attn.c_proj.weight"), &[d, d]);
            put(format!("h.{i}.attn.c_proj.bias"), &[d]);
            put(format!("h.{i}.mlp.c_fc.weight"), &[d, 4 * d]);
            put(format!("h.{i}.mlp.c_fc.bias"), &[4 * d]);
            put(format!("h.{i}.mlp.c_proj.weight"), &[4 * d, d]);
            put(format!("h.{i}.mlp.c_proj.bias"), &[d]);
        }
        put("ln_f.weight".into(), &[d]);
        put("ln_f.bias".into(), &[d]);
        weights
    }

    fn tiny_generator() -> Gpt2Generator {
        let config = tiny_config();
        let vb = VarBuilder::from_tensors(tiny_weights(&config), DType::F32, &Device::Cpu);
        Gpt2Generator::from_var_builder(&config, vb, &Device::Cpu, SamplingConfig::greedy())
            .unwrap()
    }

    #[test]
    fn output_extends_input_up_to_max_length() {
        let generator = tiny_generator();
        let input = [1, 2, 3];

        let output = generator.generate(&input, 8, NO_PAD).unwrap();
        assert_eq!(output.len(), 8);
        assert_eq!(&output[..3], &input);
        assert!(output.iter().all(|&t| (t as usize) < VOCAB));
    }

    #[test]
    fn stops_after_the_pad_token() {
        let generator = tiny_generator();
        let input = [4, 5];

        // greedy decoding: find the first token, then make it the stop token
        let first = generator.generate(&input, 3, NO_PAD).unwrap()[2];
        let output = generator.generate(&input, 10, first).unwrap();
        assert_eq!(output, vec![4, 5, first]);
    }

    #[test]
    fn greedy_generation_is_deterministic() {
        let generator = tiny_generator();
        let a = generator.generate(&[7, 1], 9, NO_PAD).unwrap();
        let b = generator.generate(&[7, 1], 9, NO_PAD).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn input_at_limit_is_returned_unchanged() {
        let generator = tiny_generator();
        let input = [1, 2, 3, 4];
        assert_eq!(generator.generate(&input, 4, NO_PAD).unwrap(), input);
        assert_eq!(generator.generate(&input, 2, NO_PAD).unwrap(), input);
    }

    #[test]
    fn length_is_capped_by_positions() {
        let generator = tiny_generator();
        let output = generator.generate(&[1], 100, NO_PAD).unwrap();
        assert_eq!(output.len(), generator.config().n_positions);
    }

    #[test]
    fn reports_its_position_limit() {
        assert_eq!(tiny_generator().max_positions(), Some(16));
    }

    #[test]
    fn empty_input_is_a_model_error() {
        let generator = tiny_generator();
        let err = generator.generate(&[], 8, NO_PAD).unwrap_err();
        assert!(matches!(err, GenerationError::Model(_)));
    }

    #[test]
    fn out_of_vocab_input_is_a_model_error() {
        let generator = tiny_generator();
        let err = generator.generate(&[500], 8, NO_PAD).unwrap_err();
        assert!(matches!(err, GenerationError::Model(_)));
    }

    #[test]
    fn cached_step_matches_full_forward() {
        let generator = tiny_generator();
        let model = &generator.model;
        let tokens = [3u32, 1, 4, 1];

        let mut cache = model.empty_cache();
        let prefix = Tensor::new(&tokens[..3], &Device::Cpu).unwrap().unsqueeze(0).unwrap();
        model.forward(&prefix, 0, &mut cache).unwrap();
        let last = Tensor::new(&tokens[3..], &Device::Cpu).unwrap().unsqueeze(0).unwrap();
        let cached: Vec<f32> = model.forward(&last, 3, &mut cache).unwrap().to_vec1().unwrap();

        let mut fresh_cache = model.empty_cache();
        let full = Tensor::new(&tokens[..], &Device::Cpu).unwrap().unsqueeze(0).unwrap();
        let fresh: Vec<f32> = model
            .forward(&full, 0, &mut fresh_cache)
            .unwrap()
            .to_vec1()
            .unwrap();

        assert_eq!(cached.len(), VOCAB);
        for (a, b) in cached.iter().zip(&fresh) {
            assert!((a - b).abs() < 1e-4, "{a} != {b}");
        }
    }

    #[test]
    fn loads_weights_without_transformer_prefix() {
        let config = tiny_config();
        let weights = tiny_weights(&config)
            .into_iter()
            .map(|(name, t)| (name.trim_start_matches("transformer.").to_string(), t))
            .collect();
        let vb = VarBuilder::from_tensors(weights, DType::F32, &Device::Cpu);
        let generator =
            Gpt2Generator::from_var_builder(&config, vb, &Device::Cpu, SamplingConfig::greedy())
                .unwrap();
        assert_eq!(generator.generate(&[1, 2], 5, NO_PAD).unwrap().len(), 5);
    }

    #[test]
    fn repeat_penalty_keeps_contract() {
        let config = tiny_config();
        let vb = VarBuilder::from_tensors(tiny_weights(&config), DType::F32, &Device::Cpu);
        let sampling = SamplingConfig {
            temperature: Some(0.8),
            top_p: Some(0.9),
            repeat_penalty: 1.3,
            repeat_last_n: 4,
            seed: 42,
        };
        let generator =
            Gpt2Generator::from_var_builder(&config, vb, &Device::Cpu, sampling).unwrap();

        let output = generator.generate(&[2, 2, 2], 9, NO_PAD).unwrap();
        assert_eq!(&output[..3], &[2, 2, 2]);
        assert_eq!(output.len(), 9);
    }

    #[test]
    fn sampling_follows_generation_config() {
        let config = GenerationConfig {
            temperature: Some(0.7),
            repeat_last_n: 32,
            ..GenerationConfig::default()
        };
        let sampling = SamplingConfig::from_config(&config);
        assert_eq!(sampling.temperature, Some(0.7));
        assert_eq!(sampling.repeat_last_n, 32);
        assert_eq!(sampling.seed, config.seed);
    }

    #[test]
    fn logits_have_vocab_width() {
        let generator = tiny_generator();
        let mut cache = generator.model.empty_cache();
        let tokens = Tensor::new(&[1u32, 2][..], &Device::Cpu).unwrap().unsqueeze(0).unwrap();
        let logits = generator.model.forward(&tokens, 0, &mut cache).unwrap();
        assert_eq!(logits.dims(), &[VOCAB]);
    }
}
