//! Pretrained collaborators and their one-time initialization.
//!
//! Loading DialoGPT takes seconds and hundreds of megabytes, so the
//! tokenizer and model are built once per process and shared by every
//! session through an `Arc<Engine>`.

use std::sync::{Arc, OnceLock};

use candle_core::Device;
use empathy_config::schema::{DeviceKind, EmpathyConfig};
use tokio::sync::OnceCell;
use tracing::info;

use crate::gpt2::{Gpt2Generator, SamplingConfig};
use crate::hub::{self, ModelFiles};
use crate::tokenizer::BpeTokenizer;
use crate::{GenerationError, LanguageModel, TextTokenizer};

/// The immutable tokenizer + model pair shared across sessions.
pub struct Engine {
    tokenizer: Arc<dyn TextTokenizer>,
    model: Arc<dyn LanguageModel>,
}

impl Engine {
    pub fn new(tokenizer: Arc<dyn TextTokenizer>, model: Arc<dyn LanguageModel>) -> Self {
        Self { tokenizer, model }
    }

    /// Resolve, download if needed, and load the configured model. Blocking.
    pub fn load(config: &EmpathyConfig) -> Result<Self, GenerationError> {
        let files = hub::resolve(&config.model)?;
        Self::from_files(&files, config)
    }

    pub fn from_files(files: &ModelFiles, config: &EmpathyConfig) -> Result<Self, GenerationError> {
        let device = select_device(config.model.device)?;
        let tokenizer = BpeTokenizer::from_files(&files.tokenizer)?;
        let model = Gpt2Generator::load(
            &files.config,
            &files.weights,
            &device,
            SamplingConfig::from_config(&config.generation),
        )?;

        info!(
            device = ?device,
            end_of_turn = tokenizer.end_of_turn(),
            "engine ready"
        );
        Ok(Self::new(Arc::new(tokenizer), Arc::new(model)))
    }

    pub fn tokenizer(&self) -> &Arc<dyn TextTokenizer> {
        &self.tokenizer
    }

    pub fn model(&self) -> &Arc<dyn LanguageModel> {
        &self.model
    }
}

fn select_device(kind: DeviceKind) -> Result<Device, GenerationError> {
    match kind {
        DeviceKind::Cpu => Ok(Device::Cpu),
        DeviceKind::Auto => Device::cuda_if_available(0)
            .map_err(|e| GenerationError::Unavailable(format!("failed to open device: {e}"))),
    }
}

/// A cell that runs its loader at most once, even under concurrent callers.
pub struct EngineCell {
    cell: OnceCell<Arc<Engine>>,
}

impl EngineCell {
    pub fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    /// Return the loaded engine, running `loader` on a blocking thread if
    /// this is the first call. A failed load leaves the cell empty so the
    /// next call tries again.
    pub async fn get_or_load<F>(&self, loader: F) -> Result<Arc<Engine>, GenerationError>
    where
        F: FnOnce() -> Result<Engine, GenerationError> + Send + 'static,
    {
        self.cell
            .get_or_try_init(|| async move {
                let engine = tokio::task::spawn_blocking(loader).await.map_err(|e| {
                    GenerationError::Unavailable(format!("model loading task failed: {e}"))
                })??;
                Ok::<_, GenerationError>(Arc::new(engine))
            })
            .await
            .cloned()
    }

    pub fn get(&self) -> Option<Arc<Engine>> {
        self.cell.get().cloned()
    }
}

impl Default for EngineCell {
    fn default() -> Self {
        Self::new()
    }
}

/// The process-wide engine. The first caller's config decides what is
/// loaded; later calls get the same instance whatever they pass.
pub async fn shared_engine(config: &EmpathyConfig) -> Result<Arc<Engine>, GenerationError> {
    static SHARED: OnceLock<EngineCell> = OnceLock::new();

    let config = config.clone();
    SHARED
        .get_or_init(EngineCell::new)
        .get_or_load(move || Engine::load(&config))
        .await
}
