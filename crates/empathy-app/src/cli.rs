use std::path::PathBuf;

use clap::Parser;
use empathy_config::EmpathyConfig;

/// EmpathyBot: a terminal chat companion that listens.
#[derive(Parser, Debug)]
#[command(name = "empathybot", version, about)]
pub struct Args {
    /// Config file path override.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log filter override (e.g. `debug`, `empathy_ai=trace`).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Hugging Face model repository to load.
    #[arg(long)]
    pub model: Option<String>,

    /// Local directory holding an already downloaded model.
    #[arg(long, conflicts_with = "model")]
    pub model_path: Option<PathBuf>,

    /// Maximum total token length handed to the model.
    #[arg(long)]
    pub max_length: Option<u32>,

    /// Print the conversation as JSON on exit.
    #[arg(long)]
    pub json_history: bool,

    /// Print the effective config as JSON and exit.
    #[arg(long)]
    pub print_config: bool,
}

impl Args {
    /// Apply command-line overrides on top of the loaded config.
    pub fn apply_to(&self, config: &mut EmpathyConfig) {
        if let Some(repo) = &self.model {
            config.model.repo = repo.clone();
            config.model.path = None;
        }
        if let Some(path) = &self.model_path {
            config.model.path = Some(path.display().to_string());
        }
        if let Some(max_length) = self.max_length {
            config.generation.max_length = max_length;
        }
    }
}

pub fn parse() -> Args {
    Args::parse()
}
