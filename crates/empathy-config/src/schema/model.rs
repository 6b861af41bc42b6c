//! Pretrained model location and execution device.

use serde::{Deserialize, Serialize};

/// Where generation runs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum DeviceKind {
    #[default]
    Cpu,
    /// CUDA device 0 when the build supports it, CPU otherwise.
    Auto,
}

/// Model source configuration.
///
/// When `path` is set the files are read from that directory and the hub
/// is never contacted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub repo: String,
    pub revision: String,
    pub path: Option<String>,
    pub cache_dir: Option<String>,
    pub device: DeviceKind,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            repo: "microsoft/DialoGPT-medium".into(),
            revision: "main".into(),
            path: None,
            cache_dir: None,
            device: DeviceKind::Cpu,
        }
    }
}
