//! Locating model files, either in a local directory or on the Hugging Face hub.
//!
//! Resolution order for each artifact:
//! 1. weights: `model.safetensors`, then `pytorch_model.bin`
//! 2. tokenizer: `tokenizer.json`, then `vocab.json` + `merges.txt`
//!
//! `config.json` is always required.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use empathy_config::schema::ModelConfig;
use hf_hub::api::sync::{ApiBuilder, ApiRepo};
use hf_hub::{Cache, CacheRepo, Repo, RepoType};
use tracing::{debug, info, warn};

use crate::GenerationError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WeightsFile {
    Safetensors(PathBuf),
    Pytorch(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenizerFiles {
    Json(PathBuf),
    VocabMerges { vocab: PathBuf, merges: PathBuf },
}

/// Everything needed to build the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelFiles {
    pub config: PathBuf,
    pub weights: WeightsFile,
    pub tokenizer: TokenizerFiles,
}

/// Somewhere named model files can be fetched from.
pub trait FileSource {
    /// Local path of `name`; `Ok(None)` if the source does not have it.
    /// Any other failure (network, auth, disk) is an error.
    fn fetch(&self, name: &str) -> Result<Option<PathBuf>, GenerationError>;

    fn describe(&self) -> String;
}

/// A directory holding an already downloaded model.
pub struct LocalDir(pub PathBuf);

impl FileSource for LocalDir {
    fn fetch(&self, name: &str) -> Result<Option<PathBuf>, GenerationError> {
        let path = self.0.join(name);
        Ok(path.is_file().then_some(path))
    }

    fn describe(&self) -> String {
        self.0.display().to_string()
    }
}

/// A hub repository; files are downloaded into the local cache on first use.
///
/// The repository listing decides which files exist, so a download
/// failure is never mistaken for a missing file. When the hub cannot be
/// reached at all, files already in the local cache are used.
pub struct HubRepo {
    id: String,
    access: HubAccess,
}

enum HubAccess {
    Online { repo: ApiRepo, files: HashSet<String> },
    Offline { cache: CacheRepo, cause: String },
}

impl HubRepo {
    pub fn open(
        id: &str,
        revision: &str,
        cache_dir: Option<&Path>,
    ) -> Result<Self, GenerationError> {
        let repo_ref = Repo::with_revision(id.to_string(), RepoType::Model, revision.to_string());

        let mut builder = ApiBuilder::new().with_progress(true);
        if let Some(dir) = cache_dir {
            builder = builder.with_cache_dir(dir.to_path_buf());
        }
        let api = builder
            .build()
            .map_err(|e| GenerationError::Unavailable(format!("failed to open hub client: {e}")))?;
        let repo = api.repo(repo_ref.clone());

        match repo.info() {
            Ok(info) => {
                let files = info.siblings.into_iter().map(|s| s.rfilename).collect();
                Ok(Self {
                    id: format!("{id}@{revision}"),
                    access: HubAccess::Online { repo, files },
                })
            }
            Err(e) => {
                warn!(repo = id, "hub unreachable, falling back to the local cache: {e}");
                Ok(Self::offline(id, revision, cache_dir, e.to_string()))
            }
        }
    }

    /// Serve only what is already in the local cache; `cause` explains why
    /// the hub is not used.
    pub fn offline(id: &str, revision: &str, cache_dir: Option<&Path>, cause: String) -> Self {
        let cache = match cache_dir {
            Some(dir) => Cache::new(dir.to_path_buf()),
            None => Cache::from_env(),
        };
        let repo_ref = Repo::with_revision(id.to_string(), RepoType::Model, revision.to_string());
        Self {
            id: format!("{id}@{revision}"),
            access: HubAccess::Offline {
                cache: cache.repo(repo_ref),
                cause,
            },
        }
    }
}

impl FileSource for HubRepo {
    fn fetch(&self, name: &str) -> Result<Option<PathBuf>, GenerationError> {
        match &self.access {
            HubAccess::Online { repo, files } => {
                if !files.contains(name) {
                    debug!(repo = %self.id, file = name, "not in repository");
                    return Ok(None);
                }
                repo.get(name).map(Some).map_err(|e| {
                    GenerationError::Unavailable(format!(
                        "failed to download {name} from {}: {e}",
                        self.id
                    ))
                })
            }
            HubAccess::Offline { cache, .. } => Ok(cache.get(name)),
        }
    }

    fn describe(&self) -> String {
        match &self.access {
            HubAccess::Online { .. } => self.id.clone(),
            HubAccess::Offline { cause, .. } => {
                format!("the local cache of {} (hub unreachable: {cause})", self.id)
            }
        }
    }
}

/// Resolve model files for `config`, downloading from the hub when no
/// local `path` is configured.
pub fn resolve(config: &ModelConfig) -> Result<ModelFiles, GenerationError> {
    match &config.path {
        Some(dir) => resolve_from(&LocalDir(PathBuf::from(dir))),
        None => {
            let cache_dir = config.cache_dir.as_deref().map(Path::new);
            let repo = HubRepo::open(&config.repo, &config.revision, cache_dir)?;
            resolve_from(&repo)
        }
    }
}

pub fn resolve_from(source: &dyn FileSource) -> Result<ModelFiles, GenerationError> {
    let missing = |what: &str| {
        GenerationError::Unavailable(format!("{} has no {what}", source.describe()))
    };

    let config = source.fetch("config.json")?.ok_or_else(|| missing("config.json"))?;

    let weights = match source.fetch("model.safetensors")? {
        Some(path) => WeightsFile::Safetensors(path),
        None => source
            .fetch("pytorch_model.bin")?
            .map(WeightsFile::Pytorch)
            .ok_or_else(|| missing("model.safetensors or pytorch_model.bin"))?,
    };

    let tokenizer = match source.fetch("tokenizer.json")? {
        Some(path) => TokenizerFiles::Json(path),
        None => {
            let vocab = source.fetch("vocab.json")?;
            let merges = source.fetch("merges.txt")?;
            match (vocab, merges) {
                (Some(vocab), Some(merges)) => TokenizerFiles::VocabMerges { vocab, merges },
                _ => return Err(missing("tokenizer.json or vocab.json + merges.txt")),
            }
        }
    };

    info!(source = %source.describe(), ?weights, "model files resolved");
    Ok(ModelFiles {
        config,
        weights,
        tokenizer,
    })
}
