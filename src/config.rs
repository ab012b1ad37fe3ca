use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use homedir::my_home;
use serde::{Deserialize, Serialize};

use crate::knowledge::FileCorpus;
use crate::semantic::{self, FastEmbedLoader, Retriever};

const CONFIG_FILE: &str = "config.yaml";

/// Default location of the tip corpus
const DEFAULT_CORPUS_PATH: &str = "data/survival_tips.json";
/// Default model download timeout in seconds
const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config is malformed: {0}")]
    Yaml(#[from] serde_yml::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("could not determine home directory")]
    NoHome,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetrieverConfig {
    /// JSON file holding the tips. Relative paths are resolved against the
    /// base path, not the working directory.
    #[serde(default = "default_corpus_path")]
    pub corpus_path: PathBuf,

    /// Model name for embeddings (e.g., "all-MiniLM-L6-v2")
    #[serde(default = "default_model")]
    pub model: String,

    /// Where downloaded models live. Defaults to the base path.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    /// Timeout for model download in seconds
    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,

    /// Tips returned per query when not specified
    #[serde(default = "default_top_n")]
    pub default_top_n: usize,

    #[serde(skip_serializing, skip_deserializing)]
    base_path: PathBuf,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            corpus_path: default_corpus_path(),
            model: default_model(),
            cache_dir: None,
            download_timeout_secs: DEFAULT_DOWNLOAD_TIMEOUT_SECS,
            default_top_n: semantic::DEFAULT_TOP_N,
            base_path: PathBuf::new(),
        }
    }
}

fn default_corpus_path() -> PathBuf {
    PathBuf::from(DEFAULT_CORPUS_PATH)
}

fn default_model() -> String {
    semantic::DEFAULT_MODEL.to_string()
}

fn default_download_timeout_secs() -> u64 {
    DEFAULT_DOWNLOAD_TIMEOUT_SECS
}

fn default_top_n() -> usize {
    semantic::DEFAULT_TOP_N
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> ConfigError {
    let path = path.to_path_buf();
    move |source| ConfigError::Io { path, source }
}

impl RetrieverConfig {
    /// `TIPFINDER_BASE_PATH`, or `~/.local/share/tipfinder`.
    pub fn default_base_path() -> Result<PathBuf, ConfigError> {
        if let Ok(path) = std::env::var("TIPFINDER_BASE_PATH") {
            return Ok(PathBuf::from(path));
        }

        let home = my_home()
            .map_err(|_| ConfigError::NoHome)?
            .ok_or(ConfigError::NoHome)?;
        Ok(home.join(".local/share/tipfinder"))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        semantic::embeddings::parse_model_name(&self.model)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        if self.download_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "download_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.default_top_n == 0 {
            return Err(ConfigError::Invalid(
                "default_top_n must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Load `config.yaml` from `base_path`, writing the defaults first if
    /// the file doesn't exist.
    pub fn load_with(base_path: &Path) -> Result<Self, ConfigError> {
        std::fs::create_dir_all(base_path).map_err(io_error(base_path))?;
        let config_path = base_path.join(CONFIG_FILE);

        // create new if does not exist
        if !config_path.exists() {
            let defaults = serde_yml::to_string(&Self::default())?;
            std::fs::write(&config_path, defaults).map_err(io_error(&config_path))?;
        }

        let config_str = std::fs::read_to_string(&config_path).map_err(io_error(&config_path))?;
        let mut config: Self = serde_yml::from_str(&config_str)?;
        config.base_path = base_path.to_path_buf();

        config.validate()?;

        // resave in case config version needs an upgrade
        if config_str != serde_yml::to_string(&config)? {
            config.save()?;
        }

        Ok(config)
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        let path = self.base_path.join(CONFIG_FILE);
        let config_str = serde_yml::to_string(&self)?;
        std::fs::write(&path, config_str).map_err(|source| ConfigError::Io { path, source })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Absolute location of the corpus file.
    pub fn corpus_file(&self) -> PathBuf {
        self.base_path.join(&self.corpus_path)
    }

    /// Directory handed to the embedding backend.
    pub fn model_cache_dir(&self) -> PathBuf {
        self.cache_dir
            .clone()
            .unwrap_or_else(|| self.base_path.clone())
    }

    /// Build an uninitialized retriever wired to the corpus file and the
    /// configured fastembed model.
    pub fn build_retriever(&self) -> Retriever {
        let corpus = FileCorpus::new(self.corpus_file());
        let loader = FastEmbedLoader::new(&self.model, self.model_cache_dir());

        Retriever::new(Arc::new(corpus), Arc::new(loader))
            .with_load_timeout(Duration::from_secs(self.download_timeout_secs))
    }
}
