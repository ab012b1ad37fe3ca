use std::path::{Path, PathBuf};

/// Error raised when the corpus bytes cannot be obtained.
#[derive(Debug, thiserror::Error)]
pub enum CorpusReadError {
    #[error("failed to read corpus {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Provides the raw JSON bytes of the knowledge base.
pub trait CorpusSource: Send + Sync {
    fn read(&self) -> Result<Vec<u8>, CorpusReadError>;

    /// Human readable origin, used in log lines.
    fn describe(&self) -> String;
}

/// Corpus stored in a JSON file on disk.
#[derive(Clone, Debug)]
pub struct FileCorpus {
    path: PathBuf,
}

impl FileCorpus {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CorpusSource for FileCorpus {
    fn read(&self) -> Result<Vec<u8>, CorpusReadError> {
        std::fs::read(&self.path).map_err(|source| CorpusReadError::Io {
            path: self.path.clone(),
            source,
        })
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Corpus held in memory, e.g. compiled into the binary.
#[derive(Clone, Debug)]
pub struct StaticCorpus {
    bytes: Vec<u8>,
}

impl StaticCorpus {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }
}

impl CorpusSource for StaticCorpus {
    fn read(&self) -> Result<Vec<u8>, CorpusReadError> {
        Ok(self.bytes.clone())
    }

    fn describe(&self) -> String {
        format!("<memory, {} bytes>", self.bytes.len())
    }
}
