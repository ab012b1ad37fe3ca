//! Survival-tip retriever.
//!
//! Owns the initialization lifecycle and the query path:
//! - `initialize()` loads the embedder, parses the corpus and embeds every tip
//! - `find_relevant_tips()` embeds the query and ranks tips by cosine similarity
//!
//! State moves `Uninitialized -> Initializing -> Ready | Failed` and never
//! leaves `Ready` or `Failed`. The ready snapshot is published in one step
//! after the whole index is built, so queries never see a partial index.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use crate::knowledge::{CorpusReadError, CorpusSource, Entry, KnowledgeError, KnowledgeStore};
use crate::semantic::embeddings::{Embedder, EmbedderLoader, EmbeddingError};
use crate::semantic::index::{cosine_similarity, EmbeddingIndex, IndexError};

/// Number of tips returned when the caller doesn't ask for a specific count.
pub const DEFAULT_TOP_N: usize = 2;

const UNINITIALIZED: u8 = 0;
const INITIALIZING: u8 = 1;
const READY: u8 = 2;
const FAILED: u8 = 3;

/// Lifecycle state of a [`Retriever`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrieverStatus {
    Uninitialized,
    Initializing,
    Ready,
    Failed,
}

impl RetrieverStatus {
    fn from_u8(value: u8) -> Self {
        match value {
            UNINITIALIZED => Self::Uninitialized,
            INITIALIZING => Self::Initializing,
            READY => Self::Ready,
            _ => Self::Failed,
        }
    }
}

/// Failures during initialization. These are logged and turned into the
/// `Failed` state, never returned from `initialize()`.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("Embedder error: {0}")]
    Embedder(#[from] EmbeddingError),

    #[error("Corpus error: {0}")]
    Corpus(#[from] CorpusReadError),

    #[error("Knowledge base error: {0}")]
    Knowledge(#[from] KnowledgeError),

    #[error("Failed to embed tip '{id}': {source}")]
    EntryEmbedding {
        id: String,
        #[source]
        source: EmbeddingError,
    },

    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    #[error("Initialization task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Errors surfaced by queries.
#[derive(Debug, thiserror::Error)]
pub enum RetrieverError {
    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<tokio::task::JoinError> for RetrieverError {
    fn from(e: tokio::task::JoinError) -> Self {
        RetrieverError::Internal(format!("Query task failed: {}", e))
    }
}

/// Everything a query needs, published once initialization succeeded.
struct ReadyState {
    embedder: Arc<dyn Embedder>,
    store: KnowledgeStore,
    index: EmbeddingIndex,
}

impl ReadyState {
    fn search(&self, query: &str, top_n: usize) -> Result<Vec<(Entry, f32)>, RetrieverError> {
        if self.store.is_empty() || top_n == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed(query)?;
        let ranked = rank(&self.store, &self.index, &query_embedding, top_n)?;

        Ok(ranked
            .into_iter()
            .map(|(entry, score)| (entry.clone(), score))
            .collect())
    }
}

/// Score every entry against `query` and keep the best `top_n`.
///
/// Sorting is stable, so equal scores keep knowledge-base order.
fn rank<'a>(
    store: &'a KnowledgeStore,
    index: &EmbeddingIndex,
    query: &[f32],
    top_n: usize,
) -> Result<Vec<(&'a Entry, f32)>, IndexError> {
    index.check_dimensions(query)?;

    let mut scored = store
        .iter()
        .map(|entry| -> Result<(&'a Entry, f32), IndexError> {
            let vector = index
                .get(&entry.id)
                .ok_or_else(|| IndexError::Missing(entry.id.clone()))?;
            Ok((entry, cosine_similarity(query, vector)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(top_n);

    Ok(scored)
}

/// Marks the retriever as failed if `initialize()` is dropped mid-flight.
struct InitGuard<'a> {
    retriever: &'a Retriever,
    armed: bool,
}

impl InitGuard<'_> {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for InitGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            log::warn!("Retriever initialization was cancelled");
            self.retriever.fail("initialization cancelled".to_string());
        }
    }
}

/// Finds the survival tips most relevant to a free-text query.
///
/// Construct once, await [`Retriever::initialize`] on startup, then share
/// (e.g. behind an `Arc`) for concurrent queries.
pub struct Retriever {
    corpus: Arc<dyn CorpusSource>,
    loader: Arc<dyn EmbedderLoader>,
    load_timeout: Option<Duration>,
    state: AtomicU8,
    ready: OnceLock<Arc<ReadyState>>,
    failure: OnceLock<String>,
    init_lock: tokio::sync::Mutex<()>,
}

impl Retriever {
    /// Create a retriever in the `Uninitialized` state. No I/O happens here.
    pub fn new(corpus: Arc<dyn CorpusSource>, loader: Arc<dyn EmbedderLoader>) -> Self {
        Self {
            corpus,
            loader,
            load_timeout: None,
            state: AtomicU8::new(UNINITIALIZED),
            ready: OnceLock::new(),
            failure: OnceLock::new(),
            init_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Give up on the embedder if loading it takes longer than `timeout`.
    pub fn with_load_timeout(mut self, timeout: Duration) -> Self {
        self.load_timeout = Some(timeout);
        self
    }

    /// Current lifecycle state. Reports `Ready` as soon as the snapshot is
    /// published, so it never disagrees with `is_initialized()`.
    pub fn status(&self) -> RetrieverStatus {
        if self.ready.get().is_some() {
            return RetrieverStatus::Ready;
        }
        RetrieverStatus::from_u8(self.state.load(Ordering::Acquire))
    }

    /// True once the knowledge base and its index are fully built.
    pub fn is_initialized(&self) -> bool {
        self.ready.get().is_some()
    }

    /// Why initialization failed, if it did.
    pub fn failure_reason(&self) -> Option<String> {
        self.failure.get().cloned()
    }

    /// Number of indexed tips. Returns 0 if not ready.
    pub fn len(&self) -> usize {
        self.ready.get().map(|s| s.store.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Load the embedder, parse the corpus and embed every tip.
    ///
    /// Does nothing if already `Ready`. Errors are logged and leave the
    /// retriever `Failed`; a new instance is needed to try again. Concurrent
    /// callers wait for the first one to finish.
    pub async fn initialize(&self) {
        if self.is_initialized() {
            return;
        }

        let _lock = self.init_lock.lock().await;
        match self.status() {
            RetrieverStatus::Ready => return,
            RetrieverStatus::Failed => {
                log::warn!(
                    "Retriever already failed ({}), not retrying",
                    self.failure_reason().unwrap_or_default()
                );
                return;
            }
            RetrieverStatus::Uninitialized | RetrieverStatus::Initializing => {}
        }

        self.state.store(INITIALIZING, Ordering::Release);
        let mut guard = InitGuard {
            retriever: self,
            armed: true,
        };

        log::info!("Initializing retriever from {}", self.corpus.describe());
        let result = self.build().await;
        guard.disarm();

        match result {
            Ok(ready) => {
                log::info!(
                    "Retriever ready: {} tips indexed with '{}'",
                    ready.store.len(),
                    ready.embedder.name()
                );
                // cannot already be set while init_lock is held
                let _ = self.ready.set(Arc::new(ready));
                self.state.store(READY, Ordering::Release);
            }
            Err(e) => {
                log::error!("Failed to initialize retriever: {}", e);
                self.fail(e.to_string());
            }
        }
    }

    /// Find the `top_n` tips most similar to `query`, best first.
    ///
    /// Returns an empty list if the retriever isn't ready. A failure to embed
    /// the query is returned as an error.
    pub async fn find_relevant_tips(
        &self,
        query: &str,
        top_n: usize,
    ) -> Result<Vec<Entry>, RetrieverError> {
        let scored = self.find_relevant_tips_scored(query, top_n).await?;
        Ok(scored.into_iter().map(|(entry, _)| entry).collect())
    }

    /// [`Retriever::find_relevant_tips`] with [`DEFAULT_TOP_N`].
    pub async fn find_relevant_tips_default(
        &self,
        query: &str,
    ) -> Result<Vec<Entry>, RetrieverError> {
        self.find_relevant_tips(query, DEFAULT_TOP_N).await
    }

    /// Same as `find_relevant_tips()` but keeps the similarity scores.
    pub async fn find_relevant_tips_scored(
        &self,
        query: &str,
        top_n: usize,
    ) -> Result<Vec<(Entry, f32)>, RetrieverError> {
        let Some(ready) = self.ready.get().cloned() else {
            log::warn!("Retriever not ready, cannot find tips");
            return Ok(Vec::new());
        };

        let query = query.to_string();
        tokio::task::spawn_blocking(move || ready.search(&query, top_n)).await?
    }

    fn fail(&self, reason: String) {
        let _ = self.failure.set(reason);
        self.state.store(FAILED, Ordering::Release);
    }

    async fn build(&self) -> Result<ReadyState, InitError> {
        let embedder = self.load_embedder().await?;

        let corpus = Arc::clone(&self.corpus);
        tokio::task::spawn_blocking(move || build_index(corpus.as_ref(), embedder)).await?
    }

    async fn load_embedder(&self) -> Result<Arc<dyn Embedder>, InitError> {
        let loader = Arc::clone(&self.loader);
        let task = tokio::task::spawn_blocking(move || loader.load());

        let joined = match self.load_timeout {
            Some(limit) => tokio::time::timeout(limit, task)
                .await
                .map_err(|_| EmbeddingError::DownloadTimeout(limit.as_secs()))?,
            None => task.await,
        };

        Ok(joined??)
    }
}

fn build_index(
    corpus: &dyn CorpusSource,
    embedder: Arc<dyn Embedder>,
) -> Result<ReadyState, InitError> {
    let raw = corpus.read()?;
    let store = KnowledgeStore::load(&raw)?;
    log::info!(
        "Loaded {} tips from {} (sha256 {})",
        store.len(),
        corpus.describe(),
        store.digest_hex()
    );

    let mut index = EmbeddingIndex::with_capacity(embedder.dimensions(), store.len());
    for entry in store.iter() {
        let embedding = embedder
            .embed(&entry.searchable_content())
            .map_err(|source| InitError::EntryEmbedding {
                id: entry.id.clone(),
                source,
            })?;
        index.insert(entry.id.clone(), embedding)?;
    }
    log::debug!("Generated embeddings for {} tips", index.len());

    Ok(ReadyState {
        embedder,
        store,
        index,
    })
}
