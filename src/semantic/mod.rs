//! Semantic retrieval over the survival-tip knowledge base.
//!
//! This module embeds every tip once at startup and answers free-text
//! queries by cosine similarity against those embeddings.
//!
//! # Architecture
//!
//! - `embeddings`: `Embedder` capability and the fastembed-backed model
//! - `index`: In-memory id -> vector index and cosine similarity
//! - `retriever`: Initialization lifecycle and ranked queries

pub mod embeddings;
mod index;
mod retriever;

pub use embeddings::{Embedder, EmbedderLoader, EmbeddingError, EmbeddingModel, FastEmbedLoader};
pub use index::{cosine_similarity, EmbeddingIndex, IndexError};
pub use retriever::{
    InitError, Retriever, RetrieverError, RetrieverStatus, DEFAULT_TOP_N,
};

/// Default embedding model name
pub const DEFAULT_MODEL: &str = "all-MiniLM-L6-v2";
