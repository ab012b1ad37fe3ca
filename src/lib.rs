//! Semantic lookup of survival tips.
//!
//! A [`Retriever`] embeds a fixed knowledge base of tips once at startup and
//! then returns the tips closest in meaning to a free-text query.

pub mod config;
pub mod knowledge;
pub mod semantic;
#[cfg(test)]
mod tests;

pub use config::{ConfigError, RetrieverConfig};
pub use knowledge::{Entry, KnowledgeStore};
pub use semantic::{Retriever, RetrieverError, RetrieverStatus, DEFAULT_TOP_N};
