//! The survival-tip knowledge base.
//!
//! - `entry`: a single tip and its searchable text
//! - `store`: parses the JSON corpus into an immutable, ordered store
//! - `source`: where the raw corpus bytes come from

mod entry;
mod source;
mod store;

pub use entry::Entry;
pub use source::{CorpusReadError, CorpusSource, FileCorpus, StaticCorpus};
pub use store::{KnowledgeError, KnowledgeStore};
