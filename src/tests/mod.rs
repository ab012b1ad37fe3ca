//! Cross-module tests and the mock embedders they share.


use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::knowledge::StaticCorpus;
use crate::semantic::{Embedder, EmbedderLoader, EmbeddingError, Retriever};

/// Words mapped onto a handful of concept axes. Unknown words are ignored,
/// so text with no known words embeds to the zero vector.
const CONCEPTS: &[&[&str]] = &[
    &["water", "purify", "boil", "clean", "drink", "thirsty", "rain", "dew"],
    &["fire", "friction", "drill", "start", "ember", "tinder", "warm", "matches"],
    &["shelter", "ridge", "roof", "tarp", "sleep", "insulate"],
    &["food", "berries", "forage", "eat", "hungry", "plants"],
];

/// Deterministic bag-of-concepts embedder.
pub struct ConceptEmbedder {
    calls: AtomicUsize,
}

impl ConceptEmbedder {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn vectorize(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; CONCEPTS.len()];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(str::to_lowercase)
        {
            for (axis, words) in CONCEPTS.iter().enumerate() {
                if words.contains(&word.as_str()) {
                    vector[axis] += 1.0;
                }
            }
        }
        vector
    }
}

impl Embedder for ConceptEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Self::vectorize(text))
    }

    fn dimensions(&self) -> Option<usize> {
        Some(CONCEPTS.len())
    }

    fn name(&self) -> &str {
        "concepts"
    }
}

/// Fails whenever the text contains `poison`, otherwise behaves like
/// `ConceptEmbedder`. Texts containing `wide` get one extra dimension.
pub struct PickyEmbedder {
    pub poison: &'static str,
}

impl Embedder for PickyEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.contains(self.poison) {
            return Err(EmbeddingError::EmbeddingFailed(format!(
                "refusing to embed '{}'",
                text
            )));
        }

        let mut vector = ConceptEmbedder::vectorize(text);
        if text.contains("wide") {
            vector.push(1.0);
        }
        Ok(vector)
    }

    fn name(&self) -> &str {
        "picky"
    }
}

/// Hands out a prepared embedder and counts how often it was asked.
pub struct MockLoader {
    embedder: Arc<dyn Embedder>,
    delay: Option<Duration>,
    loads: AtomicUsize,
}

impl MockLoader {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            delay: None,
            loads: AtomicUsize::new(0),
        }
    }

    pub fn slow(embedder: Arc<dyn Embedder>, delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::new(embedder)
        }
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl EmbedderLoader for MockLoader {
    fn load(&self) -> Result<Arc<dyn Embedder>, EmbeddingError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        Ok(Arc::clone(&self.embedder))
    }
}

/// Loader whose model never comes up.
pub struct BrokenLoader;

impl EmbedderLoader for BrokenLoader {
    fn load(&self) -> Result<Arc<dyn Embedder>, EmbeddingError> {
        Err(EmbeddingError::InitFailed("model file missing".to_string()))
    }
}

pub const WATER_AND_FIRE: &str = r#"[
    {"main_category": "Water", "sub_category": "Purify", "tip": "Boil", "instruction": "Boil for 1 minute"},
    {"main_category": "Fire", "sub_category": "Start", "tip": "Friction", "instruction": "Use a bow drill"}
]"#;

pub fn retriever_with(corpus: &str, loader: Arc<dyn EmbedderLoader>) -> Retriever {
    Retriever::new(Arc::new(StaticCorpus::new(corpus)), loader)
}

/// Retriever over `corpus` backed by a fresh `ConceptEmbedder`.
pub fn concept_retriever(corpus: &str) -> (Retriever, Arc<ConceptEmbedder>) {
    let embedder = Arc::new(ConceptEmbedder::new());
    let loader = Arc::new(MockLoader::new(embedder.clone()));
    (retriever_with(corpus, loader), embedder)
}
