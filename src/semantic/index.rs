//! In-memory embedding index keyed by entry id.
//!
//! Built once during initialization and read-only afterwards.

use std::collections::HashMap;

/// Errors that can occur during index operations.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Entry '{0}' is already indexed")]
    DuplicateId(String),

    #[error("Entry '{0}' has no embedding")]
    Missing(String),
}

/// Entry id -> embedding vector.
#[derive(Debug, Clone, Default)]
pub struct EmbeddingIndex {
    vectors: HashMap<String, Vec<f32>>,
    /// Fixed by the embedder, or by the first inserted vector
    dimensions: Option<usize>,
}

impl EmbeddingIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an index that only accepts vectors of the given length.
    pub fn with_dimensions(dimensions: usize) -> Self {
        Self {
            vectors: HashMap::new(),
            dimensions: Some(dimensions),
        }
    }

    pub fn with_capacity(dimensions: Option<usize>, capacity: usize) -> Self {
        Self {
            vectors: HashMap::with_capacity(capacity),
            dimensions,
        }
    }

    pub fn dimensions(&self) -> Option<usize> {
        self.dimensions
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Add the vector for an entry.
    ///
    /// The first insert fixes the dimensionality when it isn't known yet.
    /// Ids can only be inserted once.
    pub fn insert(&mut self, id: String, embedding: Vec<f32>) -> Result<(), IndexError> {
        self.check_dimensions(&embedding)?;

        if self.vectors.contains_key(&id) {
            return Err(IndexError::DuplicateId(id));
        }

        self.dimensions.get_or_insert(embedding.len());
        self.vectors.insert(id, embedding);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&[f32]> {
        self.vectors.get(id).map(Vec::as_slice)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.vectors.contains_key(id)
    }

    /// Ensure `vector` can be compared against the indexed vectors.
    pub fn check_dimensions(&self, vector: &[f32]) -> Result<(), IndexError> {
        match self.dimensions {
            Some(expected) if expected != vector.len() => Err(IndexError::DimensionMismatch {
                expected,
                got: vector.len(),
            }),
            _ => Ok(()),
        }
    }
}

/// Compute L2 norm of a vector.
fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Cosine similarity in [-1, 1].
///
/// Returns 0.0 when either vector has zero magnitude, when the lengths
/// differ, or when the result is not a finite number.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let norm_a = l2_norm(a);
    let norm_b = l2_norm(b);
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let similarity = dot_product / (norm_a * norm_b);
    if similarity.is_finite() {
        similarity.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}
