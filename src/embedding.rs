use crate::core::LogRagError;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::Mutex;

/// Maps text chunks to fixed-length vectors, order-preserving.
///
/// Trait seam so the indexing and retrieval pipeline can run against a
/// deterministic embedder in tests.
pub trait Embedder: Send + Sync {
    fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, LogRagError>;
    fn dim(&self) -> usize;
}

/// fastembed-backed embedder. The ONNX session needs `&mut` access, so it
/// sits behind a mutex and batches are serialized.
pub struct FastEmbedder {
    model: Mutex<TextEmbedding>,
    dim: usize,
}

impl FastEmbedder {
    pub fn new(model_name: &str) -> Result<Self, LogRagError> {
        Self::new_with_quiet(model_name, false)
    }

    pub fn new_with_quiet(model_name: &str, quiet: bool) -> Result<Self, LogRagError> {
        let model_enum = match model_name.to_lowercase().as_str() {
            "all-minilm-l6-v2" => EmbeddingModel::AllMiniLML6V2,
            "nomic-embed-text-v1.5" => EmbeddingModel::NomicEmbedTextV15,
            "bge-small-en-v1.5" => EmbeddingModel::BGESmallENV15,
            "bge-base-en-v1.5" => EmbeddingModel::BGEBaseENV15,
            _ => {
                tracing::warn!(
                    "Unknown embedding model '{}', falling back to AllMiniLML6V2",
                    model_name
                );
                EmbeddingModel::AllMiniLML6V2
            }
        };

        let mut options = InitOptions::new(model_enum);
        options.show_download_progress = !quiet;

        let mut model = TextEmbedding::try_new(options)
            .map_err(|e| LogRagError::Embedding(e.to_string()))?;

        // Determine dimension
        let warmup = model
            .embed(vec!["warmup".to_string()], None)
            .map_err(|e| LogRagError::Embedding(e.to_string()))?;
        let dim = warmup.first().map(|v| v.len()).unwrap_or(384);

        Ok(Self {
            model: Mutex::new(model),
            dim,
        })
    }
}

impl Embedder for FastEmbedder {
    fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, LogRagError> {
        let mut model = self
            .model
            .lock()
            .map_err(|e| LogRagError::Embedding(format!("embedder lock poisoned: {}", e)))?;
        model
            .embed(texts, None)
            .map_err(|e| LogRagError::Embedding(e.to_string()))
    }

    fn dim(&self) -> usize {
        self.dim
    }
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Deterministic hashing embedder: similar strings share trigram buckets,
    /// so cosine ranking behaves sensibly without a real model.
    pub struct HashEmbedder {
        dim: usize,
        pub calls: AtomicUsize,
        pub fail: AtomicBool,
    }

    impl HashEmbedder {
        pub fn new(dim: usize) -> Self {
            Self {
                dim,
                calls: AtomicUsize::new(0),
                fail: AtomicBool::new(false),
            }
        }

        fn embed_one(&self, text: &str) -> Vec<f32> {
            let mut vector = vec![0f32; self.dim.max(1)];
            let lowered = text.to_lowercase();
            let chars: Vec<char> = lowered.chars().collect();
            for window in chars.windows(3) {
                let token: String = window.iter().collect();
                let mut hash = 1469598103934665603u64;
                for byte in token.bytes() {
                    hash ^= byte as u64;
                    hash = hash.wrapping_mul(1099511628211);
                }
                let slot = (hash % vector.len() as u64) as usize;
                vector[slot] += 1.0;
            }
            let magnitude = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
            if magnitude > 0.0 {
                for v in &mut vector {
                    *v /= magnitude;
                }
            }
            vector
        }
    }

    impl Embedder for HashEmbedder {
        fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, LogRagError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(LogRagError::Embedding("mock embedder failure".to_string()));
            }
            Ok(texts.iter().map(|t| self.embed_one(t)).collect())
        }

        fn dim(&self) -> usize {
            self.dim
        }
    }
}
