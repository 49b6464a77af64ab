use crate::core::LogRagError;
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;

/// One indexed log line with its embedding.
#[derive(Debug, Clone)]
pub struct ChunkEntry {
    pub id: String,
    pub text: String,
    pub vector: Vec<f32>,
}

/// A retrieval hit, ranked by descending cosine similarity.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredChunk {
    pub id: String,
    pub text: String,
    pub score: f32,
}

/// In-memory vector store keyed by sanitized filename.
///
/// Collections are replaced wholesale behind an `Arc`, so a reader holding
/// the previous version keeps a consistent view while a re-index swaps in
/// the new one. Collections live until process teardown; `clear` empties a
/// collection but never removes the key.
pub struct VectorStore {
    collections: DashMap<String, Arc<Vec<ChunkEntry>>>,
    // sanitized key -> original filename, to refuse silent merges
    key_owners: DashMap<String, String>,
}

/// Strips a filename down to ASCII alphanumerics, `_` and `-`.
pub fn sanitize_key(filename: &str) -> String {
    filename
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

impl VectorStore {
    pub fn new() -> Self {
        Self {
            collections: DashMap::new(),
            key_owners: DashMap::new(),
        }
    }

    /// Resolves and registers the collection key for `filename`.
    ///
    /// Two distinct filenames sanitizing to the same key is refused rather
    /// than silently merged.
    pub fn claim_key(&self, filename: &str) -> Result<String, LogRagError> {
        let key = sanitize_key(filename);
        let owner = self
            .key_owners
            .entry(key.clone())
            .or_insert_with(|| filename.to_string());
        if owner.value() != filename {
            return Err(LogRagError::CollectionKeyCollision {
                candidate: filename.to_string(),
                existing: owner.value().clone(),
                key,
            });
        }
        Ok(key)
    }

    /// Read-side key resolution: same collision check, but an unclaimed key
    /// is fine (the caller will see the collection as absent).
    pub fn lookup_key(&self, filename: &str) -> Result<String, LogRagError> {
        let key = sanitize_key(filename);
        if let Some(owner) = self.key_owners.get(&key) {
            if owner.value() != filename {
                return Err(LogRagError::CollectionKeyCollision {
                    candidate: filename.to_string(),
                    existing: owner.value().clone(),
                    key,
                });
            }
        }
        Ok(key)
    }

    /// Atomically swaps in a new version of the collection.
    pub fn replace(&self, key: &str, entries: Vec<ChunkEntry>) {
        self.collections.insert(key.to_string(), Arc::new(entries));
    }

    /// Empties the collection if it exists; absent collections stay absent.
    pub fn clear(&self, key: &str) {
        if self.collections.contains_key(key) {
            self.collections.insert(key.to_string(), Arc::new(Vec::new()));
        }
    }

    pub fn get(&self, key: &str) -> Option<Arc<Vec<ChunkEntry>>> {
        self.collections.get(key).map(|c| c.value().clone())
    }

    /// Top-`k` entries by cosine similarity to `query_vector`, best first.
    /// Fewer than `k` stored chunks returns all of them.
    pub fn query(
        &self,
        key: &str,
        query_vector: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredChunk>, LogRagError> {
        let collection = self
            .get(key)
            .ok_or_else(|| LogRagError::NotIndexed(key.to_string()))?;

        let mut hits: Vec<ScoredChunk> = collection
            .iter()
            .map(|entry| ScoredChunk {
                id: entry.id.clone(),
                text: entry.text.clone(),
                score: cosine_sim(query_vector, &entry.vector),
            })
            .collect();
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(k);
        Ok(hits)
    }
}

impl Default for VectorStore {
    fn default() -> Self {
        Self::new()
    }
}

fn cosine_sim(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if mag_a < f32::EPSILON || mag_b < f32::EPSILON {
        0.0
    } else {
        dot / (mag_a * mag_b)
    }
}
