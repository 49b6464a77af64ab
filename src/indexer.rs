use crate::core::LogRagError;
use crate::embedding::Embedder;
use crate::store::{ChunkEntry, VectorStore};
use dashmap::DashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// One non-empty, trimmed line of a log file. `line_index` is the chunk's
/// position among the retained lines, so ids are dense and stable in line
/// order regardless of interleaved blanks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogChunk {
    pub line_index: usize,
    pub text: String,
}

/// Splits file content into chunks: one per non-empty trimmed line.
pub fn chunk_lines(content: &str) -> Vec<LogChunk> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .enumerate()
        .map(|(i, line)| LogChunk {
            line_index: i,
            text: line.to_string(),
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct IndexOutcome {
    pub filename: String,
    pub chunks: usize,
}

/// Reads a file, chunks it, embeds the chunks in one batch and atomically
/// replaces the file's collection. Shared by the full reindex pass and the
/// watcher, so indexation of the same file is serialized per filename.
pub struct LogIndexer {
    store: Arc<VectorStore>,
    embedder: Arc<dyn Embedder>,
    file_locks: DashMap<String, Arc<tokio::sync::Mutex<()>>>,
}

impl LogIndexer {
    pub fn new(store: Arc<VectorStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            store,
            embedder,
            file_locks: DashMap::new(),
        }
    }

    pub async fn index_file(&self, path: &Path) -> Result<IndexOutcome, LogRagError> {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                LogRagError::Validation(format!("path has no usable filename: {}", path.display()))
            })?
            .to_string();

        let lock = self
            .file_locks
            .entry(filename.clone())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        // Decoding errors are replaced, never fatal
        let bytes = fs::read(path)?;
        let content = String::from_utf8_lossy(&bytes);
        let chunks = chunk_lines(&content);

        let key = self.store.claim_key(&filename)?;

        if chunks.is_empty() {
            self.store.clear(&key);
            debug!("No indexable lines in {}, collection cleared", filename);
            return Ok(IndexOutcome { filename, chunks: 0 });
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embedder.embed(texts)?;
        if embeddings.len() != chunks.len() {
            return Err(LogRagError::Embedding(format!(
                "embedding count mismatch for {}: {} chunks, {} vectors",
                filename,
                chunks.len(),
                embeddings.len()
            )));
        }
        // Same-length vectors are what makes cosine scores comparable
        let dim = self.embedder.dim();
        if let Some(bad) = embeddings.iter().find(|v| v.len() != dim) {
            return Err(LogRagError::Embedding(format!(
                "embedding dimension mismatch for {}: expected {}, got {}",
                filename,
                dim,
                bad.len()
            )));
        }

        let entries: Vec<ChunkEntry> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, vector)| ChunkEntry {
                id: format!("{}_{}", filename, chunk.line_index),
                text: chunk.text,
                vector,
            })
            .collect();

        let count = entries.len();
        // Single swap: a failure above leaves the previous version intact
        self.store.replace(&key, entries);

        info!("Indexed {} ({} chunks)", filename, count);
        Ok(IndexOutcome {
            filename,
            chunks: count,
        })
    }
}
