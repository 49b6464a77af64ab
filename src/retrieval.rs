use crate::core::LogRagError;
use crate::embedding::Embedder;
use crate::llm::BackendRegistry;
use crate::store::VectorStore;
use std::sync::Arc;
use tracing::debug;

/// How many chunks go into the prompt context.
pub const TOP_K: usize = 10;

pub const SYSTEM_INSTRUCTION: &str = "You are a log-analysis assistant. Answer the user's \
question using only the provided log entries. Point at concrete lines where possible, and say \
so plainly when the entries do not contain the answer.";

/// Retrieval-augmented answering over indexed log files.
pub struct RagEngine {
    store: Arc<VectorStore>,
    embedder: Arc<dyn Embedder>,
    backends: Arc<BackendRegistry>,
}

/// `"User Query: {query}"` followed by the retrieved entries, one per line.
pub fn build_prompt(query: &str, context: &str) -> String {
    format!(
        "User Query: {}\n\nRelevant Log Entries:\n---\n{}",
        query, context
    )
}

impl RagEngine {
    pub fn new(
        store: Arc<VectorStore>,
        embedder: Arc<dyn Embedder>,
        backends: Arc<BackendRegistry>,
    ) -> Self {
        Self {
            store,
            embedder,
            backends,
        }
    }

    pub fn backends(&self) -> &Arc<BackendRegistry> {
        &self.backends
    }

    /// Answers `query` about `filename` via the selected backend.
    pub async fn answer(
        &self,
        query: &str,
        filename: &str,
        provider: Option<&str>,
    ) -> Result<String, LogRagError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(LogRagError::Validation("query is required".to_string()));
        }
        let filename = filename.trim();
        if filename.is_empty() {
            return Err(LogRagError::Validation("filename is required".to_string()));
        }

        // Pin the backend before any slow work so a default flip mid-request
        // cannot change which variant answers
        let backend = self.backends.select(provider)?;

        let vectors = self.embedder.embed(vec![query.to_string()])?;
        let query_vector = vectors
            .first()
            .ok_or_else(|| LogRagError::Embedding("empty embedding batch".to_string()))?;

        let key = self.store.lookup_key(filename)?;
        if self.store.get(&key).is_none() {
            return Err(LogRagError::NotIndexed(filename.to_string()));
        }

        let hits = self.store.query(&key, query_vector, TOP_K)?;
        debug!("Retrieved {} chunks for '{}' from {}", hits.len(), query, filename);

        let context = hits
            .iter()
            .map(|h| h.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = build_prompt(query, &context);

        let text = backend.generate(&prompt, SYSTEM_INSTRUCTION).await?;
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::mocks::HashEmbedder;
    use crate::llm::client::mocks::MockBackend;
    use crate::llm::{LlmBackend, Provider};
    use crate::store::ChunkEntry;
    use std::sync::atomic::Ordering;

    struct Fixture {
        engine: RagEngine,
        store: Arc<VectorStore>,
        local: Arc<MockBackend>,
        hosted: Arc<MockBackend>,
        embedder: Arc<HashEmbedder>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(VectorStore::new());
        let embedder = Arc::new(HashEmbedder::new(64));
        let local = Arc::new(MockBackend::new("local answer"));
        let hosted = Arc::new(MockBackend::new("hosted answer"));
        let backends = Arc::new(BackendRegistry::new(
            local.clone() as Arc<dyn LlmBackend>,
            hosted.clone() as Arc<dyn LlmBackend>,
            Provider::Local,
        ));
        let engine = RagEngine::new(
            store.clone(),
            embedder.clone() as Arc<dyn Embedder>,
            backends,
        );
        Fixture {
            engine,
            store,
            local,
            hosted,
            embedder,
        }
    }

    fn seed(fixture: &Fixture, filename: &str, lines: &[&str]) {
        let vectors = fixture
            .embedder
            .embed(lines.iter().map(|l| l.to_string()).collect())
            .unwrap();
        let key = fixture.store.claim_key(filename).unwrap();
        let entries = lines
            .iter()
            .zip(vectors)
            .enumerate()
            .map(|(i, (text, vector))| ChunkEntry {
                id: format!("{}_{}", filename, i),
                text: text.to_string(),
                vector,
            })
            .collect();
        fixture.store.replace(&key, entries);
    }

    #[tokio::test]
    async fn empty_inputs_are_validation_errors() {
        let f = fixture();
        assert!(matches!(
            f.engine.answer("", "app.log", None).await.unwrap_err(),
            LogRagError::Validation(_)
        ));
        assert!(matches!(
            f.engine.answer("why?", "  ", None).await.unwrap_err(),
            LogRagError::Validation(_)
        ));
        assert_eq!(f.local.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unindexed_file_is_not_indexed_not_generic() {
        let f = fixture();
        let err = f.engine.answer("why?", "app.log", None).await.unwrap_err();
        assert!(matches!(err, LogRagError::NotIndexed(name) if name == "app.log"));
    }

    #[tokio::test]
    async fn answer_builds_augmented_prompt_with_ranked_context() {
        let f = fixture();
        seed(&f, "app.log", &["ERROR boot failed", "INFO ready"]);

        let answer = f.engine.answer("boot failure", "app.log", None).await.unwrap();
        assert_eq!(answer, "local answer");

        let prompt = f.local.last_prompt.lock().unwrap().clone();
        assert!(prompt.starts_with("User Query: boot failure"));
        assert!(prompt.contains("Relevant Log Entries:\n---\n"));
        // Closest chunk comes first in the context
        let context = prompt.split("---\n").nth(1).unwrap().to_string();
        assert!(context.starts_with("ERROR boot failed"));

        let system = f.local.last_system.lock().unwrap().clone();
        assert!(system.contains("log-analysis assistant"));
    }

    #[tokio::test]
    async fn caller_choice_overrides_default_backend() {
        let f = fixture();
        seed(&f, "app.log", &["line"]);

        let answer = f
            .engine
            .answer("anything", "app.log", Some("hosted"))
            .await
            .unwrap();
        assert_eq!(answer, "hosted answer");
        assert_eq!(f.hosted.calls.load(Ordering::SeqCst), 1);
        assert_eq!(f.local.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn backend_failure_surfaces_verbatim() {
        let f = fixture();
        seed(&f, "app.log", &["line"]);
        *f.local.response.lock().unwrap() = Err("connection refused".to_string());

        let err = f.engine.answer("anything", "app.log", None).await.unwrap_err();
        assert!(err.to_string().contains("connection refused"));
    }

    #[tokio::test]
    async fn unknown_provider_is_rejected_before_retrieval() {
        let f = fixture();
        seed(&f, "app.log", &["line"]);
        let err = f
            .engine
            .answer("anything", "app.log", Some("gpt"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LogRagError::Backend(crate::core::BackendError::UnknownProvider(_))
        ));
    }

    #[tokio::test]
    async fn empty_collection_yields_empty_context_not_error() {
        let f = fixture();
        let key = f.store.claim_key("empty.log").unwrap();
        f.store.replace(&key, Vec::new());

        let answer = f.engine.answer("anything", "empty.log", None).await.unwrap();
        assert_eq!(answer, "local answer");
        let prompt = f.local.last_prompt.lock().unwrap().clone();
        assert!(prompt.ends_with("---\n"));
    }
}
