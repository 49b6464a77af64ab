use serde::Serialize;
use std::sync::Mutex;

/// State of the background indexing process, shared between the reindex
/// task, the watcher and the HTTP handlers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexingStatus {
    #[serde(rename = "status")]
    pub state: IndexState,
    pub files_processed: usize,
    pub total_files: usize,
    pub current_file: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexState {
    Idle,
    Indexing,
}

impl Default for IndexingStatus {
    fn default() -> Self {
        Self {
            state: IndexState::Idle,
            files_processed: 0,
            total_files: 0,
            current_file: String::new(),
        }
    }
}

/// Mutex-guarded status record. All writers serialize through the lock;
/// readers always get a whole-record clone, never a torn snapshot.
#[derive(Default)]
pub struct StatusTracker {
    inner: Mutex<IndexingStatus>,
}

impl StatusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> IndexingStatus {
        self.inner.lock().expect("status lock poisoned").clone()
    }

    /// Resets counters and switches to `Indexing` for a fresh full pass.
    pub fn begin_reindex(&self, total_files: usize) {
        let mut status = self.inner.lock().expect("status lock poisoned");
        *status = IndexingStatus {
            state: IndexState::Indexing,
            files_processed: 0,
            total_files,
            current_file: String::new(),
        };
    }

    /// Records one processed file. Processed count never exceeds the total.
    pub fn advance(&self, current_file: &str) {
        let mut status = self.inner.lock().expect("status lock poisoned");
        status.files_processed = (status.files_processed + 1).min(status.total_files);
        status.current_file = current_file.to_string();
    }

    pub fn complete(&self) {
        let mut status = self.inner.lock().expect("status lock poisoned");
        status.state = IndexState::Idle;
    }
}
