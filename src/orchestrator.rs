use crate::config::{Settings, SettingsStore};
use crate::core::LogRagError;
use crate::indexer::LogIndexer;
use crate::status::{IndexingStatus, StatusTracker};
use crate::watcher::{spawn_watcher, WatcherGuard};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use tracing::{error, info, warn};

/// Owns the active log directory and supervises the background tasks tied
/// to it: the full reindex pass and the watcher. Exactly one watcher is
/// live at a time; switching directories cancels the previous one before
/// the new one starts.
pub struct Orchestrator {
    indexer: Arc<LogIndexer>,
    status: Arc<StatusTracker>,
    settings: Arc<SettingsStore>,
    active_dir: RwLock<Option<PathBuf>>,
    watcher: Mutex<Option<WatcherGuard>>,
}

impl Orchestrator {
    pub fn new(
        indexer: Arc<LogIndexer>,
        status: Arc<StatusTracker>,
        settings: Arc<SettingsStore>,
    ) -> Self {
        Self {
            indexer,
            status,
            settings,
            active_dir: RwLock::new(None),
            watcher: Mutex::new(None),
        }
    }

    pub fn active_directory(&self) -> Option<PathBuf> {
        self.active_dir.read().expect("directory lock poisoned").clone()
    }

    pub fn indexing_status(&self) -> IndexingStatus {
        self.status.snapshot()
    }

    /// Validates and activates a new log directory.
    ///
    /// Validation failures return before any side effect. On success the
    /// directory swap is immediately visible, the previous watcher is
    /// cancelled, and the reindex pass plus the new watcher run as
    /// fire-and-forget tasks; this call does not wait for indexing.
    pub fn set_active_directory(&self, raw: &str) -> Result<(), LogRagError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(LogRagError::Path("path must not be empty".to_string()));
        }
        let path = PathBuf::from(trimmed);
        if !path.is_absolute() {
            return Err(LogRagError::Path(format!(
                "path must be absolute: {}",
                trimmed
            )));
        }
        if !path.is_dir() {
            return Err(LogRagError::Path(format!(
                "not an existing directory: {}",
                trimmed
            )));
        }

        // The whole swap happens under the watcher lock so concurrent
        // switches serialize; releasing it between cancel and re-store
        // would let an interleaved switch leave two live watchers
        let mut watcher_slot = self.watcher.lock().expect("watcher lock poisoned");

        *self.active_dir.write().expect("directory lock poisoned") = Some(path.clone());
        self.persist(|s| s.log_directory = Some(trimmed.to_string()));

        if let Some(old) = watcher_slot.take() {
            info!("Cancelling previous watcher");
            old.cancel();
        }

        let indexer = self.indexer.clone();
        let status = self.status.clone();
        let reindex_dir = path.clone();
        tokio::spawn(async move {
            reindex_directory(&reindex_dir, &indexer, &status).await;
        });

        match spawn_watcher(path, self.indexer.clone()) {
            Ok(guard) => *watcher_slot = Some(guard),
            // The directory stays active and the reindex still runs; only
            // ongoing change tracking is lost
            Err(e) => error!("Failed to start watcher: {}", e),
        }

        Ok(())
    }

    /// Records the default provider choice in the persisted settings.
    pub fn persist_provider(&self, provider: &str) {
        let provider = provider.to_string();
        self.persist(move |s| s.llm_provider = Some(provider));
    }

    /// Non-directory entries directly inside the active directory, sorted.
    pub fn list_files(&self) -> Result<Vec<String>, LogRagError> {
        let dir = self
            .active_directory()
            .ok_or_else(|| LogRagError::Path("no active log directory".to_string()))?;
        let mut files = list_directory_files(&dir)?
            .into_iter()
            .filter_map(|p| p.file_name().and_then(|n| n.to_str()).map(String::from))
            .collect::<Vec<_>>();
        files.sort();
        Ok(files)
    }

    /// Raw line listing with an optional case-insensitive substring filter,
    /// capped at `limit` matching lines.
    pub fn read_lines(
        &self,
        filename: &str,
        filter_term: &str,
        limit: usize,
    ) -> Result<Vec<String>, LogRagError> {
        if filename.trim().is_empty() {
            return Err(LogRagError::Validation("filename is required".to_string()));
        }
        // Untrusted input: only bare filenames may reach the filesystem
        if filename.contains('/') || filename.contains('\\') || filename.contains("..") {
            return Err(LogRagError::Validation(format!(
                "filename must not contain path separators: {}",
                filename
            )));
        }
        let dir = self
            .active_directory()
            .ok_or_else(|| LogRagError::Path("no active log directory".to_string()))?;
        let path = dir.join(filename);
        if !path.is_file() {
            return Err(LogRagError::Validation(format!(
                "no such file in the active log directory: {}",
                filename
            )));
        }

        let bytes = std::fs::read(&path)?;
        let content = String::from_utf8_lossy(&bytes);
        let needle = filter_term.to_lowercase();

        let mut lines = Vec::new();
        for line in content.lines() {
            if needle.is_empty() || line.to_lowercase().contains(&needle) {
                if lines.len() < limit {
                    lines.push(line.trim().to_string());
                } else {
                    lines.push(format!("... (Showing first {} matching lines) ...", limit));
                    break;
                }
            }
        }
        Ok(lines)
    }

    fn persist<F: FnOnce(&mut Settings)>(&self, patch: F) {
        let mut settings = self.settings.load();
        patch(&mut settings);
        if let Err(e) = self.settings.save(&settings) {
            warn!("Failed to persist settings: {}", e);
        }
    }
}

fn list_directory_files(dir: &Path) -> Result<Vec<PathBuf>, LogRagError> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Full pass over every file in `dir`. Per-file failures are logged and do
/// not stop the pass; the next watch event or reindex gets another chance.
async fn reindex_directory(dir: &Path, indexer: &LogIndexer, status: &StatusTracker) {
    let files = match list_directory_files(dir) {
        Ok(files) => files,
        Err(e) => {
            error!("Cannot enumerate {}: {}", dir.display(), e);
            return;
        }
    };

    info!("Reindexing {} ({} files)", dir.display(), files.len());
    status.begin_reindex(files.len());

    for path in files {
        let display_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        if let Err(e) = indexer.index_file(&path).await {
            error!("Failed to index {}: {}", path.display(), e);
        }
        status.advance(&display_name);
    }

    status.complete();
    info!("Reindex of {} complete", dir.display());
}
