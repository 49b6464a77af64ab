use crate::core::LogRagError;
use crate::indexer::LogIndexer;
use notify_debouncer_mini::{new_debouncer, notify::RecursiveMode, DebounceEventResult};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Handle for a running watcher task. The orchestrator keeps the guard and
/// cancels it on every directory switch; dropping the guard also cancels the
/// watch loop, so a replaced guard can never keep indexing in the background.
pub struct WatcherGuard {
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl WatcherGuard {
    /// Stops the watch loop. Idempotent.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub async fn join(mut self) {
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for WatcherGuard {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Watches `dir` (non-recursive) and re-indexes each created or modified
/// file. Events are debounced by notify; redundant re-indexing of an
/// unchanged file is harmless because indexing replaces the collection.
pub fn spawn_watcher(
    dir: PathBuf,
    indexer: Arc<LogIndexer>,
) -> Result<WatcherGuard, LogRagError> {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<DebounceEventResult>();

    let mut debouncer = new_debouncer(Duration::from_millis(500), move |result| {
        let _ = tx.send(result);
    })
    .map_err(|e| LogRagError::Io(std::io::Error::other(e.to_string())))?;

    debouncer
        .watcher()
        .watch(&dir, RecursiveMode::NonRecursive)
        .map_err(|e| LogRagError::Io(std::io::Error::other(e.to_string())))?;

    info!("Watching {} for log file changes", dir.display());

    let token = CancellationToken::new();
    let loop_token = token.clone();
    let task = tokio::spawn(async move {
        // The debouncer's notify thread stops when this binding drops
        let _debouncer = debouncer;
        loop {
            tokio::select! {
                // Check cancellation first so a pending event is never
                // processed after the guard was cancelled
                biased;
                _ = loop_token.cancelled() => {
                    info!("Watcher for {} cancelled", dir.display());
                    break;
                }
                received = rx.recv() => match received {
                    None => break,
                    Some(Ok(events)) => {
                        for event in events {
                            // Deletions and subdirectories are not indexed
                            if !event.path.is_file() {
                                debug!("Ignoring event for {}", event.path.display());
                                continue;
                            }
                            if let Err(e) = indexer.index_file(&event.path).await {
                                error!("Failed to re-index {}: {}", event.path.display(), e);
                            }
                        }
                    }
                    Some(Err(e)) => {
                        error!("Watch error: {:?}", e);
                    }
                }
            }
        }
    });

    Ok(WatcherGuard {
        token,
        task: Some(task),
    })
}
