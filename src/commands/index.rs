use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::core::LogRagError;
use crate::embedding::{Embedder, FastEmbedder};
use crate::indexer::LogIndexer;
use crate::store::VectorStore;

/// One-shot index of every file in `path`, with per-file progress. Useful
/// for checking what a directory would index without running the server.
pub async fn index_directory(path: &str, config: &AppConfig) -> Result<(), LogRagError> {
    let dir = Path::new(path);
    if !dir.is_dir() {
        return Err(LogRagError::Path(format!(
            "not an existing directory: {}",
            path
        )));
    }

    println!("Loading embedding model '{}'...", config.embedding_model);
    let embedder: Arc<dyn Embedder> = Arc::new(FastEmbedder::new(&config.embedding_model)?);
    println!(
        "Model ready: {} ({} dimensions)",
        config.embedding_model.cyan(),
        embedder.dim()
    );
    let store = Arc::new(VectorStore::new());
    let indexer = LogIndexer::new(store, embedder);

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.path().is_file() {
            files.push(entry.path());
        }
    }
    files.sort();

    if files.is_empty() {
        println!("{}", "No files found.".yellow());
        return Ok(());
    }

    let pb = ProgressBar::new(files.len() as u64);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    pb.set_style(style);

    let mut total_chunks = 0usize;
    let mut failures = 0usize;
    for file in &files {
        pb.set_message(file.display().to_string());
        match indexer.index_file(file).await {
            Ok(outcome) => {
                total_chunks += outcome.chunks;
                pb.println(format!(
                    "{} {} ({} chunks)",
                    "Indexed".green(),
                    outcome.filename.yellow(),
                    outcome.chunks
                ));
            }
            Err(e) => {
                failures += 1;
                pb.println(format!("{} {}: {}", "Failed".red(), file.display(), e));
            }
        }
        pb.inc(1);
    }
    pb.finish_with_message("done");

    println!(
        "\n{} {} files, {} chunks, {} failures",
        "Summary:".bold(),
        files.len(),
        total_chunks,
        failures
    );
    Ok(())
}
