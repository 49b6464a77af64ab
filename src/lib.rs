pub mod commands;
pub mod config;
pub mod core;
pub mod embedding;
pub mod indexer;
pub mod llm;
pub mod orchestrator;
pub mod retrieval;
pub mod server;
pub mod status;
pub mod store;
pub mod telemetry;
pub mod watcher;

// Re-export core types for convenience
pub use config::AppConfig;
pub use core::{BackendError, LogRagError};
