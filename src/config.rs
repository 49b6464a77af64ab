use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    pub server_host: String,
    pub server_port: u16,
    pub log_level: String,
    pub log_format: String,
    pub embedding_model: String,
    pub ollama_host: String,
    pub ollama_model: String,
    pub gemini_model: String,
    pub gemini_api_key: Option<String>,
    pub default_provider: String,
    pub raw_line_limit: usize,
    pub settings_path: Option<String>,
}

impl AppConfig {
    /// Load default config (looks for log-rag.toml in the standard locations)
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_path(None)
    }

    /// Load config from a specific file path
    pub fn from_path(custom_path: Option<String>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("server_host", "127.0.0.1")?
            .set_default("server_port", 8080)?
            .set_default("log_level", "info")?
            .set_default("log_format", "text")?
            .set_default("embedding_model", "all-minilm-l6-v2")?
            .set_default("ollama_host", "http://localhost:11434")?
            .set_default("ollama_model", "codellama:7b-instruct")?
            .set_default("gemini_model", "gemini-1.5-flash")?
            .set_default("default_provider", "local")?
            .set_default("raw_line_limit", 2000)?;

        if let Some(path) = custom_path {
            let path_buf = PathBuf::from(&path);

            if !path_buf.exists() {
                return Err(ConfigError::Message(format!(
                    "Config file not found: {}",
                    path
                )));
            }
            if path_buf.extension().and_then(|s| s.to_str()) != Some("toml") {
                return Err(ConfigError::Message(format!(
                    "Config file must have .toml extension: {}",
                    path
                )));
            }
            builder = builder.add_source(File::from(path_buf));
        } else {
            // 1. File: ~/.config/log-rag/log-rag.toml (User Config)
            if let Some(mut home) = dirs::config_dir() {
                home.push("log-rag");
                home.push("log-rag.toml");
                builder = builder.add_source(File::from(home).required(false));
            }
            // 2. File: log-rag.toml (Current Directory) - takes precedence
            if PathBuf::from("log-rag.toml").exists() {
                builder = builder.add_source(File::with_name("log-rag"));
            }
        }

        // 3. Environment: LOG_RAG__KEY=VALUE
        builder = builder.add_source(Environment::with_prefix("LOG_RAG").separator("__"));

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// GEMINI_API_KEY in the process environment beats the config file.
    pub fn resolved_gemini_key(&self) -> Option<String> {
        std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| self.gemini_api_key.clone())
    }

    pub fn settings_file(&self) -> PathBuf {
        if let Some(path) = &self.settings_path {
            return PathBuf::from(path);
        }
        let mut base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        base.push("log-rag");
        base.push("settings.json");
        base
    }
}

/// User-driven state that survives restarts: the active log directory and
/// the default LLM provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub log_directory: Option<String>,
    #[serde(default)]
    pub llm_provider: Option<String>,
}

/// JSON-file persistence for [`Settings`]. Read failures produce an empty
/// settings object instead of propagating.
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn load(&self) -> Settings {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!("Malformed settings file {}: {}", self.path.display(), e);
                Settings::default()
            }),
            Err(_) => Settings::default(),
        }
    }

    pub fn save(&self, settings: &Settings) -> Result<(), crate::core::LogRagError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(settings)?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }
}
