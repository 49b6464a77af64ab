use thiserror::Error;

/// Failures produced by the generation backends.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("LLM backend unreachable: {0}")]
    Unreachable(String),

    #[error("missing API credential ({0}); configure it before using the hosted backend")]
    MissingCredential(String),

    #[error("LLM returned no content{}", feedback_suffix(.0))]
    EmptyResponse(Option<String>),

    #[error("unknown LLM provider '{0}' (expected 'local' or 'hosted')")]
    UnknownProvider(String),
}

fn feedback_suffix(feedback: &Option<String>) -> String {
    match feedback {
        Some(f) => format!(" (provider feedback: {})", f),
        None => String::new(),
    }
}

#[derive(Error, Debug)]
pub enum LogRagError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid log directory: {0}")]
    Path(String),

    #[error("'{0}' has not been indexed yet; wait for indexing to finish or re-select the log directory")]
    NotIndexed(String),

    #[error("collection key collision: '{candidate}' sanitizes to '{key}', already claimed by '{existing}'")]
    CollectionKeyCollision {
        candidate: String,
        existing: String,
        key: String,
    },

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl axum::response::IntoResponse for LogRagError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;

        let status = match &self {
            LogRagError::Validation(_) | LogRagError::Path(_) => StatusCode::BAD_REQUEST,
            LogRagError::NotIndexed(_) | LogRagError::CollectionKeyCollision { .. } => {
                StatusCode::CONFLICT
            }
            LogRagError::Backend(BackendError::UnknownProvider(_)) => StatusCode::BAD_REQUEST,
            LogRagError::Backend(BackendError::Unreachable(_))
            | LogRagError::Backend(BackendError::EmptyResponse(_)) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = serde_json::json!({
            "error": self.to_string()
        });

        (status, axum::Json(body)).into_response()
    }
}
