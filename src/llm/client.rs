use crate::core::BackendError;
use async_trait::async_trait;
use ollama_rs::{generation::completion::request::GenerationRequest, Ollama};
use serde::{Deserialize, Serialize};

/// Trait abstracting generation backends to allow mocking and per-request
/// selection between the local and hosted variants.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Generates text for `prompt` under the given system instruction.
    async fn generate(&self, prompt: &str, system: &str) -> Result<String, BackendError>;
}

/// Client for a local Ollama instance, non-streaming, fixed model.
pub struct OllamaBackend {
    client: Ollama,
    model: String,
}

impl OllamaBackend {
    pub fn new(host: &str, model: &str) -> Self {
        let url = url::Url::parse(host).unwrap_or_else(|_| {
            url::Url::parse("http://localhost:11434").expect("Hardcoded default URL must be valid")
        });
        let host_str = url.host_str().unwrap_or("localhost").to_string();
        let port = url.port().unwrap_or(11434);

        let client = Ollama::new(format!("{}://{}", url.scheme(), host_str), port);

        Self {
            client,
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl LlmBackend for OllamaBackend {
    async fn generate(&self, prompt: &str, system: &str) -> Result<String, BackendError> {
        let request =
            GenerationRequest::new(self.model.clone(), prompt.to_string()).system(system.to_string());

        let response = self
            .client
            .generate(request)
            .await
            .map_err(|e| BackendError::Unreachable(format!("Ollama generation failed: {}", e)))?;

        Ok(response.response)
    }
}

/// Client for the hosted Gemini API. Requires an API key; a response with no
/// generated content surfaces the provider's prompt feedback for diagnostics.
pub struct GeminiBackend {
    http: reqwest::Client,
    api_url: String,
    model: String,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
    system_instruction: GeminiContent<'a>,
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
    prompt_feedback: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiCandidateContent>,
}

#[derive(Deserialize)]
struct GeminiCandidateContent {
    parts: Option<Vec<GeminiResponsePart>>,
}

#[derive(Deserialize)]
struct GeminiResponsePart {
    text: Option<String>,
}

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

impl GeminiBackend {
    pub fn new(model: &str, api_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: GEMINI_API_URL.to_string(),
            model: model.to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        }
    }

    #[cfg(test)]
    pub fn with_api_url(mut self, api_url: &str) -> Self {
        self.api_url = api_url.to_string();
        self
    }
}

#[async_trait]
impl LlmBackend for GeminiBackend {
    async fn generate(&self, prompt: &str, system: &str) -> Result<String, BackendError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| BackendError::MissingCredential("GEMINI_API_KEY".to_string()))?;

        let body = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart { text: prompt }],
            }],
            system_instruction: GeminiContent {
                parts: vec![GeminiPart { text: system }],
            },
        };

        let url = format!(
            "{}/{}:generateContent?key={}",
            self.api_url, self.model, key
        );
        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| BackendError::Unreachable(format!("Gemini request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(BackendError::Unreachable(format!(
                "Gemini returned {}: {}",
                status, detail
            )));
        }

        let parsed: GeminiResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Unreachable(format!("Gemini response unreadable: {}", e)))?;

        let text = parsed
            .candidates
            .as_ref()
            .and_then(|c| c.first())
            .and_then(|c| c.content.as_ref())
            .and_then(|c| c.parts.as_ref())
            .and_then(|p| p.first())
            .and_then(|p| p.text.clone())
            .filter(|t| !t.is_empty());

        match text {
            Some(t) => Ok(t),
            None => Err(BackendError::EmptyResponse(
                parsed.prompt_feedback.map(|f| f.to_string()),
            )),
        }
    }
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    pub struct MockBackend {
        pub response: Mutex<Result<String, String>>,
        pub calls: AtomicUsize,
        pub last_prompt: Mutex<String>,
        pub last_system: Mutex<String>,
    }

    impl MockBackend {
        pub fn new(response: &str) -> Self {
            Self {
                response: Mutex::new(Ok(response.to_string())),
                calls: AtomicUsize::new(0),
                last_prompt: Mutex::new(String::new()),
                last_system: Mutex::new(String::new()),
            }
        }

        pub fn unreachable() -> Self {
            let mock = Self::new("");
            *mock.response.lock().unwrap() = Err("connection refused".to_string());
            mock
        }
    }

    #[async_trait]
    impl LlmBackend for MockBackend {
        async fn generate(&self, prompt: &str, system: &str) -> Result<String, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_prompt.lock().unwrap() = prompt.to_string();
            *self.last_system.lock().unwrap() = system.to_string();
            self.response
                .lock()
                .unwrap()
                .clone()
                .map_err(BackendError::Unreachable)
        }
    }
}
