pub mod client;

pub use client::{GeminiBackend, LlmBackend, OllamaBackend};

use crate::core::BackendError;
use std::str::FromStr;
use std::sync::{Arc, RwLock};

/// Which generation backend serves a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Local,
    Hosted,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Local => "local",
            Provider::Hosted => "hosted",
        }
    }
}

impl FromStr for Provider {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" | "ollama" => Ok(Provider::Local),
            "hosted" | "gemini" => Ok(Provider::Hosted),
            other => Err(BackendError::UnknownProvider(other.to_string())),
        }
    }
}

/// Holds both backend variants plus the mutable process-wide default.
///
/// Selection happens once per request: the caller-supplied name wins, the
/// default fills in when the caller sends none, and the resolved handle is
/// pinned for the rest of the request so a concurrent default flip cannot
/// change an in-flight generation.
pub struct BackendRegistry {
    local: Arc<dyn LlmBackend>,
    hosted: Arc<dyn LlmBackend>,
    default: RwLock<Provider>,
}

impl BackendRegistry {
    pub fn new(
        local: Arc<dyn LlmBackend>,
        hosted: Arc<dyn LlmBackend>,
        default: Provider,
    ) -> Self {
        Self {
            local,
            hosted,
            default: RwLock::new(default),
        }
    }

    pub fn default_provider(&self) -> Provider {
        *self.default.read().expect("provider lock poisoned")
    }

    pub fn set_default(&self, provider: Provider) {
        *self.default.write().expect("provider lock poisoned") = provider;
    }

    /// Resolves `choice` (or the default when `None`) to a backend handle.
    pub fn select(&self, choice: Option<&str>) -> Result<Arc<dyn LlmBackend>, BackendError> {
        let provider = match choice.map(str::trim).filter(|c| !c.is_empty()) {
            Some(name) => name.parse()?,
            None => self.default_provider(),
        };
        Ok(match provider {
            Provider::Local => self.local.clone(),
            Provider::Hosted => self.hosted.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::client::mocks::MockBackend;
    use super::*;
    use std::sync::atomic::Ordering;

    fn registry() -> (BackendRegistry, Arc<MockBackend>, Arc<MockBackend>) {
        let local = Arc::new(MockBackend::new("local answer"));
        let hosted = Arc::new(MockBackend::new("hosted answer"));
        (
            BackendRegistry::new(
                local.clone() as Arc<dyn LlmBackend>,
                hosted.clone() as Arc<dyn LlmBackend>,
                Provider::Local,
            ),
            local,
            hosted,
        )
    }

    #[test]
    fn provider_names_accept_aliases() {
        assert_eq!("local".parse::<Provider>().unwrap(), Provider::Local);
        assert_eq!("ollama".parse::<Provider>().unwrap(), Provider::Local);
        assert_eq!("hosted".parse::<Provider>().unwrap(), Provider::Hosted);
        assert_eq!("Gemini".parse::<Provider>().unwrap(), Provider::Hosted);
        assert!("gpt".parse::<Provider>().is_err());
    }

    #[tokio::test]
    async fn select_honors_caller_choice_over_default() {
        let (registry, local, hosted) = registry();

        let backend = registry.select(Some("hosted")).unwrap();
        backend.generate("q", "s").await.unwrap();
        assert_eq!(hosted.calls.load(Ordering::SeqCst), 1);
        assert_eq!(local.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn select_falls_back_to_mutable_default() {
        let (registry, local, hosted) = registry();

        registry.select(None).unwrap().generate("q", "s").await.unwrap();
        assert_eq!(local.calls.load(Ordering::SeqCst), 1);

        registry.set_default(Provider::Hosted);
        registry.select(None).unwrap().generate("q", "s").await.unwrap();
        assert_eq!(hosted.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn blank_choice_counts_as_absent() {
        let (registry, _, _) = registry();
        assert!(registry.select(Some("   ")).is_ok());
        assert!(matches!(
            registry.select(Some("claude")),
            Err(BackendError::UnknownProvider(_))
        ));
    }
}
