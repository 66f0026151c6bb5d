//! Text generation: the seam between the pipeline and the LLM provider.
//!
//! Everything the engine needs from a model is one call: system prompt plus
//! user prompt in, text out. [`TextGenerator`] captures exactly that, so the
//! engine can be driven by a scripted generator in tests and by
//! [`LlmGenerator`] (edgequake-llm providers) in production. All prompt
//! wording lives in [`crate::prompts`].
//!
//! ## Fallback Strategy
//!
//! [`generate_with_fallback`] walks the ordered list
//! `[model, fallback_model]`. Only a rate-limit error moves on to the next
//! model: a timeout, an empty response or any other failure would most
//! likely repeat on the fallback, so it ends the chain immediately. Every
//! attempt runs under `tokio::time::timeout`.

use crate::config::PipelineConfig;
use crate::error::{GenerationError, PdfQaError};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// One generation call, independent of provider.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub max_tokens: usize,
    pub temperature: f32,
    pub model: String,
    pub fallback_model: Option<String>,
}

impl GenerationRequest {
    /// Models to try, in order, without repeats.
    pub fn models(&self) -> Vec<&str> {
        let mut models = vec![self.model.as_str()];
        if let Some(fallback) = self.fallback_model.as_deref() {
            if !fallback.is_empty() && fallback != self.model {
                models.push(fallback);
            }
        }
        models
    }
}

/// Anything that can turn a prompt pair into text with a named model.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(
        &self,
        model: &str,
        request: &GenerationRequest,
    ) -> Result<String, GenerationError>;
}

/// Run `request` against its primary model, retrying once on the fallback
/// model when the primary is rate-limited.
pub async fn generate_with_fallback(
    generator: &dyn TextGenerator,
    request: &GenerationRequest,
    timeout: Duration,
) -> Result<String, GenerationError> {
    let mut last_err: Option<GenerationError> = None;

    for model in request.models() {
        let start = Instant::now();
        let result = match tokio::time::timeout(timeout, generator.generate(model, request)).await
        {
            Ok(result) => result,
            Err(_) => Err(GenerationError::Timeout {
                model: model.to_string(),
                secs: timeout.as_secs(),
            }),
        };

        match result {
            Ok(text) if text.trim().is_empty() => {
                return Err(GenerationError::EmptyResponse {
                    model: model.to_string(),
                });
            }
            Ok(text) => {
                debug!(
                    "Model {} answered {} chars in {:?}",
                    model,
                    text.chars().count(),
                    start.elapsed()
                );
                return Ok(text);
            }
            Err(e) if e.is_retryable() => {
                warn!("Model {} rate-limited, trying next model — {}", model, e);
                last_err = Some(e);
            }
            Err(e) => {
                warn!("Model {} failed — {}", model, e);
                return Err(e);
            }
        }
    }

    Err(last_err.unwrap_or_else(|| GenerationError::Failed {
        model: request.model.clone(),
        detail: "no model to try".into(),
    }))
}

/// Whether a provider error message describes a rate limit.
pub fn is_rate_limited(message: &str) -> bool {
    // 429 only as a standalone status code, never inside a larger number.
    static RE_STATUS_429: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b429\b").unwrap());

    let lower = message.to_lowercase();
    RE_STATUS_429.is_match(&lower)
        || lower.contains("rate limit")
        || lower.contains("rate_limit")
        || lower.contains("ratelimit")
        || lower.contains("too many requests")
}

// ── edgequake-llm adapter ────────────────────────────────────────────────

enum ProviderSource {
    /// A single provider used for every model name.
    Fixed(Arc<dyn LLMProvider>),
    /// A provider family; one provider instance is created per model.
    Named(String),
}

/// [`TextGenerator`] backed by edgequake-llm providers.
pub struct LlmGenerator {
    source: ProviderSource,
    providers: Mutex<HashMap<String, Arc<dyn LLMProvider>>>,
}

impl LlmGenerator {
    /// Use one pre-built provider for every request; the model name in a
    /// request is then informational only.
    pub fn with_provider(provider: Arc<dyn LLMProvider>) -> Self {
        Self {
            source: ProviderSource::Fixed(provider),
            providers: Mutex::new(HashMap::new()),
        }
    }

    /// Create providers of family `provider_name` (e.g. "openai") on demand.
    pub fn named(provider_name: impl Into<String>) -> Self {
        Self {
            source: ProviderSource::Named(provider_name.into()),
            providers: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve the provider, from most-specific to least-specific.
    ///
    /// 1. **Pre-built provider** (`config.provider`), used as-is.
    /// 2. **Named provider** (`config.provider_name`).
    /// 3. **`EDGEQUAKE_LLM_PROVIDER`** from the environment.
    /// 4. **`OPENAI_API_KEY`** present → "openai".
    /// 5. **Full auto-detection** (`ProviderFactory::from_env`).
    ///
    /// For named providers the primary model's provider is created eagerly
    /// so a missing API key surfaces here, not on the first request.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, PdfQaError> {
        if let Some(ref provider) = config.provider {
            return Ok(Self::with_provider(Arc::clone(provider)));
        }

        let name = config
            .provider_name
            .clone()
            .or_else(|| non_empty_env("EDGEQUAKE_LLM_PROVIDER"))
            .or_else(|| non_empty_env("OPENAI_API_KEY").map(|_| "openai".to_string()));

        if let Some(name) = name {
            let generator = Self::named(name.clone());
            let provider = create_provider(&name, &config.model)?;
            generator
                .providers
                .lock()
                .insert(config.model.clone(), provider);
            info!("Using LLM provider '{}' with model {}", name, config.model);
            return Ok(generator);
        }

        let (llm_provider, _embedding) =
            ProviderFactory::from_env().map_err(|e| PdfQaError::ProviderNotConfigured {
                provider: "auto".to_string(),
                hint: format!(
                    "No LLM provider could be auto-detected from environment.\n\
                    Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                    Error: {}",
                    e
                ),
            })?;
        info!("Using auto-detected LLM provider");
        Ok(Self::with_provider(llm_provider))
    }

    fn provider_for(&self, model: &str) -> Result<Arc<dyn LLMProvider>, GenerationError> {
        let name = match &self.source {
            ProviderSource::Fixed(provider) => return Ok(Arc::clone(provider)),
            ProviderSource::Named(name) => name,
        };

        if let Some(provider) = self.providers.lock().get(model) {
            return Ok(Arc::clone(provider));
        }

        // Created outside the lock; a racing request may build a duplicate,
        // the last insert wins.
        let provider = create_provider(name, model).map_err(|e| GenerationError::Failed {
            model: model.to_string(),
            detail: e.to_string(),
        })?;
        self.providers
            .lock()
            .insert(model.to_string(), Arc::clone(&provider));
        Ok(provider)
    }
}

#[async_trait]
impl TextGenerator for LlmGenerator {
    async fn generate(
        &self,
        model: &str,
        request: &GenerationRequest,
    ) -> Result<String, GenerationError> {
        let provider = self.provider_for(model)?;
        let messages = vec![
            ChatMessage::system(&request.system_prompt),
            ChatMessage::user(&request.user_prompt),
        ];
        let options = build_options(request);

        match provider.chat(&messages, Some(&options)).await {
            Ok(response) => {
                debug!(
                    "Model {}: {} input tokens, {} output tokens",
                    model, response.prompt_tokens, response.completion_tokens
                );
                Ok(response.content)
            }
            Err(e) => {
                let detail = e.to_string();
                if is_rate_limited(&detail) {
                    Err(GenerationError::RateLimited {
                        model: model.to_string(),
                        detail,
                    })
                } else {
                    Err(GenerationError::Failed {
                        model: model.to_string(),
                        detail,
                    })
                }
            }
        }
    }
}

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, PdfQaError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        PdfQaError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Build `CompletionOptions` from a request.
fn build_options(request: &GenerationRequest) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(request.temperature),
        max_tokens: Some(request.max_tokens),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn request(fallback: Option<&str>) -> GenerationRequest {
        GenerationRequest {
            system_prompt: "sys".into(),
            user_prompt: "user".into(),
            max_tokens: 100,
            temperature: 0.2,
            model: "primary".into(),
            fallback_model: fallback.map(str::to_string),
        }
    }

    /// Fails the primary model with `primary_err`, succeeds on any other.
    struct Scripted {
        primary_err: Option<GenerationError>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TextGenerator for Scripted {
        async fn generate(
            &self,
            model: &str,
            _request: &GenerationRequest,
        ) -> Result<String, GenerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match (&self.primary_err, model) {
                (Some(e), "primary") => Err(e.clone()),
                _ => Ok(format!("from {model}")),
            }
        }
    }

    struct Slow;

    #[async_trait]
    impl TextGenerator for Slow {
        async fn generate(
            &self,
            _model: &str,
            _request: &GenerationRequest,
        ) -> Result<String, GenerationError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok("late".into())
        }
    }

    #[test]
    fn test_models_dedup() {
        assert_eq!(request(Some("backup")).models(), vec!["primary", "backup"]);
        assert_eq!(request(Some("primary")).models(), vec!["primary"]);
        assert_eq!(request(Some("")).models(), vec!["primary"]);
        assert_eq!(request(None).models(), vec!["primary"]);
    }

    #[test]
    fn test_is_rate_limited() {
        assert!(is_rate_limited("HTTP 429 Too Many Requests"));
        assert!(is_rate_limited("Rate limit exceeded for model"));
        assert!(is_rate_limited("RateLimitError"));
        assert!(!is_rate_limited("invalid api key"));
        assert!(is_rate_limited("status: 429, body: slow down"));
        assert!(!is_rate_limited(
            "This model's maximum context length is 8192 tokens. However, you requested 14293 tokens."
        ));
        assert!(!is_rate_limited("request id 4290 failed"));
    }

    #[test]
    fn test_build_options() {
        let opts = build_options(&request(None));
        assert_eq!(opts.temperature, Some(0.2));
        assert_eq!(opts.max_tokens, Some(100));
    }

    #[tokio::test]
    async fn test_rate_limit_falls_back() {
        let gen = Scripted {
            primary_err: Some(GenerationError::RateLimited {
                model: "primary".into(),
                detail: "429".into(),
            }),
            calls: AtomicUsize::new(0),
        };
        let out = generate_with_fallback(&gen, &request(Some("backup")), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(out, "from backup");
        assert_eq!(gen.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_other_error_stops_chain() {
        let gen = Scripted {
            primary_err: Some(GenerationError::Failed {
                model: "primary".into(),
                detail: "500".into(),
            }),
            calls: AtomicUsize::new(0),
        };
        let err = generate_with_fallback(&gen, &request(Some("backup")), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Failed { .. }));
        assert_eq!(gen.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rate_limit_without_fallback_surfaces() {
        let gen = Scripted {
            primary_err: Some(GenerationError::RateLimited {
                model: "primary".into(),
                detail: "429".into(),
            }),
            calls: AtomicUsize::new(0),
        };
        let err = generate_with_fallback(&gen, &request(None), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_not_retried() {
        let err = generate_with_fallback(&Slow, &request(Some("backup")), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Timeout { secs: 1, .. }));
    }

    #[tokio::test]
    async fn test_blank_text_is_empty_response() {
        struct Blank;
        #[async_trait]
        impl TextGenerator for Blank {
            async fn generate(
                &self,
                _model: &str,
                _request: &GenerationRequest,
            ) -> Result<String, GenerationError> {
                Ok("  \n".into())
            }
        }
        let err = generate_with_fallback(&Blank, &request(None), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::EmptyResponse { .. }));
    }
}
