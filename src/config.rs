//! Configuration types for document summarization and question answering.
//!
//! Every behaviour of the pipeline is controlled through [`PipelineConfig`],
//! built via its [`PipelineConfigBuilder`]. The chunking and scoring knobs
//! live in their own sub-structs ([`ChunkingConfig`], [`ScoringConfig`]) so
//! the pure pipeline stages can take exactly the slice they need.
//!
//! # Design choice: builder over constructor
//! The config has more than twenty fields; the builder lets callers set only
//! what they care about and rely on documented defaults for the rest.
//! Validation happens once, in [`PipelineConfigBuilder::build`].

use crate::error::PdfQaError;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Paragraph-accumulating chunker settings. Lengths are in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Target maximum chunk length. Default: 1100.
    pub chunk_chars: usize,
    /// Characters carried from the end of one chunk into the next. Default: 110.
    pub overlap_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_chars: 1100,
            overlap_chars: 110,
        }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<(), PdfQaError> {
        if self.chunk_chars == 0 {
            return Err(PdfQaError::InvalidConfig(
                "chunk_chars must be ≥ 1".into(),
            ));
        }
        if self.overlap_chars >= self.chunk_chars {
            return Err(PdfQaError::InvalidConfig(format!(
                "overlap_chars ({}) must be smaller than chunk_chars ({})",
                self.overlap_chars, self.chunk_chars
            )));
        }
        Ok(())
    }
}

/// String-similarity function used for fuzzy term matching.
///
/// | Metric | "eular" vs "euler" |
/// |--------|--------------------|
/// | Jaro-Winkler (default) | ≈ 0.91 |
/// | Normalized Levenshtein | 0.80 |
///
/// Jaro-Winkler rewards a shared prefix, which is what typos in question
/// terms usually preserve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMetric {
    #[default]
    JaroWinkler,
    NormalizedLevenshtein,
}

impl SimilarityMetric {
    /// Similarity in `[0, 1]`, 1 meaning identical.
    pub fn similarity(&self, a: &str, b: &str) -> f64 {
        match self {
            SimilarityMetric::JaroWinkler => strsim::jaro_winkler(a, b),
            SimilarityMetric::NormalizedLevenshtein => strsim::normalized_levenshtein(a, b),
        }
    }
}

/// Weights and thresholds of the lexical relevance scorer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Added per exact occurrence of a query term. Default: 1.0.
    pub exact_weight: f64,
    /// Added once per term with no exact hit but a near match. Default: 0.7.
    pub fuzzy_weight: f64,
    /// Added for a long term found as a substring of the chunk. Default: 0.3.
    pub rare_term_bonus: f64,
    /// Minimum term length for the rare-term bonus. Default: 7.
    pub rare_term_min_len: usize,
    /// Maximum length difference between term and candidate token. Default: 2.
    pub fuzzy_max_len_diff: usize,
    /// Minimum similarity for a fuzzy match. Default: 0.84.
    pub fuzzy_min_similarity: f64,
    /// Query tokens shorter than this are ignored. Default: 3.
    pub min_term_len: usize,
    /// Default: Jaro-Winkler.
    pub metric: SimilarityMetric,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            exact_weight: 1.0,
            fuzzy_weight: 0.7,
            rare_term_bonus: 0.3,
            rare_term_min_len: 7,
            fuzzy_max_len_diff: 2,
            fuzzy_min_similarity: 0.84,
            min_term_len: 3,
            metric: SimilarityMetric::default(),
        }
    }
}

/// Configuration for a [`crate::engine::DocumentEngine`].
///
/// Built via [`PipelineConfig::builder()`] or using
/// [`PipelineConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_pdfqa::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .top_k(4)
///     .max_context_chars(8000)
///     .model("gpt-4.1-nano")
///     .build()
///     .unwrap();
/// assert_eq!(config.top_k, 4);
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    pub chunking: ChunkingConfig,
    pub scoring: ScoringConfig,

    /// Number of passages forwarded to the answer prompt. Default: 6.
    pub top_k: usize,

    /// Hard cap on the assembled answer context, in characters. Default: 12000.
    pub max_context_chars: usize,

    /// A page whose block-mode text has fewer non-whitespace characters
    /// than this is re-extracted in flat mode. Default: 40.
    ///
    /// Block extraction on scanned or form-heavy pages often returns a
    /// handful of stray glyphs while flat mode recovers the real text.
    pub min_page_chars: usize,

    /// Lifetime of summary and answer cache entries. Default: 7 days.
    pub cache_ttl_secs: u64,

    /// Number of leading characters hashed into the summary fingerprint. Default: 20000.
    ///
    /// Two uploads whose normalized text agrees on this prefix share one
    /// cached summary. The summary prompt only reads the first
    /// `summary_input_chars` anyway, so a longer prefix buys nothing.
    pub fingerprint_chars: usize,

    /// Number of leading characters sent to the summary prompt. Default: 6000.
    pub summary_input_chars: usize,

    /// Sentences kept by the heuristic summary. Default: 3.
    pub simple_summary_sentences: usize,

    /// Maximum documents kept in the store before least-recently-used
    /// eviction. Default: 256.
    pub max_documents: usize,

    /// Primary generation model. Default: "gpt-4.1-nano".
    pub model: String,

    /// Model tried once when the primary is rate-limited. Default: "gpt-4.1-mini".
    /// `None` disables the fallback.
    pub fallback_model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    /// If None along with `provider`, the environment decides.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature for both summaries and answers. Default: 0.2.
    pub temperature: f32,

    /// Token budget for the AI summary. Default: 600.
    pub summary_max_tokens: usize,

    /// Token budget for an answer. Default: 700.
    pub answer_max_tokens: usize,

    /// Per-generation-call timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunking: ChunkingConfig::default(),
            scoring: ScoringConfig::default(),
            top_k: 6,
            max_context_chars: 12_000,
            min_page_chars: 40,
            cache_ttl_secs: 7 * 24 * 60 * 60,
            fingerprint_chars: 20_000,
            summary_input_chars: 6_000,
            simple_summary_sentences: 3,
            max_documents: 256,
            model: "gpt-4.1-nano".to_string(),
            fallback_model: Some("gpt-4.1-mini".to_string()),
            provider_name: None,
            provider: None,
            temperature: 0.2,
            summary_max_tokens: 600,
            answer_max_tokens: 700,
            api_timeout_secs: 60,
            download_timeout_secs: 120,
        }
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("chunking", &self.chunking)
            .field("scoring", &self.scoring)
            .field("top_k", &self.top_k)
            .field("max_context_chars", &self.max_context_chars)
            .field("min_page_chars", &self.min_page_chars)
            .field("cache_ttl_secs", &self.cache_ttl_secs)
            .field("fingerprint_chars", &self.fingerprint_chars)
            .field("summary_input_chars", &self.summary_input_chars)
            .field("max_documents", &self.max_documents)
            .field("model", &self.model)
            .field("fallback_model", &self.fallback_model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .finish()
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_secs)
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn chunking(mut self, chunking: ChunkingConfig) -> Self {
        self.config.chunking = chunking;
        self
    }

    pub fn chunk_chars(mut self, n: usize) -> Self {
        self.config.chunking.chunk_chars = n;
        self
    }

    pub fn overlap_chars(mut self, n: usize) -> Self {
        self.config.chunking.overlap_chars = n;
        self
    }

    pub fn scoring(mut self, scoring: ScoringConfig) -> Self {
        self.config.scoring = scoring;
        self
    }

    pub fn similarity_metric(mut self, metric: SimilarityMetric) -> Self {
        self.config.scoring.metric = metric;
        self
    }

    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    pub fn max_context_chars(mut self, n: usize) -> Self {
        self.config.max_context_chars = n;
        self
    }

    pub fn min_page_chars(mut self, n: usize) -> Self {
        self.config.min_page_chars = n;
        self
    }

    pub fn cache_ttl_secs(mut self, secs: u64) -> Self {
        self.config.cache_ttl_secs = secs;
        self
    }

    pub fn fingerprint_chars(mut self, n: usize) -> Self {
        self.config.fingerprint_chars = n;
        self
    }

    pub fn summary_input_chars(mut self, n: usize) -> Self {
        self.config.summary_input_chars = n;
        self
    }

    pub fn simple_summary_sentences(mut self, n: usize) -> Self {
        self.config.simple_summary_sentences = n;
        self
    }

    pub fn max_documents(mut self, n: usize) -> Self {
        self.config.max_documents = n;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn fallback_model(mut self, model: Option<String>) -> Self {
        self.config.fallback_model = model;
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn summary_max_tokens(mut self, n: usize) -> Self {
        self.config.summary_max_tokens = n;
        self
    }

    pub fn answer_max_tokens(mut self, n: usize) -> Self {
        self.config.answer_max_tokens = n;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, PdfQaError> {
        let c = &self.config;
        c.chunking.validate()?;
        if c.top_k == 0 {
            return Err(PdfQaError::InvalidConfig("top_k must be ≥ 1".into()));
        }
        if c.max_context_chars == 0 {
            return Err(PdfQaError::InvalidConfig(
                "max_context_chars must be ≥ 1".into(),
            ));
        }
        if c.fingerprint_chars == 0 {
            return Err(PdfQaError::InvalidConfig(
                "fingerprint_chars must be ≥ 1".into(),
            ));
        }
        if c.max_documents == 0 {
            return Err(PdfQaError::InvalidConfig(
                "max_documents must be ≥ 1".into(),
            ));
        }
        if !(0.0..=1.0).contains(&c.scoring.fuzzy_min_similarity) {
            return Err(PdfQaError::InvalidConfig(format!(
                "fuzzy_min_similarity must be within 0–1, got {}",
                c.scoring.fuzzy_min_similarity
            )));
        }
        if c.model.trim().is_empty() {
            return Err(PdfQaError::InvalidConfig("model must not be empty".into()));
        }
        Ok(self.config)
    }
}
