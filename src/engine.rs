//! The pipeline orchestrator: summarize documents and answer questions.
//!
//! [`DocumentEngine`] owns every piece of shared state (the document store
//! and the two result caches) and the injected [`TextGenerator`]. One engine
//! is meant to live for the whole process and be shared behind an `Arc`;
//! all methods take `&self`.
//!
//! ## Failure model
//!
//! Request-level problems (unreadable file, no question, no context) return
//! `Err(PdfQaError)`. A failed generation never does: the summary or answer
//! carries a visible `[Generation Error] …` marker instead, every other
//! field is still filled in, and nothing is cached, so the next request
//! retries the model.

use crate::cache::{answer_key, content_key, summary_key, ResultCache};
use crate::config::PipelineConfig;
use crate::error::{ErrorReport, GenerationError, PdfQaError};
use crate::generate::{generate_with_fallback, GenerationRequest, LlmGenerator, TextGenerator};
use crate::output::{
    AiSummary, AnswerOutput, DocumentInfo, PassageScore, StructuredSummary, SummaryOutput,
};
use crate::pipeline::chunk::chunk_text;
use crate::pipeline::extract::extract_document;
use crate::pipeline::input::{self, ResolvedInput};
use crate::pipeline::normalize::NormalizedDocument;
use crate::pipeline::select::{select_passages, truncate_chars};
use crate::pipeline::summary::simple_summary;
use crate::prompts;
use crate::store::{Document, DocumentStore};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// A question, addressed either to a stored document or to inline text.
///
/// When both are given and the document id is known, the document wins;
/// an unknown id falls back to the inline context.
#[derive(Debug, Clone, Default)]
pub struct AskRequest {
    pub document_id: Option<String>,
    pub context: Option<String>,
    pub question: String,
}

impl AskRequest {
    pub fn for_document(document_id: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            document_id: Some(document_id.into()),
            context: None,
            question: question.into(),
        }
    }

    pub fn with_context(context: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            document_id: None,
            context: Some(context.into()),
            question: question.into(),
        }
    }
}

/// Summarization and Q&A over ingested PDF documents.
pub struct DocumentEngine {
    config: PipelineConfig,
    generator: Arc<dyn TextGenerator>,
    store: DocumentStore,
    summaries: ResultCache,
    answers: ResultCache,
}

impl DocumentEngine {
    /// Build an engine around an explicit generator.
    pub fn new(config: PipelineConfig, generator: Arc<dyn TextGenerator>) -> Self {
        let ttl = config.cache_ttl();
        Self {
            store: DocumentStore::new(config.max_documents),
            summaries: ResultCache::new(ttl),
            answers: ResultCache::new(ttl),
            generator,
            config,
        }
    }

    /// Build an engine whose generator is resolved from the config and the
    /// environment (see [`LlmGenerator::from_config`]).
    pub fn from_config(config: PipelineConfig) -> Result<Self, PdfQaError> {
        let generator = LlmGenerator::from_config(&config)?;
        Ok(Self::new(config, Arc::new(generator)))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    // ── Summarize ────────────────────────────────────────────────────────

    /// Summarize a PDF given as a local path or HTTP(S) URL.
    pub async fn summarize(&self, input: &str) -> Result<SummaryOutput, PdfQaError> {
        info!("Summarizing: {}", input);
        let resolved = input::resolve_input(input, self.config.download_timeout_secs).await?;
        let document = self.extract(&resolved).await?;
        self.summarize_document(document).await
    }

    /// Summarize an uploaded PDF held in memory.
    pub async fn summarize_bytes(&self, bytes: &[u8]) -> Result<SummaryOutput, PdfQaError> {
        info!("Summarizing upload of {} bytes", bytes.len());
        let resolved = input::resolve_bytes(bytes)?;
        let document = self.extract(&resolved).await?;
        self.summarize_document(document).await
    }

    /// Summarize already-normalized text and register it for questions.
    pub async fn summarize_document(
        &self,
        document: NormalizedDocument,
    ) -> Result<SummaryOutput, PdfQaError> {
        if document.is_blank() {
            return Err(PdfQaError::UnreadableDocument);
        }

        let summary = simple_summary(&document.text, self.config.simple_summary_sentences);
        let key = summary_key(&document.text, self.config.fingerprint_chars);

        let (ai_summary, cached) = match self.cached_summary(&key) {
            Some(ai) => {
                info!("Summary cache hit");
                (ai, true)
            }
            None => (self.generate_summary(&document.text, &key).await, false),
        };

        let stored = self.register(document)?;
        info!(
            "Summarized document {}: {} pages, {} words",
            stored.id, stored.page_count, stored.word_count
        );

        Ok(SummaryOutput {
            document_id: stored.id.clone(),
            page_count: stored.page_count,
            word_count: stored.word_count,
            summary,
            ai_summary,
            cached,
        })
    }

    fn cached_summary(&self, key: &str) -> Option<AiSummary> {
        let raw = self.summaries.get(key)?;
        match serde_json::from_str(&raw) {
            Ok(ai) => Some(ai),
            Err(e) => {
                warn!("Discarding unreadable cached summary: {}", e);
                None
            }
        }
    }

    async fn generate_summary(&self, text: &str, key: &str) -> AiSummary {
        let start = Instant::now();
        match self.request_summary(text).await {
            Ok(ai) => {
                match serde_json::to_string(&ai) {
                    Ok(json) => self.summaries.put(key, json),
                    Err(e) => warn!("Summary not cached: {}", e),
                }
                info!("AI summary generated in {:?}", start.elapsed());
                ai
            }
            Err(e) => {
                warn!("AI summary failed: {}", e);
                AiSummary::Failed(e.marker())
            }
        }
    }

    /// Ask for the structured summary; fall back to free text when the
    /// model answers with something that is not the expected JSON.
    async fn request_summary(&self, text: &str) -> Result<AiSummary, GenerationError> {
        let excerpt = truncate_chars(text, self.config.summary_input_chars);

        let structured = self.request(
            prompts::SUMMARY_SYSTEM_PROMPT,
            prompts::structured_summary_prompt(excerpt),
            self.config.summary_max_tokens,
        );
        let raw = generate_with_fallback(
            self.generator.as_ref(),
            &structured,
            self.config.api_timeout(),
        )
        .await?;

        if let Some(parsed) = StructuredSummary::parse(&raw) {
            return Ok(AiSummary::Structured(parsed));
        }

        warn!("Structured summary malformed, requesting free text");
        debug!("Malformed summary response: {} chars", raw.chars().count());
        let free = self.request(
            prompts::SUMMARY_SYSTEM_PROMPT,
            prompts::free_text_summary_prompt(excerpt),
            self.config.summary_max_tokens,
        );
        let text =
            generate_with_fallback(self.generator.as_ref(), &free, self.config.api_timeout())
                .await?;
        Ok(AiSummary::FreeText(text.trim().to_string()))
    }

    // ── Ingest ───────────────────────────────────────────────────────────

    /// Extract, normalize, chunk and register a PDF without any generation.
    pub async fn ingest(&self, input: &str) -> Result<Arc<Document>, PdfQaError> {
        let resolved = input::resolve_input(input, self.config.download_timeout_secs).await?;
        let document = self.extract(&resolved).await?;
        self.register(document)
    }

    /// [`ingest`](Self::ingest) for an upload held in memory.
    pub async fn ingest_bytes(&self, bytes: &[u8]) -> Result<Arc<Document>, PdfQaError> {
        let resolved = input::resolve_bytes(bytes)?;
        let document = self.extract(&resolved).await?;
        self.register(document)
    }

    /// Chunk normalized text and store it. Blank text is rejected.
    pub fn register(&self, document: NormalizedDocument) -> Result<Arc<Document>, PdfQaError> {
        if document.is_blank() {
            return Err(PdfQaError::UnreadableDocument);
        }
        let chunks = chunk_text(&document.text, &self.config.chunking);
        debug!("Chunked document into {} chunks", chunks.len());
        let stored = self
            .store
            .register(Document::new(document.text, document.page_count, chunks));
        Ok(stored)
    }

    async fn extract(&self, resolved: &ResolvedInput) -> Result<NormalizedDocument, PdfQaError> {
        let start = Instant::now();
        let document = extract_document(resolved.path(), self.config.min_page_chars).await?;
        info!(
            "Extracted {} pages ({} chars) in {:?}",
            document.page_count,
            document.text.chars().count(),
            start.elapsed()
        );
        if document.is_blank() {
            return Err(PdfQaError::UnreadableDocument);
        }
        Ok(document)
    }

    // ── Ask ──────────────────────────────────────────────────────────────

    /// Answer a question from a stored document or from inline context.
    pub async fn ask(&self, request: &AskRequest) -> Result<AnswerOutput, PdfQaError> {
        let question = request.question.trim();
        if question.is_empty() {
            return Err(PdfQaError::MissingQuestion);
        }

        let document = request
            .document_id
            .as_deref()
            .and_then(|id| self.store.get(id));

        let inline = request
            .context
            .as_deref()
            .filter(|c| !c.trim().is_empty());

        let (document_id, key) = match (&document, inline) {
            (Some(doc), _) => (Some(doc.id.clone()), answer_key(&doc.id, question)),
            (None, Some(context)) => {
                // The whole context reaches the model, so the whole context is hashed.
                let scope = format!("context:{}", content_key(context));
                (None, answer_key(&scope, question))
            }
            (None, None) => return Err(PdfQaError::NoContext),
        };

        if let Some(answer) = self.answers.get(&key) {
            info!("Answer cache hit");
            return Ok(AnswerOutput {
                document_id,
                question: question.to_string(),
                answer,
                cached: true,
                error: None,
                passages: Vec::new(),
            });
        }

        let (context, passages) = match (&document, inline) {
            (Some(doc), _) => {
                let selection = select_passages(
                    &doc.chunks,
                    question,
                    self.config.top_k,
                    self.config.max_context_chars,
                    &self.config.scoring,
                );
                if !selection.has_signal {
                    debug!("Question has no scoring terms; using leading chunks");
                }
                debug!("Selected passages: {:?}", selection.scores);
                let passages = selection
                    .scores
                    .iter()
                    .map(|&(chunk, score)| PassageScore { chunk, score })
                    .collect();
                (selection.context, passages)
            }
            (None, Some(context)) => (context.to_string(), Vec::new()),
            (None, None) => return Err(PdfQaError::NoContext),
        };

        let generation = self.request(
            prompts::ANSWER_SYSTEM_PROMPT,
            prompts::answer_prompt(&context, question),
            self.config.answer_max_tokens,
        );

        let start = Instant::now();
        match generate_with_fallback(
            self.generator.as_ref(),
            &generation,
            self.config.api_timeout(),
        )
        .await
        {
            Ok(text) => {
                let answer = text.trim().to_string();
                self.answers.put(key, answer.clone());
                info!("Answered in {:?}", start.elapsed());
                Ok(AnswerOutput {
                    document_id,
                    question: question.to_string(),
                    answer,
                    cached: false,
                    error: None,
                    passages,
                })
            }
            Err(e) => {
                warn!("Answer generation failed: {}", e);
                Ok(AnswerOutput {
                    document_id,
                    question: question.to_string(),
                    answer: e.marker(),
                    cached: false,
                    error: Some(ErrorReport::from(&e)),
                    passages,
                })
            }
        }
    }

    // ── Registry ─────────────────────────────────────────────────────────

    /// Look up a stored document.
    pub fn document(&self, id: &str) -> Option<DocumentInfo> {
        self.store.get(id).map(|doc| DocumentInfo::from(doc.as_ref()))
    }

    pub fn document_count(&self) -> usize {
        self.store.len()
    }

    /// Sweep expired entries from both caches; returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        self.summaries.purge_expired() + self.answers.purge_expired()
    }

    fn request(&self, system: &str, user: String, max_tokens: usize) -> GenerationRequest {
        GenerationRequest {
            system_prompt: system.to_string(),
            user_prompt: user,
            max_tokens,
            temperature: self.config.temperature,
            model: self.config.model.clone(),
            fallback_model: self.config.fallback_model.clone(),
        }
    }
}
