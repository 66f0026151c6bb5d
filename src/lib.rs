//! # edgequake-pdfqa
//!
//! Summarize PDF documents and answer questions about them.
//!
//! ## Why this crate?
//!
//! Sending a whole PDF to a language model for every question is slow,
//! expensive and bounded by the context window. This crate extracts and
//! cleans the text once, splits it into overlapping chunks, and for each
//! question forwards only the few passages that score best under a cheap,
//! explainable lexical ranking. Summaries and answers are cached, so
//! repeated uploads and repeated questions cost nothing.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input      resolve local file, URL or upload bytes
//!  ├─ 2. Extract    per-page text via pdfium (blocks → flat fallback)
//!  ├─ 3. Normalize  NFKC, reading order, whitespace/rule/repeat cleanup
//!  ├─ 4. Summarize  first sentences + structured LLM summary (cached)
//!  ├─ 5. Chunk      paragraph packing with overlap → document store
//!  └─ 6. Ask        lexical top-k passages → LLM answer (cached)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdfqa::{AskRequest, DocumentEngine, PipelineConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / …
//!     let engine = DocumentEngine::from_config(PipelineConfig::default())?;
//!
//!     let summary = engine.summarize("report.pdf").await?;
//!     println!("{}", summary.ai_summary.render());
//!
//!     let answer = engine
//!         .ask(&AskRequest::for_document(&summary.document_id, "What are the main risks?"))
//!         .await?;
//!     println!("{}", answer.answer);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdfqa` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-pdfqa = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod generate;
pub mod output;
pub mod pipeline;
pub mod prompts;
pub mod store;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use cache::{answer_key, content_key, summary_key, ResultCache};
pub use config::{
    ChunkingConfig, PipelineConfig, PipelineConfigBuilder, ScoringConfig, SimilarityMetric,
};
pub use engine::{AskRequest, DocumentEngine};
pub use error::{ErrorKind, ErrorReport, GenerationError, PdfQaError, GENERATION_ERROR_MARKER};
pub use generate::{generate_with_fallback, GenerationRequest, LlmGenerator, TextGenerator};
pub use output::{
    AiSummary, AnswerOutput, DocumentInfo, PassageScore, StructuredSummary, SummaryOutput,
};
pub use pipeline::chunk::{chunk_text, Chunk};
pub use pipeline::extract::{ExtractionMode, InMemoryPages, PageLayout, PageSource, TextBlock};
pub use pipeline::normalize::{clean_text, normalize_document, NormalizedDocument};
pub use pipeline::score::{normalize_for_match, query_terms, score_chunk};
pub use pipeline::select::{select_passages, Selection, PASSAGE_SEPARATOR};
pub use store::{Document, DocumentStore};
