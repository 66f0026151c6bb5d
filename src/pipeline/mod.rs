//! Pipeline stages for document summarization and question answering.
//!
//! Each submodule implements exactly one transformation step. Every stage
//! except `input` and `extract` is a pure function over text, so each is
//! independently testable without pdfium or a network.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ normalize ──▶ chunk ──▶ score ──▶ select
//! (path/URL/  (pdfium)   (cleanup)    (paras)   (lexical)  (top-k)
//!  bytes)                    │
//!                            └──▶ summary (first sentences, counts)
//! ```
//!
//! 1. [`input`]     — canonicalise the path, URL or upload to a local file
//! 2. [`extract`]   — per-page text through the [`extract::PageSource`]
//!    seam; runs in `spawn_blocking` because pdfium is blocking FFI
//! 3. [`normalize`] — reading order, NFKC and the document cleanup rules
//! 4. [`chunk`]     — overlapping paragraph chunks with match projections
//! 5. [`score`]     — exact, fuzzy and rare-term lexical scoring
//! 6. [`select`]    — top-k passages joined under a character budget
//! 7. [`summary`]   — heuristic summary and word counts

pub mod chunk;
pub mod extract;
pub mod input;
pub mod normalize;
pub mod score;
pub mod select;
pub mod summary;
