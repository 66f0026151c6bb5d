//! Passage selection: pick the best chunks for a question and assemble the
//! answer context.

use crate::config::ScoringConfig;
use crate::pipeline::chunk::Chunk;
use crate::pipeline::score::{query_terms, score_chunk};
use std::cmp::Ordering;

/// Separator placed between selected passages.
pub const PASSAGE_SEPARATOR: &str = "\n\n---\n\n";

/// Result of one selection.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    /// Selected raw passages joined by [`PASSAGE_SEPARATOR`], truncated to
    /// the character budget.
    pub context: String,
    /// `(chunk index, score)` of the selected chunks, best first.
    pub scores: Vec<(usize, f64)>,
    /// Whether the question had any scoring term at all.
    pub has_signal: bool,
}

/// Score every chunk, keep the `top_k` best and join them.
///
/// Ties keep document order. When no chunk scores above zero the first
/// `top_k` chunks are returned, so the context is empty only when `chunks`
/// is.
pub fn select_passages(
    chunks: &[Chunk],
    question: &str,
    top_k: usize,
    max_chars: usize,
    config: &ScoringConfig,
) -> Selection {
    let terms = query_terms(question, config);

    let mut ranked: Vec<(usize, f64)> = chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| (i, score_chunk(&terms, chunk, config)))
        .collect();
    // Stable: equal scores stay in document order.
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    ranked.truncate(top_k);

    let joined = ranked
        .iter()
        .map(|(i, _)| chunks[*i].text.as_str())
        .collect::<Vec<_>>()
        .join(PASSAGE_SEPARATOR);

    Selection {
        context: truncate_chars(&joined, max_chars).to_string(),
        scores: ranked,
        has_signal: !terms.is_empty(),
    }
}

/// The first `max_chars` characters of `s`.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
