//! Paragraph-accumulating chunker.
//!
//! Splits normalized document text on newlines and packs whole paragraphs
//! into chunks of at most `chunk_chars` characters. When a chunk closes, the
//! last `overlap_chars` characters are carried into the next one so a
//! sentence straddling the boundary stays retrievable from either side.
//!
//! Paragraphs are never split: a single paragraph longer than `chunk_chars`
//! becomes one oversized chunk.

use crate::config::ChunkingConfig;
use crate::pipeline::score::normalize_for_match;
use serde::{Deserialize, Serialize};

/// A retrieval unit with its match projection precomputed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Raw chunk text, forwarded verbatim to the answer prompt.
    pub text: String,
    /// Case-folded, accent- and punctuation-stripped projection of `text`.
    pub normalized: String,
    /// `normalized` split on spaces.
    pub tokens: Vec<String>,
}

impl Chunk {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let normalized = normalize_for_match(&text);
        let tokens = normalized
            .split(' ')
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();
        Self {
            text,
            normalized,
            tokens,
        }
    }
}

/// Split `text` into overlapping paragraph chunks.
///
/// Lengths are measured in characters, never bytes, so multi-byte scripts
/// get the same budget as ASCII.
pub fn chunk_text(text: &str, config: &ChunkingConfig) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut buffer = String::new();
    let mut buffer_len = 0usize;

    for paragraph in text.split('\n').map(str::trim).filter(|p| !p.is_empty()) {
        let para_len = paragraph.chars().count();

        if buffer.is_empty() {
            buffer.push_str(paragraph);
            buffer_len = para_len;
            continue;
        }

        if buffer_len + para_len + 1 <= config.chunk_chars {
            buffer.push('\n');
            buffer.push_str(paragraph);
            buffer_len += para_len + 1;
            continue;
        }

        let tail = char_tail(&buffer, config.overlap_chars).to_string();
        chunks.push(Chunk::new(std::mem::take(&mut buffer)));

        if tail.is_empty() {
            buffer.push_str(paragraph);
            buffer_len = para_len;
        } else {
            buffer_len = tail.chars().count() + 1 + para_len;
            buffer.push_str(&tail);
            buffer.push('\n');
            buffer.push_str(paragraph);
        }
    }

    if !buffer.is_empty() {
        chunks.push(Chunk::new(buffer));
    }
    chunks
}

/// The last `n` characters of `s`.
fn char_tail(s: &str, n: usize) -> &str {
    if n == 0 {
        return "";
    }
    match s.char_indices().rev().nth(n - 1) {
        Some((idx, _)) => &s[idx..],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(chunk_chars: usize, overlap_chars: usize) -> ChunkingConfig {
        ChunkingConfig {
            chunk_chars,
            overlap_chars,
        }
    }

    #[test]
    fn test_empty_input_yields_no_chunks() {
        assert!(chunk_text("", &ChunkingConfig::default()).is_empty());
        assert!(chunk_text("\n \n\t\n", &ChunkingConfig::default()).is_empty());
    }

    #[test]
    fn test_short_text_single_chunk() {
        let chunks = chunk_text("alpha\n\nbeta", &ChunkingConfig::default());
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "alpha\nbeta");
    }

    #[test]
    fn test_overflow_closes_and_seeds_overlap() {
        let text = "aaaaaaaaaa\nbbbbbbbbbb\ncccccccccc";
        let chunks = chunk_text(text, &cfg(21, 3));
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "aaaaaaaaaa\nbbbbbbbbbb");
        assert_eq!(chunks[1].text, "bbb\ncccccccccc");
    }

    #[test]
    fn test_zero_overlap() {
        let chunks = chunk_text("one two\nthree four", &cfg(8, 0));
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].text, "three four");
    }

    #[test]
    fn test_oversized_paragraph_kept_whole() {
        let long = "x".repeat(50);
        let chunks = chunk_text(&long, &cfg(10, 2));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text.len(), 50);
    }

    #[test]
    fn test_lengths_counted_in_chars() {
        // 5 chars, 10 bytes each.
        let text = "ééééé\nààààà";
        let chunks = chunk_text(text, &cfg(11, 1));
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn test_char_tail_multibyte() {
        assert_eq!(char_tail("héllo", 4), "éllo");
        assert_eq!(char_tail("hi", 10), "hi");
        assert_eq!(char_tail("hi", 0), "");
    }

    #[test]
    fn test_chunk_projection_precomputed() {
        let chunk = Chunk::new("L'Équation d'Euler, 1768!");
        assert_eq!(chunk.normalized, "l equation d euler 1768");
        assert_eq!(chunk.tokens, vec!["l", "equation", "d", "euler", "1768"]);
    }
}
