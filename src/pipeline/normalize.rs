//! Text normalization: turn raw per-page extraction into one clean document.
//!
//! ## Why is normalization necessary?
//!
//! PDF text extraction returns whatever the content stream happens to hold:
//!
//! - Text runs in drawing order, not reading order (two-column layouts,
//!   footers emitted before body text)
//! - Compatibility characters (ligatures like `ﬁ`, full-width digits)
//! - Zero-width joiners and BOMs left behind by the authoring tool
//! - Dot leaders in tables of contents (`________`) and watermark words
//!   stamped on every line (`DRAFT DRAFT DRAFT …`)
//!
//! Each of these inflates chunk sizes and pollutes lexical matching. The
//! rules below are cheap, deterministic and independently testable.
//!
//! ## Rule Order
//!
//! Page assembly runs first (per page, per [`ExtractionMode`]), then the
//! document-level cleanup. Line endings are normalised before whitespace
//! collapsing so `\r` is never mistaken for horizontal whitespace, and
//! blank-line collapsing runs after per-line trimming so lines holding only
//! spaces count as blank. The cleanup is idempotent.

use crate::error::PdfQaError;
use crate::pipeline::extract::{ExtractionMode, PageLayout, PageSource, TextBlock};
use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Ordering;
use tracing::{debug, warn};
use unicode_normalization::UnicodeNormalization;

/// The normalized text of a whole document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedDocument {
    pub page_count: usize,
    pub text: String,
}

impl NormalizedDocument {
    /// Whether extraction produced nothing but whitespace.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Extract every page of `source` and normalize the document.
///
/// Pages are tried in [`ExtractionMode::ORDER`]: a page whose block text has
/// fewer than `min_page_chars` non-whitespace characters, or whose block
/// extraction fails, is re-read in flat mode. A page fails the whole
/// document only when every mode fails.
pub fn normalize_document(
    source: &dyn PageSource,
    min_page_chars: usize,
) -> Result<NormalizedDocument, PdfQaError> {
    let page_count = source.page_count();
    let mut pages = Vec::with_capacity(page_count);

    for page in 0..page_count {
        let text = extract_page(source, page, min_page_chars)?;
        pages.push(clean_page(&text));
    }

    let text = clean_text(&pages.join("\n\n"));
    debug!(
        "Normalized {} pages → {} chars",
        page_count,
        text.chars().count()
    );
    Ok(NormalizedDocument { page_count, text })
}

fn extract_page(
    source: &dyn PageSource,
    page: usize,
    min_page_chars: usize,
) -> Result<String, PdfQaError> {
    let mut best: Option<String> = None;
    let mut last_err = None;

    for mode in ExtractionMode::ORDER {
        match source.extract(page, mode) {
            Ok(layout) => {
                let text = layout_text(layout);
                if non_whitespace_len(&text) >= min_page_chars {
                    return Ok(text);
                }
                debug!(
                    "Page {}: {:?} text below {} chars, trying next mode",
                    page + 1,
                    mode,
                    min_page_chars
                );
                // Keep the longest sparse result in case every mode is sparse.
                if best
                    .as_deref()
                    .is_none_or(|b| non_whitespace_len(b) < non_whitespace_len(&text))
                {
                    best = Some(text);
                }
            }
            Err(e) => {
                warn!("Page {}: {:?} extraction failed: {}", page + 1, mode, e);
                last_err = Some(e);
            }
        }
    }

    match (best, last_err) {
        (Some(text), _) => Ok(text),
        (None, Some(e)) => Err(e),
        (None, None) => Ok(String::new()),
    }
}

fn layout_text(layout: PageLayout) -> String {
    match layout {
        PageLayout::Blocks(blocks) => assemble_blocks(blocks),
        PageLayout::Flat(text) => text,
    }
}

fn non_whitespace_len(s: &str) -> usize {
    s.chars().filter(|c| !c.is_whitespace()).count()
}

// ── Page assembly: reading order ─────────────────────────────────────────

/// Sort blocks top-to-bottom then left-to-right on a 0.1 pt grid and join
/// the non-empty ones with `\n`. Blocks on the same grid cell keep their
/// extraction order.
pub fn assemble_blocks(mut blocks: Vec<TextBlock>) -> String {
    blocks.sort_by(|a, b| {
        let ka = (grid(a.y), grid(a.x));
        let kb = (grid(b.y), grid(b.x));
        ka.partial_cmp(&kb).unwrap_or(Ordering::Equal)
    });
    blocks
        .iter()
        .map(|b| b.text.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn grid(v: f32) -> i64 {
    (f64::from(v) * 10.0).round() as i64
}

// ── Page cleanup: compatibility forms and invisible characters ───────────

const INVISIBLE: [char; 6] = [
    '\0', '\u{200B}', '\u{200C}', '\u{200D}', '\u{2060}', '\u{FEFF}',
];

/// NFKC-normalize one page and strip NUL and zero-width characters.
pub fn clean_page(text: &str) -> String {
    text.nfkc().filter(|c| !INVISIBLE.contains(c)).collect()
}

// ── Document cleanup ─────────────────────────────────────────────────────

/// Apply all document-level cleanup rules.
///
/// Rules (applied in order):
/// 1. Normalise line endings (CRLF/CR → LF)
/// 2. Collapse horizontal-whitespace runs to one space
/// 3. Collapse 4+ dash/underscore runs into one em-dash
/// 4. Collapse a word repeated 8+ times in a row to one occurrence
/// 5. Trim trailing spaces per line
/// 6. Collapse 3+ blank lines down to one
/// 7. Trim the document
pub fn clean_text(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = collapse_horizontal_whitespace(&s);
    let s = collapse_rules(&s);
    let s = collapse_repeated_words(&s);
    let s = trim_trailing_spaces(&s);
    let s = collapse_blank_lines(&s);
    s.trim().to_string()
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Collapse horizontal whitespace ───────────────────────────────

static RE_HSPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\S\n]+").unwrap());

fn collapse_horizontal_whitespace(input: &str) -> String {
    RE_HSPACE.replace_all(input, " ").into_owned()
}

// ── Rule 3: Collapse dash/underscore runs ────────────────────────────────

static RE_RULES: Lazy<Regex> = Lazy::new(|| Regex::new(r"[-_\u{2013}\u{2014}]{4,}").unwrap());

fn collapse_rules(input: &str) -> String {
    RE_RULES.replace_all(input, "\u{2014}").into_owned()
}

// ── Rule 4: Collapse repeated words ──────────────────────────────────────
//
// A word of 2+ word characters repeated 8 or more times in a row, separated
// only by whitespace, keeps its first occurrence. The comparison is
// case-insensitive. The regex crate has no backreferences, so this scans
// word tokens and the gaps between them.

const MIN_WORD_REPEATS: usize = 8;

static RE_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+").unwrap());

fn collapse_repeated_words(input: &str) -> String {
    let words: Vec<(usize, usize)> = RE_WORD
        .find_iter(input)
        .map(|m| (m.start(), m.end()))
        .collect();

    let mut out = String::with_capacity(input.len());
    let mut cursor = 0;
    let mut i = 0;

    while i < words.len() {
        let (start, end) = words[i];
        let word = &input[start..end];
        let mut run_end = i + 1;

        if word.chars().count() >= 2 {
            let folded = word.to_lowercase();
            while run_end < words.len() {
                let (prev_end, (next_start, next_end)) = (words[run_end - 1].1, words[run_end]);
                let gap = &input[prev_end..next_start];
                if gap.is_empty()
                    || !gap.chars().all(char::is_whitespace)
                    || input[next_start..next_end].to_lowercase() != folded
                {
                    break;
                }
                run_end += 1;
            }
        }

        if run_end - i >= MIN_WORD_REPEATS {
            out.push_str(&input[cursor..end]);
            cursor = words[run_end - 1].1;
            i = run_end;
        } else {
            i += 1;
        }
    }

    out.push_str(&input[cursor..]);
    out
}

// ── Rule 5: Trim trailing spaces per line ────────────────────────────────

fn trim_trailing_spaces(input: &str) -> String {
    input
        .split('\n')
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 6: Collapse excessive blank lines ───────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{4,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").into_owned()
}

// ── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::extract::InMemoryPages;

    #[test]
    fn test_normalise_line_endings() {
        assert_eq!(normalise_line_endings("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn test_collapse_horizontal_whitespace_keeps_newlines() {
        assert_eq!(
            collapse_horizontal_whitespace("a \t  b\n\n  c"),
            "a b\n\n c"
        );
    }

    #[test]
    fn test_collapse_rules() {
        assert_eq!(collapse_rules("Intro ________ 3"), "Intro \u{2014} 3");
        assert_eq!(collapse_rules("a---b"), "a---b");
        assert_eq!(collapse_rules("x-_-_y"), "x\u{2014}y");
    }

    #[test]
    fn test_collapse_repeated_words() {
        let input = format!("Header {}end", "DRAFT ".repeat(9));
        assert_eq!(collapse_repeated_words(&input), "Header DRAFT end");
    }

    #[test]
    fn test_repeated_words_case_insensitive() {
        let input = "go Go GO go gO Go go GO done";
        assert_eq!(collapse_repeated_words(input), "go done");
    }

    #[test]
    fn test_seven_repeats_untouched() {
        let input = "la la la la la la la";
        assert_eq!(collapse_repeated_words(input), input);
    }

    #[test]
    fn test_single_char_words_untouched() {
        let input = "a a a a a a a a a a";
        assert_eq!(collapse_repeated_words(input), input);
    }

    #[test]
    fn test_repeats_across_punctuation_untouched() {
        let input = "no, no, no, no, no, no, no, no, no";
        assert_eq!(collapse_repeated_words(input), input);
    }

    #[test]
    fn test_collapse_blank_lines() {
        assert_eq!(collapse_blank_lines("a\n\n\n\n\nb"), "a\n\nb");
        assert_eq!(collapse_blank_lines("a\n\n\nb"), "a\n\n\nb");
    }

    #[test]
    fn test_clean_page_nfkc_and_invisible() {
        assert_eq!(clean_page("\u{FB01}le\u{200B}\0 \u{FEFF}x"), "file x");
    }

    #[test]
    fn test_assemble_blocks_reading_order() {
        let blocks = vec![
            TextBlock::new(700.0, 50.0, "footer"),
            TextBlock::new(100.0, 300.0, "right"),
            TextBlock::new(100.0, 50.0, "left"),
            TextBlock::new(400.0, 50.0, "   "),
        ];
        assert_eq!(assemble_blocks(blocks), "left\nright\nfooter");
    }

    #[test]
    fn test_assemble_blocks_stable_on_same_cell() {
        let blocks = vec![
            TextBlock::new(100.01, 50.0, "first"),
            TextBlock::new(100.04, 50.0, "second"),
        ];
        assert_eq!(assemble_blocks(blocks), "first\nsecond");
    }

    #[test]
    fn test_sparse_blocks_fall_back_to_flat() {
        let source = InMemoryPages::new(vec![PageLayout::Blocks(vec![TextBlock::new(
            0.0, 0.0, "12",
        )])]);
        // Blocks give "12"; flat of a block page is the same text, so the
        // longest sparse result is kept.
        let doc = normalize_document(&source, 40).unwrap();
        assert_eq!(doc.text, "12");
    }

    #[test]
    fn test_flat_only_pages() {
        let source = InMemoryPages::from_texts(["Page one text.", "Page two text."]);
        let doc = normalize_document(&source, 5).unwrap();
        assert_eq!(doc.page_count, 2);
        assert_eq!(doc.text, "Page one text.\n\nPage two text.");
    }

    #[test]
    fn test_blank_document() {
        let source = InMemoryPages::from_texts(["  ", "\u{200B}\n"]);
        let doc = normalize_document(&source, 40).unwrap();
        assert!(doc.is_blank());
        assert_eq!(doc.text, "");
    }

    #[test]
    fn test_clean_text_idempotent() {
        let input = "  Title\r\n\r\n\r\n\r\nBody  text ----- more\t\n\n\n\nDRAFT DRAFT DRAFT DRAFT DRAFT DRAFT DRAFT DRAFT x  ";
        let once = clean_text(input);
        assert_eq!(clean_text(&once), once);
        assert_eq!(once, "Title\n\nBody text \u{2014} more\n\nDRAFT x");
    }
}
