//! Cross-stage properties of the text pipeline.
//!
//! Unit tests inside each module pin individual rules; these tests run the
//! stages together the way the engine does (pages → normalize → chunk →
//! select) and check the properties callers rely on.

use chrono::{Duration as ChronoDuration, Utc};
use edgequake_pdfqa::pipeline::input::resolve_input;
use edgequake_pdfqa::{
    answer_key, chunk_text, clean_text, normalize_document, query_terms, score_chunk,
    select_passages, summary_key, Chunk, ChunkingConfig, ErrorKind, InMemoryPages, PageLayout,
    PdfQaError, ResultCache, ScoringConfig, SimilarityMetric, TextBlock, PASSAGE_SEPARATOR,
};
use std::io::Write;
use std::time::Duration;

fn lecture_chunks() -> Vec<Chunk> {
    vec![
        Chunk::new("Numerical methods approximate the solution of differential equations."),
        Chunk::new("The Euler method advances the solution using the derivative at each step."),
        Chunk::new("Runge-Kutta schemes combine several slope evaluations per step."),
        Chunk::new("The history of mathematics includes many famous names."),
    ]
}

// ── Normalization ────────────────────────────────────────────────────────────

#[test]
fn test_normalize_mixed_document() {
    let pages = InMemoryPages::new(vec![
        PageLayout::Blocks(vec![
            TextBlock::new(96.0, 72.0, "Second line"),
            TextBlock::new(72.0, 72.0, "Title\u{200B}"),
        ]),
        PageLayout::Flat("ﬁnal   page\r\nwith  text".into()),
    ]);
    // Block pages here are short, so force the threshold down to keep them.
    let doc = normalize_document(&pages, 1).unwrap();
    assert_eq!(doc.page_count, 2);
    assert!(doc.text.starts_with("Title\nSecond line"));
    assert!(doc.text.contains("final page\nwith text"));
    assert!(!doc.text.contains('\r'));
    assert!(!doc.text.contains('\u{200B}'));
}

#[test]
fn test_clean_text_idempotent_on_noisy_input() {
    let noisy = "Header\r\n\r\n\r\n\r\n\r\nBody  text\t\there.\n\
                 ________________\n\
                 data data data data data data data data data end\n   \n";
    let once = clean_text(noisy);
    assert_eq!(clean_text(&once), once);
    assert!(once.contains("Body text here."));
    assert!(once.contains("—"));
    assert!(once.contains("data end"));
    assert!(!once.contains("\n\n\n\n"));
}

// ── Chunking ─────────────────────────────────────────────────────────────────

#[test]
fn test_chunks_cover_every_paragraph_in_order() {
    let paragraphs: Vec<String> = (0..40)
        .map(|i| format!("Paragraph {i} talks about topic number {i} in some detail."))
        .collect();
    let text = paragraphs.join("\n");
    let config = ChunkingConfig {
        chunk_chars: 300,
        overlap_chars: 30,
    };
    let chunks = chunk_text(&text, &config);
    assert!(chunks.len() > 1);

    let mut cursor = 0;
    for para in &paragraphs {
        let found = chunks[cursor..]
            .iter()
            .position(|c| c.text.contains(para.as_str()))
            .unwrap_or_else(|| panic!("paragraph missing: {para}"));
        cursor += found;
    }

    for pair in chunks.windows(2) {
        let tail: String = pair[0]
            .text
            .chars()
            .rev()
            .take(30)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        assert!(pair[1].text.starts_with(&tail), "overlap not carried");
    }
}

#[test]
fn test_blank_text_has_no_chunks() {
    assert!(chunk_text(" \n\n\t\n", &ChunkingConfig::default()).is_empty());
}

// ── Scoring and selection ────────────────────────────────────────────────────

#[test]
fn test_stop_word_question_scores_zero_everywhere() {
    let cfg = ScoringConfig::default();
    let terms = query_terms("What is the?", &cfg);
    assert!(terms.is_empty());
    for chunk in lecture_chunks() {
        assert_eq!(score_chunk(&terms, &chunk, &cfg), 0.0);
    }

    let selection = select_passages(&lecture_chunks(), "What is the?", 2, 10_000, &cfg);
    assert!(!selection.has_signal);
    assert_eq!(
        selection.scores.iter().map(|s| s.0).collect::<Vec<_>>(),
        vec![0, 1]
    );
}

#[test]
fn test_euler_question_ranks_euler_chunk_first() {
    let cfg = ScoringConfig::default();
    let selection = select_passages(
        &lecture_chunks(),
        "Explain the Euler method",
        2,
        10_000,
        &cfg,
    );
    assert!(selection.has_signal);
    assert_eq!(selection.scores[0].0, 1);
    assert!(selection.context.starts_with("The Euler method advances"));
    assert_eq!(selection.context.matches(PASSAGE_SEPARATOR).count(), 1);
}

#[test]
fn test_misspelled_term_scores_between_zero_and_exact() {
    let cfg = ScoringConfig::default();
    let chunk = &lecture_chunks()[1];
    let exact = score_chunk(&query_terms("euler", &cfg), chunk, &cfg);
    let fuzzy = score_chunk(&query_terms("eular", &cfg), chunk, &cfg);
    assert!(fuzzy > 0.0, "fuzzy = {fuzzy}");
    assert!(fuzzy < exact, "fuzzy = {fuzzy}, exact = {exact}");
}

#[test]
fn test_levenshtein_metric_misses_eular() {
    let cfg = ScoringConfig {
        metric: SimilarityMetric::NormalizedLevenshtein,
        ..ScoringConfig::default()
    };
    let chunk = &lecture_chunks()[1];
    assert_eq!(score_chunk(&query_terms("eular", &cfg), chunk, &cfg), 0.0);
}

#[test]
fn test_context_respects_max_chars() {
    let cfg = ScoringConfig::default();
    for max_chars in [0, 1, 25, 80, 10_000] {
        let selection =
            select_passages(&lecture_chunks(), "solution step", 4, max_chars, &cfg);
        assert!(selection.context.chars().count() <= max_chars);
    }
}

// ── Cache ────────────────────────────────────────────────────────────────────

#[test]
fn test_cache_entry_expires_after_ttl() {
    let cache = ResultCache::new(Duration::from_secs(7 * 24 * 3600));
    let inserted = Utc::now();
    cache.put_at("k", "v", inserted);

    let almost = inserted + ChronoDuration::days(7) - ChronoDuration::seconds(1);
    assert_eq!(cache.get_at("k", almost).as_deref(), Some("v"));

    let expired = inserted + ChronoDuration::days(7) + ChronoDuration::seconds(1);
    assert!(cache.get_at("k", expired).is_none());
}

#[test]
fn test_documents_sharing_prefix_share_summary_key() {
    let prefix = "x".repeat(20_000);
    let a = format!("{prefix} first ending");
    let b = format!("{prefix} a completely different ending");
    assert_eq!(summary_key(&a, 20_000), summary_key(&b, 20_000));
    assert_ne!(summary_key(&a, 20_010), summary_key(&b, 20_010));
}

#[test]
fn test_answer_keys_are_scoped_per_document() {
    assert_eq!(answer_key("doc", "What?"), answer_key("doc", "  what? "));
    assert_ne!(answer_key("doc-a", "What?"), answer_key("doc-b", "What?"));
}

// ── Input ────────────────────────────────────────────────────────────────────

#[test]
fn test_resolve_missing_file() {
    let err = tokio_test::block_on(resolve_input("/definitely/not/here.pdf", 5)).unwrap_err();
    assert!(matches!(err, PdfQaError::FileNotFound { .. }));
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}

#[test]
fn test_resolve_rejects_non_pdf() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"PK\x03\x04 zip archive").unwrap();
    let path = file.path().to_string_lossy().to_string();

    let err = tokio_test::block_on(resolve_input(&path, 5)).unwrap_err();
    match err {
        PdfQaError::NotAPdf { magic, .. } => assert_eq!(&magic, b"PK\x03\x04"),
        other => panic!("expected NotAPdf, got {other:?}"),
    }
}

#[test]
fn test_resolve_accepts_pdf_magic() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"%PDF-1.7\n%fake body").unwrap();
    let path = file.path().to_string_lossy().to_string();

    let resolved = tokio_test::block_on(resolve_input(&path, 5)).unwrap();
    assert_eq!(resolved.path(), file.path());
}
