//! Lexical relevance scoring of chunks against a question.
//!
//! ## Why lexical?
//!
//! Retrieval here has no model dependency: every score can be explained by
//! pointing at the tokens that produced it. Questions and chunks are both
//! projected through [`normalize_for_match`] so "Équation" matches
//! "equation" and punctuation never splits a hit.
//!
//! ## Scoring
//!
//! For each distinct query term (stop words and short tokens removed):
//!
//! | Signal | Contribution |
//! |--------|--------------|
//! | exact token occurrences | `count × exact_weight` |
//! | no exact hit, near-match token | `fuzzy_weight`, once |
//! | long term found as a substring | `rare_term_bonus` |
//!
//! A question with no surviving terms scores every chunk 0.0.

use crate::config::ScoringConfig;
use crate::pipeline::chunk::Chunk;
use once_cell::sync::Lazy;
use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;

/// Project text onto lowercase ASCII words separated by single spaces.
///
/// NFD decomposition splits accented letters into base + combining mark;
/// dropping every non-ASCII character then removes the marks (and any
/// script without an ASCII decomposition).
pub fn normalize_for_match(text: &str) -> String {
    let mapped: String = text
        .nfd()
        .filter(char::is_ascii)
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                ' '
            }
        })
        .collect();
    mapped.split_whitespace().collect::<Vec<_>>().join(" ")
}

// English and French function words, already in normalize_for_match form.
static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        // English
        "the", "and", "for", "are", "but", "not", "you", "all", "any", "can", "had", "her",
        "was", "one", "our", "out", "has", "have", "him", "his", "how", "its", "may", "who",
        "did", "does", "this", "that", "these", "those", "with", "from", "into", "onto",
        "what", "when", "where", "which", "while", "why", "will", "would", "should", "could",
        "about", "there", "their", "them", "they", "then", "than", "been", "being", "were",
        "your", "yours", "some", "such", "only", "also", "very", "just", "more", "most",
        "other", "each", "both", "over", "under", "again", "here", "whom", "whose", "shall",
        "tell", "explain", "describe", "please",
        // French
        "les", "des", "une", "est", "sont", "pour", "par", "dans", "sur", "avec", "sans",
        "que", "qui", "quoi", "quel", "quelle", "quels", "quelles", "dont", "mais", "ont",
        "aux", "ces", "cet", "cette", "ses", "son", "sa", "leur", "leurs", "nous", "vous",
        "ils", "elles", "elle", "lui", "pas", "plus", "tres", "comme", "comment", "quand",
        "etre", "avoir", "fait", "faire", "entre", "vers", "chez", "aussi", "donc", "alors",
        "ainsi", "cela", "ceci", "celui", "celle", "tout", "tous", "toute", "toutes", "peut",
        "selon", "parce", "pourquoi", "expliquer", "decrire", "moi",
    ]
    .into_iter()
    .collect()
});

/// Whether `token` (already normalized) is an English or French stop word.
pub fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.contains(token)
}

/// Extract the distinct scoring terms of a question, in first-seen order.
pub fn query_terms(question: &str, config: &ScoringConfig) -> Vec<String> {
    let normalized = normalize_for_match(question);
    let mut seen = HashSet::new();
    normalized
        .split(' ')
        .filter(|t| t.len() >= config.min_term_len && !is_stop_word(t))
        .filter(|t| seen.insert(*t))
        .map(str::to_string)
        .collect()
}

/// Score one chunk against pre-extracted query terms.
pub fn score_chunk(terms: &[String], chunk: &Chunk, config: &ScoringConfig) -> f64 {
    terms
        .iter()
        .map(|term| score_term(term, chunk, config))
        .fold(0.0, |acc, s| acc + s)
}

fn score_term(term: &str, chunk: &Chunk, config: &ScoringConfig) -> f64 {
    let exact = chunk.tokens.iter().filter(|t| t.as_str() == term).count();

    let mut score = if exact > 0 {
        exact as f64 * config.exact_weight
    } else if has_fuzzy_match(term, &chunk.tokens, config) {
        config.fuzzy_weight
    } else {
        0.0
    };

    if term.len() >= config.rare_term_min_len && chunk.normalized.contains(term) {
        score += config.rare_term_bonus;
    }
    score
}

fn has_fuzzy_match(term: &str, tokens: &[String], config: &ScoringConfig) -> bool {
    tokens.iter().any(|token| {
        token.len().abs_diff(term.len()) <= config.fuzzy_max_len_diff
            && config.metric.similarity(term, token) >= config.fuzzy_min_similarity
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimilarityMetric;

    #[test]
    fn test_normalize_for_match() {
        assert_eq!(normalize_for_match("  Hôtel-de-Ville, PARIS!! "), "hotel de ville paris");
        assert_eq!(normalize_for_match("naïve café"), "naive cafe");
        assert_eq!(normalize_for_match("数学 math"), "math");
        assert_eq!(normalize_for_match(""), "");
    }

    #[test]
    fn test_normalize_for_match_idempotent() {
        let once = normalize_for_match("Ça va? Très bien — merci.");
        assert_eq!(normalize_for_match(&once), once);
    }

    #[test]
    fn test_query_terms_filters_and_dedupes() {
        let terms = query_terms(
            "What is the Euler method, and why Euler?",
            &ScoringConfig::default(),
        );
        assert_eq!(terms, vec!["euler", "method"]);
    }

    #[test]
    fn test_french_stop_words_removed() {
        let terms = query_terms("Quelle est la méthode d'Euler ?", &ScoringConfig::default());
        assert_eq!(terms, vec!["methode", "euler"]);
    }

    #[test]
    fn test_exact_counts_occurrences() {
        let chunk = Chunk::new("Euler wrote. Euler again.");
        let terms = vec!["euler".to_string()];
        assert_eq!(score_chunk(&terms, &chunk, &ScoringConfig::default()), 2.0);
    }

    #[test]
    fn test_fuzzy_once_per_term() {
        let chunk = Chunk::new("euler euler euler");
        let terms = vec!["eular".to_string()];
        assert_eq!(score_chunk(&terms, &chunk, &ScoringConfig::default()), 0.7);
    }

    #[test]
    fn test_fuzzy_respects_length_difference() {
        let chunk = Chunk::new("eulerian");
        let terms = vec!["euler".to_string()];
        assert_eq!(score_chunk(&terms, &chunk, &ScoringConfig::default()), 0.0);
    }

    #[test]
    fn test_levenshtein_metric_rejects_eular() {
        let config = ScoringConfig {
            metric: SimilarityMetric::NormalizedLevenshtein,
            ..ScoringConfig::default()
        };
        let chunk = Chunk::new("euler");
        assert_eq!(score_chunk(&["eular".to_string()], &chunk, &config), 0.0);
    }

    #[test]
    fn test_rare_term_bonus() {
        let chunk = Chunk::new("integration methods");
        let terms = vec!["integration".to_string()];
        assert!((score_chunk(&terms, &chunk, &ScoringConfig::default()) - 1.3).abs() < 1e-9);
    }

    #[test]
    fn test_rare_term_bonus_on_substring_only() {
        // "integrat" is not a token but is a substring of "integration".
        let chunk = Chunk::new("numerical integration");
        let terms = vec!["integrat".to_string()];
        let score = score_chunk(&terms, &chunk, &ScoringConfig::default());
        assert!(score >= 0.3, "got {score}");
    }

    #[test]
    fn test_no_terms_scores_zero() {
        let chunk = Chunk::new("anything at all");
        let score = score_chunk(&[], &chunk, &ScoringConfig::default());
        assert_eq!(score, 0.0);
        // Serialized passage scores must read 0.0, not -0.0.
        assert!(score.is_sign_positive());
        assert_eq!(serde_json::to_string(&score).unwrap(), "0.0");
    }
}
