//! Prompts for document summarization and question answering.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth** — changing how summaries are phrased or how
//!    strictly answers stick to the context requires editing exactly one place.
//!
//! 2. **Testability** — unit tests can inspect the rendered prompts without
//!    calling a model, so prompt regressions are easy to catch.

/// System prompt shared by both summary prompts.
pub const SUMMARY_SYSTEM_PROMPT: &str =
    "You are an expert at summarizing professional and academic documents in all languages.";

/// Instructions for the structured (JSON) summary.
///
/// The placeholder `{document}` is replaced by [`structured_summary_prompt`].
const STRUCTURED_SUMMARY_TEMPLATE: &str = r#"Summarize this PDF document in the original language, professionally, as if explaining to an executive.
Extract only the key information, main results, recommendations, and important insights for decision-making.

Respond with a single JSON object and nothing else, using exactly these fields:

{
  "executive_summary": "2-3 sentences",
  "key_points": ["main point or result", "..."],
  "recommendations": ["recommendation", "..."],
  "remarks": "other important remarks, or null"
}

Rules:
- Write every value in the language of the document.
- Use empty lists when the document has no recommendations.
- Do NOT wrap the JSON in ``` fences.
- Do NOT add commentary before or after the JSON.

PDF content:
{document}"#;

/// Instructions for the free-text summary used when the structured one
/// comes back malformed.
const FREE_TEXT_SUMMARY_TEMPLATE: &str = r#"Summarize this PDF document in the original language, professionally, as if explaining to an executive. Extract only the key information, main results, recommendations, and important insights for decision-making. Use bullet or numbered lists for clarity.

Expected structure:
1. Executive summary (2-3 sentences)
2. Key points / Results (list)
3. Recommendations (list)
4. Other important remarks (optional)

PDF content:
{document}"#;

/// System prompt for answering a question from retrieved passages.
pub const ANSWER_SYSTEM_PROMPT: &str = r#"You answer questions about a document using only the excerpts provided.

Rules:
- Answer in the language of the question.
- Base the answer strictly on the excerpts; do not use outside knowledge.
- If the excerpts do not contain the answer, say so plainly instead of guessing.
- Quote figures, names and dates exactly as they appear.
- Be concise: a direct answer first, then supporting detail if useful."#;

/// Build the user prompt for the structured summary.
pub fn structured_summary_prompt(document_excerpt: &str) -> String {
    STRUCTURED_SUMMARY_TEMPLATE.replace("{document}", document_excerpt)
}

/// Build the user prompt for the free-text summary.
pub fn free_text_summary_prompt(document_excerpt: &str) -> String {
    FREE_TEXT_SUMMARY_TEMPLATE.replace("{document}", document_excerpt)
}

/// Build the user prompt for an answer.
pub fn answer_prompt(context: &str, question: &str) -> String {
    format!(
        "Document excerpts:\n\"\"\"\n{}\n\"\"\"\n\nQuestion: {}",
        context,
        question.trim()
    )
}
