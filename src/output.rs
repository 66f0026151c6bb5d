//! Output types returned by the engine.
//!
//! Everything here is `Serialize` so the CLI's `--json` mode and any HTTP
//! layer in front of the library can emit results without a second model.

use crate::error::ErrorReport;
use crate::store::Document;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The executive summary a model returns in JSON mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredSummary {
    pub executive_summary: String,
    #[serde(default)]
    pub key_points: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub remarks: Option<String>,
}

impl StructuredSummary {
    /// Parse a model response, tolerating code fences and prose around the
    /// JSON object. Returns `None` unless the object has a non-empty
    /// `executive_summary`.
    pub fn parse(raw: &str) -> Option<Self> {
        let start = raw.find('{')?;
        let end = raw.rfind('}')?;
        if end < start {
            return None;
        }
        let mut parsed: Self = serde_json::from_str(&raw[start..=end]).ok()?;
        if parsed.executive_summary.trim().is_empty() {
            return None;
        }
        parsed.key_points.retain(|p| !p.trim().is_empty());
        parsed.recommendations.retain(|r| !r.trim().is_empty());
        parsed.remarks = parsed.remarks.filter(|r| !r.trim().is_empty());
        Some(parsed)
    }

    /// Render as numbered sections with bullet lists.
    pub fn render(&self) -> String {
        let mut out = format!("1. Executive summary\n{}\n", self.executive_summary.trim());
        push_list(&mut out, "2. Key points", &self.key_points);
        push_list(&mut out, "3. Recommendations", &self.recommendations);
        if let Some(ref remarks) = self.remarks {
            out.push_str(&format!("\n4. Other remarks\n{}\n", remarks.trim()));
        }
        out.trim_end().to_string()
    }
}

fn push_list(out: &mut String, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    out.push('\n');
    out.push_str(title);
    out.push('\n');
    for item in items {
        out.push_str("- ");
        out.push_str(item.trim());
        out.push('\n');
    }
}

/// The model-written half of a summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "content", rename_all = "snake_case")]
pub enum AiSummary {
    Structured(StructuredSummary),
    /// The model ignored the JSON format; its text is kept verbatim.
    FreeText(String),
    /// Generation failed; holds the `[Generation Error] …` marker.
    Failed(String),
}

impl AiSummary {
    pub fn is_failed(&self) -> bool {
        matches!(self, AiSummary::Failed(_))
    }

    /// Human-readable text for terminals and plain-text consumers.
    pub fn render(&self) -> String {
        match self {
            AiSummary::Structured(s) => s.render(),
            AiSummary::FreeText(text) | AiSummary::Failed(text) => text.clone(),
        }
    }
}

/// Result of summarizing one document.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryOutput {
    /// Id under which the document was registered for follow-up questions.
    pub document_id: String,
    pub page_count: usize,
    pub word_count: usize,
    /// Heuristic summary: the first sentences of the document.
    pub summary: String,
    pub ai_summary: AiSummary,
    /// Whether `ai_summary` came from the summary cache.
    pub cached: bool,
}

/// Score of one passage forwarded to the answer prompt.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PassageScore {
    /// Chunk index in document order.
    pub chunk: usize,
    pub score: f64,
}

/// Result of answering one question.
#[derive(Debug, Clone, Serialize)]
pub struct AnswerOutput {
    /// Document the answer was retrieved from; `None` for inline context.
    pub document_id: Option<String>,
    pub question: String,
    /// The answer text, or the `[Generation Error] …` marker on failure.
    pub answer: String,
    pub cached: bool,
    /// Set when generation failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorReport>,
    /// Passages used, best first. Empty for inline context and cache hits.
    pub passages: Vec<PassageScore>,
}

impl AnswerOutput {
    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Registry view of a stored document.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentInfo {
    pub id: String,
    pub page_count: usize,
    pub word_count: usize,
    pub chunk_count: usize,
    pub char_count: usize,
    pub created_at: DateTime<Utc>,
}

impl From<&Document> for DocumentInfo {
    fn from(doc: &Document) -> Self {
        Self {
            id: doc.id.clone(),
            page_count: doc.page_count,
            word_count: doc.word_count,
            chunk_count: doc.chunks.len(),
            char_count: doc.text.chars().count(),
            created_at: doc.created_at,
        }
    }
}
