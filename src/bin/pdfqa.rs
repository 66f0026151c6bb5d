//! CLI binary for edgequake-pdfqa.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `PipelineConfig`, drives a `DocumentEngine`, and prints results.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use edgequake_pdfqa::pipeline::{chunk, extract, input, summary};
use edgequake_pdfqa::{
    AnswerOutput, AskRequest, DocumentEngine, PipelineConfig, SimilarityMetric, SummaryOutput,
};
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Summarize a local PDF
  pdfqa summarize report.pdf

  # Summarize from a URL, JSON output
  pdfqa summarize https://arxiv.org/pdf/1706.03762 --json

  # Ask several questions about one document (answered concurrently)
  pdfqa ask paper.pdf -q "What is the Euler method?" -q "What step size is used?"

  # Answer from a text file instead of a PDF
  pdfqa ask --context-file notes.txt -q "Who signed the contract?"

  # Extraction statistics only (no API key needed)
  pdfqa inspect report.pdf

RETRIEVAL:
  Questions are answered from the --top-k best chunks under a lexical score:
  exact term hits, near-miss spellings (--metric), and long-term bonuses.
  Stop words in English and French are ignored.

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory)
  RUST_LOG                Log filter, overrides --verbose/--quiet
"#;

/// Summarize PDF documents and answer questions about them.
#[derive(Parser, Debug)]
#[command(
    name = "pdfqa",
    version,
    about = "Summarize PDF documents and answer questions about them with LLMs",
    long_about = "Extract and clean the text of a PDF (local file or URL), produce an executive \
summary, and answer questions from the most relevant passages. Supports OpenAI, Anthropic, \
Google Gemini, Ollama, and any provider known to edgequake-llm.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    global: GlobalArgs,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Summarize a PDF: first sentences plus an AI executive summary.
    Summarize {
        /// Local PDF file path or HTTP/HTTPS URL.
        input: String,
    },

    /// Answer one or more questions about a PDF or a text file.
    Ask {
        /// Local PDF file path or HTTP/HTTPS URL.
        #[arg(required_unless_present = "context_file")]
        input: Option<String>,

        /// Question to answer; repeat for several.
        #[arg(short, long = "question", required = true)]
        questions: Vec<String>,

        /// Answer from this plain-text file instead of a PDF.
        #[arg(long, conflicts_with = "input")]
        context_file: Option<PathBuf>,

        /// Number of questions answered at the same time.
        #[arg(short, long, env = "PDFQA_CONCURRENCY", default_value_t = 4)]
        concurrency: usize,
    },

    /// Print extraction statistics without calling any model.
    Inspect {
        /// Local PDF file path or HTTP/HTTPS URL.
        input: String,
    },
}

#[derive(Args, Debug)]
struct GlobalArgs {
    /// LLM model ID.
    #[arg(long, global = true, env = "PDFQA_MODEL", default_value = "gpt-4.1-nano")]
    model: String,

    /// Model tried once when the primary is rate-limited ("none" disables).
    #[arg(long, global = true, env = "PDFQA_FALLBACK_MODEL", default_value = "gpt-4.1-mini")]
    fallback_model: String,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, global = true, env = "PDFQA_PROVIDER")]
    provider: Option<String>,

    /// LLM temperature (0.0–2.0).
    #[arg(long, global = true, env = "PDFQA_TEMPERATURE", default_value_t = 0.2)]
    temperature: f32,

    /// Chunk size in characters.
    #[arg(long, global = true, env = "PDFQA_CHUNK_CHARS", default_value_t = 1100)]
    chunk_chars: usize,

    /// Overlap carried between chunks, in characters.
    #[arg(long, global = true, env = "PDFQA_OVERLAP_CHARS", default_value_t = 110)]
    overlap_chars: usize,

    /// Passages forwarded per question.
    #[arg(long, global = true, env = "PDFQA_TOP_K", default_value_t = 6)]
    top_k: usize,

    /// Maximum characters of context per question.
    #[arg(long, global = true, env = "PDFQA_MAX_CONTEXT_CHARS", default_value_t = 12_000)]
    max_context_chars: usize,

    /// Fuzzy-match similarity metric.
    #[arg(long, global = true, env = "PDFQA_METRIC", value_enum, default_value = "jaro-winkler")]
    metric: MetricArg,

    /// Max LLM output tokens for the summary.
    #[arg(long, global = true, env = "PDFQA_SUMMARY_MAX_TOKENS", default_value_t = 600)]
    summary_max_tokens: usize,

    /// Max LLM output tokens per answer.
    #[arg(long, global = true, env = "PDFQA_ANSWER_MAX_TOKENS", default_value_t = 700)]
    answer_max_tokens: usize,

    /// HTTP download timeout in seconds.
    #[arg(long, global = true, env = "PDFQA_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Per-LLM-call timeout in seconds.
    #[arg(long, global = true, env = "PDFQA_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// Output structured JSON instead of text.
    #[arg(long, global = true, env = "PDFQA_JSON")]
    json: bool,

    /// Disable the spinner.
    #[arg(long, global = true, env = "PDFQA_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PDFQA_VERBOSE")]
    verbose: bool,

    /// Suppress all output except results and errors.
    #[arg(short = 'Q', long, global = true, env = "PDFQA_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum MetricArg {
    JaroWinkler,
    Levenshtein,
}

impl From<MetricArg> for SimilarityMetric {
    fn from(v: MetricArg) -> Self {
        match v {
            MetricArg::JaroWinkler => SimilarityMetric::JaroWinkler,
            MetricArg::Levenshtein => SimilarityMetric::NormalizedLevenshtein,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let g = &cli.global;

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner covers progress feedback, so INFO logs are only shown
    // when it is off.
    let show_progress = !g.quiet && !g.no_progress && !g.json;
    let filter = if g.verbose {
        "debug"
    } else if g.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(g)?;

    match &cli.command {
        Command::Summarize { input } => run_summarize(input, config, g, show_progress).await,
        Command::Ask {
            input,
            questions,
            context_file,
            concurrency,
        } => {
            run_ask(
                input.as_deref(),
                questions,
                context_file.as_ref(),
                *concurrency,
                config,
                g,
                show_progress,
            )
            .await
        }
        Command::Inspect { input } => run_inspect(input, &config, g).await,
    }
}

// ── summarize ────────────────────────────────────────────────────────────────

async fn run_summarize(
    input: &str,
    config: PipelineConfig,
    g: &GlobalArgs,
    show_progress: bool,
) -> Result<()> {
    let engine = DocumentEngine::from_config(config).context("Failed to configure LLM provider")?;
    let spinner = spinner(show_progress, "Summarizing");
    let start = Instant::now();

    let output = engine
        .summarize(input)
        .await
        .with_context(|| format!("Failed to summarize '{input}'"));
    spinner.finish_and_clear();
    let output = output?;

    if g.json {
        print_json(&output)?;
    } else {
        print_summary(input, &output);
    }

    if !g.quiet && !g.json {
        eprintln!(
            "{}  {} pages  {} words  {}",
            if output.ai_summary.is_failed() {
                red("✘")
            } else {
                green("✔")
            },
            output.page_count,
            output.word_count,
            dim(&format!("{:.1}s", start.elapsed().as_secs_f64())),
        );
    }
    Ok(())
}

fn print_summary(input: &str, output: &SummaryOutput) {
    println!("{} {}", cyan("◆"), bold(input));
    println!(
        "{}",
        dim(&format!(
            "{} pages · {} words · document {}{}",
            output.page_count,
            output.word_count,
            output.document_id,
            if output.cached { " · cached" } else { "" }
        ))
    );
    println!();
    println!("{}", bold("Summary"));
    println!("{}", output.summary);
    println!();
    println!("{}", bold("AI summary"));
    let rendered = output.ai_summary.render();
    if output.ai_summary.is_failed() {
        println!("{}", red(&rendered));
    } else {
        println!("{rendered}");
    }
}

// ── ask ──────────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct AskReport<'a> {
    document_id: Option<&'a str>,
    answers: &'a [AnswerOutput],
}

async fn run_ask(
    input: Option<&str>,
    questions: &[String],
    context_file: Option<&PathBuf>,
    concurrency: usize,
    config: PipelineConfig,
    g: &GlobalArgs,
    show_progress: bool,
) -> Result<()> {
    let engine =
        Arc::new(DocumentEngine::from_config(config).context("Failed to configure LLM provider")?);
    let spinner = spinner(show_progress, "Reading");

    let loaded = load_context(&engine, input, context_file).await;
    if loaded.is_err() {
        spinner.finish_and_clear();
    }
    let (document_id, context) = loaded?;

    spinner.set_prefix("Answering");
    spinner.set_message(format!("{} question(s)", questions.len()));

    // Results come back in completion order; re-sort to question order.
    let mut answers: Vec<(usize, Result<AnswerOutput>)> =
        stream::iter(questions.iter().enumerate().map(|(i, question)| {
            let engine = Arc::clone(&engine);
            let request = AskRequest {
                document_id: document_id.clone(),
                context: context.clone(),
                question: question.clone(),
            };
            async move {
                let answer = engine
                    .ask(&request)
                    .await
                    .with_context(|| format!("Failed to answer '{}'", request.question));
                (i, answer)
            }
        }))
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;
    spinner.finish_and_clear();
    answers.sort_by_key(|(i, _)| *i);

    let answers = answers
        .into_iter()
        .map(|(_, a)| a)
        .collect::<Result<Vec<_>>>()?;

    if g.json {
        print_json(&AskReport {
            document_id: document_id.as_deref(),
            answers: &answers,
        })?;
    } else {
        for answer in &answers {
            print_answer(answer);
        }
    }

    let failed = answers.iter().filter(|a| a.is_failed()).count();
    if !g.quiet && !g.json {
        eprintln!(
            "{}  {}/{} answered",
            if failed == 0 { green("✔") } else { red("✘") },
            answers.len() - failed,
            answers.len()
        );
    }
    Ok(())
}

/// Ingest the PDF (returning its id) or read the inline context file.
async fn load_context(
    engine: &DocumentEngine,
    input: Option<&str>,
    context_file: Option<&PathBuf>,
) -> Result<(Option<String>, Option<String>)> {
    match (input, context_file) {
        (_, Some(path)) => {
            let text = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read context from {:?}", path))?;
            Ok((None, Some(text)))
        }
        (Some(input), None) => {
            let doc = engine
                .ingest(input)
                .await
                .with_context(|| format!("Failed to read '{input}'"))?;
            Ok((Some(doc.id.clone()), None))
        }
        (None, None) => anyhow::bail!("Either an input PDF or --context-file is required"),
    }
}

fn print_answer(answer: &AnswerOutput) {
    println!("{} {}", cyan("?"), bold(&answer.question));
    if answer.is_failed() {
        println!("{}", red(&answer.answer));
    } else {
        println!("{}", answer.answer);
    }
    let mut meta = Vec::new();
    if answer.cached {
        meta.push("cached".to_string());
    }
    if !answer.passages.is_empty() {
        let passages = answer
            .passages
            .iter()
            .map(|p| format!("#{}={:.2}", p.chunk, p.score))
            .collect::<Vec<_>>()
            .join(" ");
        meta.push(format!("passages {passages}"));
    }
    if !meta.is_empty() {
        println!("{}", dim(&meta.join(" · ")));
    }
    println!();
}

// ── inspect ──────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct InspectReport {
    input: String,
    page_count: usize,
    word_count: usize,
    char_count: usize,
    chunk_count: usize,
    summary: String,
}

async fn run_inspect(input_str: &str, config: &PipelineConfig, g: &GlobalArgs) -> Result<()> {
    let resolved = input::resolve_input(input_str, config.download_timeout_secs)
        .await
        .with_context(|| format!("Failed to open '{input_str}'"))?;
    let document = extract::extract_document(resolved.path(), config.min_page_chars)
        .await
        .context("Failed to extract text")?;
    let chunks = chunk::chunk_text(&document.text, &config.chunking);

    let report = InspectReport {
        input: input_str.to_string(),
        page_count: document.page_count,
        word_count: summary::word_count(&document.text),
        char_count: document.text.chars().count(),
        chunk_count: chunks.len(),
        summary: summary::simple_summary(&document.text, config.simple_summary_sentences),
    };

    if g.json {
        print_json(&report)?;
    } else {
        println!("File:     {}", report.input);
        println!("Pages:    {}", report.page_count);
        println!("Words:    {}", report.word_count);
        println!("Chars:    {}", report.char_count);
        println!("Chunks:   {}", report.chunk_count);
        if document.is_blank() {
            println!("Text:     {}", red("none (scanned or empty document)"));
        } else {
            println!("Opening:  {}", report.summary);
        }
    }
    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────────────

/// Map CLI args to `PipelineConfig`.
fn build_config(g: &GlobalArgs) -> Result<PipelineConfig> {
    let fallback = match g.fallback_model.trim() {
        "" | "none" => None,
        m => Some(m.to_string()),
    };

    let mut builder = PipelineConfig::builder()
        .model(g.model.clone())
        .fallback_model(fallback)
        .temperature(g.temperature)
        .chunk_chars(g.chunk_chars)
        .overlap_chars(g.overlap_chars)
        .top_k(g.top_k)
        .max_context_chars(g.max_context_chars)
        .similarity_metric(g.metric.into())
        .summary_max_tokens(g.summary_max_tokens)
        .answer_max_tokens(g.answer_max_tokens)
        .download_timeout_secs(g.download_timeout)
        .api_timeout_secs(g.api_timeout);

    if let Some(ref provider) = g.provider {
        builder = builder.provider_name(provider.clone());
    }

    builder.build().context("Invalid configuration")
}

fn spinner(enabled: bool, prefix: &'static str) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
    );
    bar.set_prefix(prefix);
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialise output")?;
    println!("{json}");
    Ok(())
}
