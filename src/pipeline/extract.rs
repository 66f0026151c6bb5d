//! Page-level text extraction: the seam between the pipeline and pdfium.
//!
//! ## Why a trait?
//!
//! The normalizer only needs two things from a document: how many pages it
//! has, and the text of one page in a given [`ExtractionMode`]. Putting that
//! behind [`PageSource`] keeps every cleanup rule testable with
//! [`InMemoryPages`] and no native library on the machine.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which is blocking FFI.
//! [`extract_document`] moves opening, extraction and normalization onto the
//! blocking pool so the Tokio worker threads never stall on a large PDF.

use crate::error::PdfQaError;
use crate::pipeline::normalize::{normalize_document, NormalizedDocument};
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// How a page's text is requested from the extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionMode {
    /// Positioned text blocks, re-ordered into reading order by the normalizer.
    Blocks,
    /// The extractor's own flat text stream.
    Flat,
}

impl ExtractionMode {
    /// Modes tried per page, in order.
    pub const ORDER: [ExtractionMode; 2] = [ExtractionMode::Blocks, ExtractionMode::Flat];
}

/// A positioned run of text on a page.
///
/// `y` grows downward from the top edge of the page; `x` grows rightward.
#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub y: f32,
    pub x: f32,
    pub text: String,
}

impl TextBlock {
    pub fn new(y: f32, x: f32, text: impl Into<String>) -> Self {
        Self {
            y,
            x,
            text: text.into(),
        }
    }
}

/// What one extraction call produced.
#[derive(Debug, Clone, PartialEq)]
pub enum PageLayout {
    Blocks(Vec<TextBlock>),
    Flat(String),
}

/// A document whose pages can be read one at a time.
pub trait PageSource {
    fn page_count(&self) -> usize;

    /// Extract page `page` (0-indexed) in the requested mode.
    fn extract(&self, page: usize, mode: ExtractionMode) -> Result<PageLayout, PdfQaError>;
}

// ── In-memory pages ──────────────────────────────────────────────────────

/// Pre-extracted pages, for callers that already hold text and for tests.
///
/// A page given as blocks answers `Flat` requests with its blocks joined in
/// insertion order; a page given as flat text fails `Blocks` requests, which
/// drives the normalizer straight to its flat fallback.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPages {
    pages: Vec<PageLayout>,
}

impl InMemoryPages {
    pub fn new(pages: Vec<PageLayout>) -> Self {
        Self { pages }
    }

    /// One flat page per string.
    pub fn from_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            pages: texts
                .into_iter()
                .map(|t| PageLayout::Flat(t.into()))
                .collect(),
        }
    }
}

impl PageSource for InMemoryPages {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn extract(&self, page: usize, mode: ExtractionMode) -> Result<PageLayout, PdfQaError> {
        let layout = self.pages.get(page).ok_or(PdfQaError::ExtractionFailure {
            page: Some(page + 1),
            detail: format!("page out of range (total={})", self.pages.len()),
        })?;
        match (mode, layout) {
            (ExtractionMode::Blocks, PageLayout::Blocks(_)) => Ok(layout.clone()),
            (ExtractionMode::Blocks, PageLayout::Flat(_)) => Err(PdfQaError::ExtractionFailure {
                page: Some(page + 1),
                detail: "no block layout available".into(),
            }),
            (ExtractionMode::Flat, PageLayout::Flat(text)) => Ok(PageLayout::Flat(text.clone())),
            (ExtractionMode::Flat, PageLayout::Blocks(blocks)) => Ok(PageLayout::Flat(
                blocks
                    .iter()
                    .map(|b| b.text.as_str())
                    .collect::<Vec<_>>()
                    .join("\n"),
            )),
        }
    }
}

// ── pdfium ───────────────────────────────────────────────────────────────

/// Bind pdfium: `PDFIUM_LIB_PATH`, then the working directory, then the system.
pub fn bind_pdfium() -> Result<Pdfium, PdfQaError> {
    if let Ok(path) = std::env::var("PDFIUM_LIB_PATH") {
        let path = PathBuf::from(path);
        let lib = if path.is_dir() {
            Pdfium::pdfium_platform_library_name_at_path(&path)
        } else {
            path
        };
        return Pdfium::bind_to_library(&lib)
            .map(Pdfium::new)
            .map_err(|e| PdfQaError::PdfiumBindingFailed(format!("{}: {:?}", lib.display(), e)));
    }

    Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| Pdfium::bind_to_system_library())
        .map(Pdfium::new)
        .map_err(|e| PdfQaError::PdfiumBindingFailed(format!("{:?}", e)))
}

/// [`PageSource`] over an open pdfium document.
pub struct PdfiumPages<'a> {
    document: PdfDocument<'a>,
}

impl<'a> PdfiumPages<'a> {
    pub fn open(pdfium: &'a Pdfium, path: &Path) -> Result<Self, PdfQaError> {
        let document =
            pdfium
                .load_pdf_from_file(path, None)
                .map_err(|e| PdfQaError::ExtractionFailure {
                    page: None,
                    detail: format!("cannot open '{}': {:?}", path.display(), e),
                })?;
        Ok(Self { document })
    }

    fn page_error(page: usize, e: PdfiumError) -> PdfQaError {
        PdfQaError::ExtractionFailure {
            page: Some(page + 1),
            detail: format!("{:?}", e),
        }
    }
}

impl PageSource for PdfiumPages<'_> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn extract(&self, page: usize, mode: ExtractionMode) -> Result<PageLayout, PdfQaError> {
        let pdf_page = self
            .document
            .pages()
            .get(page as u16)
            .map_err(|e| Self::page_error(page, e))?;
        let text = pdf_page.text().map_err(|e| Self::page_error(page, e))?;

        match mode {
            ExtractionMode::Flat => Ok(PageLayout::Flat(text.all())),
            ExtractionMode::Blocks => {
                let height = pdf_page.height().value;
                let blocks = text
                    .segments()
                    .iter()
                    .map(|segment| {
                        let bounds = segment.bounds();
                        TextBlock::new(
                            height - bounds.top().value,
                            bounds.left().value,
                            segment.text(),
                        )
                    })
                    .collect::<Vec<_>>();
                debug!("Page {}: {} text segments", page + 1, blocks.len());
                Ok(PageLayout::Blocks(blocks))
            }
        }
    }
}

/// Open a PDF, extract every page and normalize the result.
///
/// Runs entirely inside `spawn_blocking`.
pub async fn extract_document(
    pdf_path: &Path,
    min_page_chars: usize,
) -> Result<NormalizedDocument, PdfQaError> {
    let path = pdf_path.to_path_buf();

    tokio::task::spawn_blocking(move || {
        let pdfium = bind_pdfium()?;
        let pages = PdfiumPages::open(&pdfium, &path)?;
        info!("PDF loaded: {} pages", pages.page_count());
        normalize_document(&pages, min_page_chars)
    })
    .await
    .map_err(|e| PdfQaError::Internal(format!("Extraction task panicked: {}", e)))?
}
