//! Text extraction: PDF bytes → [`ExtractedText`].
//!
//! Pages are read in document order and their text joined with the
//! configured [`PageSeparator`]. Every failure path returns
//! [`Pdf2QuizError::UnreadableDocument`]: bytes that are not a PDF, an
//! encrypted document, a document without pages, and a document whose pages
//! carry no text at all (scanned images). A panic inside the PDF parser on
//! hostile input is caught and reported the same way.
//!
//! ## Why spawn_blocking?
//!
//! Decoding content streams is CPU-bound and can take seconds on large
//! documents. [`extract_document`] moves the work onto tokio's blocking pool
//! so the caller's executor keeps servicing the presentation layer.

use crate::config::{ExtractorBackend, PageSeparator};
use crate::error::Pdf2QuizError;
use crate::output::ExtractedText;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{debug, info, warn};

/// Reads per-page text out of a PDF byte stream.
pub trait TextExtractor: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Text of every page, in page order. Pages without text yield `""`.
    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<String>, Pdf2QuizError>;
}

/// Construct the extractor for `backend`.
pub fn extractor_for(backend: ExtractorBackend) -> Result<Box<dyn TextExtractor>, Pdf2QuizError> {
    match backend {
        ExtractorBackend::Lopdf => Ok(Box::new(LopdfExtractor)),
        #[cfg(feature = "pdfium")]
        ExtractorBackend::Pdfium => Ok(Box::new(pdfium_backend::PdfiumExtractor)),
        #[cfg(not(feature = "pdfium"))]
        ExtractorBackend::Pdfium => Err(Pdf2QuizError::InvalidConfig(
            "the pdfium extractor requires the `pdfium` feature".into(),
        )),
    }
}

/// Extract text from `bytes` with the default (lopdf) backend and a newline
/// page separator.
pub fn extract(bytes: &[u8]) -> Result<ExtractedText, Pdf2QuizError> {
    extract_with(&LopdfExtractor, bytes, &PageSeparator::default())
}

/// Extract text from `bytes` with an explicit extractor and separator.
///
/// Never panics: a panic inside the extractor becomes `UnreadableDocument`.
pub fn extract_with(
    extractor: &dyn TextExtractor,
    bytes: &[u8],
    separator: &PageSeparator,
) -> Result<ExtractedText, Pdf2QuizError> {
    debug!("Extracting text from {} bytes with {}", bytes.len(), extractor.name());

    let pages = catch_unwind(AssertUnwindSafe(|| extractor.extract_pages(bytes))).map_err(|_| {
        Pdf2QuizError::UnreadableDocument {
            reason: format!("the {} parser could not process this file", extractor.name()),
        }
    })??;

    if pages.is_empty() {
        return Err(Pdf2QuizError::UnreadableDocument {
            reason: "the document has no pages".into(),
        });
    }

    let text = join_pages(&pages, separator);
    let page_count = pages.len();
    let extracted = ExtractedText::from_pdf(text, page_count)?;
    info!(
        "Extracted {} characters from {} pages",
        extracted.char_count(),
        page_count
    );
    Ok(extracted)
}

/// Async wrapper running [`extract_with`] on the blocking pool.
pub async fn extract_document(
    bytes: Vec<u8>,
    backend: ExtractorBackend,
    separator: PageSeparator,
) -> Result<ExtractedText, Pdf2QuizError> {
    let extractor = extractor_for(backend)?;
    tokio::task::spawn_blocking(move || extract_with(extractor.as_ref(), &bytes, &separator))
        .await
        .map_err(|e| Pdf2QuizError::UnreadableDocument {
            reason: format!("extraction task failed: {e}"),
        })?
}

/// Join page texts in order, skipping pages without text.
fn join_pages(pages: &[String], separator: &PageSeparator) -> String {
    let mut out = String::new();
    for (idx, page) in pages.iter().enumerate() {
        let page = page.trim();
        if page.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push_str(&separator.render(idx + 1));
        }
        out.push_str(page);
    }
    out
}

// ── lopdf backend ───────────────────────────────────────────────────────────

/// Pure-Rust extractor built on `lopdf`.
pub struct LopdfExtractor;

impl TextExtractor for LopdfExtractor {
    fn name(&self) -> &'static str {
        "lopdf"
    }

    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<String>, Pdf2QuizError> {
        let document = lopdf::Document::load_mem(bytes).map_err(|e| Pdf2QuizError::UnreadableDocument {
            reason: format!("not a valid PDF ({e})"),
        })?;

        if document.is_encrypted() {
            return Err(Pdf2QuizError::UnreadableDocument {
                reason: "the PDF is encrypted".into(),
            });
        }

        let page_numbers: Vec<u32> = document.get_pages().keys().copied().collect();
        debug!("PDF loaded: {} pages", page_numbers.len());

        let pages = page_numbers
            .iter()
            .map(|&num| match document.extract_text(&[num]) {
                Ok(text) => text,
                Err(e) => {
                    warn!("Page {}: text extraction failed — {}", num, e);
                    String::new()
                }
            })
            .collect();

        Ok(pages)
    }
}

// ── pdfium backend ──────────────────────────────────────────────────────────

#[cfg(feature = "pdfium")]
mod pdfium_backend {
    use super::TextExtractor;
    use crate::error::Pdf2QuizError;
    use pdfium_render::prelude::*;
    use tracing::warn;

    /// Extractor backed by the pdfium C++ library.
    pub struct PdfiumExtractor;

    impl TextExtractor for PdfiumExtractor {
        fn name(&self) -> &'static str {
            "pdfium"
        }

        fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<String>, Pdf2QuizError> {
            let pdfium = bind()?;
            let document = pdfium
                .load_pdf_from_byte_slice(bytes, None)
                .map_err(|e| Pdf2QuizError::UnreadableDocument {
                    reason: format!("not a valid PDF ({e:?})"),
                })?;

            let mut pages = Vec::new();
            for (idx, page) in document.pages().iter().enumerate() {
                match page.text() {
                    Ok(text) => pages.push(text.all()),
                    Err(e) => {
                        warn!("Page {}: text extraction failed — {:?}", idx + 1, e);
                        pages.push(String::new());
                    }
                }
            }
            Ok(pages)
        }
    }

    /// Bind to `PDFIUM_LIB_PATH` when set, else the system library.
    fn bind() -> Result<Pdfium, Pdf2QuizError> {
        let bindings = match std::env::var("PDFIUM_LIB_PATH") {
            Ok(path) if !path.is_empty() => Pdfium::bind_to_library(&path),
            _ => Pdfium::bind_to_system_library(),
        }
        .map_err(|e| {
            Pdf2QuizError::InvalidConfig(format!(
                "cannot load libpdfium ({e:?}); set PDFIUM_LIB_PATH=/path/to/libpdfium"
            ))
        })?;
        Ok(Pdfium::new(bindings))
    }
}
