//! PDF text extraction
//!
//! Text comes out of `pdf-extract`; page counts come from `lopdf`. Extracted
//! text is normalized before chunking so offsets refer to the stored form.

use crate::error::{DocrelayError, Result};
use unicode_normalization::UnicodeNormalization;

/// Text extracted from a PDF along with its page count
#[derive(Debug, Clone)]
pub struct ExtractedPdf {
    pub text: String,
    pub page_count: u32,
}

/// PDF processing entry points
pub struct PdfProcessor;

impl PdfProcessor {
    /// Extract normalized text and page count from an in-memory PDF
    pub fn extract_text_from_bytes(bytes: &[u8]) -> Result<ExtractedPdf> {
        if !Self::looks_like_pdf(bytes) {
            return Err(DocrelayError::Pdf("Input is not a PDF document".to_string()));
        }

        let raw = pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| DocrelayError::Pdf(format!("Failed to extract text: {}", e)))?;
        let page_count = Self::page_count(bytes)?;
        let text = normalize_text(&raw);

        log::info!(
            "Extracted {} characters from {} page(s)",
            text.chars().count(),
            page_count
        );

        Ok(ExtractedPdf { text, page_count })
    }

    /// Number of pages in the document
    pub fn page_count(bytes: &[u8]) -> Result<u32> {
        let document = lopdf::Document::load_mem(bytes)?;
        Ok(document.get_pages().len() as u32)
    }

    /// Cheap magic-number check, PDFs start with `%PDF-`
    pub fn looks_like_pdf(bytes: &[u8]) -> bool {
        bytes.starts_with(b"%PDF-")
    }
}

/// Normalize extracted text: NFC, non-whitespace control characters dropped.
///
/// Whitespace is left untouched, so text that is already NFC and free of
/// control characters comes back unchanged and chunk offsets line up with it.
pub fn normalize_text(text: &str) -> String {
    text.nfc()
        .filter(|c| !c.is_control() || c.is_whitespace())
        .collect()
}
