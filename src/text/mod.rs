//! Text processing for docrelay
//!
//! Chunking, PDF extraction, and the keyword heuristics used by retrieval.

pub mod chunking;
pub mod keywords;
pub mod pdf;

// Re-export main types and functions
pub use chunking::{TextChunk, TextChunker, chunk};
pub use keywords::{QueryTokenizer, keyword_score};
pub use pdf::{ExtractedPdf, PdfProcessor, normalize_text};
