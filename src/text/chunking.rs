//! Fixed-window text chunking
//!
//! Documents are cut into windows of `chunk_size` characters, each sharing
//! `overlap` characters with the previous one. Offsets are counted in
//! `char`s of the input, and every chunk's content is exactly the input span
//! `[char_start, char_end)`, so the source text can be recovered from them.

use crate::config::ChunkingConfig;
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// A window of text produced by the chunker, not yet tied to a document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TextChunk {
    /// Position in the chunker output, starting at 0
    pub index: usize,

    /// The window's text, untrimmed
    pub content: String,

    /// Offset of the first character in the source text
    pub char_start: usize,

    /// Offset one past the last character in the source text
    pub char_end: usize,
}

/// Split `text` into overlapping windows.
///
/// Fails with a configuration error when `chunk_size` is zero or `overlap`
/// is not smaller than `chunk_size`. Windows that are blank after trimming
/// are skipped without consuming an index.
pub fn chunk(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<TextChunk>> {
    ChunkingConfig {
        chunk_size,
        overlap,
        ..ChunkingConfig::default()
    }
    .validate()?;

    Ok(split_windows(text, chunk_size, overlap))
}

fn split_windows(text: &str, chunk_size: usize, overlap: usize) -> Vec<TextChunk> {
    // Byte position of every char boundary, including the end of the text
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(pos, _)| pos)
        .chain(std::iter::once(text.len()))
        .collect();
    let total_chars = boundaries.len() - 1;

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < total_chars {
        let end = std::cmp::min(start + chunk_size, total_chars);
        let window = &text[boundaries[start]..boundaries[end]];

        if !window.trim().is_empty() {
            chunks.push(TextChunk {
                index: chunks.len(),
                content: window.to_string(),
                char_start: start,
                char_end: end,
            });
        }

        let mut next = start + chunk_size.saturating_sub(overlap);

        // Prevent infinite loop if overlap is too large
        if next <= start {
            next = end;
        }
        start = next;
    }

    chunks
}

/// Chunker bound to a validated configuration
#[derive(Debug, Clone)]
pub struct TextChunker {
    config: ChunkingConfig,
}

impl TextChunker {
    /// Create a new text chunker with the given configuration
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    /// Chunk text into overlapping segments
    pub fn chunk_text(&self, text: &str) -> Vec<TextChunk> {
        let chunks = split_windows(text, self.config.chunk_size, self.config.overlap);
        log::debug!(
            "Chunked {} characters into {} chunks (size {}, overlap {})",
            text.chars().count(),
            chunks.len(),
            self.config.chunk_size,
            self.config.overlap
        );
        chunks
    }
}
