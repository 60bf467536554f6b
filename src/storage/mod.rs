//! Storage functionality for docrelay
//!
//! Retrieval and ingestion never reach for a global client: they are handed a
//! [`ChunkStore`], the capability to read and write documents and chunks.
//! [`SqliteChunkStore`] is the embedded implementation.
//!
//! ```text
//! DocumentIngestor ─┐
//!                   ├─ dyn ChunkStore ── SqliteChunkStore ── Database (rusqlite)
//! KeywordRetriever ─┘
//! ```

pub mod database;
pub mod schema;
pub mod sqlite_store;

// Re-export main types
pub use database::{Database, DatabaseStats};
pub use sqlite_store::SqliteChunkStore;

use crate::error::Result;
use crate::text::TextChunk;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Database id of an uploaded document
pub type DocumentId = i64;

/// A stored chunk of a document's extracted text
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    pub document_id: DocumentId,
    /// 0-based, sequential within the document
    pub index: usize,
    pub content: String,
    pub char_start: usize,
    pub char_end: usize,
}

/// Document fields supplied at upload time
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub filename: String,
    pub page_count: Option<u32>,
    /// The text the chunks are cut from; chunk offsets index into it
    pub text: String,
}

/// An uploaded document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub id: DocumentId,
    pub filename: String,
    pub page_count: Option<u32>,
    pub char_count: usize,
    pub chunk_count: usize,
    pub created_at: DateTime<Utc>,
}

/// Read and write access to documents and their chunks
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Register a document and return its id
    async fn create_document(&self, document: NewDocument) -> Result<DocumentId>;

    /// Insert one batch of chunks for a document
    async fn insert_chunks(&self, document_id: DocumentId, chunks: Vec<TextChunk>) -> Result<usize>;

    /// All chunks of the given documents, ordered by document then index
    async fn fetch_chunks(&self, document_ids: &[DocumentId]) -> Result<Vec<Chunk>>;

    /// Get a document by id
    async fn get_document(&self, document_id: DocumentId) -> Result<Option<Document>>;

    /// The indexed text of a document, `None` when it does not exist
    async fn document_text(&self, document_id: DocumentId) -> Result<Option<String>>;

    /// All documents, newest first
    async fn list_documents(&self) -> Result<Vec<Document>>;

    /// Delete a document together with its chunks
    async fn delete_document(&self, document_id: DocumentId) -> Result<bool>;
}

/// Ingestion statistics
#[derive(Debug, Clone)]
pub struct IngestStats {
    /// Id assigned to the stored document
    pub document_id: DocumentId,

    /// Total number of chunks stored
    pub total_chunks: usize,

    /// Number of insert batches written
    pub total_batches: usize,

    /// Page count when the source was a PDF
    pub page_count: Option<u32>,

    /// Total processing time in seconds
    pub processing_time: f64,
}
