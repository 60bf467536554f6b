//! # docrelay
//!
//! Backend for chatting with uploaded PDFs. Documents are cut into
//! overlapping character windows and stored in SQLite; each chat message
//! pulls the best-matching windows with a keyword-frequency heuristic and is
//! relayed, with that context, to an external workflow webhook.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docrelay::{Config, DocumentIngestor, KeywordRetriever, RetrievalRequest, SqliteChunkStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let store = Arc::new(SqliteChunkStore::open("docrelay.db")?);
//!
//!     let ingestor = DocumentIngestor::new(store.clone(), config.chunking.clone())?;
//!     let stats = ingestor.ingest_pdf("report.pdf").await?;
//!
//!     let retriever = KeywordRetriever::new(store, &config.retrieval)?;
//!     let request = RetrievalRequest::new(vec![stats.document_id], "graphene synthesis status");
//!     for chunk in retriever.retrieve(&request).await? {
//!         println!("#{} [{}..{}] {}", chunk.index, chunk.char_start, chunk.char_end, chunk.content);
//!     }
//!
//!     Ok(())
//! }
//! ```

// Core modules
pub mod api;
pub mod config;
pub mod error;
pub mod storage;
pub mod text;
pub mod utils;

// Re-export main API types
pub use api::{
    ChatReply, ChatRequest, ChatService, DocumentIngestor, KeywordRetriever, RetrievalRequest,
    ScoredChunk, WebhookClient,
};
pub use config::Config;
pub use error::{DocrelayError, Result};

// Re-export commonly used types
pub use storage::{Chunk, ChunkStore, Document, DocumentId, IngestStats, SqliteChunkStore};
pub use text::{TextChunk, chunk};
