//! API layer for docrelay
//!
//! Ingestion of uploads, keyword retrieval, and the chat relay built on both.

pub mod chat;
pub mod ingest;
pub mod retriever;
pub mod webhook;

// Re-export main API types
pub use chat::{ChatReply, ChatRequest, ChatService, chat_session, context_only_response};
pub use ingest::DocumentIngestor;
pub use retriever::{KeywordRetriever, RetrievalRequest, ScoredChunk, rank_chunks};
pub use webhook::{WebhookClient, WebhookPayload, normalize_reply, normalize_reply_body};
