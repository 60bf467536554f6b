//! DocumentIngestor - upload pipeline
//!
//! Extract text, normalize it, cut it into chunks and write the chunks to the
//! store in bounded batches.

use crate::config::ChunkingConfig;
use crate::error::{DocrelayError, Result};
use crate::storage::{ChunkStore, DocumentId, IngestStats, NewDocument};
use crate::text::{PdfProcessor, TextChunker, normalize_text};
use crate::utils::sanitize_filename;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// Turns uploaded documents into stored chunks
pub struct DocumentIngestor {
    store: Arc<dyn ChunkStore>,
    chunker: TextChunker,
}

impl DocumentIngestor {
    pub fn new(store: Arc<dyn ChunkStore>, config: ChunkingConfig) -> Result<Self> {
        Ok(Self {
            store,
            chunker: TextChunker::new(config)?,
        })
    }

    /// Add a PDF document from disk
    pub async fn ingest_pdf<P: AsRef<Path>>(&self, pdf_path: P) -> Result<IngestStats> {
        let path = pdf_path.as_ref();

        if !path.exists() {
            return Err(DocrelayError::Pdf(format!("PDF file not found: {}", path.display())));
        }

        let bytes = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        self.ingest_pdf_bytes(&filename, bytes).await
    }

    /// Add an uploaded PDF held in memory
    pub async fn ingest_pdf_bytes(&self, filename: &str, bytes: Vec<u8>) -> Result<IngestStats> {
        let started = Instant::now();

        // pdf-extract is CPU bound
        let extracted = tokio::task::spawn_blocking(move || PdfProcessor::extract_text_from_bytes(&bytes))
            .await
            .map_err(|e| DocrelayError::Pdf(format!("Extraction task failed: {}", e)))??;

        if extracted.text.trim().is_empty() {
            return Err(DocrelayError::Pdf(format!(
                "No extractable text in {} (scanned document?)",
                filename
            )));
        }

        self.store_text(filename, &extracted.text, Some(extracted.page_count), started)
            .await
    }

    /// Add plain text, normalized the same way as PDF text
    pub async fn ingest_text(&self, filename: &str, text: &str) -> Result<IngestStats> {
        let started = Instant::now();
        let text = normalize_text(text);
        self.store_text(filename, &text, None, started).await
    }

    /// Add a plain text or markdown file from disk
    pub async fn ingest_text_file<P: AsRef<Path>>(&self, file_path: P) -> Result<IngestStats> {
        let path = file_path.as_ref();
        let text = tokio::fs::read_to_string(path).await?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        self.ingest_text(&filename, &text).await
    }

    async fn store_text(
        &self,
        filename: &str,
        text: &str,
        page_count: Option<u32>,
        started: Instant,
    ) -> Result<IngestStats> {
        let chunks = self.chunker.chunk_text(text);
        if chunks.is_empty() {
            return Err(DocrelayError::TextProcessing(format!(
                "{} contains no text to index",
                filename
            )));
        }

        let document_id = self
            .store
            .create_document(NewDocument {
                filename: sanitize_filename(filename),
                page_count,
                text: text.to_string(),
            })
            .await?;

        let total_chunks = chunks.len();
        let batch_size = self.chunker.config().insert_batch_size;
        let mut total_batches = 0;

        let mut remaining = chunks.into_iter().peekable();
        while remaining.peek().is_some() {
            let batch: Vec<_> = remaining.by_ref().take(batch_size).collect();
            if let Err(e) = self.store.insert_chunks(document_id, batch).await {
                self.discard_partial(document_id).await;
                return Err(e);
            }
            total_batches += 1;
        }

        let stats = IngestStats {
            document_id,
            total_chunks,
            total_batches,
            page_count,
            processing_time: started.elapsed().as_secs_f64(),
        };

        log::info!(
            "Ingested {} as document {}: {} chunks in {} batch(es), {:.2}s",
            filename,
            document_id,
            stats.total_chunks,
            stats.total_batches,
            stats.processing_time
        );
        Ok(stats)
    }

    /// Drop a document whose chunks were only partly written
    async fn discard_partial(&self, document_id: DocumentId) {
        match self.store.delete_document(document_id).await {
            Ok(_) => log::warn!("Discarded partially ingested document {}", document_id),
            Err(e) => log::error!(
                "Failed to discard partially ingested document {}: {}",
                document_id,
                e
            ),
        }
    }
}
