//! SQLite database operations for docrelay
//!
//! Documents and their chunks live in an embedded SQLite file. Chunks are
//! keyed by `(document_id, chunk_index)` and cascade-deleted with their
//! document.

use crate::error::{DocrelayError, Result};
use crate::storage::schema::*;
use crate::storage::{Chunk, Document, DocumentId, NewDocument};
use crate::text::TextChunk;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use std::path::Path;

/// Document ids bound per chunk query, well below SQLite's variable limit
const FETCH_BATCH_SIZE: usize = 500;

const SELECT_DOCUMENT: &str = r#"
SELECT d.id, d.filename, d.page_count, d.char_count, d.created_at,
       (SELECT COUNT(*) FROM chunks c WHERE c.document_id = d.id)
FROM documents d
"#;

/// Database connection and operations
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Create a new database connection
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)
            .map_err(|e| DocrelayError::Storage(format!("Failed to open database: {}", e)))?;

        let mut db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Create an in-memory database (for testing)
    pub fn memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| {
            DocrelayError::Storage(format!("Failed to create in-memory database: {}", e))
        })?;

        let mut db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Initialize database schema
    fn initialize(&mut self) -> Result<()> {
        // In-memory databases answer "memory" here, which is fine
        let _: String = self
            .conn
            .query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))
            .map_err(|e| DocrelayError::Storage(format!("Failed to enable WAL mode: {}", e)))?;

        // Cascading deletes need this on every connection
        self.conn
            .execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(|e| DocrelayError::Storage(format!("Failed to enable foreign keys: {}", e)))?;

        self.conn
            .execute_batch(CREATE_DOCUMENTS_TABLE)
            .map_err(|e| DocrelayError::Storage(format!("Failed to create documents table: {}", e)))?;

        self.conn
            .execute_batch(CREATE_CHUNKS_TABLE)
            .map_err(|e| DocrelayError::Storage(format!("Failed to create chunks table: {}", e)))?;

        self.conn
            .execute_batch(CREATE_METADATA_TABLE)
            .map_err(|e| DocrelayError::Storage(format!("Failed to create metadata table: {}", e)))?;

        self.conn
            .execute_batch(CREATE_INDEXES)
            .map_err(|e| DocrelayError::Storage(format!("Failed to create indexes: {}", e)))?;

        self.conn
            .execute(
                "INSERT OR REPLACE INTO metadata (key, value) VALUES ('schema_version', ?)",
                params![SCHEMA_VERSION.to_string()],
            )
            .map_err(|e| DocrelayError::Storage(format!("Failed to set schema version: {}", e)))?;

        log::info!("Database initialized with schema version {}", SCHEMA_VERSION);
        Ok(())
    }

    /// Register a document and return its id
    pub fn insert_document(&mut self, document: &NewDocument) -> Result<DocumentId> {
        self.conn
            .execute(
                "INSERT INTO documents (filename, page_count, char_count, content, created_at) \
                 VALUES (?, ?, ?, ?, ?)",
                params![
                    document.filename,
                    document.page_count.map(i64::from),
                    document.text.chars().count() as i64,
                    document.text,
                    Utc::now().to_rfc3339(),
                ],
            )
            .map_err(|e| {
                DocrelayError::Storage(format!("Failed to insert document {}: {}", document.filename, e))
            })?;

        let id = self.conn.last_insert_rowid();
        log::debug!("Registered document {} as id {}", document.filename, id);
        Ok(id)
    }

    /// Insert multiple chunks of one document in a transaction
    pub fn insert_chunks(&mut self, document_id: DocumentId, chunks: &[TextChunk]) -> Result<usize> {
        let tx = self
            .conn
            .transaction()
            .map_err(|e| DocrelayError::Storage(format!("Failed to start transaction: {}", e)))?;

        {
            let mut stmt = tx
                .prepare(
                    r#"
                INSERT INTO chunks (document_id, chunk_index, content, char_start, char_end)
                VALUES (?, ?, ?, ?, ?)
                "#,
                )
                .map_err(|e| DocrelayError::Storage(format!("Failed to prepare statement: {}", e)))?;

            for chunk in chunks {
                stmt.execute(params![
                    document_id,
                    chunk.index as i64,
                    chunk.content,
                    chunk.char_start as i64,
                    chunk.char_end as i64,
                ])
                .map_err(|e| {
                    DocrelayError::Storage(format!(
                        "Failed to insert chunk {} of document {}: {}",
                        chunk.index, document_id, e
                    ))
                })?;
            }
        }

        tx.commit()
            .map_err(|e| DocrelayError::Storage(format!("Failed to commit transaction: {}", e)))?;

        log::debug!("Inserted {} chunks for document {}", chunks.len(), document_id);
        Ok(chunks.len())
    }

    /// All chunks of the given documents, ordered by document then index
    pub fn fetch_chunks(&self, document_ids: &[DocumentId]) -> Result<Vec<Chunk>> {
        self.fetch_chunks_batched(document_ids, FETCH_BATCH_SIZE)
    }

    fn fetch_chunks_batched(&self, document_ids: &[DocumentId], batch_size: usize) -> Result<Vec<Chunk>> {
        // Sorted, distinct ids keep the concatenated batches in global order
        let mut ids = document_ids.to_vec();
        ids.sort_unstable();
        ids.dedup();

        let mut result = Vec::new();
        for batch in ids.chunks(batch_size.max(1)) {
            result.extend(self.fetch_chunk_batch(batch)?);
        }
        Ok(result)
    }

    fn fetch_chunk_batch(&self, document_ids: &[DocumentId]) -> Result<Vec<Chunk>> {
        let placeholders = vec!["?"; document_ids.len()].join(", ");
        let sql = format!(
            "SELECT document_id, chunk_index, content, char_start, char_end FROM chunks \
             WHERE document_id IN ({}) ORDER BY document_id, chunk_index",
            placeholders
        );

        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| DocrelayError::Storage(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map(params_from_iter(document_ids.iter()), row_to_chunk)
            .map_err(|e| DocrelayError::Storage(format!("Failed to query chunks: {}", e)))?;

        let mut result = Vec::new();
        for row in rows {
            result.push(
                row.map_err(|e| DocrelayError::Storage(format!("Failed to process chunk row: {}", e)))?,
            );
        }

        Ok(result)
    }

    /// Get a document by id
    pub fn get_document(&self, document_id: DocumentId) -> Result<Option<Document>> {
        let sql = format!("{} WHERE d.id = ?", SELECT_DOCUMENT);
        self.conn
            .query_row(&sql, params![document_id], row_to_document)
            .optional()
            .map_err(|e| DocrelayError::Storage(format!("Failed to query document: {}", e)))
    }

    /// Stored text of a document
    pub fn get_document_text(&self, document_id: DocumentId) -> Result<Option<String>> {
        self.conn
            .query_row(
                "SELECT content FROM documents WHERE id = ?",
                params![document_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| DocrelayError::Storage(format!("Failed to query document text: {}", e)))
    }

    /// All documents, newest first
    pub fn list_documents(&self) -> Result<Vec<Document>> {
        let sql = format!("{} ORDER BY d.id DESC", SELECT_DOCUMENT);
        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| DocrelayError::Storage(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map([], row_to_document)
            .map_err(|e| DocrelayError::Storage(format!("Failed to list documents: {}", e)))?;

        let mut result = Vec::new();
        for row in rows {
            result.push(
                row.map_err(|e| DocrelayError::Storage(format!("Failed to process document row: {}", e)))?,
            );
        }
        Ok(result)
    }

    /// Delete a document and, by cascade, its chunks. Returns whether it existed.
    pub fn delete_document(&mut self, document_id: DocumentId) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM documents WHERE id = ?", params![document_id])
            .map_err(|e| DocrelayError::Storage(format!("Failed to delete document {}: {}", document_id, e)))?;

        if deleted > 0 {
            log::info!("Deleted document {}", document_id);
        }
        Ok(deleted > 0)
    }

    /// Get total chunk count
    pub fn get_chunk_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))
            .map_err(|e| DocrelayError::Storage(format!("Failed to count chunks: {}", e)))?;

        Ok(count as usize)
    }

    /// Get database statistics
    pub fn get_stats(&self) -> Result<DatabaseStats> {
        let chunk_count = self.get_chunk_count()?;

        let document_count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))
            .map_err(|e| DocrelayError::Storage(format!("Failed to count documents: {}", e)))?;

        let file_size: i64 = self
            .conn
            .query_row(
                "SELECT page_count * page_size FROM pragma_page_count(), pragma_page_size()",
                [],
                |row| row.get(0),
            )
            .map_err(|e| DocrelayError::Storage(format!("Failed to get database size: {}", e)))?;

        Ok(DatabaseStats {
            document_count: document_count as usize,
            chunk_count,
            file_size_bytes: file_size as usize,
        })
    }
}

fn row_to_chunk(row: &Row) -> rusqlite::Result<Chunk> {
    Ok(Chunk {
        document_id: row.get(0)?,
        index: row.get::<_, i64>(1)? as usize,
        content: row.get(2)?,
        char_start: row.get::<_, i64>(3)? as usize,
        char_end: row.get::<_, i64>(4)? as usize,
    })
}

fn row_to_document(row: &Row) -> rusqlite::Result<Document> {
    let created_at: String = row.get(4)?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?
        .with_timezone(&Utc);

    Ok(Document {
        id: row.get(0)?,
        filename: row.get(1)?,
        page_count: row.get::<_, Option<i64>>(2)?.map(|p| p as u32),
        char_count: row.get::<_, i64>(3)? as usize,
        chunk_count: row.get::<_, i64>(5)? as usize,
        created_at,
    })
}

/// Database statistics
#[derive(Debug, Clone)]
pub struct DatabaseStats {
    pub document_count: usize,
    pub chunk_count: usize,
    pub file_size_bytes: usize,
}
