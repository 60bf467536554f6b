//! [`ChunkStore`] backed by the embedded SQLite [`Database`]
//!
//! rusqlite is blocking, so every call runs on the blocking thread pool with
//! the connection behind a mutex.

use crate::error::{DocrelayError, Result};
use crate::storage::{Chunk, ChunkStore, Database, DatabaseStats, Document, DocumentId, NewDocument};
use crate::text::TextChunk;
use async_trait::async_trait;
use std::path::Path;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub struct SqliteChunkStore {
    db: Arc<Mutex<Database>>,
}

impl SqliteChunkStore {
    /// Open (or create) the database file at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let database = Database::new(path.as_ref())?;
        log::info!("Opened chunk store at {}", path.as_ref().display());
        Ok(Self::from_database(database))
    }

    /// Fresh in-memory store
    pub fn memory() -> Result<Self> {
        Ok(Self::from_database(Database::memory()?))
    }

    pub fn from_database(database: Database) -> Self {
        Self {
            db: Arc::new(Mutex::new(database)),
        }
    }

    pub async fn stats(&self) -> Result<DatabaseStats> {
        self.with_db(|db| db.get_stats()).await
    }

    async fn with_db<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Database) -> Result<T> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
            let mut guard = db
                .lock()
                .map_err(|_| DocrelayError::Storage("database mutex poisoned".to_string()))?;
            op(&mut guard)
        })
        .await
        .map_err(|e| DocrelayError::Storage(format!("Storage task failed: {}", e)))?
    }
}

#[async_trait]
impl ChunkStore for SqliteChunkStore {
    async fn create_document(&self, document: NewDocument) -> Result<DocumentId> {
        self.with_db(move |db| db.insert_document(&document)).await
    }

    async fn insert_chunks(&self, document_id: DocumentId, chunks: Vec<TextChunk>) -> Result<usize> {
        self.with_db(move |db| db.insert_chunks(document_id, &chunks)).await
    }

    async fn fetch_chunks(&self, document_ids: &[DocumentId]) -> Result<Vec<Chunk>> {
        let ids = document_ids.to_vec();
        self.with_db(move |db| db.fetch_chunks(&ids)).await
    }

    async fn get_document(&self, document_id: DocumentId) -> Result<Option<Document>> {
        self.with_db(move |db| db.get_document(document_id)).await
    }

    async fn document_text(&self, document_id: DocumentId) -> Result<Option<String>> {
        self.with_db(move |db| db.get_document_text(document_id)).await
    }

    async fn list_documents(&self) -> Result<Vec<Document>> {
        self.with_db(|db| db.list_documents()).await
    }

    async fn delete_document(&self, document_id: DocumentId) -> Result<bool> {
        self.with_db(move |db| db.delete_document(document_id)).await
    }
}
