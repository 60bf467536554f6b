//! KeywordRetriever - chunk selection for chat context
//!
//! Scores every chunk of the requested documents by keyword frequency and
//! returns the best `top_k`. All chunks take part in one total order
//! (score descending, chunk index ascending), so when only a few chunks match
//! the result is filled up with the following chunks in reading order.

use crate::config::RetrievalConfig;
use crate::error::{DocrelayError, Result};
use crate::storage::{Chunk, ChunkStore, DocumentId};
use crate::text::{QueryTokenizer, keyword_score};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Parameters of one retrieval call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalRequest {
    pub document_ids: Vec<DocumentId>,
    pub query_text: String,
    /// Falls back to the retriever's configured default when unset
    pub top_k: Option<usize>,
}

impl RetrievalRequest {
    pub fn new(document_ids: Vec<DocumentId>, query_text: impl Into<String>) -> Self {
        Self {
            document_ids,
            query_text: query_text.into(),
            top_k: None,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }
}

/// A chunk with its keyword score
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: usize,
}

/// Keyword retriever over an injected chunk store
pub struct KeywordRetriever {
    store: Arc<dyn ChunkStore>,
    tokenizer: QueryTokenizer,
    default_top_k: usize,
}

impl KeywordRetriever {
    pub fn new(store: Arc<dyn ChunkStore>, config: &RetrievalConfig) -> Result<Self> {
        if config.top_k == 0 {
            return Err(DocrelayError::Config(
                "retrieval.top_k must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            store,
            tokenizer: QueryTokenizer::new(config.min_token_len)?,
            default_top_k: config.top_k,
        })
    }

    pub fn default_top_k(&self) -> usize {
        self.default_top_k
    }

    /// Query keywords as the retriever sees them
    pub fn tokenize(&self, query: &str) -> Vec<String> {
        self.tokenizer.tokenize(query)
    }

    /// The best chunks for the request, at most `top_k` of them.
    ///
    /// `Ok(vec![])` means there was nothing to search (no documents, no
    /// usable keywords, or no chunks stored). A storage failure is returned as
    /// an error, never as an empty list.
    pub async fn retrieve(&self, request: &RetrievalRequest) -> Result<Vec<Chunk>> {
        Ok(self
            .retrieve_scored(request)
            .await?
            .into_iter()
            .map(|scored| scored.chunk)
            .collect())
    }

    /// Same selection as [`retrieve`](Self::retrieve), with scores attached
    pub async fn retrieve_scored(&self, request: &RetrievalRequest) -> Result<Vec<ScoredChunk>> {
        let top_k = request.top_k.unwrap_or(self.default_top_k);
        if top_k == 0 {
            return Err(DocrelayError::Config("top_k must be greater than zero".to_string()));
        }

        if request.document_ids.is_empty() {
            log::debug!("No documents selected, skipping retrieval");
            return Ok(Vec::new());
        }

        let tokens = self.tokenizer.tokenize(&request.query_text);
        if tokens.is_empty() {
            log::debug!("Query '{}' has no usable keywords", request.query_text);
            return Ok(Vec::new());
        }

        let chunks = self.store.fetch_chunks(&request.document_ids).await.map_err(|e| {
            log::warn!(
                "Chunk fetch failed for documents {:?}: {}",
                request.document_ids,
                e
            );
            match e {
                DocrelayError::Storage(_) => e,
                other => DocrelayError::Storage(other.to_string()),
            }
        })?;

        let candidates = chunks.len();
        let ranked = rank_chunks(chunks, &tokens, top_k);

        log::info!(
            "Retrieved {} of {} chunks for keywords {:?} ({} matched)",
            ranked.len(),
            candidates,
            tokens,
            ranked.iter().filter(|c| c.score > 0).count()
        );
        Ok(ranked)
    }
}

/// Score `chunks` against `tokens` and keep the first `top_k` of the
/// (score desc, index asc) order. Chunks with equal score and index keep
/// their input order.
pub fn rank_chunks(chunks: Vec<Chunk>, tokens: &[String], top_k: usize) -> Vec<ScoredChunk> {
    let mut scored: Vec<ScoredChunk> = chunks
        .into_iter()
        .map(|chunk| {
            let score = keyword_score(&chunk.content, tokens);
            ScoredChunk { chunk, score }
        })
        .collect();

    scored.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| a.chunk.index.cmp(&b.chunk.index))
    });
    scored.truncate(top_k);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{Document, NewDocument, SqliteChunkStore};
    use crate::text::TextChunk;
    use async_trait::async_trait;

    fn text_chunk(index: usize, content: &str) -> TextChunk {
        TextChunk {
            index,
            content: content.to_string(),
            char_start: index * 100,
            char_end: index * 100 + content.chars().count(),
        }
    }

    async fn store_with(contents: &[&str]) -> (Arc<SqliteChunkStore>, DocumentId) {
        let store = Arc::new(SqliteChunkStore::memory().unwrap());
        let doc = store
            .create_document(NewDocument {
                filename: "test.pdf".to_string(),
                page_count: Some(1),
                text: String::new(),
            })
            .await
            .unwrap();
        let chunks = contents
            .iter()
            .enumerate()
            .map(|(i, c)| text_chunk(i, c))
            .collect();
        store.insert_chunks(doc, chunks).await.unwrap();
        (store, doc)
    }

    fn retriever(store: Arc<dyn ChunkStore>) -> KeywordRetriever {
        KeywordRetriever::new(store, &RetrievalConfig::default()).unwrap()
    }

    struct UnreachableStore;

    #[async_trait]
    impl ChunkStore for UnreachableStore {
        async fn create_document(&self, _document: NewDocument) -> Result<DocumentId> {
            Err(DocrelayError::Storage("connection refused".into()))
        }
        async fn insert_chunks(&self, _id: DocumentId, _chunks: Vec<TextChunk>) -> Result<usize> {
            Err(DocrelayError::Storage("connection refused".into()))
        }
        async fn fetch_chunks(&self, _ids: &[DocumentId]) -> Result<Vec<Chunk>> {
            Err(DocrelayError::Storage("connection refused".into()))
        }
        async fn get_document(&self, _id: DocumentId) -> Result<Option<Document>> {
            Err(DocrelayError::Storage("connection refused".into()))
        }
        async fn document_text(&self, _id: DocumentId) -> Result<Option<String>> {
            Err(DocrelayError::Storage("connection refused".into()))
        }
        async fn list_documents(&self) -> Result<Vec<Document>> {
            Err(DocrelayError::Storage("connection refused".into()))
        }
        async fn delete_document(&self, _id: DocumentId) -> Result<bool> {
            Err(DocrelayError::Storage("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn test_relevant_chunk_ranks_first() {
        let (store, doc) = store_with(&["graphene coating process", "unrelated text about polymers"]).await;
        let retriever = retriever(store);

        let results = retriever
            .retrieve(&RetrievalRequest::new(vec![doc], "graphene"))
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].index, 0);
        assert_eq!(results[0].content, "graphene coating process");
    }

    #[tokio::test]
    async fn test_higher_score_beats_reading_order() {
        let (store, doc) = store_with(&[
            "an introduction to materials",
            "graphene once",
            "graphene coating on graphene substrates",
        ])
        .await;
        let retriever = retriever(store);

        let scored = retriever
            .retrieve_scored(&RetrievalRequest::new(vec![doc], "Graphene?"))
            .await
            .unwrap();

        let order: Vec<(usize, usize)> = scored.iter().map(|s| (s.chunk.index, s.score)).collect();
        assert_eq!(order, vec![(2, 2), (1, 1), (0, 0)]);
    }

    #[tokio::test]
    async fn test_zero_matches_fall_back_to_reading_order() {
        let (store, doc) = store_with(&["alpha", "bravo", "charlie", "delta"]).await;
        let retriever = retriever(store);

        let results = retriever
            .retrieve(&RetrievalRequest::new(vec![doc], "quantum entanglement").with_top_k(3))
            .await
            .unwrap();

        let indices: Vec<usize> = results.iter().map(|c| c.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_top_k_bounded_by_available_chunks() {
        let (store, doc) = store_with(&["first graphene", "second", "third"]).await;
        let retriever = retriever(store);

        let results = retriever
            .retrieve(&RetrievalRequest::new(vec![doc], "graphene").with_top_k(12))
            .await
            .unwrap();
        assert_eq!(results.len(), 3);
    }

    #[tokio::test]
    async fn test_top_k_truncates() {
        let contents: Vec<String> = (0..20).map(|i| format!("graphene section {}", i)).collect();
        let refs: Vec<&str> = contents.iter().map(String::as_str).collect();
        let (store, doc) = store_with(&refs).await;
        let retriever = retriever(store);

        let results = retriever
            .retrieve(&RetrievalRequest::new(vec![doc], "graphene"))
            .await
            .unwrap();
        assert_eq!(results.len(), 12);
        let indices: Vec<usize> = results.iter().map(|c| c.index).collect();
        assert_eq!(indices, (0..12).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_empty_inputs_return_nothing() {
        let (store, doc) = store_with(&["graphene coating process"]).await;
        let retriever = retriever(store);

        let no_docs = retriever
            .retrieve(&RetrievalRequest::new(vec![], "graphene"))
            .await
            .unwrap();
        assert!(no_docs.is_empty());

        let blank = retriever
            .retrieve(&RetrievalRequest::new(vec![doc], "   "))
            .await
            .unwrap();
        assert!(blank.is_empty());

        let short_words = retriever
            .retrieve(&RetrievalRequest::new(vec![doc], "is it on?"))
            .await
            .unwrap();
        assert!(short_words.is_empty());
    }

    #[tokio::test]
    async fn test_empty_document_set_skips_storage() {
        let retriever = retriever(Arc::new(UnreachableStore));
        let results = retriever
            .retrieve(&RetrievalRequest::new(vec![], "graphene synthesis"))
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_storage_failure_is_not_an_empty_result() {
        let retriever = retriever(Arc::new(UnreachableStore));
        let result = retriever
            .retrieve(&RetrievalRequest::new(vec![1], "graphene synthesis"))
            .await;

        match result {
            Err(DocrelayError::Storage(message)) => assert!(message.contains("connection refused")),
            other => panic!("Expected storage error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_zero_top_k_is_rejected() {
        let (store, doc) = store_with(&["graphene"]).await;
        let retriever = retriever(store);
        let result = retriever
            .retrieve(&RetrievalRequest::new(vec![doc], "graphene").with_top_k(0))
            .await;
        assert!(matches!(result, Err(DocrelayError::Config(_))));

        let config = RetrievalConfig {
            top_k: 0,
            ..RetrievalConfig::default()
        };
        assert!(KeywordRetriever::new(Arc::new(UnreachableStore), &config).is_err());
    }

    #[test]
    fn test_rank_ties_keep_document_order() {
        let chunk = |document_id, index, content: &str| Chunk {
            document_id,
            index,
            content: content.to_string(),
            char_start: 0,
            char_end: content.len(),
        };
        let chunks = vec![
            chunk(1, 0, "graphene"),
            chunk(1, 1, "nothing"),
            chunk(2, 0, "graphene"),
            chunk(2, 1, "nothing"),
        ];

        let ranked = rank_chunks(chunks, &["graphene".to_string()], 10);
        let order: Vec<(DocumentId, usize)> = ranked
            .iter()
            .map(|s| (s.chunk.document_id, s.chunk.index))
            .collect();
        assert_eq!(order, vec![(1, 0), (2, 0), (1, 1), (2, 1)]);
    }
}
