//! High-level chat API
//!
//! A chat turn retrieves context from the selected documents and relays the
//! message to the workflow webhook. Without a webhook the reply is built from
//! the retrieved passages alone.

use crate::api::retriever::{KeywordRetriever, RetrievalRequest};
use crate::api::webhook::{ContextPassage, WebhookClient, WebhookPayload};
use crate::error::{DocrelayError, Result};
use crate::storage::{Chunk, DocumentId};
use crate::utils::preview;
use serde::{Deserialize, Serialize};
use std::io::{self, Write};

/// Passages quoted in a context-only reply
const CONTEXT_ONLY_PASSAGES: usize = 3;

/// One user message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub document_ids: Vec<DocumentId>,
    pub session_id: Option<String>,
}

/// Reply shown to the user
#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub text: String,

    /// Passages that were sent along with the message
    pub context_chunks: Vec<Chunk>,

    /// False when retrieval failed and the message went out without context
    pub context_available: bool,
}

pub struct ChatService {
    retriever: KeywordRetriever,
    webhook: Option<WebhookClient>,
}

impl ChatService {
    pub fn new(retriever: KeywordRetriever, webhook: Option<WebhookClient>) -> Self {
        Self { retriever, webhook }
    }

    pub fn retriever(&self) -> &KeywordRetriever {
        &self.retriever
    }

    /// Where replies come from, `None` for context-only replies
    pub fn webhook_url(&self) -> Option<&str> {
        self.webhook.as_ref().map(|webhook| webhook.url())
    }

    /// Answer one message
    pub async fn ask(&self, request: &ChatRequest) -> Result<ChatReply> {
        let message = request.message.trim();
        if message.is_empty() {
            return Err(DocrelayError::TextProcessing("Message is empty".to_string()));
        }

        let retrieval = RetrievalRequest::new(request.document_ids.clone(), message);
        let (context_chunks, context_available) = match self.retriever.retrieve(&retrieval).await {
            Ok(chunks) => (chunks, true),
            Err(e) if e.is_storage() => {
                log::warn!("Retrieval failed, continuing without document context: {}", e);
                (Vec::new(), false)
            }
            Err(e) => return Err(e),
        };

        let text = match &self.webhook {
            Some(webhook) => {
                let payload = WebhookPayload {
                    message: message.to_string(),
                    session_id: request.session_id.clone(),
                    document_ids: request.document_ids.clone(),
                    context: context_chunks.iter().map(ContextPassage::from).collect(),
                };
                webhook.send(&payload).await?
            }
            None => context_only_response(&context_chunks),
        };

        Ok(ChatReply {
            text,
            context_chunks,
            context_available,
        })
    }
}

/// Reply built from retrieved passages when no webhook is available
pub fn context_only_response(chunks: &[Chunk]) -> String {
    if chunks.is_empty() {
        return "I couldn't find any relevant information in the uploaded documents.".to_string();
    }

    let mut response = "Based on the uploaded documents, here's what I found:\n\n".to_string();
    for (i, chunk) in chunks.iter().take(CONTEXT_ONLY_PASSAGES).enumerate() {
        response.push_str(&format!("{}. {}\n\n", i + 1, preview(chunk.content.trim(), 200)));
    }

    response.trim().to_string()
}

/// Interactive chat session on stdin/stdout
pub async fn chat_session(service: &ChatService, document_ids: Vec<DocumentId>) -> Result<()> {
    let mut session_id = new_session_id();

    println!("💬 Interactive Chat Mode");
    println!("   Documents: {:?}", document_ids);
    match service.webhook_url() {
        Some(url) => println!("   Replies: workflow webhook at {}", url),
        None => println!("   Replies: context-only (no webhook configured)"),
    }
    println!("\nType 'help' for commands, 'exit' to quit");
    println!("{}", "-".repeat(50));

    loop {
        print!("\nYou: ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        match input.to_lowercase().as_str() {
            "quit" | "exit" | "q" => {
                println!("Goodbye!");
                break;
            }
            "help" => {
                println!("\nCommands:");
                println!("  search <query> - Show ranked passages");
                println!("  clear         - Start a new session");
                println!("  help          - Show this help");
                println!("  exit/quit     - End session");
                continue;
            }
            "clear" => {
                session_id = new_session_id();
                println!("Started new session {}", session_id);
                continue;
            }
            _ => {}
        }

        if let Some(query) = input.strip_prefix("search ") {
            let request = RetrievalRequest::new(document_ids.clone(), query);
            match service.retriever().retrieve_scored(&request).await {
                Ok(results) if results.is_empty() => println!("❌ No passages for '{}'", query),
                Ok(results) => {
                    for (i, scored) in results.iter().take(5).enumerate() {
                        println!(
                            "{}. [doc {} #{} score {}] {}",
                            i + 1,
                            scored.chunk.document_id,
                            scored.chunk.index,
                            scored.score,
                            preview(&scored.chunk.content, 100)
                        );
                    }
                }
                Err(e) => println!("❌ Search error: {}", e),
            }
            continue;
        }

        let started = std::time::Instant::now();
        let request = ChatRequest {
            message: input.to_string(),
            document_ids: document_ids.clone(),
            session_id: Some(session_id.clone()),
        };
        match service.ask(&request).await {
            Ok(reply) => {
                println!("\nAssistant: {}", reply.text);
                if !reply.context_available {
                    println!("(document context unavailable)");
                }
                println!("[{:.1}s]", started.elapsed().as_secs_f64());
            }
            Err(e) => println!("❌ {}", e),
        }
    }

    Ok(())
}

fn new_session_id() -> String {
    format!("cli-{}", chrono::Utc::now().timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetrievalConfig;
    use crate::storage::{ChunkStore, NewDocument, SqliteChunkStore};
    use crate::text::chunk;
    use std::sync::Arc;

    async fn service_with(text: &str) -> (ChatService, DocumentId) {
        let store = Arc::new(SqliteChunkStore::memory().unwrap());
        let doc = store
            .create_document(NewDocument {
                filename: "doc.txt".to_string(),
                page_count: None,
                text: text.to_string(),
            })
            .await
            .unwrap();
        store.insert_chunks(doc, chunk(text, 40, 5).unwrap()).await.unwrap();

        let retriever = KeywordRetriever::new(store, &RetrievalConfig::default()).unwrap();
        (ChatService::new(retriever, None), doc)
    }

    #[tokio::test]
    async fn test_context_only_reply() {
        let (service, doc) = service_with(
            "Polymers are long molecules. Graphene is a single layer of carbon atoms.",
        )
        .await;
        assert!(service.webhook_url().is_none());

        let reply = service
            .ask(&ChatRequest {
                message: "Tell me about graphene".to_string(),
                document_ids: vec![doc],
                session_id: None,
            })
            .await
            .unwrap();

        assert!(reply.context_available);
        assert!(!reply.context_chunks.is_empty());
        assert!(reply.context_chunks[0].content.to_lowercase().contains("graphene"));
        assert!(reply.text.starts_with("Based on the uploaded documents"));
    }

    #[tokio::test]
    async fn test_no_documents_selected() {
        let (service, _doc) = service_with("Graphene is a single layer of carbon atoms.").await;

        let reply = service
            .ask(&ChatRequest {
                message: "graphene".to_string(),
                document_ids: vec![],
                session_id: None,
            })
            .await
            .unwrap();

        assert!(reply.context_chunks.is_empty());
        assert!(reply.context_available);
        assert!(reply.text.contains("couldn't find"));
    }

    #[tokio::test]
    async fn test_empty_message_rejected() {
        let (service, doc) = service_with("Graphene").await;
        let result = service
            .ask(&ChatRequest {
                message: "   ".to_string(),
                document_ids: vec![doc],
                session_id: None,
            })
            .await;
        assert!(matches!(result, Err(DocrelayError::TextProcessing(_))));
    }

    #[test]
    fn test_context_only_response_limits_passages() {
        let chunks: Vec<Chunk> = (0..5)
            .map(|i| Chunk {
                document_id: 1,
                index: i,
                content: format!("passage {}", i),
                char_start: 0,
                char_end: 9,
            })
            .collect();

        let response = context_only_response(&chunks);
        assert!(response.contains("1. passage 0"));
        assert!(response.contains("3. passage 2"));
        assert!(!response.contains("passage 3"));
    }
}
