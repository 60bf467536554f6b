//! docrelay CLI application
//!
//! Command-line interface for the docrelay library.

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use docrelay::api::chat_session;
use docrelay::utils::{DocumentKind, document_kind, format_file_size, preview};
use docrelay::{
    ChatRequest, ChatService, ChunkStore, Config, DocumentId, DocumentIngestor, KeywordRetriever,
    RetrievalRequest, SqliteChunkStore, WebhookClient,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "docrelay")]
#[command(about = "Chat with uploaded PDFs through a workflow webhook")]
#[command(version)]
struct Cli {
    /// JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database (overrides configuration)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract, chunk and store documents
    Ingest {
        /// PDF, text or markdown files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Chunk size in characters
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Overlap between chunks
        #[arg(long)]
        overlap: Option<usize>,
    },

    /// Show the passages retrieval would select
    Search {
        /// Documents to search
        #[arg(long = "doc", required = true)]
        documents: Vec<DocumentId>,

        /// Search query
        query: String,

        /// Number of results to return
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// Send one message and print the reply
    Ask {
        /// Documents to draw context from
        #[arg(long = "doc")]
        documents: Vec<DocumentId>,

        /// Conversation id forwarded to the webhook
        #[arg(long)]
        session: Option<String>,

        message: String,
    },

    /// Interactive chat with your documents
    Chat {
        /// Documents to draw context from
        #[arg(long = "doc")]
        documents: Vec<DocumentId>,
    },

    /// List stored documents
    Documents,

    /// Delete a document and its chunks
    Delete { id: DocumentId },

    /// Show database statistics
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    env_logger::init();

    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref()).context("Invalid configuration")?;
    if let Some(database) = &cli.database {
        config.storage.database_path = database.to_string_lossy().to_string();
    }

    let store = Arc::new(
        SqliteChunkStore::open(&config.storage.database_path)
            .with_context(|| format!("Cannot open {}", config.storage.database_path))?,
    );

    match cli.command {
        Commands::Ingest {
            inputs,
            chunk_size,
            overlap,
        } => {
            if let Some(chunk_size) = chunk_size {
                config.chunking.chunk_size = chunk_size;
            }
            if let Some(overlap) = overlap {
                config.chunking.overlap = overlap;
            }
            ingest_command(store, &config, inputs).await?;
        }
        Commands::Search {
            documents,
            query,
            top_k,
        } => {
            search_command(store, &config, documents, query, top_k).await?;
        }
        Commands::Ask {
            documents,
            session,
            message,
        } => {
            let service = chat_service(store, &config)?;
            let reply = service
                .ask(&ChatRequest {
                    message,
                    document_ids: documents,
                    session_id: session,
                })
                .await?;

            println!("{}", reply.text);
            if !reply.context_available {
                eprintln!("⚠️  Document context was unavailable for this reply");
            }
        }
        Commands::Chat { documents } => {
            let service = chat_service(store, &config)?;
            chat_session(&service, documents).await?;
        }
        Commands::Documents => {
            let documents = store.list_documents().await?;
            if documents.is_empty() {
                println!("No documents stored");
            }
            for document in documents {
                println!(
                    "{:>5}  {:<40} {:>4} pages {:>6} chunks  {}",
                    document.id,
                    preview(&document.filename, 37),
                    document
                        .page_count
                        .map(|p| p.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                    document.chunk_count,
                    document.created_at.format("%Y-%m-%d %H:%M")
                );
            }
        }
        Commands::Delete { id } => {
            if store.delete_document(id).await? {
                println!("🗑️  Deleted document {}", id);
            } else {
                bail!("Document {} not found", id);
            }
        }
        Commands::Stats => {
            let stats = store.stats().await?;
            println!("📊 Documents: {}", stats.document_count);
            println!("   Chunks:    {}", stats.chunk_count);
            println!("   Database:  {}", format_file_size(stats.file_size_bytes as u64));
        }
    }

    Ok(())
}

fn chat_service(store: Arc<SqliteChunkStore>, config: &Config) -> anyhow::Result<ChatService> {
    let retriever = KeywordRetriever::new(store, &config.retrieval)?;
    let webhook = WebhookClient::from_config(&config.webhook)?;
    Ok(ChatService::new(retriever, webhook))
}

async fn ingest_command(
    store: Arc<SqliteChunkStore>,
    config: &Config,
    inputs: Vec<PathBuf>,
) -> anyhow::Result<()> {
    let ingestor = DocumentIngestor::new(store, config.chunking.clone())?;

    let progress = ProgressBar::new(inputs.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("{bar:30} {pos}/{len} {msg}")
            .context("Invalid progress template")?,
    );

    let mut ingested = 0;
    for input in inputs {
        progress.set_message(input.display().to_string());

        let result = match document_kind(&input) {
            Some(DocumentKind::Pdf) => ingestor.ingest_pdf(&input).await,
            Some(DocumentKind::Text) => ingestor.ingest_text_file(&input).await,
            None => {
                progress.println(format!("❌ Unsupported file type: {}", input.display()));
                progress.inc(1);
                continue;
            }
        };

        match result {
            Ok(stats) => {
                ingested += 1;
                progress.println(format!(
                    "📄 {} → document {} ({} chunks, {:.2}s)",
                    input.display(),
                    stats.document_id,
                    stats.total_chunks,
                    stats.processing_time
                ));
            }
            Err(e) => progress.println(format!("❌ Failed to process {}: {}", input.display(), e)),
        }
        progress.inc(1);
    }
    progress.finish_and_clear();

    if ingested == 0 {
        bail!("No content was successfully processed");
    }
    println!("✅ Ingested {} document(s)", ingested);
    Ok(())
}

async fn search_command(
    store: Arc<SqliteChunkStore>,
    config: &Config,
    documents: Vec<DocumentId>,
    query: String,
    top_k: Option<usize>,
) -> anyhow::Result<()> {
    let retriever = KeywordRetriever::new(store, &config.retrieval)?;
    let top_k = top_k.unwrap_or(retriever.default_top_k());
    println!("🔍 Keywords: {:?} (top {})", retriever.tokenize(&query), top_k);

    let request = RetrievalRequest::new(documents, query).with_top_k(top_k);
    let results = retriever.retrieve_scored(&request).await?;

    if results.is_empty() {
        println!("❌ No results found");
        return Ok(());
    }

    println!("📋 Found {} results:", results.len());
    println!();

    for (i, scored) in results.iter().enumerate() {
        println!(
            "{}. Score: {}  (document {}, chunk {}, chars {}..{})",
            i + 1,
            scored.score,
            scored.chunk.document_id,
            scored.chunk.index,
            scored.chunk.char_start,
            scored.chunk.char_end
        );
        println!("   {}", preview(&scored.chunk.content, 300));
        println!();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from(["docrelay", "ingest", "report.pdf"]);
        assert!(cli.is_ok());

        let cli = Cli::try_parse_from(["docrelay", "search", "--doc", "1", "--doc", "2", "graphene", "-k", "5"]).unwrap();
        match cli.command {
            Commands::Search { documents, top_k, .. } => {
                assert_eq!(documents, vec![1, 2]);
                assert_eq!(top_k, Some(5));
            }
            _ => panic!("Expected search command"),
        }
    }

    #[test]
    fn test_search_requires_documents() {
        assert!(Cli::try_parse_from(["docrelay", "search", "graphene"]).is_err());
    }
}
