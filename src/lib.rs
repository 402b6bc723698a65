//! Advisor - a retrieval-augmented faculty advisor assistant
//!
//! Answers student questions about graduate faculty, their research areas and
//! availability from a small tabular corpus of advisor records.
//!
//! # Overview
//!
//! Advisor allows you to:
//! - Index a CSV or JSON file of faculty records into an in-memory vector index
//! - Ask questions answered from the closest records
//! - Chat with a persona-driven advisor that remembers recent turns
//! - Detect keywords and intent in a student's question
//!
//! # Architecture
//!
//! - `config` - Configuration and prompt templates
//! - `corpus` - Advisor records and corpus loading
//! - `embedding` - Embedding backends (HuggingFace, OpenAI)
//! - `index` - Flat nearest-neighbour index
//! - `indexer` - Corpus indexing into a knowledge base
//! - `generation` - Text generation backends (Groq, OpenAI, HuggingFace)
//! - `retry` - Bounded retry for backend calls
//! - `rag` - Retrieval-augmented responder and persona conversation
//! - `analysis` - Keyword and intent detection
//!
//! # Example
//!
//! ```rust,no_run
//! use advisor::config::Settings;
//! use advisor::corpus::Corpus;
//! use advisor::indexer::CorpusIndexer;
//! use advisor::rag::Responder;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let corpus = Corpus::load(&settings.corpus_path())?;
//!     let knowledge_base = CorpusIndexer::from_settings(&settings)?.build(corpus).await?;
//!
//!     let responder = Responder::from_settings(Arc::new(knowledge_base), &settings)?;
//!     let response = responder.answer("Who works on machine learning?", &[]).await?;
//!     println!("{}", response.answer);
//!
//!     Ok(())
//! }
//! ```

pub mod analysis;
pub mod cli;
pub mod config;
pub mod corpus;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod huggingface;
pub mod index;
pub mod indexer;
pub mod openai;
pub mod rag;
pub mod retry;

pub use error::{AdvisorError, Result};
