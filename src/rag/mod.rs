//! RAG (Retrieval-Augmented Generation) for answering questions about advisors.
//!
//! Two front doors share one generation core: [`Responder`] retrieves advisor
//! records as context, [`Conversation`] relies on a fixed persona and the
//! recent conversation only.

pub mod context;
mod response;

pub use context::ContextBuilder;
pub use response::{extract_answer, Conversation, RagResponse, Responder};

use crate::corpus::Record;
use serde::Serialize;

/// A retrieved advisor record with its distance to the query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Source {
    /// Row of the record in the corpus.
    pub row: usize,
    /// Advisor name.
    pub name: String,
    /// The text that was embedded and given to the model.
    pub content: String,
    /// Distance to the query (lower is closer).
    pub distance: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Source {
    pub fn from_record(row: usize, record: &Record, distance: f32) -> Self {
        Self {
            row,
            name: record.name.clone(),
            content: record.document_text(),
            distance,
            email: record.email.clone(),
            url: record.url.clone(),
        }
    }
}
