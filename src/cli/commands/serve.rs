//! HTTP API server for integration with other systems.
//!
//! Provides REST endpoints for retrieval, RAG answers and persona chat.

use super::{build_knowledge_base, preflight};
use crate::cli::preflight::Operation;
use crate::cli::Output;
use crate::config::{Prompts, RagSettings, Settings};
use crate::error::AdvisorError;
use crate::generation::{create_generator, ChatMessage, Generator};
use crate::indexer::KnowledgeBase;
use crate::rag::{ContextBuilder, Conversation, RagResponse, Responder, Source};
use crate::retry::RetryPolicy;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

/// Shared application state.
struct AppState {
    knowledge_base: Arc<KnowledgeBase>,
    generator: Arc<dyn Generator>,
    prompts: Prompts,
    rag: RagSettings,
    retry: RetryPolicy,
}

impl AppState {
    fn responder(&self, top_k: Option<usize>) -> Responder {
        let mut rag = self.rag.clone();
        if let Some(k) = top_k {
            rag.top_k = k;
        }
        Responder::new(self.knowledge_base.clone(), self.generator.clone())
            .with_prompts(self.prompts.clone())
            .with_settings(rag)
            .with_retry(self.retry)
    }

    fn conversation(&self) -> Conversation {
        Conversation::new(self.generator.clone())
            .with_prompts(self.prompts.clone())
            .with_settings(self.rag.clone())
            .with_retry(self.retry)
    }
}

/// Run the HTTP API server.
pub async fn run_serve(host: &str, port: u16, settings: Settings) -> anyhow::Result<()> {
    preflight(Operation::Ask, &settings)?;

    let knowledge_base = build_knowledge_base(&settings).await?;
    let state = Arc::new(AppState {
        knowledge_base: Arc::new(knowledge_base),
        generator: create_generator(&settings.generation)?,
        prompts: Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?,
        rag: settings.rag.clone(),
        retry: RetryPolicy::from_settings(&settings.retry),
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(health))
        .route("/search", post(search))
        .route("/ask", post(ask))
        .route("/chat", post(chat))
        .layer(cors)
        .with_state(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Advisor API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Search", "POST /search");
    Output::kv("Ask (RAG)", "POST /ask");
    Output::kv("Chat", "POST /chat");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct SearchRequest {
    query: String,
    #[serde(default)]
    top_k: Option<usize>,
}

#[derive(Serialize)]
struct SearchResponse {
    results: Vec<Source>,
}

#[derive(Deserialize)]
struct AskRequest {
    question: String,
    #[serde(default)]
    history: Vec<ChatMessage>,
    #[serde(default)]
    top_k: Option<usize>,
}

#[derive(Deserialize)]
struct ChatRequest {
    message: String,
    #[serde(default)]
    history: Vec<ChatMessage>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn status_for(error: &AdvisorError) -> StatusCode {
    match error {
        AdvisorError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
        AdvisorError::Authentication(_) => StatusCode::UNAUTHORIZED,
        e if e.is_transient() => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(error: AdvisorError) -> Response {
    (
        status_for(&error),
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
        .into_response()
}

fn answer_response(result: crate::error::Result<RagResponse>) -> Response {
    match result {
        Ok(response) => Json(response).into_response(),
        Err(e) => error_response(e),
    }
}

// === Handlers ===

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "records": state.knowledge_base.corpus().len(),
        "model": state.generator.model(),
    }))
}

async fn search(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SearchRequest>,
) -> Response {
    if req.query.trim().is_empty() {
        return error_response(AdvisorError::InvalidQuery("Query must not be empty".to_string()));
    }

    let context_builder = ContextBuilder::new(state.knowledge_base.clone())
        .with_top_k(req.top_k.unwrap_or(state.rag.top_k))
        .with_retry(state.retry);

    match context_builder.build(&req.query).await {
        Ok(results) => Json(SearchResponse { results }).into_response(),
        Err(e) => error_response(e),
    }
}

async fn ask(State(state): State<Arc<AppState>>, Json(req): Json<AskRequest>) -> Response {
    info!("POST /ask ({} history messages)", req.history.len());
    let responder = state.responder(req.top_k);
    answer_response(responder.answer(&req.question, &req.history).await)
}

async fn chat(State(state): State<Arc<AppState>>, Json(req): Json<ChatRequest>) -> Response {
    info!("POST /chat ({} history messages)", req.history.len());
    let conversation = state.conversation();
    answer_response(conversation.reply(&req.message, &req.history).await)
}
