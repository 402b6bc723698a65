//! Search command implementation.

use super::{build_knowledge_base, preflight};
use crate::cli::preflight::Operation;
use crate::cli::Output;
use crate::config::Settings;
use crate::rag::ContextBuilder;
use crate::retry::RetryPolicy;
use anyhow::Result;
use std::sync::Arc;

/// Run the search command.
pub async fn run_search(query: &str, top_k: usize, settings: Settings) -> Result<()> {
    if query.trim().is_empty() {
        anyhow::bail!("Search query must not be empty");
    }

    preflight(Operation::Index, &settings)?;

    let knowledge_base = build_knowledge_base(&settings).await?;
    let context_builder = ContextBuilder::new(Arc::new(knowledge_base))
        .with_top_k(top_k)
        .with_retry(RetryPolicy::from_settings(&settings.retry));

    let spinner = Output::spinner("Searching...");
    let results = context_builder.build(query).await;
    spinner.finish_and_clear();

    match results {
        Ok(sources) => {
            Output::success(&format!("Found {} results", sources.len()));
            for source in &sources {
                Output::source(source);
            }
        }
        Err(e) => {
            Output::error(&format!("Search failed: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
