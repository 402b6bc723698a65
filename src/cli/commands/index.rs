//! Index command implementation.

use super::{build_knowledge_base, preflight};
use crate::cli::preflight::Operation;
use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;

/// Build the index and report its shape.
pub async fn run_index(settings: Settings) -> Result<()> {
    preflight(Operation::Index, &settings)?;

    let knowledge_base = build_knowledge_base(&settings).await?;
    let index = knowledge_base.index();

    Output::success(&format!("Indexed {} advisor records", index.len()));
    Output::kv("Corpus", &settings.corpus_path().display().to_string());
    Output::kv("Embedding model", &settings.embedding.model);
    Output::kv("Dimensions", &index.dimensions().to_string());
    Output::kv("Metric", &index.metric().to_string());

    Ok(())
}
