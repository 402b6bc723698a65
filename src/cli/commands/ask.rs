//! Ask command implementation.

use super::{build_knowledge_base, preflight};
use crate::cli::preflight::Operation;
use crate::cli::Output;
use crate::config::Settings;
use crate::rag::Responder;
use anyhow::Result;
use std::sync::Arc;

/// Run the ask command.
pub async fn run_ask(
    question: &str,
    top_k: Option<usize>,
    model: Option<String>,
    mut settings: Settings,
) -> Result<()> {
    if let Some(k) = top_k {
        settings.rag.top_k = k;
    }
    if let Some(model) = model {
        settings.generation.model = model;
    }

    preflight(Operation::Ask, &settings)?;

    let knowledge_base = build_knowledge_base(&settings).await?;
    let responder = Responder::from_settings(Arc::new(knowledge_base), &settings)?;

    let spinner = Output::spinner("Thinking...");
    let result = responder.answer(question, &[]).await;
    spinner.finish_and_clear();

    match result {
        Ok(response) => {
            if response.fallback {
                Output::warning("The generation backend did not respond.");
            }

            println!("\n{}\n", response.answer);

            if !response.sources.is_empty() {
                Output::header("Sources");
                for source in &response.sources {
                    Output::source(source);
                }
            }
        }
        Err(e) => {
            Output::error(&format!("Failed to generate answer: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
