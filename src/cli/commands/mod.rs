//! CLI command implementations.

mod analyze;
mod ask;
mod chat;
mod config;
mod doctor;
mod index;
mod search;
mod serve;

pub use analyze::run_analyze;
pub use ask::run_ask;
pub use chat::run_chat;
pub use config::run_config;
pub use doctor::run_doctor;
pub use index::run_index;
pub use search::run_search;
pub use serve::run_serve;

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::corpus::Corpus;
use crate::indexer::{CorpusIndexer, KnowledgeBase};

/// Run pre-flight checks, pointing at `advisor doctor` on failure.
fn preflight(operation: Operation, settings: &Settings) -> anyhow::Result<()> {
    if let Err(e) = preflight::check(operation, settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'advisor doctor' for detailed diagnostics.");
        return Err(e.into());
    }
    Ok(())
}

/// Load the configured corpus and index it.
async fn build_knowledge_base(settings: &Settings) -> anyhow::Result<KnowledgeBase> {
    let corpus = Corpus::load(&settings.corpus_path())?;
    let indexer = CorpusIndexer::from_settings(settings)?;

    let spinner = Output::spinner(&format!("Indexing {} advisor records...", corpus.len()));
    let result = indexer.build(corpus).await;
    spinner.finish_and_clear();

    Ok(result?)
}
