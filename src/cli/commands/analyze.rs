//! Analyze command implementation.

use crate::analysis::QueryAnalyzer;
use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;

/// Print the keywords and intent detected in a query.
pub async fn run_analyze(query: &str, settings: Settings) -> Result<()> {
    let analyzer = QueryAnalyzer::from_settings(&settings.analysis, settings.generation.timeout())?;

    let spinner = Output::spinner("Analysing...");
    let analysis = analyzer.analyze(query).await;
    spinner.finish_and_clear();

    Output::header("Intent");
    match &analysis.intent {
        Some(intent) => Output::kv(&intent.label, &format!("{:.2}", intent.score)),
        None => Output::kv("intent", "unknown"),
    }

    Output::header("Keywords");
    if analysis.keywords.is_empty() {
        Output::info("No keywords found.");
    }
    for keyword in &analysis.keywords {
        Output::list_item(keyword);
    }

    Ok(())
}
