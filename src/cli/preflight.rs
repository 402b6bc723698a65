//! Pre-flight checks before expensive operations.
//!
//! Validates that tokens and the corpus file are available before starting
//! operations that would otherwise fail midway.

use crate::config::{api_key_from_env, Settings};
use crate::error::{AdvisorError, Result};
use std::path::Path;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Indexing and search need the embedding token and the corpus.
    Index,
    /// Answering from records needs both tokens and the corpus.
    Ask,
    /// Persona chat needs only the generation token.
    Chat,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    match operation {
        Operation::Index => {
            api_key_from_env(settings.embedding.api_key_env())?;
            check_corpus(&settings.corpus_path())?;
        }
        Operation::Ask => {
            api_key_from_env(settings.generation.api_key_env())?;
            api_key_from_env(settings.embedding.api_key_env())?;
            check_corpus(&settings.corpus_path())?;
        }
        Operation::Chat => {
            api_key_from_env(settings.generation.api_key_env())?;
        }
    }
    Ok(())
}

/// Check that the corpus file exists.
pub fn check_corpus(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(AdvisorError::Config(format!(
            "Corpus file not found: {}. Set [corpus] path in the config file.",
            path.display()
        )))
    }
}
