//! Configuration module for Advisor.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{PersonaPrompts, Prompts, RagPrompts};
pub use settings::{
    api_key_from_env, AnalysisSettings, CorpusSettings, DistanceMetric, EmbeddingProvider,
    EmbeddingSettings, GeneralSettings, GenerationProvider, GenerationSettings, IndexSettings,
    PromptSettings, RagSettings, RetrySettings, Settings, DEFAULT_FALLBACK_MESSAGE,
};
