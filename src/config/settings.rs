//! Configuration settings for Advisor.

use crate::error::{AdvisorError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub corpus: CorpusSettings,
    pub embedding: EmbeddingSettings,
    pub index: IndexSettings,
    pub generation: GenerationSettings,
    pub retry: RetrySettings,
    pub rag: RagSettings,
    pub analysis: AnalysisSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
        }
    }
}

/// Where the advisor corpus is read from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusSettings {
    /// Path to a CSV or JSON file of advisor records.
    pub path: String,
}

impl Default for CorpusSettings {
    fn default() -> Self {
        Self {
            path: "data/professors.csv".to_string(),
        }
    }
}

/// Embedding provider type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// HuggingFace inference feature-extraction pipeline (default).
    #[default]
    HuggingFace,
    /// OpenAI-compatible embeddings endpoint.
    OpenAI,
}

impl std::str::FromStr for EmbeddingProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "huggingface" | "hf" => Ok(EmbeddingProvider::HuggingFace),
            "openai" => Ok(EmbeddingProvider::OpenAI),
            _ => Err(format!("Unknown embedding provider: {}", s)),
        }
    }
}

impl std::fmt::Display for EmbeddingProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmbeddingProvider::HuggingFace => write!(f, "huggingface"),
            EmbeddingProvider::OpenAI => write!(f, "openai"),
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding provider (huggingface, openai).
    pub provider: EmbeddingProvider,
    /// Embedding model to use.
    pub model: String,
    /// Embedding dimensions.
    pub dimensions: u32,
    /// Override for the provider's API base URL.
    pub api_base: Option<String>,
    /// Override for the environment variable holding the API token.
    pub api_key_env: Option<String>,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::HuggingFace,
            model: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
            dimensions: 384,
            api_base: None,
            api_key_env: None,
        }
    }
}

impl EmbeddingSettings {
    /// Environment variable holding the embedding provider's token.
    pub fn api_key_env(&self) -> &str {
        self.api_key_env.as_deref().unwrap_or(match self.provider {
            EmbeddingProvider::HuggingFace => "HUGGINGFACE_API_TOKEN",
            EmbeddingProvider::OpenAI => "OPENAI_API_KEY",
        })
    }
}

/// Distance metric used by the flat index.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// Euclidean distance.
    #[default]
    L2,
    /// One minus cosine similarity.
    Cosine,
}

impl std::str::FromStr for DistanceMetric {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "l2" | "euclidean" => Ok(DistanceMetric::L2),
            "cosine" => Ok(DistanceMetric::Cosine),
            _ => Err(format!("Unknown distance metric: {}", s)),
        }
    }
}

impl std::fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DistanceMetric::L2 => write!(f, "l2"),
            DistanceMetric::Cosine => write!(f, "cosine"),
        }
    }
}

/// Index settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct IndexSettings {
    /// Distance metric (l2, cosine).
    pub metric: DistanceMetric,
}

/// Generation provider type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GenerationProvider {
    /// Groq's OpenAI-compatible chat completions (default).
    #[default]
    Groq,
    /// OpenAI chat completions.
    OpenAI,
    /// HuggingFace text2text inference.
    HuggingFace,
}

impl std::str::FromStr for GenerationProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "groq" => Ok(GenerationProvider::Groq),
            "openai" => Ok(GenerationProvider::OpenAI),
            "huggingface" | "hf" => Ok(GenerationProvider::HuggingFace),
            _ => Err(format!("Unknown generation provider: {}", s)),
        }
    }
}

impl std::fmt::Display for GenerationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerationProvider::Groq => write!(f, "groq"),
            GenerationProvider::OpenAI => write!(f, "openai"),
            GenerationProvider::HuggingFace => write!(f, "huggingface"),
        }
    }
}

/// Text generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// Generation provider (groq, openai, huggingface).
    pub provider: GenerationProvider,
    /// Model name.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Timeout for a single HTTP request, in seconds.
    pub timeout_secs: u64,
    /// Override for the provider's API base URL.
    pub api_base: Option<String>,
    /// Override for the environment variable holding the API token.
    pub api_key_env: Option<String>,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            provider: GenerationProvider::Groq,
            model: "llama-3.1-8b-instant".to_string(),
            temperature: 0.7,
            max_tokens: 512,
            timeout_secs: crate::openai::DEFAULT_TIMEOUT_SECS,
            api_base: None,
            api_key_env: None,
        }
    }
}

impl GenerationSettings {
    /// Environment variable holding the generation provider's token.
    pub fn api_key_env(&self) -> &str {
        self.api_key_env.as_deref().unwrap_or(match self.provider {
            GenerationProvider::Groq => "GROQ_API_KEY",
            GenerationProvider::OpenAI => "OPENAI_API_KEY",
            GenerationProvider::HuggingFace => "HUGGINGFACE_API_TOKEN",
        })
    }

    /// API base URL, falling back to the provider default.
    pub fn api_base(&self) -> Option<&str> {
        match (&self.api_base, self.provider) {
            (Some(base), _) => Some(base.as_str()),
            (None, GenerationProvider::Groq) => Some("https://api.groq.com/openai/v1"),
            (None, _) => None,
        }
    }

    /// HTTP request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Retry behaviour for backend calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Maximum attempts per backend call (including the first).
    pub max_attempts: u32,
    /// Delay between attempts, in milliseconds.
    pub backoff_ms: u64,
    /// Double the delay after each failed attempt.
    pub exponential: bool,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_ms: 2000,
            exponential: false,
        }
    }
}

/// Apology returned when the generation backend cannot be reached.
pub const DEFAULT_FALLBACK_MESSAGE: &str = "I'm sorry, something went wrong while generating a response. Could you please repeat or rephrase your question?";

/// RAG (Retrieval-Augmented Generation) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagSettings {
    /// Number of advisor records retrieved per query.
    pub top_k: usize,
    /// Number of prior conversation messages sent with each request.
    pub history_window: usize,
    /// Message returned once all retries are exhausted.
    pub fallback_message: String,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            top_k: 2,
            history_window: 4,
            fallback_message: DEFAULT_FALLBACK_MESSAGE.to_string(),
        }
    }
}

/// Query analysis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    /// Keywords detected in queries.
    pub keywords: Vec<String>,
    /// Zero-shot classification model for intent detection. None disables it.
    pub intent_model: Option<String>,
    /// Candidate intent labels.
    pub intent_labels: Vec<String>,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            keywords: [
                "AI",
                "machine learning",
                "data science",
                "professor",
                "faculty",
                "research",
                "availability",
                "office hours",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            intent_model: Some("facebook/bart-large-mnli".to_string()),
            intent_labels: [
                "find_professor_by_area",
                "find_available_professor",
                "general_question",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| AdvisorError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("advisor")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded corpus path.
    pub fn corpus_path(&self) -> PathBuf {
        Self::expand_path(&self.corpus.path)
    }
}

/// Read a bearer token from the environment.
///
/// A missing or empty token is an authentication failure: no request made
/// without it can succeed.
pub fn api_key_from_env(var: &str) -> Result<String> {
    match std::env::var(var) {
        Ok(key) if !key.trim().is_empty() => Ok(key.trim().to_string()),
        Ok(_) => Err(AdvisorError::Authentication(format!("{} is empty", var))),
        Err(_) => Err(AdvisorError::Authentication(format!("{} not set", var))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.rag.top_k, 2);
        assert_eq!(settings.retry.max_attempts, 3);
        assert_eq!(settings.embedding.dimensions, 384);
        assert_eq!(settings.generation.timeout(), Duration::from_secs(30));
        assert_eq!(settings.generation.api_key_env(), "GROQ_API_KEY");
        assert_eq!(
            settings.generation.api_base(),
            Some("https://api.groq.com/openai/v1")
        );
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [rag]
            top_k = 1

            [generation]
            provider = "huggingface"
            model = "google/flan-t5-base"

            [index]
            metric = "cosine"
            "#,
        )
        .unwrap();

        assert_eq!(settings.rag.top_k, 1);
        assert_eq!(settings.rag.history_window, 4);
        assert_eq!(settings.generation.provider, GenerationProvider::HuggingFace);
        assert_eq!(settings.generation.api_key_env(), "HUGGINGFACE_API_TOKEN");
        assert_eq!(settings.generation.api_base(), None);
        assert_eq!(settings.index.metric, DistanceMetric::Cosine);
    }

    #[test]
    fn test_provider_parsing() {
        assert_eq!("GROQ".parse::<GenerationProvider>(), Ok(GenerationProvider::Groq));
        assert_eq!("hf".parse::<EmbeddingProvider>(), Ok(EmbeddingProvider::HuggingFace));
        assert_eq!("euclidean".parse::<DistanceMetric>(), Ok(DistanceMetric::L2));
        assert!("faiss".parse::<DistanceMetric>().is_err());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut settings = Settings::default();
        settings.rag.history_window = 6;
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.rag.history_window, 6);
    }

    #[test]
    fn test_missing_api_key_is_authentication_error() {
        let err = api_key_from_env("ADVISOR_TEST_TOKEN_THAT_IS_NEVER_SET").unwrap_err();
        assert!(matches!(err, AdvisorError::Authentication(_)));
    }
}
