//! Query analysis: keyword detection and optional intent classification.
//!
//! Intent comes from a hosted zero-shot classifier. It is advisory only, so
//! any backend failure yields no intent instead of an error.

use crate::config::{api_key_from_env, AnalysisSettings};
use crate::error::{AdvisorError, Result};
use crate::huggingface::InferenceClient;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Environment variable holding the token for the intent classifier.
pub const INTENT_TOKEN_ENV: &str = "HUGGINGFACE_API_TOKEN";

/// Result of analysing a query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryAnalysis {
    /// Best-scoring intent label, if classification ran.
    pub intent: Option<Intent>,
    /// Configured keywords found in the query, in configuration order.
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Intent {
    pub label: String,
    pub score: f32,
}

#[derive(Serialize)]
struct ZeroShotRequest<'a> {
    inputs: &'a str,
    parameters: ZeroShotParameters<'a>,
}

#[derive(Serialize)]
struct ZeroShotParameters<'a> {
    candidate_labels: &'a [String],
}

/// The inference API answers in either of two shapes depending on the
/// deployment.
#[derive(Deserialize)]
#[serde(untagged)]
enum ZeroShotResponse {
    Columns { labels: Vec<String>, scores: Vec<f32> },
    Rows(Vec<LabelScore>),
}

#[derive(Deserialize)]
struct LabelScore {
    label: String,
    score: f32,
}

impl ZeroShotResponse {
    fn best(self) -> Option<Intent> {
        let pairs: Vec<(String, f32)> = match self {
            ZeroShotResponse::Columns { labels, scores } => {
                labels.into_iter().zip(scores).collect()
            }
            ZeroShotResponse::Rows(rows) => rows.into_iter().map(|r| (r.label, r.score)).collect(),
        };
        pairs
            .into_iter()
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(label, score)| Intent { label, score })
    }
}

/// Zero-shot intent classifier on the HuggingFace inference API.
pub struct IntentClassifier {
    client: InferenceClient,
    model: String,
    labels: Vec<String>,
}

impl IntentClassifier {
    pub fn new(client: InferenceClient, model: &str, labels: Vec<String>) -> Self {
        Self {
            client,
            model: model.to_string(),
            labels,
        }
    }

    /// Highest-scoring label for the query.
    pub async fn classify(&self, query: &str) -> Result<Option<Intent>> {
        if self.labels.is_empty() {
            return Ok(None);
        }

        let url = self.client.endpoint(&self.model, None)?;
        let request = ZeroShotRequest {
            inputs: query,
            parameters: ZeroShotParameters {
                candidate_labels: &self.labels,
            },
        };

        let response: ZeroShotResponse = self
            .client
            .post(url, &request, AdvisorError::GenerationBackend)
            .await?;
        Ok(response.best())
    }
}

/// Detects configured keywords and, when enabled, the query intent.
pub struct QueryAnalyzer {
    keywords: Vec<(String, Regex)>,
    classifier: Option<IntentClassifier>,
}

impl QueryAnalyzer {
    /// Keyword-only analyzer.
    pub fn new(keywords: &[String]) -> Result<Self> {
        let mut compiled = Vec::with_capacity(keywords.len());
        for keyword in keywords {
            let trimmed = keyword.trim();
            let duplicate = compiled
                .iter()
                .any(|(k, _): &(String, Regex)| k.eq_ignore_ascii_case(trimmed));
            if trimmed.is_empty() || duplicate {
                continue;
            }
            // Word boundaries that also hold for keywords ending in symbols ("C++").
            let pattern = format!(r"(?i)(?:^|\W){}(?:\W|$)", regex::escape(trimmed));
            let regex = Regex::new(&pattern).map_err(|e| {
                AdvisorError::Config(format!("Invalid keyword {:?}: {}", trimmed, e))
            })?;
            compiled.push((trimmed.to_string(), regex));
        }

        Ok(Self {
            keywords: compiled,
            classifier: None,
        })
    }

    pub fn with_classifier(mut self, classifier: IntentClassifier) -> Self {
        self.classifier = Some(classifier);
        self
    }

    /// Create an analyzer from configuration.
    ///
    /// Intent classification is skipped when no model is configured or the
    /// token is missing.
    pub fn from_settings(settings: &AnalysisSettings, timeout: Duration) -> Result<Self> {
        let analyzer = Self::new(&settings.keywords)?;

        let Some(model) = settings.intent_model.as_deref() else {
            return Ok(analyzer);
        };

        match api_key_from_env(INTENT_TOKEN_ENV) {
            Ok(token) => {
                let client = InferenceClient::new(&token, None, timeout)?;
                Ok(analyzer.with_classifier(IntentClassifier::new(
                    client,
                    model,
                    settings.intent_labels.clone(),
                )))
            }
            Err(e) => {
                warn!("Intent classification disabled: {}", e);
                Ok(analyzer)
            }
        }
    }

    /// Keywords present in the query as whole words or phrases.
    pub fn keywords(&self, query: &str) -> Vec<String> {
        self.keywords
            .iter()
            .filter(|(_, regex)| regex.is_match(query))
            .map(|(keyword, _)| keyword.clone())
            .collect()
    }

    pub async fn analyze(&self, query: &str) -> QueryAnalysis {
        let keywords = self.keywords(query);

        let intent = match &self.classifier {
            Some(classifier) => match classifier.classify(query).await {
                Ok(intent) => intent,
                Err(e) => {
                    warn!("Intent classification failed: {}", e);
                    None
                }
            },
            None => None,
        };

        debug!("Analysed query: intent={:?} keywords={:?}", intent, keywords);
        QueryAnalysis { intent, keywords }
    }
}
