//! Minimal client for the HuggingFace inference API.
//!
//! Shared by the embedding, generation and query-analysis backends. Every
//! endpoint takes a JSON body, authenticates with a bearer token and answers
//! with either a pipeline-specific payload or `{"error": "..."}`.

use crate::error::{AdvisorError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Default base URL for hosted inference.
pub const DEFAULT_API_BASE: &str = "https://router.huggingface.co/hf-inference/models";

/// Error body returned by the inference API.
#[derive(Debug, Deserialize)]
pub struct ApiError {
    pub error: String,
    #[serde(default)]
    pub estimated_time: Option<f32>,
}

/// Authenticated HTTP client for inference endpoints.
#[derive(Debug, Clone)]
pub struct InferenceClient {
    http: reqwest::Client,
    base: Url,
    token: String,
}

impl InferenceClient {
    /// Create a client. `api_base` of `None` uses [`DEFAULT_API_BASE`].
    pub fn new(token: &str, api_base: Option<&str>, timeout: Duration) -> Result<Self> {
        let base = api_base.unwrap_or(DEFAULT_API_BASE);
        let base = Url::parse(base.trim_end_matches('/'))
            .map_err(|e| AdvisorError::Config(format!("Invalid API base {}: {}", base, e)))?;
        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            base,
            token: token.to_string(),
        })
    }

    /// URL for a model, optionally pinned to a pipeline task.
    pub fn endpoint(&self, model: &str, pipeline: Option<&str>) -> Result<Url> {
        let mut path = format!("{}/{}", self.base.as_str().trim_end_matches('/'), model);
        if let Some(task) = pipeline {
            path.push_str("/pipeline/");
            path.push_str(task);
        }
        Url::parse(&path).map_err(|e| AdvisorError::Config(format!("Invalid endpoint: {}", e)))
    }

    /// POST a JSON body and decode the typed response.
    ///
    /// Transport failures and non-success statuses are wrapped with
    /// `on_backend`; 401/403 become authentication errors and an undecodable
    /// success body becomes a malformed-response error.
    pub async fn post<B, R>(
        &self,
        url: Url,
        body: &B,
        on_backend: fn(String) -> AdvisorError,
    ) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        debug!("POST {}", url);

        let response = self
            .http
            .post(url)
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await
            .map_err(|e| on_backend(e.to_string()))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| on_backend(e.to_string()))?;

        if status.as_u16() == 401 || status.as_u16() == 403 {
            let message = serde_json::from_slice::<ApiError>(&bytes)
                .map(|e| e.error)
                .unwrap_or_else(|_| status.to_string());
            return Err(AdvisorError::Authentication(message));
        }

        if !status.is_success() {
            let message = match serde_json::from_slice::<ApiError>(&bytes) {
                Ok(ApiError {
                    error,
                    estimated_time: Some(eta),
                }) => format!("{} (model loading, ~{:.0}s)", error, eta),
                Ok(ApiError { error, .. }) => error,
                Err(_) => String::from_utf8_lossy(&bytes).into_owned(),
            };
            return Err(on_backend(format!("{}: {}", status, message)));
        }

        serde_json::from_slice::<R>(&bytes)
            .map_err(|e| AdvisorError::MalformedResponse(format!("{}: {}", e, preview(&bytes))))
    }
}

fn preview(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    text.chars().take(120).collect()
}
