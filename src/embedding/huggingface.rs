//! HuggingFace feature-extraction embeddings.

use super::Embedder;
use crate::error::{AdvisorError, Result};
use crate::huggingface::InferenceClient;
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, instrument};

#[derive(Serialize)]
struct FeatureExtractionRequest<'a> {
    inputs: &'a [String],
    options: InferenceOptions,
}

#[derive(Serialize)]
struct InferenceOptions {
    wait_for_model: bool,
}

/// Sentence embeddings from a hosted sentence-transformers model.
pub struct HuggingFaceEmbedder {
    client: InferenceClient,
    model: String,
    dimensions: usize,
}

impl HuggingFaceEmbedder {
    /// Create an embedder for `model` (e.g. `sentence-transformers/all-MiniLM-L6-v2`).
    pub fn new(
        model: &str,
        dimensions: usize,
        api_key: &str,
        api_base: Option<&str>,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            client: InferenceClient::new(api_key, api_base, timeout)?,
            model: model.to_string(),
            dimensions,
        })
    }
}

#[async_trait]
impl Embedder for HuggingFaceEmbedder {
    #[instrument(skip(self, text))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.embed_batch(&[text.to_string()]).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| AdvisorError::MalformedResponse("Empty embedding response".to_string()))
    }

    #[instrument(skip(self, texts), fields(count = texts.len(), model = %self.model))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = self.client.endpoint(&self.model, Some("feature-extraction"))?;
        let request = FeatureExtractionRequest {
            inputs: texts,
            options: InferenceOptions {
                wait_for_model: true,
            },
        };

        let vectors: Vec<Vec<f32>> = self
            .client
            .post(url, &request, AdvisorError::EmbeddingBackend)
            .await?;

        if vectors.len() != texts.len() {
            return Err(AdvisorError::MalformedResponse(format!(
                "Requested {} embeddings, received {}",
                texts.len(),
                vectors.len()
            )));
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dimensions) {
            return Err(AdvisorError::DimensionMismatch {
                expected: self.dimensions,
                actual: bad.len(),
            });
        }

        debug!("Generated {} embeddings", vectors.len());
        Ok(vectors)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";

    fn embedder(server: &MockServer, dimensions: usize) -> HuggingFaceEmbedder {
        HuggingFaceEmbedder::new(
            MODEL,
            dimensions,
            "hf_test",
            Some(&server.uri()),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_embed_batch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("/{}/pipeline/feature-extraction", MODEL)))
            .and(header("authorization", "Bearer hf_test"))
            .and(body_json(json!({
                "inputs": ["a", "b"],
                "options": {"wait_for_model": true}
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([[0.1, 0.2, 0.3], [0.4, 0.5, 0.6]])),
            )
            .mount(&server)
            .await;

        let vectors = embedder(&server, 3)
            .embed_batch(&["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[1], vec![0.4, 0.5, 0.6]);
    }

    #[tokio::test]
    async fn test_wrong_dimension_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([[0.1, 0.2]])))
            .mount(&server)
            .await;

        let err = embedder(&server, 384).embed("query").await.unwrap_err();
        assert!(matches!(
            err,
            AdvisorError::DimensionMismatch { expected: 384, actual: 2 }
        ));
    }

    #[tokio::test]
    async fn test_empty_batch_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        assert!(embedder(&server, 3).embed_batch(&[]).await.unwrap().is_empty());
    }
}
