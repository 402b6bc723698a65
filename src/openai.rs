//! Client construction for OpenAI-compatible APIs (OpenAI, Groq).

use crate::error::{AdvisorError, Result};
use async_openai::error::OpenAIError;
use async_openai::{config::OpenAIConfig, Client};
use backoff::ExponentialBackoffBuilder;
use std::time::Duration;

/// Default timeout for API requests.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Create a client for an OpenAI-compatible endpoint.
///
/// `api_base` of `None` keeps the OpenAI default. The client's own
/// rate-limit retries are disabled; callers retry through
/// [`RetryPolicy`](crate::retry::RetryPolicy).
pub fn create_client(
    api_key: &str,
    api_base: Option<&str>,
    timeout: Duration,
) -> Result<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder().timeout(timeout).build()?;

    let mut config = OpenAIConfig::new().with_api_key(api_key);
    if let Some(base) = api_base {
        config = config.with_api_base(base.trim_end_matches('/'));
    }

    let no_retries = ExponentialBackoffBuilder::new()
        .with_max_elapsed_time(Some(Duration::ZERO))
        .build();

    Ok(Client::with_config(config)
        .with_http_client(http_client)
        .with_backoff(no_retries))
}

/// Map a client error onto the library taxonomy.
///
/// `on_backend` wraps transient failures in the caller's backend variant.
pub fn classify_error(error: OpenAIError, on_backend: fn(String) -> AdvisorError) -> AdvisorError {
    match error {
        OpenAIError::ApiError(api) => {
            let auth = api.code.as_deref() == Some("invalid_api_key")
                || api.message.to_lowercase().contains("api key");
            if auth {
                AdvisorError::Authentication(api.message)
            } else {
                on_backend(api.message)
            }
        }
        OpenAIError::Reqwest(e) => match e.status() {
            Some(status) if status.as_u16() == 401 || status.as_u16() == 403 => {
                AdvisorError::Authentication(e.to_string())
            }
            _ => on_backend(e.to_string()),
        },
        OpenAIError::JSONDeserialize(e) => AdvisorError::MalformedResponse(e.to_string()),
        other => on_backend(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_openai::error::ApiError;

    fn api_error(message: &str, code: Option<&str>) -> OpenAIError {
        OpenAIError::ApiError(ApiError {
            message: message.to_string(),
            r#type: Some("invalid_request_error".to_string()),
            param: None,
            code: code.map(str::to_string),
        })
    }

    #[test]
    fn test_invalid_key_is_authentication() {
        let err = classify_error(
            api_error("Invalid API Key", Some("invalid_api_key")),
            AdvisorError::GenerationBackend,
        );
        assert!(matches!(err, AdvisorError::Authentication(_)));
    }

    #[test]
    fn test_other_api_errors_use_backend_variant() {
        let err = classify_error(
            api_error("model is overloaded", None),
            AdvisorError::EmbeddingBackend,
        );
        assert!(matches!(err, AdvisorError::EmbeddingBackend(_)));
        assert!(err.is_transient());
    }

    #[test]
    fn test_create_client_with_custom_base() {
        let client = create_client(
            "test-key",
            Some("https://api.groq.com/openai/v1/"),
            Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        );
        assert!(client.is_ok());
    }
}
