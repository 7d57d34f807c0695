use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, warn};

use super::{SuggestionError, SuggestionProvider, SuggestionSettings};

const DEFAULT_ENDPOINT: &str = "https://api.groq.com/openai";
const DEFAULT_MODEL: &str = "llama-3.1-8b-instant";
const DEFAULT_TIMEOUT_SECS: u64 = 60;
const INITIAL_BACKOFF: Duration = Duration::from_millis(200);
const MAX_BACKOFF: Duration = Duration::from_secs(5);

/// Chat-completions client for any OpenAI-compatible endpoint (Groq by default).
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleClient {
    http: Client,
    url: String,
    api_key: String,
    model: String,
    max_retries: u32,
}

impl OpenAiCompatibleClient {
    pub fn new(settings: &SuggestionSettings) -> Result<Self> {
        if settings.api_key.trim().is_empty() {
            return Err(SuggestionError::MissingApiKey(SuggestionSettings::API_KEY_ENV).into());
        }
        let base = settings.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT);
        let url = format!("{}/v1/chat/completions", base.trim_end_matches('/'));
        let http = Client::builder()
            .user_agent("adgm-review/0.3")
            .timeout(Duration::from_secs(
                settings.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            ))
            .build()
            .context("failed to build suggestion service HTTP client")?;
        Ok(Self {
            http,
            url,
            api_key: settings.api_key.clone(),
            model: settings
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            max_retries: settings.max_retries,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl SuggestionProvider for OpenAiCompatibleClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let payload = ChatCompletionRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: 0.2,
            max_tokens: 600,
        };

        let mut attempt = 0u32;
        let mut backoff = INITIAL_BACKOFF;
        loop {
            let response = self
                .http
                .post(&self.url)
                .bearer_auth(&self.api_key)
                .json(&payload)
                .send()
                .await;

            let response = match response {
                Ok(resp) => resp,
                Err(err) => {
                    if attempt >= self.max_retries {
                        return Err(err).context("failed to call chat completions API");
                    }
                    warn!(attempt, error = %err, "suggestion request failed; retrying");
                    sleep(backoff).await;
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                    attempt += 1;
                    continue;
                }
            };

            let status = response.status();
            if !status.is_success() {
                if !is_retryable(status) || attempt >= self.max_retries {
                    let body = response.text().await.unwrap_or_default();
                    return Err(SuggestionError::Status {
                        status: status.as_u16(),
                        body,
                    }
                    .into());
                }
                warn!(attempt, %status, "suggestion service returned an error; retrying");
                sleep(backoff).await;
                backoff = (backoff * 2).min(MAX_BACKOFF);
                attempt += 1;
                continue;
            }

            let chat: ChatCompletionResponse = response
                .json()
                .await
                .context("failed to parse chat completions response")?;
            debug!(attempt, "suggestion service responded");
            return chat
                .choices
                .into_iter()
                .find_map(|choice| choice.message.content)
                .ok_or_else(|| SuggestionError::MissingContent.into());
        }
    }
}

/// Rate limiting and server errors are transient; other client errors are final.
fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn settings(url: String, max_retries: u32) -> SuggestionSettings {
        SuggestionSettings {
            provider: "openai".into(),
            api_key: "test-key".into(),
            endpoint: Some(url),
            model: Some("llama-test".into()),
            timeout_secs: Some(5),
            max_retries,
        }
    }

    #[test]
    fn requires_api_key() {
        let mut settings = settings("http://localhost".into(), 0);
        settings.api_key = "  ".into();
        let err = OpenAiCompatibleClient::new(&settings).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SuggestionError>(),
            Some(SuggestionError::MissingApiKey(_))
        ));
    }

    #[test]
    fn defaults_model_when_unset() {
        let mut settings = settings("http://localhost".into(), 0);
        settings.model = None;
        let client = OpenAiCompatibleClient::new(&settings).unwrap();
        assert_eq!(client.model(), DEFAULT_MODEL);
    }

    #[tokio::test]
    async fn returns_message_content() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/chat/completions")
                    .header("authorization", "Bearer test-key")
                    .json_body_partial(r#"{"model": "llama-test"}"#);
                then.status(200).json_body(json!({
                    "choices": [{"message": {"role": "assistant", "content": "[{\"issue\": \"Jurisdiction\"}]"}}]
                }));
            })
            .await;

        let client = OpenAiCompatibleClient::new(&settings(server.base_url(), 0)).unwrap();
        let content = client.complete("prompt").await.unwrap();
        mock.assert_async().await;
        assert_eq!(content, "[{\"issue\": \"Jurisdiction\"}]");
    }

    #[tokio::test]
    async fn retries_then_reports_status() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(503).body("overloaded");
            })
            .await;

        let client = OpenAiCompatibleClient::new(&settings(server.base_url(), 2)).unwrap();
        let err = client.complete("prompt").await.unwrap_err();
        mock.assert_hits_async(3).await;
        match err.downcast_ref::<SuggestionError>() {
            Some(SuggestionError::Status { status, body }) => {
                assert_eq!(*status, 503);
                assert_eq!(body, "overloaded");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(401).body("invalid api key");
            })
            .await;

        let client = OpenAiCompatibleClient::new(&settings(server.base_url(), 2)).unwrap();
        let err = client.complete("prompt").await.unwrap_err();
        mock.assert_hits_async(1).await;
        match err.downcast_ref::<SuggestionError>() {
            Some(SuggestionError::Status { status, body }) => {
                assert_eq!(*status, 401);
                assert_eq!(body, "invalid api key");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn rate_limits_are_retried() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(429).body("slow down");
            })
            .await;

        let client = OpenAiCompatibleClient::new(&settings(server.base_url(), 1)).unwrap();
        let err = client.complete("prompt").await.unwrap_err();
        mock.assert_hits_async(2).await;
        assert!(matches!(
            err.downcast_ref::<SuggestionError>(),
            Some(SuggestionError::Status { status: 429, .. })
        ));
    }

    #[test]
    fn retry_policy_covers_rate_limits_and_server_errors() {
        assert!(is_retryable(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable(StatusCode::BAD_GATEWAY));
        assert!(!is_retryable(StatusCode::UNAUTHORIZED));
        assert!(!is_retryable(StatusCode::BAD_REQUEST));
    }

    #[tokio::test]
    async fn missing_content_is_an_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(200)
                    .json_body(json!({"choices": [{"message": {"content": null}}]}));
            })
            .await;

        let client = OpenAiCompatibleClient::new(&settings(server.base_url(), 0)).unwrap();
        let err = client.complete("prompt").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SuggestionError>(),
            Some(SuggestionError::MissingContent)
        ));
    }
}
