//! OpenRouter (OpenAI-compatible) chat-completions client.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;
use crate::error::GatewayError;
use crate::llm::{
    ChatMessage, CompletionRequest, LlmProvider, redact_sensitive_detail, truncate_detail,
};

const PROVIDER: &str = "openrouter";
const MAX_ERROR_BODY_CHARS: usize = 512;

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatCompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChoice {
    message: ChatCompletionMessage,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionMessage {
    content: Option<String>,
}

/// Chat-completion provider speaking the OpenAI wire format.
pub struct OpenRouterProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<SecretString>,
    model: String,
    referer: String,
    title: String,
    temperature: f32,
    timeout: Duration,
    max_retries: u32,
    retry_backoff: Duration,
}

impl OpenRouterProvider {
    pub fn new(config: &LlmConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: config.completions_url(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            referer: config.referer.clone(),
            title: config.title.clone(),
            temperature: config.temperature,
            timeout: config.timeout,
            max_retries: config.max_retries,
            retry_backoff: config.retry_backoff,
        }
    }

    async fn send_once(
        &self,
        api_key: &SecretString,
        model: &str,
        messages: Vec<ChatMessage>,
    ) -> Result<String, GatewayError> {
        let body = ChatCompletionRequest {
            model,
            messages,
            temperature: self.temperature,
        };

        let send = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key.expose_secret())
            .header("HTTP-Referer", &self.referer)
            .header("X-Title", &self.title)
            .json(&body)
            .send();

        let response = tokio::time::timeout(self.timeout, send)
            .await
            .map_err(|_| GatewayError::Timeout {
                provider: PROVIDER.to_string(),
                timeout: self.timeout,
            })?
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    GatewayError::RequestFailed {
                        provider: PROVIDER.to_string(),
                        reason: redact_sensitive_detail(&e.to_string()),
                    }
                } else {
                    GatewayError::Http(e)
                }
            })?;

        let status = response.status();
        let text = tokio::time::timeout(self.timeout, response.text())
            .await
            .map_err(|_| GatewayError::Timeout {
                provider: PROVIDER.to_string(),
                timeout: self.timeout,
            })??;

        if !status.is_success() {
            return Err(GatewayError::HttpStatus {
                provider: PROVIDER.to_string(),
                status: status.as_u16(),
                body: truncate_detail(&redact_sensitive_detail(&text), MAX_ERROR_BODY_CHARS),
            });
        }

        parse_completion(&text)
    }
}

#[async_trait]
impl LlmProvider for OpenRouterProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn default_model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, GatewayError> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| GatewayError::MissingCredential {
                provider: PROVIDER.to_string(),
            })?;
        let model = request.model.clone().unwrap_or_else(|| self.model.clone());

        let mut attempt: u32 = 0;
        loop {
            match self.send_once(api_key, &model, request.messages()).await {
                Ok(content) => {
                    tracing::debug!(provider = PROVIDER, model = %model, attempt, "completion received");
                    return Ok(content);
                }
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    let delay = self.retry_backoff * 2u32.saturating_pow(attempt);
                    tracing::warn!(
                        provider = PROVIDER,
                        model = %model,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "transient gateway failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::warn!(provider = PROVIDER, model = %model, attempt, error = %e, "gateway call failed");
                    return Err(e);
                }
            }
        }
    }
}

/// Extract `choices[0].message.content` from a chat-completions body.
pub(crate) fn parse_completion(body: &str) -> Result<String, GatewayError> {
    let parsed: ChatCompletionResponse =
        serde_json::from_str(body).map_err(|e| GatewayError::InvalidResponse {
            provider: PROVIDER.to_string(),
            reason: e.to_string(),
        })?;

    let content = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .unwrap_or_default();

    if content.trim().is_empty() {
        return Err(GatewayError::EmptyCompletion {
            provider: PROVIDER.to_string(),
        });
    }
    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_first_choice_content() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"hello"}},{"message":{"content":"second"}}]}"#;
        assert_eq!(parse_completion(body).unwrap(), "hello");
    }

    #[test]
    fn empty_choices_are_an_empty_completion() {
        let err = parse_completion(r#"{"choices":[]}"#).unwrap_err();
        assert!(matches!(err, GatewayError::EmptyCompletion { .. }));

        let err = parse_completion(r#"{"choices":[{"message":{"content":null}}]}"#).unwrap_err();
        assert!(matches!(err, GatewayError::EmptyCompletion { .. }));
    }

    #[test]
    fn non_json_body_is_invalid() {
        let err = parse_completion("<html>bad gateway</html>").unwrap_err();
        assert!(matches!(err, GatewayError::InvalidResponse { .. }));
    }

    #[tokio::test]
    async fn missing_credential_fails_without_network() {
        let provider = OpenRouterProvider::new(&LlmConfig::default());
        let err = provider
            .complete(CompletionRequest::new("sys", "hello"))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::MissingCredential { .. }));
        assert_eq!(provider.default_model(), crate::config::DEFAULT_LLM_MODEL);
    }
}
