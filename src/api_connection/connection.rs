use async_trait::async_trait;
use dotenv::dotenv;
use reqwest::Client;
use std::env;
use std::fmt;
use thiserror::Error;
use tracing::{debug, error};

use super::endpoints::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, PromptRequest, ProxyErrorBody,
};
use super::InferenceGateway;

#[derive(Debug, Error)]
pub enum ApiConnectionError {
    #[error("API key not found in environment: {0}")]
    MissingApiKey(String),
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("API error {status}: {message}")]
    ApiError {
        status: reqwest::StatusCode,
        message: String,
    },
    #[error("Completion contained no choice with text")]
    EmptyCompletion,
    /// Failure injected by an in-process gateway.
    #[error("{0}")]
    Scripted(String),
}

/// Reads a non-2xx body. Proxies answer `{"error": "..."}`; anything else is
/// passed through verbatim.
async fn error_from_response(response: reqwest::Response) -> ApiConnectionError {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to read error body".to_string());
    let message = match serde_json::from_str::<ProxyErrorBody>(&body) {
        Ok(parsed) => parsed.error,
        Err(_) => body,
    };
    error!(%status, %message, "inference gateway returned a failure status");
    ApiConnectionError::ApiError { status, message }
}

/// A present but blank answer is still an answer; only a missing choice or
/// `null` content counts as a failure.
fn completion_text(response: ChatCompletionResponse) -> Result<String, ApiConnectionError> {
    response
        .first_content()
        .map(str::to_string)
        .ok_or(ApiConnectionError::EmptyCompletion)
}

/// Bearer credential. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Gateway that talks to the prompt proxy. The proxy holds the upstream
/// credential; this client never sees it.
#[derive(Debug, Clone)]
pub struct ProxyGateway {
    client: Client,
    url: String,
}

impl ProxyGateway {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl InferenceGateway for ProxyGateway {
    async fn complete(&self, prompt: &str) -> Result<String, ApiConnectionError> {
        debug!(url = %self.url, "sending prompt to proxy");
        let response = self
            .client
            .post(&self.url)
            .json(&PromptRequest {
                prompt: prompt.to_string(),
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let body = response.text().await?;
        let completion: ChatCompletionResponse = serde_json::from_str(&body)?;
        completion_text(completion)
    }
}

/// Gateway that calls an OpenAI-compatible chat-completions endpoint
/// directly. A key given up front wins; otherwise the key variable is looked
/// up on every call so a `.env` edit is picked up without restarting.
#[derive(Debug, Clone)]
pub struct ChatCompletionGateway {
    client: Client,
    url: String,
    model: String,
    api_key_env_var: String,
    api_key: Option<ApiKey>,
}

impl ChatCompletionGateway {
    pub fn new(
        url: impl Into<String>,
        model: impl Into<String>,
        api_key_env_var: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
            model: model.into(),
            api_key_env_var: api_key_env_var.into(),
            api_key: None,
        }
    }

    pub fn with_api_key(mut self, api_key: ApiKey) -> Self {
        self.api_key = Some(api_key);
        self
    }

    fn resolve_api_key(&self) -> Result<String, ApiConnectionError> {
        if let Some(key) = &self.api_key {
            return Ok(key.expose().to_string());
        }
        dotenv().ok();
        env::var(&self.api_key_env_var)
            .map_err(|_| ApiConnectionError::MissingApiKey(self.api_key_env_var.clone()))
    }
}

#[async_trait]
impl InferenceGateway for ChatCompletionGateway {
    async fn complete(&self, prompt: &str) -> Result<String, ApiConnectionError> {
        let api_key = self.resolve_api_key()?;

        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::user(prompt)],
            temperature: None,
            max_tokens: None,
        };

        debug!(url = %self.url, model = %self.model, "sending chat completion");
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let completion = response.json::<ChatCompletionResponse>().await?;
        completion_text(completion)
    }
}
