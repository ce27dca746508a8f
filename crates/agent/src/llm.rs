use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use procura_core::config::{LlmConfig, LlmProvider};

const DEFAULT_OPENAI_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_ANTHROPIC_BASE: &str = "https://api.anthropic.com";
const DEFAULT_OLLAMA_BASE: &str = "http://localhost:11434";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const ANTHROPIC_MAX_TOKENS: u32 = 1024;

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("completion request timed out")]
    Timeout,
    #[error("completion transport error: {0}")]
    Transport(String),
    #[error("completion provider error: {0}")]
    Provider(String),
}

impl CompletionError {
    /// Transport-level failures are worth one automatic retry. Timeouts
    /// are not; the request already spent the full timeout budget, and
    /// retrying would double worst-case turn latency. Provider rejections
    /// (auth, bad model, malformed request) would fail identically again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

/// A single non-streaming completion round trip. The system instruction
/// and the transcript travel separately so each provider can map them
/// onto its own wire shape.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, CompletionError>;
}

/// Production client over the configured provider's HTTP API. Requests
/// carry a bounded timeout; transport failures get at most one retry.
pub struct HttpCompletionClient {
    client: reqwest::Client,
    provider: LlmProvider,
    base_url: String,
    model: String,
    api_key: Option<SecretString>,
    max_retries: u32,
}

impl HttpCompletionClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self, CompletionError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| {
                CompletionError::Provider(format!("failed to build HTTP client: {err}"))
            })?;

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| {
                match config.provider {
                    LlmProvider::OpenAi => DEFAULT_OPENAI_BASE,
                    LlmProvider::Anthropic => DEFAULT_ANTHROPIC_BASE,
                    LlmProvider::Ollama => DEFAULT_OLLAMA_BASE,
                }
                .to_string()
            })
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client,
            provider: config.provider,
            base_url,
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            max_retries: config.max_retries,
        })
    }

    async fn complete_once(&self, system: &str, prompt: &str) -> Result<String, CompletionError> {
        match self.provider {
            LlmProvider::OpenAi => self.complete_openai(system, prompt).await,
            LlmProvider::Anthropic => self.complete_anthropic(system, prompt).await,
            LlmProvider::Ollama => self.complete_ollama(system, prompt).await,
        }
    }

    async fn complete_openai(&self, system: &str, prompt: &str) -> Result<String, CompletionError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = OpenAiRequest {
            model: &self.model,
            messages: vec![
                WireMessage { role: "system", content: system },
                WireMessage { role: "user", content: prompt },
            ],
        };

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key.expose_secret());
        }

        let response = request.send().await.map_err(|err| self.transport_error(err))?;
        let response = check_status("OpenAI", response).await?;
        let parsed: OpenAiResponse = response.json().await.map_err(|err| {
            CompletionError::Provider(format!("failed to parse OpenAI response: {err}"))
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| CompletionError::Provider("OpenAI returned no choices".to_string()))
    }

    async fn complete_anthropic(
        &self,
        system: &str,
        prompt: &str,
    ) -> Result<String, CompletionError> {
        let url = format!("{}/v1/messages", self.base_url);
        let body = AnthropicRequest {
            model: &self.model,
            max_tokens: ANTHROPIC_MAX_TOKENS,
            system,
            messages: vec![WireMessage { role: "user", content: prompt }],
        };

        let mut request =
            self.client.post(&url).json(&body).header("anthropic-version", ANTHROPIC_VERSION);
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key.expose_secret());
        }

        let response = request.send().await.map_err(|err| self.transport_error(err))?;
        let response = check_status("Anthropic", response).await?;
        let parsed: AnthropicResponse = response.json().await.map_err(|err| {
            CompletionError::Provider(format!("failed to parse Anthropic response: {err}"))
        })?;

        parsed
            .content
            .into_iter()
            .find_map(|block| block.text)
            .ok_or_else(|| {
                CompletionError::Provider("Anthropic returned no text content".to_string())
            })
    }

    async fn complete_ollama(&self, system: &str, prompt: &str) -> Result<String, CompletionError> {
        let url = format!("{}/api/chat", self.base_url);
        let body = OllamaRequest {
            model: &self.model,
            messages: vec![
                WireMessage { role: "system", content: system },
                WireMessage { role: "user", content: prompt },
            ],
            stream: false,
        };

        let response =
            self.client.post(&url).json(&body).send().await.map_err(|err| {
                if err.is_connect() {
                    CompletionError::Transport(format!(
                        "failed to connect to Ollama at {}. Is Ollama running?",
                        self.base_url
                    ))
                } else {
                    self.transport_error(err)
                }
            })?;
        let response = check_status("Ollama", response).await?;
        let parsed: OllamaResponse = response.json().await.map_err(|err| {
            CompletionError::Provider(format!("failed to parse Ollama response: {err}"))
        })?;

        Ok(parsed.message.content)
    }

    fn transport_error(&self, err: reqwest::Error) -> CompletionError {
        if err.is_timeout() {
            CompletionError::Timeout
        } else {
            CompletionError::Transport(format!("request to {} failed: {err}", self.base_url))
        }
    }
}

async fn check_status(
    provider: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, CompletionError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(CompletionError::Provider(format!("{provider} API error ({status}): {body}")))
}

#[async_trait]
impl CompletionClient for HttpCompletionClient {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, CompletionError> {
        let mut attempt = 0;
        loop {
            debug!(provider = ?self.provider, model = %self.model, attempt, "completion request");
            match self.complete_once(system, prompt).await {
                Ok(text) => return Ok(text),
                Err(err) if err.is_retryable() && attempt < self.max_retries => {
                    warn!(error = %err, attempt, "retrying completion after transport failure");
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiChoiceMessage,
}

#[derive(Deserialize)]
struct OpenAiChoiceMessage {
    content: String,
}

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<WireMessage<'a>>,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicBlock>,
}

#[derive(Deserialize)]
struct AnthropicBlock {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    stream: bool,
}

#[derive(Deserialize)]
struct OllamaResponse {
    message: OllamaResponseMessage,
}

#[derive(Deserialize)]
struct OllamaResponseMessage {
    content: String,
}
