use serde::{Deserialize, Serialize};

use crate::config::LLMConfig;

pub const DIAGNOSIS_PERSONA: &str =
    "You are a medical assistant helping patients identify diseases. You have to be brief in conversations.";
pub const ADVICE_PERSONA: &str = "You are a medical assistant providing health advice.";
pub const CHAT_PERSONA: &str = "You are Virtual Doctor, a friendly health assistant. \
Answer general health questions clearly and briefly, and recommend seeing a doctor for anything serious.";

const MOCK_RESPONSE: &str = "Mock LLM response";

/// Ollama chat client. One request per call, no retries.
#[derive(Debug, Clone)]
pub struct LlmProvider {
    config: LLMConfig,
    client: reqwest::Client,
}

impl LlmProvider {
    pub fn new(config: &LLMConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            config: config.clone(),
            client,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub async fn chat(&self, messages: Vec<ChatMessage>) -> Result<String, LlmError> {
        if !self.config.enabled {
            return Err(LlmError::Disabled);
        }
        if self.config.mock {
            return Ok(MOCK_RESPONSE.to_string());
        }

        let url = format!("{}/api/chat", self.config.api_url.trim_end_matches('/'));
        let body = OllamaChatRequest {
            model: &self.config.model,
            messages: &messages,
            stream: false,
        };

        let mut request = self.client.post(&url).json(&body);
        if !self.config.api_key.is_empty() {
            request = request.bearer_auth(&self.config.api_key);
        }

        let started = std::time::Instant::now();
        let response = request.send().await.map_err(LlmError::from_reqwest)?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "LLM request rejected");
            return Err(LlmError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: OllamaChatResponse = response.json().await.map_err(LlmError::from_reqwest)?;
        tracing::debug!(
            model = %self.config.model,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "LLM request completed"
        );
        Ok(parsed.message.content)
    }

    /// Likely disease for a free-text symptom description.
    pub async fn diagnose(&self, symptoms: &str) -> Result<String, LlmError> {
        self.chat(vec![
            ChatMessage::system(DIAGNOSIS_PERSONA),
            ChatMessage::user(format!(
                "I have these symptoms: {symptoms}. What is the possible disease?"
            )),
        ])
        .await
    }

    /// Precautions for taking `medicine`.
    pub async fn advise(&self, medicine: &str) -> Result<String, LlmError> {
        self.chat(vec![
            ChatMessage::system(ADVICE_PERSONA),
            ChatMessage::user(format!(
                "What precautions should I take while using {medicine}?"
            )),
        ])
        .await
    }

    pub async fn converse(&self, message: &str) -> Result<String, LlmError> {
        self.chat(vec![
            ChatMessage::system(CHAT_PERSONA),
            ChatMessage::user(message),
        ])
        .await
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: ChatMessage,
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("llm is disabled")]
    Disabled,
    #[error("llm request timed out")]
    Timeout,
    #[error("llm network error: {0}")]
    Network(String),
    #[error("llm api error: status={status}, message={message}")]
    ApiError { status: u16, message: String },
}

impl LlmError {
    fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_decode() {
            Self::ApiError {
                status: 502,
                message: format!("unexpected response body: {e}"),
            }
        } else {
            Self::Network(e.to_string())
        }
    }
}
