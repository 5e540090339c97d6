use crate::config::AssistantConfig;
use crate::error::{CorepError, Result};
use crate::llm::oracle::Oracle;
use crate::llm::prompts::{Payload, SYSTEM_PROMPT};
use crate::llm::types::OracleResponse;
use log::debug;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const API_KEY_ENV: &str = "GROQ_API_KEY";

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    response_format: ResponseFormat,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Oracle backed by Groq's OpenAI-compatible chat completions API.
#[derive(Clone)]
pub struct GroqOracle {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f64,
}

impl GroqOracle {
    pub fn new(api_key: String, config: &AssistantConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }

    pub fn from_env(config: &AssistantConfig) -> Result<Self> {
        let api_key = std::env::var(API_KEY_ENV)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| CorepError::Transport(format!("{} is not set", API_KEY_ENV)))?;
        Self::new(api_key, config)
    }

    async fn chat(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: self.temperature,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        debug!("POST {} (model {})", url, self.model);
        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;
        completion_content(status, &body)
    }
}

/// Non-2xx statuses are transport failures; a 2xx body that is not a
/// completion with text content is a bad oracle response.
fn completion_content(status: StatusCode, body: &str) -> Result<String> {
    if !status.is_success() {
        return Err(CorepError::Transport(format!(
            "Groq API error (status {}): {}",
            status, body
        )));
    }

    let parsed: ChatCompletionResponse = serde_json::from_str(body).map_err(|e| {
        CorepError::OracleResponse(format!("unexpected completion envelope: {}", e))
    })?;

    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or_else(|| CorepError::OracleResponse("completion has no content".to_string()))
}

impl Oracle for GroqOracle {
    async fn complete(&self, payload: &Payload) -> Result<OracleResponse> {
        let content = self.chat(payload.as_str()).await?;
        OracleResponse::from_json_str(&content)
    }
}
