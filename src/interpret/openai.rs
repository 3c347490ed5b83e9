// OpenAI-compatible chat completions backend

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{common, InstructionInterpreter};
use crate::config::InterpreterConfig;
use crate::error::{KiruError, Result};
use crate::instruction::Instruction;

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

pub struct OpenAiInterpreter {
    client: Client,
    config: InterpreterConfig,
    api_key: Option<String>,
}

impl OpenAiInterpreter {
    pub fn new(config: InterpreterConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let api_key = std::env::var(&config.api_key_env).ok().filter(|k| !k.is_empty());
        if api_key.is_none() {
            warn!("{} is not set; sending unauthenticated requests", config.api_key_env);
        }

        Ok(Self { client, config, api_key })
    }
}

#[async_trait]
impl InstructionInterpreter for OpenAiInterpreter {
    async fn interpret(&self, prompt: &str) -> Result<Instruction> {
        let body = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: common::system_prompt(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: common::user_prompt(prompt),
                },
            ],
            temperature: self.config.temperature,
        };

        debug!("Sending chat completion request to: {}", self.config.endpoint);

        let mut request = self.client.post(&self.config.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| KiruError::Interpretation(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(KiruError::Interpretation(format!("HTTP {}: {}", status, text)));
        }

        let parsed: ChatResponse = response.json().await
            .map_err(|e| KiruError::Interpretation(format!("Failed to parse response: {}", e)))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| KiruError::Interpretation("response has no message content".to_string()))?;

        let instruction = common::parse_reply(&content)?;
        info!("Interpreted prompt as {}", instruction.action());
        Ok(instruction)
    }
}
