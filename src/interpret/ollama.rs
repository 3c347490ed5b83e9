use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use super::{common, InstructionInterpreter};
use crate::config::InterpreterConfig;
use crate::error::{KiruError, Result};
use crate::instruction::Instruction;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub model: String,
    pub system: String,
    pub prompt: String,
    pub stream: bool,
    pub format: String,
    pub options: GenerateOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateOptions {
    pub temperature: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub response: String,
    pub done: bool,
}

/// Interpreter backed by a local Ollama server
pub struct OllamaInterpreter {
    client: Client,
    config: InterpreterConfig,
}

impl OllamaInterpreter {
    pub fn new(config: InterpreterConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    fn generate_url(&self) -> String {
        format!("{}/api/generate", self.config.endpoint.trim_end_matches('/'))
    }
}

#[async_trait]
impl InstructionInterpreter for OllamaInterpreter {
    async fn interpret(&self, prompt: &str) -> Result<Instruction> {
        let request = GenerateRequest {
            model: self.config.model.clone(),
            system: common::system_prompt(),
            prompt: common::user_prompt(prompt),
            stream: false,
            format: "json".to_string(),
            options: GenerateOptions {
                temperature: self.config.temperature,
            },
        };

        let url = self.generate_url();
        debug!("Sending interpretation request to: {}", url);

        let response = self.client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| KiruError::Interpretation(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(KiruError::Interpretation(format!(
                "Ollama API error {}: {}", status, error_text
            )));
        }

        let generated: GenerateResponse = response.json().await
            .map_err(|e| KiruError::Interpretation(format!("Failed to parse response: {}", e)))?;

        let instruction = common::parse_reply(generated.response.trim())?;
        info!("Interpreted prompt as {}", instruction.action());
        Ok(instruction)
    }
}
