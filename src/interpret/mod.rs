// Instruction interpretation
//
// Turns a free-form prompt into a typed Instruction through an LLM:
// - Ollama: local /api/generate with JSON output format
// - OpenAi: any OpenAI-compatible chat completions endpoint

pub mod common;
pub mod ollama;
pub mod openai;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

pub use common::*;
use crate::config::{InterpreterBackend, InterpreterConfig};
use crate::error::Result;
use crate::instruction::Instruction;

/// Main trait for prompt interpretation
#[cfg_attr(test, automock)]
#[async_trait]
pub trait InstructionInterpreter: Send + Sync {
    /// Interpret a prompt into one instruction
    async fn interpret(&self, prompt: &str) -> Result<Instruction>;
}

/// Factory for creating interpreter instances
pub struct InterpreterFactory;

impl InterpreterFactory {
    /// Create an interpreter for the configured backend
    pub fn create_interpreter(config: InterpreterConfig) -> Result<Box<dyn InstructionInterpreter>> {
        match config.backend {
            InterpreterBackend::Ollama => Ok(Box::new(ollama::OllamaInterpreter::new(config)?)),
            InterpreterBackend::OpenAi => Ok(Box::new(openai::OpenAiInterpreter::new(config)?)),
        }
    }
}
