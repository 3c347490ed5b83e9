#![allow(dead_code)]

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

use kiru::config::Config;
use kiru::error::{KiruError, MediaFailure, Result};
use kiru::instruction::Instruction;
use kiru::interpret::InstructionInterpreter;
use kiru::media::{DrawTextSpec, MediaOperationProvider, MediaResult};
use kiru::workflow::Workflow;

/// Provider that writes placeholder files and records every call.
#[derive(Clone, Default)]
pub struct RecordingProvider {
    calls: Arc<Mutex<Vec<String>>>,
    delay: Option<Duration>,
    duration: f64,
}

impl RecordingProvider {
    pub fn new() -> Self {
        Self {
            duration: 100.0,
            ..Default::default()
        }
    }

    /// Every writing operation sleeps this long before finishing.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    async fn write(&self, call: String, output: &Path) -> MediaResult<()> {
        self.calls.lock().unwrap().push(call);
        tokio::fs::write(output, b"video")
            .await
            .map_err(|e| MediaFailure::new("write", e.to_string()))?;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }
}

#[async_trait]
impl MediaOperationProvider for RecordingProvider {
    async fn trim(&self, _input: &Path, start: f64, end: Option<f64>, output: &Path) -> MediaResult<()> {
        self.write(format!("trim {} {:?}", start, end), output).await
    }

    async fn concat(&self, inputs: &[PathBuf], output: &Path, _scratch: &Path) -> MediaResult<()> {
        self.write(format!("concat {}", inputs.len()), output).await
    }

    async fn probe_duration(&self, _input: &Path) -> MediaResult<f64> {
        self.calls.lock().unwrap().push("probe_duration".to_string());
        Ok(self.duration)
    }

    async fn probe_has_audio(&self, _input: &Path) -> MediaResult<bool> {
        self.calls.lock().unwrap().push("probe_has_audio".to_string());
        Ok(true)
    }

    async fn strip_audio(&self, _input: &Path, output: &Path) -> MediaResult<()> {
        self.write("strip_audio".to_string(), output).await
    }

    async fn add_silent_audio(&self, _input: &Path, output: &Path) -> MediaResult<()> {
        self.write("add_silent_audio".to_string(), output).await
    }

    async fn copy_streams(&self, _input: &Path, output: &Path) -> MediaResult<()> {
        self.write("copy_streams".to_string(), output).await
    }

    async fn change_speed(&self, _input: &Path, factor: f64, output: &Path) -> MediaResult<()> {
        self.write(format!("change_speed {}", factor), output).await
    }

    async fn draw_text(&self, _input: &Path, spec: &DrawTextSpec, output: &Path, _scratch: &Path) -> MediaResult<()> {
        self.write(format!("draw_text {}", spec.text), output).await
    }

    fn check_availability(&self) -> MediaResult<()> {
        Ok(())
    }
}

/// Interpreter that answers every prompt with a fixed reply.
pub struct ScriptedInterpreter {
    reply: std::result::Result<Instruction, String>,
}

impl ScriptedInterpreter {
    pub fn answering(instruction: Instruction) -> Self {
        Self { reply: Ok(instruction) }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
        }
    }
}

#[async_trait]
impl InstructionInterpreter for ScriptedInterpreter {
    async fn interpret(&self, _prompt: &str) -> Result<Instruction> {
        match &self.reply {
            Ok(instruction) => Ok(instruction.clone()),
            Err(message) => Err(KiruError::Interpretation(message.clone())),
        }
    }
}

/// Temporary directory holding inputs, outputs and scratch space.
pub struct Sandbox {
    pub dir: TempDir,
}

impl Sandbox {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn config(&self) -> Config {
        let mut config = Config::default();
        config.output.root = self.dir.path().join("output");
        config.output.scratch_dir = self.dir.path().join("scratch");
        config
    }

    pub fn input(&self, name: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, b"source").unwrap();
        path
    }

    pub fn output_files(&self) -> usize {
        std::fs::read_dir(self.dir.path().join("output"))
            .map(|entries| entries.count())
            .unwrap_or(0)
    }

    pub fn scratch_entries(&self) -> usize {
        std::fs::read_dir(self.dir.path().join("scratch"))
            .map(|entries| entries.count())
            .unwrap_or(0)
    }

    pub fn workflow(&self, interpreter: ScriptedInterpreter, provider: RecordingProvider) -> Workflow {
        self.workflow_with(self.config(), interpreter, provider)
    }

    pub fn workflow_with(
        &self,
        config: Config,
        interpreter: ScriptedInterpreter,
        provider: RecordingProvider,
    ) -> Workflow {
        Workflow::with_components(config, Box::new(interpreter), Box::new(provider)).unwrap()
    }
}
