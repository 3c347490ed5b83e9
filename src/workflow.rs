use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{KiruError, Result};
use crate::executor::{ActionExecutor, ExecutionOutcome};
use crate::interpret::{InstructionInterpreter, InterpreterFactory};
use crate::media::{MediaOperationProvider, MediaProviderFactory};
use crate::registry::OutputRegistry;

/// Prompt in, artifacts out: interpreter, validator and executor wired together.
pub struct Workflow {
    config: Config,
    interpreter: Box<dyn InstructionInterpreter>,
    executor: ActionExecutor,
}

impl Workflow {
    pub fn new(config: Config) -> Result<Self> {
        let interpreter = InterpreterFactory::create_interpreter(config.interpreter.clone())?;
        let provider = MediaProviderFactory::create_provider(config.media.clone());

        // Check dependencies
        provider
            .check_availability()
            .map_err(|e| KiruError::Config(e.to_string()))?;

        Self::with_components(config, interpreter, provider)
    }

    /// Build a workflow around explicit collaborators.
    pub fn with_components(
        config: Config,
        interpreter: Box<dyn InstructionInterpreter>,
        provider: Box<dyn MediaOperationProvider>,
    ) -> Result<Self> {
        let registry = OutputRegistry::new(&config.output.root, &config.output.extension)?;
        let executor = ActionExecutor::new(
            provider,
            registry,
            config.overlay.clone(),
            config.output.scratch_dir.clone(),
        );

        Ok(Self {
            config,
            interpreter,
            executor,
        })
    }

    pub fn registry(&self) -> &OutputRegistry {
        self.executor.registry()
    }

    /// Interpret a prompt and run the resulting plan on the given inputs.
    pub async fn process(&self, prompt: &str, inputs: &[PathBuf]) -> Result<ExecutionOutcome> {
        info!("Processing prompt against {} input(s)", inputs.len());

        let instruction = self.interpreter.interpret(prompt).await?;
        info!("Instruction: {:?}", instruction);

        let execution = self.executor.execute(&instruction, inputs);
        let outcome = match self.config.output.plan_timeout_secs {
            Some(secs) => tokio::time::timeout(Duration::from_secs(secs), execution)
                .await
                .map_err(|_| {
                    warn!("Plan for {} exceeded {}s, cancelled", instruction.action(), secs);
                    KiruError::Timeout(secs)
                })??,
            None => execution.await?,
        };

        info!("Produced {} artifact(s)", outcome.artifacts.len());
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpret::MockInstructionInterpreter;
    use crate::media::MockMediaOperationProvider;

    fn config_in(dir: &std::path::Path) -> Config {
        let mut config = Config::default();
        config.output.root = dir.join("output");
        config.output.scratch_dir = dir.join("scratch");
        config
    }

    #[tokio::test]
    async fn test_interpretation_failure_stops_before_media() {
        let dir = tempfile::tempdir().unwrap();
        let mut interpreter = MockInstructionInterpreter::new();
        interpreter
            .expect_interpret()
            .returning(|_| Err(KiruError::Interpretation("not JSON".to_string())));
        let mut provider = MockMediaOperationProvider::new();
        provider.expect_strip_audio().never();

        let workflow =
            Workflow::with_components(config_in(dir.path()), Box::new(interpreter), Box::new(provider)).unwrap();
        let err = workflow.process("mute", &[]).await.unwrap_err();
        assert!(matches!(err, KiruError::Interpretation(_)));
    }
}
