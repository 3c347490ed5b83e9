//! Action execution
//!
//! Validates an instruction, derives its plan and drives the media
//! provider through the steps strictly one after another. The first
//! failing step ends the plan; outputs it already wrote are discarded.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::OverlayConfig;
use crate::error::{KiruError, Result};
use crate::instruction::Instruction;
use crate::media::{MediaOperationProvider, MediaResult};
use crate::plan::{ExecutionPlan, Operation, PlanStep};
use crate::registry::{OutputArtifact, OutputRegistry, PartialOutputs, PlanWorkspace};
use crate::validate::{validate_instruction, validate_split_points};

/// What a finished plan produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub artifacts: Vec<OutputArtifact>,
    pub narrative: String,
}

pub struct ActionExecutor {
    provider: Box<dyn MediaOperationProvider>,
    registry: OutputRegistry,
    overlay: OverlayConfig,
    scratch_root: PathBuf,
}

impl ActionExecutor {
    pub fn new(
        provider: Box<dyn MediaOperationProvider>,
        registry: OutputRegistry,
        overlay: OverlayConfig,
        scratch_root: PathBuf,
    ) -> Self {
        Self {
            provider,
            registry,
            overlay,
            scratch_root,
        }
    }

    pub fn registry(&self) -> &OutputRegistry {
        &self.registry
    }

    /// Run an instruction against its inputs.
    pub async fn execute(&self, instruction: &Instruction, inputs: &[PathBuf]) -> Result<ExecutionOutcome> {
        validate_instruction(instruction, inputs)?;

        let workspace = PlanWorkspace::create(&self.scratch_root)?;
        info!("Plan {}: {} on {} input(s)", workspace.id(), instruction.action(), inputs.len());

        let source_duration = match instruction {
            Instruction::Split { points } => {
                let duration = self
                    .provider
                    .probe_duration(&inputs[0])
                    .await
                    .map_err(|source| KiruError::MediaOperation {
                        stage: "preparation (source duration probe)".to_string(),
                        source,
                    })?;
                validate_split_points(points, duration)?;
                Some(duration)
            }
            _ => None,
        };

        let plan = ExecutionPlan::derive(instruction, inputs, source_duration, &self.registry, &self.overlay)?;
        self.run(plan, &workspace).await
    }

    async fn run(&self, plan: ExecutionPlan, workspace: &PlanWorkspace) -> Result<ExecutionOutcome> {
        let total = plan.steps.len();
        let mut outputs = PartialOutputs::new();
        let mut artifacts = Vec::with_capacity(total);
        let mut narrative = Vec::with_capacity(total + 1);

        for (index, step) in plan.steps.into_iter().enumerate() {
            outputs.track(&step.output.path);

            let line = self
                .run_step(&step, workspace.path())
                .await
                .map_err(|source| KiruError::MediaOperation {
                    stage: format!("step {} of {} ({})", index + 1, total, step.label),
                    source,
                })?;

            info!("Plan {}: step {}/{} done -> {}", workspace.id(), index + 1, total, step.output.name);
            narrative.push(line);
            artifacts.push(step.output);
        }

        if let Some(closing) = plan.closing {
            narrative.push(closing);
        }

        outputs.commit();
        info!("Plan {}: {} completed with {} artifact(s)", workspace.id(), plan.action, artifacts.len());

        Ok(ExecutionOutcome {
            artifacts,
            narrative: narrative.join("\n"),
        })
    }

    /// Run one step, returning its narrative line.
    async fn run_step(&self, step: &PlanStep, scratch: &Path) -> MediaResult<String> {
        let output = step.output.path.as_path();

        match &step.operation {
            Operation::Trim { input, start, end } => {
                self.provider.trim(input, *start, *end, output).await?;
            }
            Operation::Concat { inputs } => {
                self.provider.concat(inputs, output, scratch).await?;
            }
            Operation::DrawText { input, spec } => {
                self.provider.draw_text(input, spec, output, scratch).await?;
            }
            Operation::ChangeSpeed { input, factor } => {
                self.provider.change_speed(input, *factor, output).await?;
            }
            Operation::StripAudio { input } => {
                self.provider.strip_audio(input, output).await?;
            }
            Operation::RestoreAudio { input } => {
                return if self.provider.probe_has_audio(input).await? {
                    self.provider.copy_streams(input, output).await?;
                    Ok(format!("{} The existing audio track was kept.", step.narrative))
                } else {
                    self.provider.add_silent_audio(input, output).await?;
                    Ok(format!("{} A silent audio track was attached.", step.narrative))
                };
            }
        }

        Ok(step.narrative.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::error::MediaFailure;
    use crate::media::MockMediaOperationProvider;
    use mockall::predicate::*;
    use mockall::Sequence;
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
        input: PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let input = dir.path().join("input.mp4");
            std::fs::write(&input, b"video").unwrap();
            Self { dir, input }
        }

        fn executor(&self, provider: MockMediaOperationProvider) -> ActionExecutor {
            let registry = OutputRegistry::new(self.dir.path().join("output"), "mp4").unwrap();
            ActionExecutor::new(
                Box::new(provider),
                registry,
                Config::default().overlay,
                self.dir.path().join("scratch"),
            )
        }
    }

    fn write_output(output: &Path) {
        std::fs::write(output, b"out").unwrap();
    }

    #[tokio::test]
    async fn test_merge_with_one_input_never_touches_provider() {
        let fixture = Fixture::new();
        let mut provider = MockMediaOperationProvider::new();
        provider.expect_concat().never();
        provider.expect_probe_duration().never();

        let err = fixture
            .executor(provider)
            .execute(&Instruction::Merge, &[fixture.input.clone()])
            .await
            .unwrap_err();
        assert!(matches!(err, KiruError::Validation(_)));
    }

    #[tokio::test]
    async fn test_split_runs_segments_in_order() {
        let fixture = Fixture::new();
        let mut provider = MockMediaOperationProvider::new();
        let mut seq = Sequence::new();

        provider
            .expect_probe_duration()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(100.0));
        for (start, end) in [(0.0, 30.0), (30.0, 60.0), (60.0, 100.0)] {
            provider
                .expect_trim()
                .with(always(), eq(start), eq(Some(end)), always())
                .times(1)
                .in_sequence(&mut seq)
                .returning(|_, _, _, output| {
                    write_output(output);
                    Ok(())
                });
        }

        let outcome = fixture
            .executor(provider)
            .execute(&Instruction::Split { points: vec![30.0, 60.0] }, &[fixture.input.clone()])
            .await
            .unwrap();

        assert_eq!(outcome.artifacts.len(), 3);
        assert!(outcome.artifacts.iter().all(|a| a.path.exists()));
        let lines: Vec<&str> = outcome.narrative.lines().collect();
        assert_eq!(lines[0], "Video part 1 cut from 0 to 30 seconds.");
        assert_eq!(lines[2], "Video part 3 cut from 60 to 100 seconds.");
        assert_eq!(lines[3], "All video parts split successfully!");
    }

    #[tokio::test]
    async fn test_split_point_beyond_duration_is_rejected_after_probe() {
        let fixture = Fixture::new();
        let mut provider = MockMediaOperationProvider::new();
        provider.expect_probe_duration().times(1).returning(|_| Ok(50.0));
        provider.expect_trim().never();

        let err = fixture
            .executor(provider)
            .execute(&Instruction::Split { points: vec![30.0, 60.0] }, &[fixture.input.clone()])
            .await
            .unwrap_err();
        assert!(matches!(err, KiruError::Validation(_)));
    }

    #[tokio::test]
    async fn test_failing_segment_aborts_and_discards_earlier_outputs() {
        let fixture = Fixture::new();
        let mut provider = MockMediaOperationProvider::new();
        provider.expect_probe_duration().returning(|_| Ok(90.0));
        provider
            .expect_trim()
            .with(always(), eq(0.0), always(), always())
            .times(1)
            .returning(|_, _, _, output| {
                write_output(output);
                Ok(())
            });
        provider
            .expect_trim()
            .with(always(), eq(30.0), always(), always())
            .times(1)
            .returning(|_, _, _, _| Err(MediaFailure::new("Trim", "Invalid data found")));
        provider
            .expect_trim()
            .with(always(), eq(60.0), always(), always())
            .never();

        let executor = fixture.executor(provider);
        let err = executor
            .execute(&Instruction::Split { points: vec![30.0, 60.0] }, &[fixture.input.clone()])
            .await
            .unwrap_err();

        match err {
            KiruError::MediaOperation { stage, source } => {
                assert_eq!(stage, "step 2 of 3 (split segment 2 of 3)");
                assert_eq!(source.diagnostics, "Invalid data found");
            }
            other => panic!("unexpected error {:?}", other),
        }
        let leftovers = std::fs::read_dir(executor.registry().root()).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn test_unmute_copies_existing_audio() {
        let fixture = Fixture::new();
        let mut provider = MockMediaOperationProvider::new();
        provider.expect_probe_has_audio().times(1).returning(|_| Ok(true));
        provider.expect_copy_streams().times(1).returning(|_, output| {
            write_output(output);
            Ok(())
        });
        provider.expect_add_silent_audio().never();

        let outcome = fixture
            .executor(provider)
            .execute(&Instruction::Unmute, &[fixture.input.clone()])
            .await
            .unwrap();
        assert!(outcome.artifacts[0].name.starts_with("unmuted_"));
        assert!(outcome.narrative.contains("existing audio track was kept"));
    }

    #[tokio::test]
    async fn test_unmute_attaches_silence_to_silent_input() {
        let fixture = Fixture::new();
        let mut provider = MockMediaOperationProvider::new();
        provider.expect_probe_has_audio().times(1).returning(|_| Ok(false));
        provider.expect_copy_streams().never();
        provider.expect_add_silent_audio().times(1).returning(|_, output| {
            write_output(output);
            Ok(())
        });

        let outcome = fixture
            .executor(provider)
            .execute(&Instruction::Unmute, &[fixture.input.clone()])
            .await
            .unwrap();
        assert!(outcome.narrative.starts_with("Video audio has been restored."));
        assert!(outcome.narrative.contains("silent audio track"));
    }

    #[tokio::test]
    async fn test_speed_factor_reaches_provider() {
        let fixture = Fixture::new();
        let mut provider = MockMediaOperationProvider::new();
        provider
            .expect_change_speed()
            .with(always(), eq(0.5), always())
            .times(1)
            .returning(|_, _, output| {
                write_output(output);
                Ok(())
            });

        let outcome = fixture
            .executor(provider)
            .execute(&Instruction::AdjustSpeed { speed: Some(0.5) }, &[fixture.input.clone()])
            .await
            .unwrap();
        assert_eq!(outcome.narrative, "Video speed adjusted to 0.5x.");
        assert!(outcome.artifacts[0].name.starts_with("speed_adjusted_"));
    }
}
