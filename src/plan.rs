//! Execution plans
//!
//! An instruction becomes an ordered list of concrete media operations,
//! each with its own freshly named output. Most actions need one step;
//! `split` fans out into one trim per segment.

use std::path::PathBuf;
use tracing::{debug, warn};

use crate::config::OverlayConfig;
use crate::error::{KiruError, Result};
use crate::instruction::{Action, Instruction, TextOverlayRequest};
use crate::media::DrawTextSpec;
use crate::registry::{OutputArtifact, OutputRegistry};

#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Trim { input: PathBuf, start: f64, end: Option<f64> },
    Concat { inputs: Vec<PathBuf> },
    DrawText { input: PathBuf, spec: DrawTextSpec },
    ChangeSpeed { input: PathBuf, factor: f64 },
    StripAudio { input: PathBuf },
    /// Copy streams when audio exists, attach a silent track otherwise
    RestoreAudio { input: PathBuf },
}

#[derive(Debug, Clone)]
pub struct PlanStep {
    pub operation: Operation,
    pub output: OutputArtifact,
    /// Short label used when the step fails
    pub label: String,
    /// Narrative line reported when the step succeeds
    pub narrative: String,
}

#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    pub action: Action,
    pub steps: Vec<PlanStep>,
    /// Narrative line appended after all steps succeed
    pub closing: Option<String>,
}

/// Boundaries `[0, p1, ..., pk, duration]` for interior split points.
pub fn split_boundaries(points: &[f64], duration: f64) -> Vec<f64> {
    let mut boundaries = Vec::with_capacity(points.len() + 2);
    boundaries.push(0.0);
    boundaries.extend_from_slice(points);
    boundaries.push(duration);
    boundaries
}

/// Seconds for humans: at most millisecond precision, no trailing zeros.
pub fn format_seconds(seconds: f64) -> String {
    let rounded = (seconds * 1000.0).round() / 1000.0;
    format!("{}", rounded)
}

/// Pick the font and fill in overlay defaults.
pub fn resolve_overlay(request: &TextOverlayRequest, overlay: &OverlayConfig) -> DrawTextSpec {
    let font_file = match &request.font_file {
        Some(custom) if overlay.allow_custom_font && custom.is_file() => custom.clone(),
        Some(custom) => {
            if overlay.allow_custom_font {
                warn!("Font file {} not found, using default font", custom.display());
            } else {
                debug!("Custom fonts disabled, ignoring {}", custom.display());
            }
            overlay.default_font_file.clone()
        }
        None => overlay.default_font_file.clone(),
    };

    DrawTextSpec {
        text: request.text.clone(),
        font_size: request.font_size.unwrap_or(overlay.default_font_size),
        font_color: request
            .font_color
            .clone()
            .unwrap_or_else(|| overlay.default_font_color.clone()),
        position: request.position,
        font_file,
        box_color: overlay.box_color.clone(),
        box_border: overlay.box_border,
        margin: overlay.margin,
    }
}

impl ExecutionPlan {
    /// Derive the plan for a validated instruction.
    ///
    /// `source_duration` is the probed duration of the single input and is
    /// only needed for `split`.
    pub fn derive(
        instruction: &Instruction,
        inputs: &[PathBuf],
        source_duration: Option<f64>,
        registry: &OutputRegistry,
        overlay: &OverlayConfig,
    ) -> Result<Self> {
        let action = instruction.action();
        let single = || {
            inputs.first().cloned().ok_or_else(|| {
                KiruError::Validation(format!("{} requires exactly one input video", action))
            })
        };
        let one_step = |operation: Operation, narrative: String| PlanStep {
            operation,
            output: registry.allocate(action.output_prefix()),
            label: action.as_str().to_string(),
            narrative,
        };

        let mut closing = None;
        let steps = match instruction {
            Instruction::Cut { start, end } => {
                let start = start.unwrap_or(0.0);
                let until = match end {
                    Some(end) => format!("{} seconds", format_seconds(*end)),
                    None => "the end".to_string(),
                };
                vec![one_step(
                    Operation::Trim { input: single()?, start, end: *end },
                    format!("Video cut from {} seconds to {}.", format_seconds(start), until),
                )]
            }
            Instruction::Split { points } => {
                let duration = source_duration.ok_or_else(|| {
                    KiruError::Validation("split requires the duration of the source video".to_string())
                })?;
                let input = single()?;
                let boundaries = split_boundaries(points, duration);
                let segments = boundaries.len() - 1;
                closing = Some("All video parts split successfully!".to_string());

                boundaries
                    .windows(2)
                    .enumerate()
                    .map(|(i, range)| {
                        let part = i + 1;
                        PlanStep {
                            operation: Operation::Trim {
                                input: input.clone(),
                                start: range[0],
                                end: Some(range[1]),
                            },
                            output: registry.allocate(&format!("{}_{}", action.output_prefix(), part)),
                            label: format!("split segment {} of {}", part, segments),
                            narrative: format!(
                                "Video part {} cut from {} to {} seconds.",
                                part,
                                format_seconds(range[0]),
                                format_seconds(range[1])
                            ),
                        }
                    })
                    .collect()
            }
            Instruction::Merge => vec![one_step(
                Operation::Concat { inputs: inputs.to_vec() },
                format!("{} videos have been merged successfully.", inputs.len()),
            )],
            Instruction::TextOverlay(request) => vec![one_step(
                Operation::DrawText {
                    input: single()?,
                    spec: resolve_overlay(request, overlay),
                },
                "Text overlay has been added to the video.".to_string(),
            )],
            Instruction::AdjustSpeed { speed } => {
                let factor = speed.ok_or_else(|| {
                    KiruError::Validation("speed adjustment requires a speed value".to_string())
                })?;
                vec![one_step(
                    Operation::ChangeSpeed { input: single()?, factor },
                    format!("Video speed adjusted to {}x.", format_seconds(factor)),
                )]
            }
            Instruction::Mute => vec![one_step(
                Operation::StripAudio { input: single()? },
                "Video audio has been muted.".to_string(),
            )],
            Instruction::Unmute => vec![one_step(
                Operation::RestoreAudio { input: single()? },
                "Video audio has been restored.".to_string(),
            )],
        };

        Ok(Self { action, steps, closing })
    }
}
