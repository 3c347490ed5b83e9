//! Plan validation
//!
//! Checks an instruction against its inputs before any media operation
//! runs: input arity per action, input existence, and parameter legality.
//! Split points can only be checked against the media duration once it
//! has been probed, see [`validate_split_points`].

use std::path::PathBuf;

use crate::error::{KiruError, Result};
use crate::instruction::{Arity, Instruction};

/// Validate an instruction against the input references it will run on.
pub fn validate_instruction(instruction: &Instruction, inputs: &[PathBuf]) -> Result<()> {
    let action = instruction.action();

    if !action.arity().accepts(inputs.len()) {
        return Err(KiruError::Validation(match action.arity() {
            Arity::Exactly(1) => format!("{} requires exactly one input video, got {}", action, inputs.len()),
            Arity::Exactly(n) => format!("{} requires exactly {} input videos, got {}", action, n, inputs.len()),
            Arity::AtLeast(n) => format!("{} requires at least {} input videos, got {}", action, n, inputs.len()),
        }));
    }

    for input in inputs {
        if !input.is_file() {
            return Err(KiruError::Validation(format!(
                "input file not found: {}",
                input.display()
            )));
        }
    }

    match instruction {
        Instruction::Cut { start, end } => validate_cut(*start, *end),
        Instruction::Split { points } => validate_points_order(points),
        Instruction::TextOverlay(request) => {
            if request.text.trim().is_empty() {
                return Err(KiruError::Validation("text overlay requires non-empty text".to_string()));
            }
            if request.font_size == Some(0) {
                return Err(KiruError::Validation("font size must be positive".to_string()));
            }
            Ok(())
        }
        Instruction::AdjustSpeed { speed } => match speed {
            Some(s) if s.is_finite() && *s > 0.0 => Ok(()),
            Some(s) => Err(KiruError::Validation(format!(
                "invalid speed value {}: must be a finite positive number",
                s
            ))),
            None => Err(KiruError::Validation("speed adjustment requires a speed value".to_string())),
        },
        Instruction::Merge | Instruction::Mute | Instruction::Unmute => Ok(()),
    }
}

fn validate_cut(start: Option<f64>, end: Option<f64>) -> Result<()> {
    if start.is_none() && end.is_none() {
        return Err(KiruError::Validation("cut requires a start or an end time".to_string()));
    }

    let start = start.unwrap_or(0.0);
    if !start.is_finite() || start < 0.0 {
        return Err(KiruError::Validation(format!("cut start {} must be non-negative", start)));
    }

    if let Some(end) = end {
        if !end.is_finite() || end <= start {
            return Err(KiruError::Validation(format!(
                "cut end {} must be after start {}",
                end, start
            )));
        }
    }

    Ok(())
}

fn validate_points_order(points: &[f64]) -> Result<()> {
    for point in points {
        if !point.is_finite() || *point <= 0.0 {
            return Err(KiruError::Validation(format!(
                "split point {} must be a positive number of seconds",
                point
            )));
        }
    }

    if let Some(pair) = points.windows(2).find(|pair| pair[1] <= pair[0]) {
        return Err(KiruError::Validation(format!(
            "split points must be strictly ascending ({} is followed by {})",
            pair[0], pair[1]
        )));
    }

    Ok(())
}

/// Split points must lie strictly inside `(0, duration)`.
pub fn validate_split_points(points: &[f64], duration: f64) -> Result<()> {
    validate_points_order(points)?;

    if let Some(point) = points.iter().find(|p| **p >= duration) {
        return Err(KiruError::Validation(format!(
            "split point {} is not before the end of the video ({} seconds)",
            point, duration
        )));
    }

    Ok(())
}
