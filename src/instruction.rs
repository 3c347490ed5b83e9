//! Editing instructions
//!
//! The interpreter hands back loosely typed JSON (`RawInstruction`). It is
//! converted here into the closed `Instruction` enum, one variant per
//! action, before anything else looks at it. Time-like fields may arrive
//! either as seconds or as time expressions and are normalized on the way.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::error::{KiruError, Result};
use crate::timeparse;

/// Editing action vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Cut,
    Split,
    Merge,
    TextOverlay,
    AdjustSpeed,
    Mute,
    Unmute,
}

/// How many inputs an action accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exactly(usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(&self, count: usize) -> bool {
        match *self {
            Arity::Exactly(n) => count == n,
            Arity::AtLeast(n) => count >= n,
        }
    }
}

impl Action {
    pub const ALL: [Action; 7] = [
        Action::Cut,
        Action::Split,
        Action::Merge,
        Action::TextOverlay,
        Action::AdjustSpeed,
        Action::Mute,
        Action::Unmute,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Cut => "cut",
            Action::Split => "split",
            Action::Merge => "merge",
            Action::TextOverlay => "text_overlay",
            Action::AdjustSpeed => "adjust_speed",
            Action::Mute => "mute",
            Action::Unmute => "unmute",
        }
    }

    /// Parse an action tag, tolerating case and `-`/space separators.
    pub fn parse(tag: &str) -> Result<Self> {
        let normalized = tag.trim().to_lowercase().replace(['-', ' '], "_");
        Action::ALL
            .into_iter()
            .find(|action| action.as_str() == normalized)
            .ok_or_else(|| KiruError::UnsupportedAction(tag.trim().to_string()))
    }

    pub fn arity(&self) -> Arity {
        match self {
            Action::Merge => Arity::AtLeast(2),
            _ => Arity::Exactly(1),
        }
    }

    /// Prefix of output artifact names
    pub fn output_prefix(&self) -> &'static str {
        match self {
            Action::Cut => "cut",
            Action::Split => "split",
            Action::Merge => "merged",
            Action::TextOverlay => "text_overlay",
            Action::AdjustSpeed => "speed_adjusted",
            Action::Mute => "muted",
            Action::Unmute => "unmuted",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextPosition {
    Top,
    #[default]
    Center,
    Bottom,
}

impl TextPosition {
    /// Unknown positions fall back to center.
    pub fn parse_lenient(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "top" => TextPosition::Top,
            "bottom" => TextPosition::Bottom,
            _ => TextPosition::Center,
        }
    }
}

/// Text overlay parameters as the user asked for them
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TextOverlayRequest {
    pub text: String,
    pub font_size: Option<u32>,
    pub font_color: Option<String>,
    pub position: TextPosition,
    pub font_file: Option<PathBuf>,
}

/// A structured edit, one variant per action.
///
/// Parameters are carried as interpreted; legality (ranges, ordering,
/// emptiness) is the validator's job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Instruction {
    Cut { start: Option<f64>, end: Option<f64> },
    Split { points: Vec<f64> },
    Merge,
    TextOverlay(TextOverlayRequest),
    AdjustSpeed { speed: Option<f64> },
    Mute,
    Unmute,
}

impl Instruction {
    pub fn action(&self) -> Action {
        match self {
            Instruction::Cut { .. } => Action::Cut,
            Instruction::Split { .. } => Action::Split,
            Instruction::Merge => Action::Merge,
            Instruction::TextOverlay(_) => Action::TextOverlay,
            Instruction::AdjustSpeed { .. } => Action::AdjustSpeed,
            Instruction::Mute => Action::Mute,
            Instruction::Unmute => Action::Unmute,
        }
    }
}

/// A number the model may have written as a number or as text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Loose {
    Number(f64),
    Text(String),
}

/// Interpreter output exactly as the model produced it
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawInstruction {
    pub action: Option<String>,
    pub start: Option<Loose>,
    pub end: Option<Loose>,
    pub points: Option<Vec<Loose>>,
    pub speed: Option<Loose>,
    pub text: Option<String>,
    pub font_size: Option<Loose>,
    pub font_color: Option<String>,
    pub position: Option<String>,
    pub font_file: Option<String>,
}

impl RawInstruction {
    /// Parse the JSON object the model returned.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| KiruError::Interpretation(format!("malformed instruction JSON: {}", e)))
    }

    /// Convert into a typed instruction. Fields irrelevant to the action are ignored.
    pub fn into_instruction(self) -> Result<Instruction> {
        let tag = self
            .action
            .as_deref()
            .filter(|tag| !tag.trim().is_empty())
            .ok_or_else(|| KiruError::Interpretation("instruction has no action".to_string()))?;

        let instruction = match Action::parse(tag)? {
            Action::Cut => Instruction::Cut {
                start: self.start.as_ref().map(|v| seconds("start", v)).transpose()?,
                end: self.end.as_ref().map(|v| seconds("end", v)).transpose()?,
            },
            Action::Split => Instruction::Split {
                points: self
                    .points
                    .unwrap_or_default()
                    .iter()
                    .map(|v| seconds("points", v))
                    .collect::<Result<Vec<_>>>()?,
            },
            Action::Merge => Instruction::Merge,
            Action::TextOverlay => Instruction::TextOverlay(TextOverlayRequest {
                text: self.text.unwrap_or_default(),
                font_size: self.font_size.as_ref().map(font_size).transpose()?,
                font_color: self.font_color.filter(|c| !c.trim().is_empty()),
                position: self
                    .position
                    .as_deref()
                    .map(TextPosition::parse_lenient)
                    .unwrap_or_default(),
                font_file: self
                    .font_file
                    .filter(|f| !f.trim().is_empty())
                    .map(PathBuf::from),
            }),
            Action::AdjustSpeed => Instruction::AdjustSpeed {
                speed: self.speed.as_ref().map(speed).transpose()?,
            },
            Action::Mute => Instruction::Mute,
            Action::Unmute => Instruction::Unmute,
        };

        Ok(instruction)
    }
}

fn seconds(field: &str, value: &Loose) -> Result<f64> {
    match value {
        Loose::Number(n) => Ok(*n),
        Loose::Text(text) => timeparse::normalize(text).map_err(|e| {
            KiruError::Interpretation(format!("field '{}' is not a time: {}", field, e))
        }),
    }
}

fn speed(value: &Loose) -> Result<f64> {
    match value {
        Loose::Number(n) => Ok(*n),
        Loose::Text(text) => text
            .trim()
            .trim_end_matches(['x', 'X'])
            .trim()
            .parse::<f64>()
            .map_err(|_| KiruError::Interpretation(format!("field 'speed' is not a number: '{}'", text))),
    }
}

fn font_size(value: &Loose) -> Result<u32> {
    let size = match value {
        Loose::Number(n) => *n,
        Loose::Text(text) => text
            .trim()
            .trim_end_matches("px")
            .parse::<f64>()
            .map_err(|_| KiruError::Interpretation(format!("field 'fontSize' is not a number: '{}'", text)))?,
    };
    if !size.is_finite() || size < 0.0 {
        return Err(KiruError::Interpretation(format!("field 'fontSize' is out of range: {}", size)));
    }
    Ok(size.round() as u32)
}
