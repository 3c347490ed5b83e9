// Media operation provider
//
// The engine never touches pixels or samples itself; it drives a provider:
// - Commands: ffmpeg/ffprobe command builder with structured failures
// - Ffmpeg: provider implementation on top of the command builder

pub mod commands;
pub mod ffmpeg;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use std::path::{Path, PathBuf};

pub use commands::*;
pub use ffmpeg::*;

use crate::config::MediaConfig;
use crate::error::MediaFailure;
use crate::instruction::TextPosition;

pub type MediaResult<T> = std::result::Result<T, MediaFailure>;

/// Fully resolved drawtext parameters
#[derive(Debug, Clone, PartialEq)]
pub struct DrawTextSpec {
    pub text: String,
    pub font_size: u32,
    pub font_color: String,
    pub position: TextPosition,
    pub font_file: PathBuf,
    pub box_color: String,
    pub box_border: u32,
    pub margin: u32,
}

/// Media transformations the engine depends on.
///
/// Every operation writes a new file at `output` and never modifies its
/// inputs. `scratch` is a directory private to the calling plan for any
/// intermediate files the operation needs.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MediaOperationProvider: Send + Sync {
    /// Copy `[start, end)` of the input, or `[start, ..)` when `end` is absent
    async fn trim(&self, input: &Path, start: f64, end: Option<f64>, output: &Path) -> MediaResult<()>;

    /// Concatenate inputs in the given order, re-encoding to a standard codec
    async fn concat(&self, inputs: &[PathBuf], output: &Path, scratch: &Path) -> MediaResult<()>;

    /// Container duration in seconds
    async fn probe_duration(&self, input: &Path) -> MediaResult<f64>;

    /// Whether the input carries an audio stream with packets
    async fn probe_has_audio(&self, input: &Path) -> MediaResult<bool>;

    /// Drop the audio track, keep the video stream as is
    async fn strip_audio(&self, input: &Path, output: &Path) -> MediaResult<()>;

    /// Attach a silent track, cut to the shorter of video and audio
    async fn add_silent_audio(&self, input: &Path, output: &Path) -> MediaResult<()>;

    /// Remux without re-encoding
    async fn copy_streams(&self, input: &Path, output: &Path) -> MediaResult<()>;

    /// Play back `factor` times faster, audio kept in step with video
    async fn change_speed(&self, input: &Path, factor: f64, output: &Path) -> MediaResult<()>;

    /// Burn text into the video
    async fn draw_text(&self, input: &Path, spec: &DrawTextSpec, output: &Path, scratch: &Path) -> MediaResult<()>;

    /// Check if the underlying tools are available
    fn check_availability(&self) -> MediaResult<()>;
}

/// Factory for creating provider instances
pub struct MediaProviderFactory;

impl MediaProviderFactory {
    /// Create the default provider implementation (FFmpeg-based)
    pub fn create_provider(config: MediaConfig) -> Box<dyn MediaOperationProvider> {
        Box::new(ffmpeg::FfmpegProvider::new(config))
    }
}
