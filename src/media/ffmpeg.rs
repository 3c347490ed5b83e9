use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Command;
use tokio::fs;
use tracing::{debug, info};

use crate::config::MediaConfig;
use crate::error::MediaFailure;
use crate::instruction::TextPosition;
use super::{
    concat_list_entry, escape_filter_value, DrawTextSpec, MediaCommandBuilder,
    MediaOperationProvider, MediaResult,
};

/// Concrete media provider (FFmpeg-based)
pub struct FfmpegProvider {
    config: MediaConfig,
    command_builder: MediaCommandBuilder,
}

impl FfmpegProvider {
    /// Create a new FFmpeg provider
    pub fn new(config: MediaConfig) -> Self {
        let command_builder = MediaCommandBuilder::new(&config.ffmpeg_path, &config.ffprobe_path);

        Self {
            config,
            command_builder,
        }
    }

    fn check_binary(&self, binary: &str) -> MediaResult<()> {
        let output = Command::new(binary)
            .arg("-version")
            .output()
            .map_err(|e| MediaFailure::new("Version check", format!("{} not found: {}", binary, e)))?;

        if output.status.success() {
            info!("{} is available", binary);
            Ok(())
        } else {
            Err(MediaFailure::new("Version check", format!("{} version check failed", binary))
                .with_status(output.status.code()))
        }
    }
}

/// Build the drawtext filter for a spec whose text lives in `text_file`.
pub fn drawtext_filter(spec: &DrawTextSpec, text_file: &Path) -> String {
    let y = match spec.position {
        TextPosition::Top => spec.margin.to_string(),
        TextPosition::Bottom => format!("h-th-{}", spec.margin),
        TextPosition::Center => "(h-text_h)/2".to_string(),
    };

    format!(
        "drawtext=fontfile={}:textfile={}:expansion=none:fontsize={}:fontcolor={}:box=1:boxcolor={}:boxborderw={}:x=(w-text_w)/2:y={}",
        escape_filter_value(&spec.font_file.to_string_lossy()),
        escape_filter_value(&text_file.to_string_lossy()),
        spec.font_size,
        escape_filter_value(&spec.font_color),
        escape_filter_value(&spec.box_color),
        spec.box_border,
        y
    )
}

fn parse_duration(stdout: &str) -> MediaResult<f64> {
    let trimmed = stdout.trim();
    match trimmed.parse::<f64>() {
        Ok(duration) if duration.is_finite() && duration > 0.0 => Ok(duration),
        _ => Err(MediaFailure::new(
            "Duration probe",
            format!("unusable duration reported: '{}'", trimmed),
        )),
    }
}

fn parse_packet_count(stdout: &str) -> bool {
    stdout
        .lines()
        .filter_map(|line| line.trim().trim_end_matches(',').parse::<u64>().ok())
        .any(|packets| packets > 0)
}

async fn absolute(path: &Path) -> MediaResult<PathBuf> {
    fs::canonicalize(path)
        .await
        .map_err(|e| MediaFailure::new("Concatenation", format!("cannot resolve {}: {}", path.display(), e)))
}

#[async_trait]
impl MediaOperationProvider for FfmpegProvider {
    async fn trim(&self, input: &Path, start: f64, end: Option<f64>, output: &Path) -> MediaResult<()> {
        info!("Trimming {} from {}s to {:?} -> {}", input.display(), start, end, output.display());
        self.command_builder.trim(input, start, end, output).execute().await?;
        Ok(())
    }

    async fn concat(&self, inputs: &[PathBuf], output: &Path, scratch: &Path) -> MediaResult<()> {
        info!("Concatenating {} inputs -> {}", inputs.len(), output.display());

        // The concat demuxer resolves relative entries against the list file, not the cwd.
        let mut entries = Vec::with_capacity(inputs.len());
        for input in inputs {
            entries.push(concat_list_entry(&absolute(input).await?));
        }

        let list_file = scratch.join("concat_list.txt");
        fs::write(&list_file, entries.join("\n"))
            .await
            .map_err(|e| MediaFailure::new("Concatenation", format!("cannot write list file: {}", e)))?;
        debug!("Wrote concat list {}", list_file.display());

        let result = self.command_builder
            .concat(list_file.as_path(), output, &self.config.concat_options)
            .execute()
            .await;

        if let Err(e) = fs::remove_file(&list_file).await {
            debug!("Could not remove concat list {}: {}", list_file.display(), e);
        }

        result.map(|_| ())
    }

    async fn probe_duration(&self, input: &Path) -> MediaResult<f64> {
        let stdout = self.command_builder.probe_duration(input).execute().await?;
        let duration = parse_duration(&stdout)?;
        debug!("Duration of {}: {}s", input.display(), duration);
        Ok(duration)
    }

    async fn probe_has_audio(&self, input: &Path) -> MediaResult<bool> {
        let stdout = self.command_builder.probe_audio(input).execute().await?;
        let has_audio = parse_packet_count(&stdout);
        debug!("{} has audio: {}", input.display(), has_audio);
        Ok(has_audio)
    }

    async fn strip_audio(&self, input: &Path, output: &Path) -> MediaResult<()> {
        info!("Removing audio from {} -> {}", input.display(), output.display());
        self.command_builder.strip_audio(input, output).execute().await?;
        Ok(())
    }

    async fn add_silent_audio(&self, input: &Path, output: &Path) -> MediaResult<()> {
        info!("Attaching silent audio to {} -> {}", input.display(), output.display());
        self.command_builder
            .add_silent_audio(
                input,
                output,
                self.config.silent_audio_sample_rate,
                &self.config.silent_audio_layout,
            )
            .execute()
            .await?;
        Ok(())
    }

    async fn copy_streams(&self, input: &Path, output: &Path) -> MediaResult<()> {
        info!("Copying streams of {} -> {}", input.display(), output.display());
        self.command_builder.copy_streams(input, output).execute().await?;
        Ok(())
    }

    async fn change_speed(&self, input: &Path, factor: f64, output: &Path) -> MediaResult<()> {
        info!("Changing speed of {} by {}x -> {}", input.display(), factor, output.display());
        // atempo on a file without audio fails, so only add it when there is a track.
        let with_audio = self.probe_has_audio(input).await?;
        self.command_builder
            .change_speed(input, factor, with_audio, output)
            .execute()
            .await?;
        Ok(())
    }

    async fn draw_text(&self, input: &Path, spec: &DrawTextSpec, output: &Path, scratch: &Path) -> MediaResult<()> {
        info!("Drawing text on {} ({:?}) -> {}", input.display(), spec.position, output.display());

        let text_file = scratch.join("overlay_text.txt");
        fs::write(&text_file, &spec.text)
            .await
            .map_err(|e| MediaFailure::new("Text overlay", format!("cannot write text file: {}", e)))?;

        let filter = drawtext_filter(spec, &text_file);
        self.command_builder.draw_text(input, filter, output).execute().await?;
        Ok(())
    }

    fn check_availability(&self) -> MediaResult<()> {
        self.check_binary(&self.config.ffmpeg_path)?;
        self.check_binary(&self.config.ffprobe_path)
    }
}
