use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use crate::error::MediaFailure;
use super::MediaResult;

/// Abstract media processing command representation
#[derive(Debug, Clone)]
pub struct MediaCommand {
    pub binary_path: String,
    pub args: Vec<String>,
    pub description: String,
}

impl MediaCommand {
    /// Create a new media processing command
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, description: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            description: description.into(),
        }
    }

    /// Add an argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|s| s.into()));
        self
    }

    /// Add input file
    pub fn input<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg("-i").arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Add output file
    pub fn output<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Force overwrite output
    pub fn overwrite(self) -> Self {
        self.arg("-y")
    }

    /// Seek before decoding
    pub fn seek(self, seconds: f64) -> Self {
        self.arg("-ss").arg(seconds.to_string())
    }

    /// Limit output duration
    pub fn duration(self, seconds: f64) -> Self {
        self.arg("-t").arg(seconds.to_string())
    }

    /// Set video codec
    pub fn video_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:v").arg(codec)
    }

    /// Set audio codec
    pub fn audio_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:a").arg(codec)
    }

    /// Copy video stream
    pub fn copy_video(self) -> Self {
        self.video_codec("copy")
    }

    /// Copy every stream
    pub fn copy_all(self) -> Self {
        self.arg("-c").arg("copy")
    }

    /// Disable audio
    pub fn no_audio(self) -> Self {
        self.arg("-an")
    }

    /// Add video filter
    pub fn video_filter<S: Into<String>>(self, filter: S) -> Self {
        self.arg("-vf").arg(filter)
    }

    /// Add audio filter
    pub fn audio_filter<S: Into<String>>(self, filter: S) -> Self {
        self.arg("-af").arg(filter)
    }

    /// Execute the command, returning its stdout
    pub async fn execute(&self) -> MediaResult<String> {
        debug!("Executing media processing command: {} {:?}", self.binary_path, self.args);
        debug!("Description: {}", self.description);

        let output = Command::new(&self.binary_path)
            .args(&self.args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                MediaFailure::new(&self.description, format!("failed to execute {}: {}", self.binary_path, e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MediaFailure::new(&self.description, stderr.trim().to_string())
                .with_status(output.status.code()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

/// Builder for the ffmpeg/ffprobe invocations the provider needs
pub struct MediaCommandBuilder {
    ffmpeg_path: String,
    ffprobe_path: String,
}

impl MediaCommandBuilder {
    /// Create a new command builder
    pub fn new<S1: Into<String>, S2: Into<String>>(ffmpeg_path: S1, ffprobe_path: S2) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            ffprobe_path: ffprobe_path.into(),
        }
    }

    /// Build trim command
    pub fn trim<P: AsRef<Path>>(&self, input: P, start: f64, end: Option<f64>, output: P) -> MediaCommand {
        let cmd = MediaCommand::new(&self.ffmpeg_path, "Trim")
            .overwrite()
            .seek(start)
            .input(input);

        let cmd = match end {
            Some(end) => cmd.duration(end - start),
            None => cmd,
        };

        cmd.output(output)
    }

    /// Build concat demuxer command over a list file
    pub fn concat<P: AsRef<Path>>(&self, list_file: P, output: P, encode_options: &[String]) -> MediaCommand {
        MediaCommand::new(&self.ffmpeg_path, "Concatenation")
            .overwrite()
            .arg("-f").arg("concat")
            .arg("-safe").arg("0")
            .input(list_file)
            .args(encode_options.iter().cloned())
            .output(output)
    }

    /// Build duration probe
    pub fn probe_duration<P: AsRef<Path>>(&self, input: P) -> MediaCommand {
        MediaCommand::new(&self.ffprobe_path, "Duration probe")
            .arg("-v").arg("error")
            .arg("-show_entries").arg("format=duration")
            .arg("-of").arg("default=noprint_wrappers=1:nokey=1")
            .output(input)
    }

    /// Build audio stream probe (prints the packet count of the first audio stream)
    pub fn probe_audio<P: AsRef<Path>>(&self, input: P) -> MediaCommand {
        MediaCommand::new(&self.ffprobe_path, "Audio probe")
            .arg("-v").arg("error")
            .arg("-select_streams").arg("a:0")
            .arg("-count_packets")
            .arg("-show_entries").arg("stream=nb_read_packets")
            .arg("-of").arg("csv=p=0")
            .output(input)
    }

    /// Build audio removal command
    pub fn strip_audio<P: AsRef<Path>>(&self, input: P, output: P) -> MediaCommand {
        MediaCommand::new(&self.ffmpeg_path, "Audio removal")
            .overwrite()
            .input(input)
            .copy_video()
            .no_audio()
            .output(output)
    }

    /// Build silent track attachment command
    pub fn add_silent_audio<P: AsRef<Path>>(
        &self,
        input: P,
        output: P,
        sample_rate: u32,
        layout: &str,
    ) -> MediaCommand {
        MediaCommand::new(&self.ffmpeg_path, "Silent audio attachment")
            .overwrite()
            .input(input)
            .arg("-f").arg("lavfi")
            .input(format!("anullsrc=channel_layout={}:sample_rate={}", layout, sample_rate))
            .arg("-map").arg("0:v")
            .arg("-map").arg("1:a")
            .copy_video()
            .audio_codec("aac")
            .arg("-shortest")
            .output(output)
    }

    /// Build stream copy command
    pub fn copy_streams<P: AsRef<Path>>(&self, input: P, output: P) -> MediaCommand {
        MediaCommand::new(&self.ffmpeg_path, "Stream copy")
            .overwrite()
            .input(input)
            .copy_all()
            .output(output)
    }

    /// Build speed change command; `with_audio` adds the compensating tempo filter
    pub fn change_speed<P: AsRef<Path>>(&self, input: P, factor: f64, with_audio: bool, output: P) -> MediaCommand {
        let cmd = MediaCommand::new(&self.ffmpeg_path, format!("Speed change ({}x)", factor))
            .overwrite()
            .input(input)
            .video_filter(format!("setpts=PTS/{}", factor));

        let cmd = if with_audio {
            cmd.audio_filter(atempo_chain(factor))
        } else {
            cmd
        };

        cmd.output(output)
    }

    /// Build drawtext command from a prepared filter
    pub fn draw_text<P: AsRef<Path>>(&self, input: P, filter: String, output: P) -> MediaCommand {
        MediaCommand::new(&self.ffmpeg_path, "Text overlay")
            .overwrite()
            .input(input)
            .video_filter(filter)
            .output(output)
    }
}

/// atempo only accepts factors in [0.5, 2.0]; larger changes are chained.
pub fn atempo_chain(factor: f64) -> String {
    let mut remaining = factor;
    let mut stages = Vec::new();

    while remaining > 2.0 {
        stages.push(2.0);
        remaining /= 2.0;
    }
    while remaining < 0.5 {
        stages.push(0.5);
        remaining /= 0.5;
    }
    stages.push(remaining);

    stages
        .iter()
        .map(|stage| format!("atempo={}", stage))
        .collect::<Vec<_>>()
        .join(",")
}

/// Escape a value for use as a filter option inside a filtergraph.
pub fn escape_filter_value(value: &str) -> String {
    let option_level = escape_chars(value, &['\\', '\'', ':']);
    escape_chars(&option_level, &['\\', '\'', '[', ']', ',', ';'])
}

fn escape_chars(value: &str, special: &[char]) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if special.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Line of an ffmpeg concat list
pub fn concat_list_entry(path: &Path) -> String {
    format!("file '{}'", path.to_string_lossy().replace('\'', "'\\''"))
}
