use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::error::{KiruError, Result};

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_interpreter_timeout() -> u64 {
    120
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub interpreter: InterpreterConfig,
    pub media: MediaConfig,
    pub overlay: OverlayConfig,
    pub output: OutputConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterpreterConfig {
    /// Which LLM API speaks to the interpreter
    pub backend: InterpreterBackend,
    /// Base URL (Ollama) or full chat completions URL (OpenAi)
    pub endpoint: String,
    /// Model name passed to the backend
    pub model: String,
    /// Environment variable holding the API key, if the backend needs one
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Request timeout in seconds
    #[serde(default = "default_interpreter_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum InterpreterBackend {
    /// Ollama /api/generate with JSON output format
    Ollama,
    /// OpenAI-compatible /v1/chat/completions
    OpenAi,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Path to ffmpeg binary
    pub ffmpeg_path: String,
    /// Path to ffprobe binary
    pub ffprobe_path: String,
    /// Encoding options for concatenated output
    /// - c:v / crf / preset: video codec and quality
    /// - c:a / b:a: audio codec and bitrate
    /// - movflags +faststart: progressive playback
    pub concat_options: Vec<String>,
    /// Sample rate of the synthesized silent track
    pub silent_audio_sample_rate: u32,
    /// Channel layout of the synthesized silent track
    pub silent_audio_layout: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayConfig {
    /// Font used when the instruction names none (or custom fonts are disabled)
    pub default_font_file: PathBuf,
    pub default_font_size: u32,
    pub default_font_color: String,
    /// Honor a font file named by the instruction when it exists on disk
    pub allow_custom_font: bool,
    /// drawtext box color, e.g. black@0.5
    pub box_color: String,
    pub box_border: u32,
    /// Distance from the top/bottom edge in pixels
    pub margin: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory holding produced artifacts
    pub root: PathBuf,
    /// Directory under which per-plan scratch directories are created
    pub scratch_dir: PathBuf,
    /// Container extension of produced artifacts
    pub extension: String,
    /// Upper bound for a whole plan, unbounded when absent
    pub plan_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub listen: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interpreter: InterpreterConfig {
                backend: InterpreterBackend::Ollama,
                endpoint: "http://localhost:11434".to_string(),
                model: "llama3.2:3b".to_string(),
                api_key_env: default_api_key_env(),
                temperature: 0.7,
                timeout_secs: default_interpreter_timeout(),
            },
            media: MediaConfig {
                ffmpeg_path: "ffmpeg".to_string(),
                ffprobe_path: "ffprobe".to_string(),
                concat_options: [
                    "-c:v", "libx264", "-crf", "23", "-preset", "medium",
                    "-c:a", "aac", "-b:a", "128k", "-movflags", "+faststart",
                ]
                .iter()
                .map(|s| s.to_string())
                .collect(),
                silent_audio_sample_rate: 44100,
                silent_audio_layout: "stereo".to_string(),
            },
            overlay: OverlayConfig {
                default_font_file: PathBuf::from("./font/GreatVibes-Regular.otf"),
                default_font_size: 24,
                default_font_color: "white".to_string(),
                allow_custom_font: false,
                box_color: "black@0.5".to_string(),
                box_border: 5,
                margin: 10,
            },
            output: OutputConfig {
                root: PathBuf::from("output"),
                scratch_dir: PathBuf::from(".kiru/scratch"),
                extension: "mp4".to_string(),
                plan_timeout_secs: None,
            },
            server: ServerConfig {
                listen: "127.0.0.1:3000".to_string(),
            },
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| KiruError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| KiruError::Config(format!("Failed to parse config file: {}", e)))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| KiruError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| KiruError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }
}
