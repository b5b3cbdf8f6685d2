use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertConfig {
    /// Encoder executable, looked up on PATH when not absolute
    pub encoder_bin: PathBuf,
    /// Audio codec passed to `-c:a` (libmp3lame, libvorbis, libopus, aac, flac, ...)
    pub audio_codec: String,
    /// Extension of the produced files, without the leading dot
    pub output_extension: String,
    /// Audio bitrate passed to `-b:a` (64k, 96k, 160k, 320k, ...)
    pub bitrate: String,
    /// Output sample rate; unset keeps the source rate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_rate: Option<u32>,
    /// Output channel count; unset keeps the source layout
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channels: Option<u8>,
    /// Leave existing outputs untouched (`-n`) instead of overwriting (`-y`)
    pub skip_existing: bool,
    /// Subdirectory created next to each input file for the outputs
    pub output_subdir: PathBuf,
    /// Worker count override; the CPU count is used when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_workers: Option<usize>,
    pub ui_mode: UiMode,
    /// Delay between scheduler ticks
    pub poll_interval_ms: u64,
    /// Pause after the last job so the final frame stays visible
    pub linger_ms: u64,
    /// Log destination while the interactive screen is up
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UiMode {
    /// Full-screen progress view
    Interactive,
    /// One line per started and finished file
    Plain,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            encoder_bin: PathBuf::from("ffmpeg"),
            audio_codec: "libmp3lame".to_string(),
            output_extension: "mp3".to_string(),
            bitrate: "160k".to_string(),
            sample_rate: None,
            channels: None,
            skip_existing: true,
            output_subdir: PathBuf::from("_converted_"),
            max_workers: None,
            ui_mode: UiMode::Interactive,
            poll_interval_ms: 500,
            linger_ms: 1000,
            log_file: None,
        }
    }
}

pub fn load_config(path: Option<&std::path::Path>) -> Result<ConvertConfig> {
    let config = if let Some(config_path) = path {
        if config_path.exists() {
            let contents = std::fs::read_to_string(config_path)
                .map_err(|e| anyhow::anyhow!("Failed to read config file: {}", e))?;

            toml::from_str::<ConvertConfig>(&contents)
                .map_err(|e| anyhow::anyhow!("Failed to parse TOML config: {}", e))?
        } else {
            tracing::warn!("Config file not found at {:?}, using defaults", config_path);
            ConvertConfig::default()
        }
    } else {
        tracing::debug!("No config path provided, using defaults");
        ConvertConfig::default()
    };

    validate_config(&config)?;
    Ok(config)
}

pub fn validate_config(config: &ConvertConfig) -> Result<()> {
    if config.audio_codec.trim().is_empty() {
        anyhow::bail!("audio_codec cannot be empty");
    }

    if config.output_extension.trim().is_empty() {
        anyhow::bail!("output_extension cannot be empty");
    }

    if config.output_extension.starts_with('.') {
        anyhow::bail!("output_extension must not start with a dot");
    }

    if config.bitrate.trim().is_empty() {
        anyhow::bail!("bitrate cannot be empty");
    }

    if config.sample_rate == Some(0) {
        anyhow::bail!("sample_rate must be positive when set");
    }

    if config.channels == Some(0) {
        anyhow::bail!("channels must be positive when set");
    }

    if config.max_workers == Some(0) {
        anyhow::bail!("max_workers must be at least 1");
    }

    if config.poll_interval_ms == 0 {
        anyhow::bail!("poll_interval_ms must be at least 1");
    }

    Ok(())
}
