use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Result, VidmillError};

fn default_socket_timeout() -> u32 {
    30
}

fn default_retries() -> u32 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub media: MediaConfig,
    pub fetch: FetchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Path to ffmpeg binary
    pub ffmpeg_path: String,
    /// Path to ffprobe binary
    pub ffprobe_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Path to yt-dlp binary
    pub ytdlp_path: String,
    /// Binary probed to decide whether hardware encoding is available
    pub gpu_probe_path: String,
    /// Socket timeout passed to the extractor, in seconds
    #[serde(default = "default_socket_timeout")]
    pub socket_timeout: u32,
    /// Whole-download retries inside the extractor
    #[serde(default = "default_retries")]
    pub retries: u32,
    /// Per-fragment retries inside the extractor
    #[serde(default = "default_retries")]
    pub fragment_retries: u32,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: "yt-dlp".to_string(),
            gpu_probe_path: "nvidia-smi".to_string(),
            socket_timeout: default_socket_timeout(),
            retries: default_retries(),
            fragment_retries: default_retries(),
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| VidmillError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| VidmillError::Config(format!("Failed to parse config file: {}", e)))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| VidmillError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| VidmillError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.media.ffmpeg_path, "ffmpeg");
        assert_eq!(parsed.fetch.ytdlp_path, "yt-dlp");
        assert_eq!(parsed.fetch.socket_timeout, 30);
    }

    #[test]
    fn missing_retry_knobs_fall_back_to_defaults() {
        let text = r#"
[media]
ffmpeg_path = "/opt/ffmpeg"
ffprobe_path = "/opt/ffprobe"

[fetch]
ytdlp_path = "yt-dlp"
gpu_probe_path = "nvidia-smi"
"#;
        let parsed: Config = toml::from_str(text).unwrap();
        assert_eq!(parsed.media.ffmpeg_path, "/opt/ffmpeg");
        assert_eq!(parsed.fetch.retries, 10);
        assert_eq!(parsed.fetch.fragment_retries, 10);
    }
}
