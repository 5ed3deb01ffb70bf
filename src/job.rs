use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{Result, VidmillError};

/// x264 speed/size trade-off ladder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Preset {
    Ultrafast,
    Superfast,
    Veryfast,
    Faster,
    Fast,
    Medium,
    Slow,
    Slower,
    Veryslow,
}

impl Preset {
    pub fn as_str(&self) -> &'static str {
        match self {
            Preset::Ultrafast => "ultrafast",
            Preset::Superfast => "superfast",
            Preset::Veryfast => "veryfast",
            Preset::Faster => "faster",
            Preset::Fast => "fast",
            Preset::Medium => "medium",
            Preset::Slow => "slow",
            Preset::Slower => "slower",
            Preset::Veryslow => "veryslow",
        }
    }
}

impl FromStr for Preset {
    type Err = VidmillError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "ultrafast" => Ok(Preset::Ultrafast),
            "superfast" => Ok(Preset::Superfast),
            "veryfast" => Ok(Preset::Veryfast),
            "faster" => Ok(Preset::Faster),
            "fast" => Ok(Preset::Fast),
            "medium" => Ok(Preset::Medium),
            "slow" => Ok(Preset::Slow),
            "slower" => Ok(Preset::Slower),
            "veryslow" => Ok(Preset::Veryslow),
            _ => Err(VidmillError::Validation(format!(
                "Invalid preset '{}'. Valid presets: ultrafast, superfast, veryfast, faster, fast, medium, slow, slower, veryslow",
                s
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VideoCodec {
    H264,
    H265,
    Mpeg4,
    Vp9,
}

impl VideoCodec {
    /// Encoder name handed to the transcoder's video-codec flag
    pub fn encoder(&self) -> &'static str {
        match self {
            VideoCodec::H264 => "libx264",
            VideoCodec::H265 => "libx265",
            VideoCodec::Mpeg4 => "mpeg4",
            VideoCodec::Vp9 => "vp9",
        }
    }
}

impl FromStr for VideoCodec {
    type Err = VidmillError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "h264" | "libx264" => Ok(VideoCodec::H264),
            "h265" | "libx265" => Ok(VideoCodec::H265),
            "mpeg4" => Ok(VideoCodec::Mpeg4),
            "vp9" => Ok(VideoCodec::Vp9),
            _ => Err(VidmillError::Validation(format!(
                "Invalid video codec '{}'. Valid codecs: h264, h265, mpeg4, vp9",
                s
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AudioCodec {
    Aac,
    Mp3,
    Opus,
    Vorbis,
}

impl AudioCodec {
    pub fn encoder(&self) -> &'static str {
        match self {
            AudioCodec::Aac => "aac",
            AudioCodec::Mp3 => "mp3",
            AudioCodec::Opus => "opus",
            AudioCodec::Vorbis => "vorbis",
        }
    }
}

impl FromStr for AudioCodec {
    type Err = VidmillError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "aac" => Ok(AudioCodec::Aac),
            "mp3" => Ok(AudioCodec::Mp3),
            "opus" => Ok(AudioCodec::Opus),
            "vorbis" => Ok(AudioCodec::Vorbis),
            _ => Err(VidmillError::Validation(format!(
                "Invalid audio codec '{}'. Valid codecs: aac, mp3, opus, vorbis",
                s
            ))),
        }
    }
}

/// One processing step within a transform job. Immutable once enqueued;
/// list order determines argument order and therefore output semantics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operation {
    Compress { quality: u8, preset: Preset },
    Convert { codec: VideoCodec },
    Resize { width: u32, height: u32 },
    Trim { start_seconds: f64, duration_seconds: f64 },
    AudioEncode { codec: AudioCodec, bitrate_kbps: u32 },
}

impl Operation {
    pub fn compress(quality: u8, preset: Preset) -> Result<Self> {
        if quality > 51 {
            return Err(VidmillError::Validation(format!(
                "Compression quality {} out of range 0..=51",
                quality
            )));
        }
        Ok(Operation::Compress { quality, preset })
    }

    pub fn resize(width: u32, height: u32) -> Result<Self> {
        if width == 0 || width > 7680 {
            return Err(VidmillError::Validation(format!(
                "Resize width {} out of range 1..=7680",
                width
            )));
        }
        if height == 0 || height > 4320 {
            return Err(VidmillError::Validation(format!(
                "Resize height {} out of range 1..=4320",
                height
            )));
        }
        Ok(Operation::Resize { width, height })
    }

    pub fn trim(start_seconds: f64, duration_seconds: f64) -> Result<Self> {
        if !start_seconds.is_finite() || start_seconds < 0.0 {
            return Err(VidmillError::Validation(format!(
                "Trim start {} must be a non-negative number of seconds",
                start_seconds
            )));
        }
        if !duration_seconds.is_finite() || duration_seconds < 0.0 {
            return Err(VidmillError::Validation(format!(
                "Trim duration {} must be a non-negative number of seconds",
                duration_seconds
            )));
        }
        Ok(Operation::Trim {
            start_seconds,
            duration_seconds,
        })
    }

    pub fn audio_encode(codec: AudioCodec, bitrate_kbps: u32) -> Result<Self> {
        if !(32..=320).contains(&bitrate_kbps) {
            return Err(VidmillError::Validation(format!(
                "Audio bitrate {} out of range 32..=320 kbps",
                bitrate_kbps
            )));
        }
        Ok(Operation::AudioEncode {
            codec,
            bitrate_kbps,
        })
    }
}

/// Compact command-line grammar for one operation:
///   compress=<quality>:<preset>
///   convert=<codec>
///   resize=<width>x<height>
///   trim=<start>:<duration>
///   audio=<codec>:<bitrate>
impl FromStr for Operation {
    type Err = VidmillError;

    fn from_str(s: &str) -> Result<Self> {
        let (kind, params) = s.split_once('=').ok_or_else(|| {
            VidmillError::Validation(format!(
                "Invalid operation '{}'. Expected <kind>=<params>, e.g. compress=23:medium",
                s
            ))
        })?;

        match kind {
            "compress" => {
                let (quality, preset) = params.split_once(':').ok_or_else(|| {
                    VidmillError::Validation(format!(
                        "Invalid compress operation '{}'. Expected compress=<quality>:<preset>",
                        params
                    ))
                })?;
                let quality: u8 = quality.parse().map_err(|_| {
                    VidmillError::Validation(format!("Invalid compression quality '{}'", quality))
                })?;
                Operation::compress(quality, preset.parse()?)
            }
            "convert" => Ok(Operation::Convert {
                codec: params.parse()?,
            }),
            "resize" => {
                let (width, height) = params.split_once('x').ok_or_else(|| {
                    VidmillError::Validation(format!(
                        "Invalid resize operation '{}'. Expected resize=<width>x<height>",
                        params
                    ))
                })?;
                let width: u32 = width.parse().map_err(|_| {
                    VidmillError::Validation(format!("Invalid resize width '{}'", width))
                })?;
                let height: u32 = height.parse().map_err(|_| {
                    VidmillError::Validation(format!("Invalid resize height '{}'", height))
                })?;
                Operation::resize(width, height)
            }
            "trim" => {
                let (start, duration) = params.split_once(':').ok_or_else(|| {
                    VidmillError::Validation(format!(
                        "Invalid trim operation '{}'. Expected trim=<start>:<duration>",
                        params
                    ))
                })?;
                let start: f64 = start.parse().map_err(|_| {
                    VidmillError::Validation(format!("Invalid trim start '{}'", start))
                })?;
                let duration: f64 = duration.parse().map_err(|_| {
                    VidmillError::Validation(format!("Invalid trim duration '{}'", duration))
                })?;
                Operation::trim(start, duration)
            }
            "audio" => {
                let (codec, bitrate) = params.split_once(':').ok_or_else(|| {
                    VidmillError::Validation(format!(
                        "Invalid audio operation '{}'. Expected audio=<codec>:<bitrate>",
                        params
                    ))
                })?;
                let bitrate: u32 = bitrate.parse().map_err(|_| {
                    VidmillError::Validation(format!("Invalid audio bitrate '{}'", bitrate))
                })?;
                Operation::audio_encode(codec.parse()?, bitrate)
            }
            _ => Err(VidmillError::Validation(format!(
                "Unknown operation kind '{}'. Valid kinds: compress, convert, resize, trim, audio",
                kind
            ))),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Compress { quality, preset } => {
                write!(f, "compress={}:{}", quality, preset.as_str())
            }
            Operation::Convert { codec } => write!(f, "convert={}", codec.encoder()),
            Operation::Resize { width, height } => write!(f, "resize={}x{}", width, height),
            Operation::Trim {
                start_seconds,
                duration_seconds,
            } => write!(f, "trim={}:{}", start_seconds, duration_seconds),
            Operation::AudioEncode {
                codec,
                bitrate_kbps,
            } => write!(f, "audio={}:{}", codec.encoder(), bitrate_kbps),
        }
    }
}

/// Remote stream quality preference, expanded into the extractor's tiered
/// format-selector expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QualityTier {
    Best,
    P1080,
    P720,
    P480,
    AudioOnly,
}

impl QualityTier {
    /// Format-preference chain, ordered most to least specific.
    pub fn format_selector(&self) -> &'static str {
        match self {
            QualityTier::Best => {
                "bestvideo[height>=2160][ext=mp4]+bestaudio[ext=m4a]\
                 /bestvideo[height>=1440][ext=mp4]+bestaudio[ext=m4a]\
                 /bestvideo[height>=1080][ext=mp4]+bestaudio[ext=m4a]\
                 /bestvideo[height>=720][ext=mp4]+bestaudio[ext=m4a]\
                 /bestvideo[ext=mp4]+bestaudio[ext=m4a]\
                 /bestvideo+bestaudio/best"
            }
            QualityTier::P1080 => {
                "bestvideo[height<=1080][ext=mp4]+bestaudio[ext=m4a]/best[height<=1080]"
            }
            QualityTier::P720 => {
                "bestvideo[height<=720][ext=mp4]+bestaudio[ext=m4a]/best[height<=720]"
            }
            QualityTier::P480 => {
                "bestvideo[height<=480][ext=mp4]+bestaudio[ext=m4a]/best[height<=480]"
            }
            QualityTier::AudioOnly => "bestaudio[ext=m4a]/bestaudio",
        }
    }

    /// Broader constraint used for the single fallback attempt after the
    /// tier-specific selector fails.
    pub fn fallback_selector() -> &'static str {
        "bestvideo[height>=720]+bestaudio/best[height>=720]/best"
    }
}

impl FromStr for QualityTier {
    type Err = VidmillError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "best" => Ok(QualityTier::Best),
            "1080p" => Ok(QualityTier::P1080),
            "720p" => Ok(QualityTier::P720),
            "480p" => Ok(QualityTier::P480),
            "audio" | "audio-only" => Ok(QualityTier::AudioOnly),
            _ => Err(VidmillError::Validation(format!(
                "Invalid quality '{}'. Valid values: best, 1080p, 720p, 480p, audio",
                s
            ))),
        }
    }
}

/// Local-file operation chain job
#[derive(Debug, Clone)]
pub struct TransformJob {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub operations: Vec<Operation>,
}

impl TransformJob {
    pub fn validate(&self) -> Result<()> {
        if self.input_path.as_os_str().is_empty() {
            return Err(VidmillError::Validation(
                "Transform job requires an input path".to_string(),
            ));
        }
        if self.output_path.as_os_str().is_empty() {
            return Err(VidmillError::Validation(
                "Transform job requires an output path".to_string(),
            ));
        }
        if self.operations.is_empty() {
            return Err(VidmillError::Validation(
                "Transform job requires at least one operation".to_string(),
            ));
        }
        Ok(())
    }
}

/// Remote-URL download job with a fixed post-processing re-encode
#[derive(Debug, Clone)]
pub struct FetchJob {
    pub url: String,
    pub output_directory: PathBuf,
    pub quality: QualityTier,
    pub hardware_accel: bool,
}

impl FetchJob {
    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(VidmillError::Validation(
                "Fetch job requires a URL".to_string(),
            ));
        }
        if self.output_directory.as_os_str().is_empty() {
            return Err(VidmillError::Validation(
                "Fetch job requires an output directory".to_string(),
            ));
        }
        Ok(())
    }
}

/// One user-requested unit of work, consumed by exactly one controller
#[derive(Debug, Clone)]
pub enum JobSpec {
    Transform(TransformJob),
    Fetch(FetchJob),
}

impl JobSpec {
    pub fn validate(&self) -> Result<()> {
        match self {
            JobSpec::Transform(job) => job.validate(),
            JobSpec::Fetch(job) => job.validate(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_operation_kind() {
        assert_eq!(
            "compress=23:medium".parse::<Operation>().unwrap(),
            Operation::Compress {
                quality: 23,
                preset: Preset::Medium
            }
        );
        assert_eq!(
            "convert=h265".parse::<Operation>().unwrap(),
            Operation::Convert {
                codec: VideoCodec::H265
            }
        );
        assert_eq!(
            "resize=1920x1080".parse::<Operation>().unwrap(),
            Operation::Resize {
                width: 1920,
                height: 1080
            }
        );
        assert_eq!(
            "trim=5:10.5".parse::<Operation>().unwrap(),
            Operation::Trim {
                start_seconds: 5.0,
                duration_seconds: 10.5
            }
        );
        assert_eq!(
            "audio=aac:192".parse::<Operation>().unwrap(),
            Operation::AudioEncode {
                codec: AudioCodec::Aac,
                bitrate_kbps: 192
            }
        );
    }

    #[test]
    fn rejects_out_of_range_parameters() {
        assert!("compress=52:medium".parse::<Operation>().is_err());
        assert!("resize=0x1080".parse::<Operation>().is_err());
        assert!("resize=1920x5000".parse::<Operation>().is_err());
        assert!("trim=-1:10".parse::<Operation>().is_err());
        assert!("audio=aac:16".parse::<Operation>().is_err());
        assert!("audio=aac:400".parse::<Operation>().is_err());
    }

    #[test]
    fn rejects_malformed_operations() {
        assert!("compress".parse::<Operation>().is_err());
        assert!("compress=23".parse::<Operation>().is_err());
        assert!("resize=1920:1080".parse::<Operation>().is_err());
        assert!("sharpen=3".parse::<Operation>().is_err());
        assert!("convert=av1".parse::<Operation>().is_err());
    }

    #[test]
    fn transform_validation_requires_paths_and_operations() {
        let job = TransformJob {
            input_path: PathBuf::from("in.mp4"),
            output_path: PathBuf::from("out.mp4"),
            operations: vec![],
        };
        assert!(job.validate().is_err());

        let job = TransformJob {
            input_path: PathBuf::new(),
            output_path: PathBuf::from("out.mp4"),
            operations: vec!["convert=h264".parse().unwrap()],
        };
        assert!(job.validate().is_err());

        let job = TransformJob {
            input_path: PathBuf::from("in.mp4"),
            output_path: PathBuf::from("out.mp4"),
            operations: vec!["convert=h264".parse().unwrap()],
        };
        assert!(job.validate().is_ok());
    }

    #[test]
    fn fetch_validation_requires_url_and_directory() {
        let job = FetchJob {
            url: "  ".to_string(),
            output_directory: PathBuf::from("downloads"),
            quality: QualityTier::Best,
            hardware_accel: false,
        };
        assert!(job.validate().is_err());

        let job = FetchJob {
            url: "https://example.com/watch?v=abc".to_string(),
            output_directory: PathBuf::new(),
            quality: QualityTier::Best,
            hardware_accel: false,
        };
        assert!(job.validate().is_err());
    }

    #[test]
    fn tier_selectors_narrow_by_height() {
        assert!(QualityTier::P1080.format_selector().contains("height<=1080"));
        assert!(QualityTier::P720.format_selector().contains("height<=720"));
        assert!(QualityTier::P480.format_selector().contains("height<=480"));
        assert!(QualityTier::AudioOnly.format_selector().starts_with("bestaudio"));
        assert!(QualityTier::fallback_selector().ends_with("/best"));
    }
}
