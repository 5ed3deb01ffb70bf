// Remote-content extraction behind a trait boundary.
//
// The default implementation drives the yt-dlp executable; the trait exists
// so the controller's retry and cancellation behavior is testable against a
// mock. To add another extraction backend, implement RemoteExtractor and
// point the factory at it.

pub mod ytdlp;

use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use tokio::process::Command;
use tokio::sync::{mpsc, watch};
use tracing::debug;

use crate::config::FetchConfig;
use crate::error::Result;
use crate::job::FetchJob;
use crate::progress::ProgressEvent;

/// One status record from the extractor's progress stream. Records from the
/// pre-download resolution phase carry no byte counters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FetchStatus {
    pub status: Option<String>,
    pub downloaded_bytes: Option<f64>,
    pub total_bytes: Option<f64>,
    pub filename: Option<String>,
}

/// A fully-resolved extraction attempt: everything the extractor needs,
/// assembled once per attempt so the fallback retry is just a second
/// request with a broader selector.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub url: String,
    pub output_template: String,
    pub format_selector: String,
    pub postprocessor_args: Vec<String>,
    pub socket_timeout: u32,
    pub retries: u32,
    pub fragment_retries: u32,
}

impl FetchRequest {
    pub fn new(job: &FetchJob, format_selector: &str, config: &FetchConfig) -> Self {
        Self {
            url: job.url.clone(),
            output_template: output_template(&job.output_directory),
            format_selector: format_selector.to_string(),
            postprocessor_args: postprocessor_args(job.hardware_accel),
            socket_timeout: config.socket_timeout,
            retries: config.retries,
            fragment_retries: config.fragment_retries,
        }
    }
}

fn output_template(output_directory: &Path) -> String {
    format!("{}/%(title)s.%(ext)s", output_directory.display())
}

/// Post-processing re-encode parameters, one fixed bundle per encoder path.
pub fn postprocessor_args(hardware_accel: bool) -> Vec<String> {
    let args: &[&str] = if hardware_accel {
        &[
            "-c:v", "h264_nvenc", "-preset", "p4", "-tune", "hq", "-rc", "vbr", "-cq", "19",
            "-b:v", "0", "-c:a", "aac", "-b:a", "192k",
        ]
    } else {
        &[
            "-c:v", "libx264", "-preset", "medium", "-crf", "18", "-c:a", "aac", "-b:a", "192k",
        ]
    };
    args.iter().map(|s| s.to_string()).collect()
}

/// Whether a hardware encoder is usable. Any probe failure, including a
/// missing binary, means "no".
pub async fn hardware_accel_available(probe_path: &str) -> bool {
    debug!("Probing hardware encoder via {}", probe_path);
    match Command::new(probe_path).output().await {
        Ok(output) => output.status.success(),
        Err(_) => false,
    }
}

/// Main trait for remote extraction backends
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemoteExtractor: Send + Sync {
    /// Perform one extraction attempt, emitting byte-count progress events
    /// until the download finishes, fails, or the cancel signal fires.
    async fn fetch(
        &self,
        request: &FetchRequest,
        events: mpsc::Sender<ProgressEvent>,
        cancel: watch::Receiver<bool>,
    ) -> Result<()>;
}

/// Factory for extraction backends
pub struct ExtractorFactory;

impl ExtractorFactory {
    /// Create the default backend (yt-dlp subprocess)
    pub fn create_default(config: FetchConfig) -> Arc<dyn RemoteExtractor> {
        Arc::new(ytdlp::YtDlpExtractor::new(config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::QualityTier;
    use std::path::PathBuf;

    fn job(hardware_accel: bool) -> FetchJob {
        FetchJob {
            url: "https://example.com/watch?v=abc".to_string(),
            output_directory: PathBuf::from("downloads"),
            quality: QualityTier::P720,
            hardware_accel,
        }
    }

    #[test]
    fn request_carries_selector_and_template() {
        let request = FetchRequest::new(
            &job(false),
            QualityTier::P720.format_selector(),
            &FetchConfig::default(),
        );
        assert_eq!(request.output_template, "downloads/%(title)s.%(ext)s");
        assert!(request.format_selector.contains("height<=720"));
        assert_eq!(request.socket_timeout, 30);
    }

    #[test]
    fn encoder_bundles_are_mutually_exclusive() {
        let hardware = postprocessor_args(true);
        let software = postprocessor_args(false);
        assert!(hardware.contains(&"h264_nvenc".to_string()));
        assert!(!hardware.contains(&"libx264".to_string()));
        assert!(software.contains(&"libx264".to_string()));
        assert!(!software.contains(&"h264_nvenc".to_string()));
        // both end with the same audio re-encode
        assert!(hardware.ends_with(&["-b:a".to_string(), "192k".to_string()]));
        assert!(software.ends_with(&["-b:a".to_string(), "192k".to_string()]));
    }

    #[cfg(unix)]
    #[test]
    fn missing_probe_binary_means_no_hardware() {
        assert!(!tokio_test::block_on(hardware_accel_available(
            "/nonexistent/vidmill-test-gpu-probe"
        )));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn probe_success_means_hardware() {
        assert!(hardware_accel_available("true").await);
        assert!(!hardware_accel_available("false").await);
    }
}
