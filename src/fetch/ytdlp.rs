use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use super::{FetchRequest, FetchStatus, RemoteExtractor};
use crate::config::FetchConfig;
use crate::error::{Result, VidmillError};
use crate::progress::{self, ProgressEvent};
use crate::supervise::{cancelled, DiagnosticSource, ProcessSupervisor};

/// Extraction backend driving the yt-dlp executable. Progress is read from
/// stdout in newline mode, one JSON status record per line.
pub struct YtDlpExtractor {
    config: FetchConfig,
}

impl YtDlpExtractor {
    pub fn new(config: FetchConfig) -> Self {
        Self { config }
    }

    fn build_args(&self, request: &FetchRequest) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "-f".to_string(),
            request.format_selector.clone(),
            request.url.clone(),
            "-o".to_string(),
            request.output_template.clone(),
            "--merge-output-format".to_string(),
            "mp4".to_string(),
            "--no-playlist".to_string(),
            "--newline".to_string(),
            "--no-warnings".to_string(),
            "--progress".to_string(),
            "--progress-template".to_string(),
            "download:%(progress)j".to_string(),
            "--no-check-certificates".to_string(),
            "--socket-timeout".to_string(),
            request.socket_timeout.to_string(),
            "--retries".to_string(),
            request.retries.to_string(),
            "--fragment-retries".to_string(),
            request.fragment_retries.to_string(),
        ];
        if !request.postprocessor_args.is_empty() {
            args.push("--postprocessor-args".to_string());
            args.push(format!("ffmpeg:{}", request.postprocessor_args.join(" ")));
        }
        args
    }
}

/// Map one stdout line to a progress event. Anything that is not a
/// downloading-phase record with both byte counters yields nothing.
fn progress_from_line(line: &str) -> Option<ProgressEvent> {
    let trimmed = line.trim();
    if !trimmed.starts_with('{') {
        return None;
    }
    let status: FetchStatus = serde_json::from_str(trimmed).ok()?;
    if status.status.as_deref() != Some("downloading") {
        return None;
    }
    let fraction = progress::byte_progress(status.downloaded_bytes, status.total_bytes)?;
    Some(ProgressEvent {
        fraction,
        raw: trimmed.to_string(),
    })
}

#[async_trait]
impl RemoteExtractor for YtDlpExtractor {
    async fn fetch(
        &self,
        request: &FetchRequest,
        events: mpsc::Sender<ProgressEvent>,
        mut cancel: watch::Receiver<bool>,
    ) -> Result<()> {
        info!(
            "Fetching {} with selector '{}'",
            request.url, request.format_selector
        );

        let args = self.build_args(request);
        let mut supervisor =
            ProcessSupervisor::spawn(&self.config.ytdlp_path, &args, DiagnosticSource::Stdout)?;

        loop {
            tokio::select! {
                line = supervisor.next_diagnostic_line() => match line? {
                    Some(line) => {
                        if let Some(event) = progress_from_line(&line) {
                            let _ = events.send(event).await;
                        }
                    }
                    None => break,
                },
                _ = cancelled(&mut cancel) => {
                    debug!("Cancelling extractor for {}", request.url);
                    supervisor.cancel().await?;
                    return Err(VidmillError::Cancelled);
                }
            }
        }

        let status = supervisor.wait().await?;
        if !status.success() {
            return Err(VidmillError::Fetch(format!(
                "Extractor exited with code {}",
                status.code().unwrap_or(-1)
            )));
        }

        info!("Fetch of {} completed", request.url);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{FetchJob, QualityTier};
    use std::path::PathBuf;

    fn request(hardware_accel: bool) -> FetchRequest {
        let job = FetchJob {
            url: "https://example.com/watch?v=abc".to_string(),
            output_directory: PathBuf::from("downloads"),
            quality: QualityTier::P1080,
            hardware_accel,
        };
        FetchRequest::new(&job, job.quality.format_selector(), &FetchConfig::default())
    }

    #[test]
    fn args_carry_selector_template_and_progress_mode() {
        let extractor = YtDlpExtractor::new(FetchConfig::default());
        let args = extractor.build_args(&request(false));

        let selector = args.iter().position(|a| a == "-f").unwrap();
        assert!(args[selector + 1].contains("height<=1080"));
        assert!(args.contains(&"downloads/%(title)s.%(ext)s".to_string()));
        assert!(args.contains(&"--newline".to_string()));
        assert!(args.contains(&"download:%(progress)j".to_string()));
        assert!(args.contains(&"--no-playlist".to_string()));
    }

    #[test]
    fn postprocessor_bundle_follows_hardware_flag() {
        let extractor = YtDlpExtractor::new(FetchConfig::default());

        let software = extractor.build_args(&request(false)).join(" ");
        assert!(software.contains("ffmpeg:-c:v libx264 -preset medium -crf 18"));

        let hardware = extractor.build_args(&request(true)).join(" ");
        assert!(hardware.contains("ffmpeg:-c:v h264_nvenc -preset p4"));
    }

    #[test]
    fn downloading_records_become_events() {
        let line = r#"{"status": "downloading", "downloaded_bytes": 50, "total_bytes": 200}"#;
        let event = progress_from_line(line).unwrap();
        assert_eq!(event.fraction, 0.25);
        assert_eq!(event.raw, line);
    }

    #[test]
    fn incomplete_or_foreign_lines_are_skipped() {
        // metadata-resolution phase: no total yet
        assert!(progress_from_line(r#"{"status": "downloading", "downloaded_bytes": 50}"#).is_none());
        assert!(progress_from_line(r#"{"status": "finished", "downloaded_bytes": 200, "total_bytes": 200}"#).is_none());
        assert!(progress_from_line("[youtube] abc: Downloading webpage").is_none());
        assert!(progress_from_line("{not json").is_none());
        assert!(progress_from_line("").is_none());
    }
}
