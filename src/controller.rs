//! Per-job state machine: validate, probe, run, report.
//!
//! Each submitted job runs on its own spawned task and talks back over a
//! channel owned by the `JobHandle`: zero or more progress events followed
//! by exactly one terminal outcome, never anything after it. One controller
//! job per handle; concurrent jobs are independent submissions.

use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{Result, VidmillError};
use crate::fetch::{ExtractorFactory, FetchRequest, RemoteExtractor};
use crate::job::{FetchJob, JobSpec, QualityTier, TransformJob};
use crate::media::{probe_duration, MediaCommandBuilder};
use crate::progress::{self, ProgressEvent};
use crate::supervise::{cancelled, DiagnosticSource, ProcessSupervisor};

/// Terminal result of one job. Exactly one per job.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome {
    Succeeded,
    Failed { reason: String },
    Cancelled,
}

/// Notification stream element delivered to the submitting caller
#[derive(Debug, Clone, PartialEq)]
pub enum JobEvent {
    Progress(ProgressEvent),
    Finished(TaskOutcome),
}

/// Caller's side of one running job. Dropping the handle detaches from the
/// job without cancelling it.
pub struct JobHandle {
    id: Uuid,
    events: mpsc::Receiver<JobEvent>,
    cancel: watch::Sender<bool>,
}

impl JobHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Next notification; `None` after the terminal outcome was consumed.
    pub async fn next_event(&mut self) -> Option<JobEvent> {
        self.events.recv().await
    }

    /// Request cancellation. Idempotent and callable from any task; the
    /// job's child process is killed and reaped before `Cancelled` is
    /// reported.
    pub fn cancel(&self) {
        let _ = self.cancel.send(true);
    }
}

/// Submits jobs and owns the collaborator configuration shared across them
pub struct TaskController {
    config: Config,
    extractor: Arc<dyn RemoteExtractor>,
}

impl TaskController {
    pub fn new(config: Config) -> Self {
        let extractor = ExtractorFactory::create_default(config.fetch.clone());
        Self { config, extractor }
    }

    /// Construct with a specific extraction backend
    pub fn with_extractor(config: Config, extractor: Arc<dyn RemoteExtractor>) -> Self {
        Self { config, extractor }
    }

    /// Start one job. Returns immediately; all work, including validation,
    /// happens on the job's own task and is reported via the handle.
    pub fn submit(&self, spec: JobSpec) -> JobHandle {
        let id = Uuid::new_v4();
        let (event_tx, event_rx) = mpsc::channel(64);
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let config = self.config.clone();
        let extractor = Arc::clone(&self.extractor);

        tokio::spawn(async move {
            let result = run_job(id, spec, &config, extractor, &event_tx, cancel_rx).await;
            let outcome = match result {
                Ok(()) => {
                    info!("Job {} succeeded", id);
                    TaskOutcome::Succeeded
                }
                Err(VidmillError::Cancelled) => {
                    info!("Job {} cancelled", id);
                    TaskOutcome::Cancelled
                }
                Err(e) => {
                    warn!("Job {} failed: {}", id, e);
                    TaskOutcome::Failed {
                        reason: e.to_string(),
                    }
                }
            };
            let _ = event_tx.send(JobEvent::Finished(outcome)).await;
        });

        JobHandle {
            id,
            events: event_rx,
            cancel: cancel_tx,
        }
    }
}

async fn run_job(
    id: Uuid,
    spec: JobSpec,
    config: &Config,
    extractor: Arc<dyn RemoteExtractor>,
    events: &mpsc::Sender<JobEvent>,
    cancel: watch::Receiver<bool>,
) -> Result<()> {
    spec.validate()?;

    match spec {
        JobSpec::Transform(job) => run_transform(id, job, config, events, cancel).await,
        JobSpec::Fetch(job) => run_fetch(id, job, config, extractor, events, cancel).await,
    }
}

async fn run_transform(
    id: Uuid,
    job: TransformJob,
    config: &Config,
    events: &mpsc::Sender<JobEvent>,
    mut cancel: watch::Receiver<bool>,
) -> Result<()> {
    let duration = probe_duration(&config.media.ffprobe_path, &job.input_path).await?;
    info!(
        "Job {}: {} -> {} ({} operations, {:.1}s of media)",
        id,
        job.input_path.display(),
        job.output_path.display(),
        job.operations.len(),
        duration
    );

    let command = MediaCommandBuilder::new(&config.media.ffmpeg_path).transform(&job);
    let mut supervisor = ProcessSupervisor::spawn(
        &command.binary_path,
        &command.args,
        DiagnosticSource::Stderr,
    )?;

    loop {
        tokio::select! {
            line = supervisor.next_diagnostic_line() => match line? {
                Some(line) => {
                    if let Some(fraction) = progress::time_progress(&line, duration) {
                        let event = ProgressEvent {
                            fraction,
                            raw: line,
                        };
                        let _ = events.send(JobEvent::Progress(event)).await;
                    }
                }
                None => break,
            },
            _ = cancelled(&mut cancel) => {
                supervisor.cancel().await?;
                return Err(VidmillError::Cancelled);
            }
        }
    }

    let status = supervisor.wait().await?;
    if !status.success() {
        return Err(VidmillError::ProcessFailed(status.code().unwrap_or(-1)));
    }
    Ok(())
}

async fn run_fetch(
    id: Uuid,
    job: FetchJob,
    config: &Config,
    extractor: Arc<dyn RemoteExtractor>,
    events: &mpsc::Sender<JobEvent>,
    cancel: watch::Receiver<bool>,
) -> Result<()> {
    let (progress_tx, mut progress_rx) = mpsc::channel::<ProgressEvent>(64);
    let forward = events.clone();
    let forwarder = tokio::spawn(async move {
        while let Some(event) = progress_rx.recv().await {
            let _ = forward.send(JobEvent::Progress(event)).await;
        }
    });

    let primary = FetchRequest::new(&job, job.quality.format_selector(), &config.fetch);
    let result = match extractor
        .fetch(&primary, progress_tx.clone(), cancel.clone())
        .await
    {
        Ok(()) => Ok(()),
        Err(VidmillError::Cancelled) => Err(VidmillError::Cancelled),
        Err(first) => {
            // One bounded fallback with a broader constraint, then terminal.
            warn!(
                "Job {}: primary fetch attempt failed ({}), retrying with broadened selector",
                id, first
            );
            let fallback = FetchRequest::new(&job, QualityTier::fallback_selector(), &config.fetch);
            extractor
                .fetch(&fallback, progress_tx.clone(), cancel.clone())
                .await
        }
    };

    // Let buffered progress drain before the terminal outcome is emitted.
    drop(progress_tx);
    let _ = forwarder.await;

    result
}
