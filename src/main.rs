//! Vidmill - Video Transform and Fetch Orchestration
//!
//! This is the main entry point for the vidmill command line, which drives
//! ffmpeg operation chains and yt-dlp downloads through the task
//! controller and renders their progress.

use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tracing::{info, warn, Level};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use walkdir::WalkDir;

use vidmill::cli::{Args, Commands};
use vidmill::config::Config;
use vidmill::controller::{JobEvent, JobHandle, TaskController, TaskOutcome};
use vidmill::error::VidmillError;
use vidmill::fetch::hardware_accel_available;
use vidmill::job::{FetchJob, JobSpec, Operation, QualityTier, TransformJob};

const VIDEO_EXTENSIONS: [&str; 7] = ["mp4", "avi", "mov", "mkv", "wmv", "flv", "webm"];

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    setup_logging(args.verbose)?;

    let config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if std::path::Path::new("config.toml").exists() {
                info!("Found config.toml in current directory, loading...");
                Config::from_file("config.toml")?
            } else {
                Config::default()
            }
        }
    };

    let controller = TaskController::new(config.clone());

    match args.command {
        Commands::Transform {
            input,
            output,
            operations,
        } => {
            let operations = parse_operations(&operations)?;
            let chain = operations
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            info!(
                "Transforming {} -> {} [{}]",
                input.display(),
                output.display(),
                chain
            );

            let handle = controller.submit(JobSpec::Transform(TransformJob {
                input_path: input,
                output_path: output,
                operations,
            }));
            finish(drive_job(handle).await?)?;
        }
        Commands::Batch {
            input_dir,
            output_dir,
            operations,
        } => {
            let operations = parse_operations(&operations)?;
            if !input_dir.is_dir() {
                return Err(VidmillError::Validation(
                    "Input path is not a directory".to_string(),
                )
                .into());
            }
            tokio::fs::create_dir_all(&output_dir).await?;

            let video_files = find_video_files(&input_dir);
            info!("Found {} video files to process", video_files.len());

            let mut succeeded = 0usize;
            let mut failed = 0usize;
            for input in video_files {
                let output = match input.file_name() {
                    Some(name) => output_dir.join(name),
                    None => continue,
                };
                println!("Processing {}", input.display());
                let handle = controller.submit(JobSpec::Transform(TransformJob {
                    input_path: input.clone(),
                    output_path: output,
                    operations: operations.clone(),
                }));
                match drive_job(handle).await? {
                    TaskOutcome::Succeeded => {
                        info!("Successfully processed: {}", input.display());
                        succeeded += 1;
                    }
                    TaskOutcome::Failed { reason } => {
                        warn!("Failed to process {}: {}", input.display(), reason);
                        failed += 1;
                    }
                    TaskOutcome::Cancelled => {
                        println!("Batch cancelled");
                        break;
                    }
                }
            }
            println!("Batch finished: {} succeeded, {} failed", succeeded, failed);
        }
        Commands::Fetch {
            url,
            output_dir,
            quality,
            hwaccel,
        } => {
            let quality: QualityTier = quality.parse()?;
            let hardware_accel = match hwaccel.to_lowercase().as_str() {
                "on" => true,
                "off" => false,
                "auto" => hardware_accel_available(&config.fetch.gpu_probe_path).await,
                other => {
                    return Err(VidmillError::Validation(format!(
                        "Invalid hwaccel mode '{}'. Valid modes: auto, on, off",
                        other
                    ))
                    .into())
                }
            };
            info!(
                "Fetching {} into {} (hardware acceleration: {})",
                url,
                output_dir.display(),
                hardware_accel
            );
            tokio::fs::create_dir_all(&output_dir).await?;

            let handle = controller.submit(JobSpec::Fetch(FetchJob {
                url,
                output_directory: output_dir,
                quality,
                hardware_accel,
            }));
            finish(drive_job(handle).await?)?;
        }
    }

    Ok(())
}

/// Render one job's event stream as a progress bar, forwarding Ctrl-C as a
/// cancellation request and draining until the terminal outcome arrives.
async fn drive_job(mut handle: JobHandle) -> Result<TaskOutcome> {
    let bar = ProgressBar::new(100);
    bar.set_style(ProgressStyle::with_template(
        "{bar:40.cyan/blue} {pos:>3}% {msg}",
    )?);

    loop {
        tokio::select! {
            event = handle.next_event() => match event {
                Some(JobEvent::Progress(progress)) => {
                    // raw fractions can transiently exceed 1.0; clamp for display only
                    let percent = (progress.fraction.clamp(0.0, 1.0) * 100.0) as u64;
                    bar.set_position(percent);
                }
                Some(JobEvent::Finished(outcome)) => {
                    bar.finish_and_clear();
                    return Ok(outcome);
                }
                None => {
                    bar.finish_and_clear();
                    return Err(anyhow::anyhow!("Job {} ended without an outcome", handle.id()));
                }
            },
            _ = tokio::signal::ctrl_c() => {
                bar.set_message("cancelling...");
                handle.cancel();
            }
        }
    }
}

fn finish(outcome: TaskOutcome) -> Result<()> {
    match outcome {
        TaskOutcome::Succeeded => {
            println!("Completed successfully");
            Ok(())
        }
        TaskOutcome::Failed { reason } => Err(anyhow::anyhow!("Job failed: {}", reason)),
        TaskOutcome::Cancelled => {
            println!("Cancelled");
            Ok(())
        }
    }
}

fn parse_operations(specs: &[String]) -> Result<Vec<Operation>> {
    specs
        .iter()
        .map(|spec| spec.parse::<Operation>().map_err(Into::into))
        .collect()
}

fn find_video_files(input_dir: &Path) -> Vec<PathBuf> {
    let mut video_files: Vec<PathBuf> = WalkDir::new(input_dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
                .unwrap_or(false)
        })
        .map(|entry| entry.path().to_path_buf())
        .collect();
    video_files.sort();
    video_files
}


/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<()> {
    let vidmill_dir = std::env::current_dir()?.join(".vidmill");
    let log_dir = vidmill_dir.join("log");
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = rolling::daily(&log_dir, "vidmill.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer().with_target(false);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}
