use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Transform a local video file through an ordered operation chain
    Transform {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,

        /// Output video file
        #[arg(short, long)]
        output: PathBuf,

        /// Operation to apply, repeatable and order-sensitive.
        /// Forms: compress=<quality>:<preset>, convert=<codec>,
        /// resize=<width>x<height>, trim=<start>:<duration>,
        /// audio=<codec>:<bitrate>
        #[arg(long = "op", value_name = "OPERATION", required = true)]
        operations: Vec<String>,
    },

    /// Apply one operation chain to every video file in a directory
    Batch {
        /// Input directory containing video files
        #[arg(short, long)]
        input_dir: PathBuf,

        /// Output directory for processed files
        #[arg(short, long)]
        output_dir: PathBuf,

        /// Operation to apply, repeatable and order-sensitive
        #[arg(long = "op", value_name = "OPERATION", required = true)]
        operations: Vec<String>,
    },

    /// Download remote video content from a URL
    Fetch {
        /// Video page URL
        #[arg(short, long)]
        url: String,

        /// Output directory for the downloaded file
        #[arg(short = 'd', long)]
        output_dir: PathBuf,

        /// Stream quality: best, 1080p, 720p, 480p, audio
        #[arg(short, long, default_value = "best")]
        quality: String,

        /// Hardware-accelerated post-processing: auto, on, off
        #[arg(long, default_value = "auto")]
        hwaccel: String,
    },
}
