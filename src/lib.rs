//! Vidmill - Video Transform and Fetch Orchestration
//!
//! A command-line tool and library for transforming local video files
//! through an ordered chain of operations and downloading remote video
//! content, by supervising the ffmpeg and yt-dlp executables and turning
//! their line-oriented status output into progress events.

pub mod cli;
pub mod config;
pub mod controller;
pub mod error;
pub mod fetch;
pub mod job;
pub mod media;
pub mod progress;
pub mod supervise;
