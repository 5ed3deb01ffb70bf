//! Subprocess ownership: spawn, drain the diagnostic stream, reap.
//!
//! The transcoder reports status on stderr, the extractor on stdout; the
//! supervisor pipes whichever stream carries diagnostics and discards the
//! other. Line framing lives in `LineAccumulator`, kept free of I/O so the
//! splitting rules are testable on their own: the transcoder separates
//! in-place progress updates with carriage returns rather than newlines, so
//! both CR and LF terminate a line.

use std::process::Stdio;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio::sync::watch;
use tracing::debug;

use crate::error::{Result, VidmillError};

/// Resolve once the cancel signal fires. A dropped sender means the job
/// handle went away without cancelling; the job keeps running, so the
/// future never resolves in that case.
pub async fn cancelled(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Which stream the external process uses for status text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticSource {
    Stdout,
    Stderr,
}

/// Byte accumulator that frames incoming chunks into lines on CR or LF.
#[derive(Debug, Default)]
pub struct LineAccumulator {
    pending: Vec<u8>,
    lines: std::collections::VecDeque<String>,
}

impl LineAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk; complete lines become available via `pop_line`.
    pub fn extend(&mut self, chunk: &[u8]) {
        for &byte in chunk {
            if byte == b'\r' || byte == b'\n' {
                let line = String::from_utf8_lossy(&self.pending).into_owned();
                self.pending.clear();
                self.lines.push_back(line);
            } else {
                self.pending.push(byte);
            }
        }
    }

    pub fn pop_line(&mut self) -> Option<String> {
        self.lines.pop_front()
    }

    /// Flush the trailing unterminated segment at end of stream.
    pub fn take_remainder(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let line = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        Some(line)
    }
}

enum DiagnosticStream {
    Stdout(ChildStdout),
    Stderr(ChildStderr),
}

impl DiagnosticStream {
    async fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            DiagnosticStream::Stdout(stream) => stream.read(buf).await,
            DiagnosticStream::Stderr(stream) => stream.read(buf).await,
        }
    }
}

/// Owns one external process for the lifetime of a job.
pub struct ProcessSupervisor {
    child: Child,
    stream: DiagnosticStream,
    accumulator: LineAccumulator,
    eof: bool,
}

impl ProcessSupervisor {
    /// Spawn the process with the selected stream piped for diagnostics.
    /// Fails with `Spawn` when the executable cannot be launched.
    pub fn spawn(program: &str, args: &[String], source: DiagnosticSource) -> Result<Self> {
        debug!("Spawning {} {:?}", program, args);

        let mut command = Command::new(program);
        command.args(args).stdin(Stdio::null()).kill_on_drop(true);
        match source {
            DiagnosticSource::Stdout => command.stdout(Stdio::piped()).stderr(Stdio::null()),
            DiagnosticSource::Stderr => command.stdout(Stdio::null()).stderr(Stdio::piped()),
        };

        let mut child = command
            .spawn()
            .map_err(|e| VidmillError::Spawn(format!("Failed to launch {}: {}", program, e)))?;

        let stream = match source {
            DiagnosticSource::Stdout => child
                .stdout
                .take()
                .map(DiagnosticStream::Stdout)
                .ok_or_else(|| {
                    VidmillError::Spawn(format!("No stdout pipe for {}", program))
                })?,
            DiagnosticSource::Stderr => child
                .stderr
                .take()
                .map(DiagnosticStream::Stderr)
                .ok_or_else(|| {
                    VidmillError::Spawn(format!("No stderr pipe for {}", program))
                })?,
        };

        Ok(Self {
            child,
            stream,
            accumulator: LineAccumulator::new(),
            eof: false,
        })
    }

    /// Next line of diagnostic text, or `None` once the process has closed
    /// its stream and all buffered output is drained.
    pub async fn next_diagnostic_line(&mut self) -> Result<Option<String>> {
        loop {
            if let Some(line) = self.accumulator.pop_line() {
                return Ok(Some(line));
            }
            if self.eof {
                return Ok(self.accumulator.take_remainder());
            }

            let mut chunk = [0u8; 4096];
            let read = self.stream.read(&mut chunk).await?;
            if read == 0 {
                self.eof = true;
            } else {
                self.accumulator.extend(&chunk[..read]);
            }
        }
    }

    /// Block until the process exits. Must follow diagnostic draining so
    /// buffered output cannot fill the pipe and stall the child.
    pub async fn wait(&mut self) -> Result<std::process::ExitStatus> {
        Ok(self.child.wait().await?)
    }

    /// Forcibly terminate and reap the process. Idempotent, and safe to call
    /// while the process is already exiting.
    pub async fn cancel(&mut self) -> Result<()> {
        // start_kill errors when the process already exited; wait reaps
        // either way.
        let _ = self.child.start_kill();
        let _ = self.child.wait().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_on_both_cr_and_lf() {
        let mut acc = LineAccumulator::new();
        acc.extend(b"first line\rsecond line\nthird");
        assert_eq!(acc.pop_line().as_deref(), Some("first line"));
        assert_eq!(acc.pop_line().as_deref(), Some("second line"));
        assert_eq!(acc.pop_line(), None);
        assert_eq!(acc.take_remainder().as_deref(), Some("third"));
        assert_eq!(acc.take_remainder(), None);
    }

    #[test]
    fn tolerates_chunks_split_mid_token() {
        let mut acc = LineAccumulator::new();
        acc.extend(b"frame=120 ti");
        assert_eq!(acc.pop_line(), None);
        acc.extend(b"me=00:01:02.50\r");
        assert_eq!(
            acc.pop_line().as_deref(),
            Some("frame=120 time=00:01:02.50")
        );
    }

    #[test]
    fn crlf_produces_an_intervening_empty_line() {
        let mut acc = LineAccumulator::new();
        acc.extend(b"one\r\ntwo\n");
        assert_eq!(acc.pop_line().as_deref(), Some("one"));
        assert_eq!(acc.pop_line().as_deref(), Some(""));
        assert_eq!(acc.pop_line().as_deref(), Some("two"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn drains_diagnostics_then_reports_exit() {
        let mut supervisor = ProcessSupervisor::spawn(
            "/bin/sh",
            &[
                "-c".to_string(),
                "printf 'alpha\\nbeta\\n' >&2".to_string(),
            ],
            DiagnosticSource::Stderr,
        )
        .unwrap();

        let mut lines = Vec::new();
        while let Some(line) = supervisor.next_diagnostic_line().await.unwrap() {
            lines.push(line);
        }
        assert_eq!(lines, vec!["alpha", "beta"]);

        let status = supervisor.wait().await.unwrap();
        assert!(status.success());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn spawn_of_missing_executable_is_a_spawn_error() {
        let result = ProcessSupervisor::spawn(
            "/nonexistent/vidmill-test-binary",
            &[],
            DiagnosticSource::Stderr,
        );
        assert!(matches!(result, Err(VidmillError::Spawn(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn cancel_is_idempotent_and_reaps() {
        let mut supervisor = ProcessSupervisor::spawn(
            "/bin/sh",
            &["-c".to_string(), "sleep 30".to_string()],
            DiagnosticSource::Stderr,
        )
        .unwrap();

        supervisor.cancel().await.unwrap();
        supervisor.cancel().await.unwrap();

        let status = supervisor.wait().await.unwrap();
        assert!(!status.success());
    }
}
