//! Pure parsing of the status text emitted by external processes.
//!
//! Two independent grammars share the `ProgressEvent` shape: the
//! transcoder's elapsed-time markers (`time=HH:MM:SS.ff` on its diagnostic
//! stream) and the extractor's byte-count status records. Parsing is
//! best-effort by contract: a line that does not parse yields no event and
//! never fails the job.

/// One progress observation. `fraction` is reported as computed and may
/// transiently exceed 1.0 near completion; consumers clamp for display.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    pub fraction: f64,
    pub raw: String,
}

/// Extract a completion fraction from one transcoder diagnostic line.
///
/// Looks for the first `time=` marker, reads the whitespace-delimited token
/// after it as an `H:M:S(.f)` timestamp and divides the elapsed seconds by
/// `total_duration`. Returns `None` for lines without the marker or with a
/// malformed timestamp.
pub fn time_progress(line: &str, total_duration: f64) -> Option<f64> {
    if total_duration <= 0.0 {
        return None;
    }
    let marker = line.find("time=")?;
    let token = line[marker + "time=".len()..].split_whitespace().next()?;
    let elapsed = parse_clock(token)?;
    Some(elapsed / total_duration)
}

/// Parse an `H:M:S(.f)` clock value into seconds.
fn parse_clock(token: &str) -> Option<f64> {
    let mut parts = token.split(':');
    let hours: f64 = parts.next()?.parse().ok()?;
    let minutes: f64 = parts.next()?.parse().ok()?;
    let seconds: f64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

/// Byte-count fraction: defined only when both counters are present and the
/// total is positive. Status records from the pre-download resolution phase
/// carry neither and produce no event.
pub fn byte_progress(downloaded_bytes: Option<f64>, total_bytes: Option<f64>) -> Option<f64> {
    let downloaded = downloaded_bytes?;
    let total = total_bytes?;
    if total <= 0.0 {
        return None;
    }
    Some(downloaded / total)
}
