use std::path::Path;
use tokio::process::Command;
use tracing::debug;

use crate::error::{Result, VidmillError};

/// Query total media duration in seconds from the prober executable.
///
/// A transform job cannot start without this value: the progress fraction is
/// elapsed time divided by it. One invocation, no retry; anything short of a
/// clean positive number is `DurationUnavailable`.
pub async fn probe_duration<P: AsRef<Path>>(prober_path: &str, input_path: P) -> Result<f64> {
    let input_path = input_path.as_ref();
    debug!("Probing duration of {}", input_path.display());

    let output = Command::new(prober_path)
        .arg("-v")
        .arg("error")
        .arg("-show_entries")
        .arg("format=duration")
        .arg("-of")
        .arg("default=noprint_wrappers=1:nokey=1")
        .arg(input_path)
        .output()
        .await
        .map_err(|e| {
            VidmillError::DurationUnavailable(format!("Failed to execute prober: {}", e))
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(VidmillError::DurationUnavailable(format!(
            "Prober failed for {}: {}",
            input_path.display(),
            stderr.trim()
        )));
    }

    parse_duration(&String::from_utf8_lossy(&output.stdout))
}

/// Parse the prober's single decimal line into a strictly positive duration.
fn parse_duration(text: &str) -> Result<f64> {
    let trimmed = text.trim();
    let duration: f64 = trimmed.parse().map_err(|_| {
        VidmillError::DurationUnavailable(format!("Unparseable duration '{}'", trimmed))
    })?;
    if !duration.is_finite() || duration <= 0.0 {
        return Err(VidmillError::DurationUnavailable(format!(
            "Non-positive duration '{}'",
            trimmed
        )));
    }
    Ok(duration)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_decimal_duration() {
        assert_eq!(parse_duration("125.400000").unwrap(), 125.4);
        assert_eq!(parse_duration("  42\n").unwrap(), 42.0);
    }

    #[test]
    fn rejects_zero_negative_and_garbage() {
        assert!(matches!(
            parse_duration("0"),
            Err(VidmillError::DurationUnavailable(_))
        ));
        assert!(matches!(
            parse_duration("-3.5"),
            Err(VidmillError::DurationUnavailable(_))
        ));
        assert!(matches!(
            parse_duration("not a number"),
            Err(VidmillError::DurationUnavailable(_))
        ));
        assert!(matches!(
            parse_duration(""),
            Err(VidmillError::DurationUnavailable(_))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn missing_prober_binary_is_duration_unavailable() {
        let result = probe_duration("/nonexistent/vidmill-test-prober", "in.mp4").await;
        assert!(matches!(
            result,
            Err(VidmillError::DurationUnavailable(_))
        ));
    }
}
