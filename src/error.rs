use thiserror::Error;

#[derive(Error, Debug)]
pub enum VidmillError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Duration unavailable: {0}")]
    DurationUnavailable(String),

    #[error("Spawn error: {0}")]
    Spawn(String),

    #[error("ProcessFailed: exit code {0}")]
    ProcessFailed(i32),

    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, VidmillError>;
