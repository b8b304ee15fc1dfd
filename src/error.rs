use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NarrateError {
    #[error("Malformed script: {0}")]
    MalformedInput(String),

    #[error("Segment {segment}: {message}")]
    SegmentSchema { segment: usize, message: String },

    #[error("Segment {segment}: invalid timestamp format '{value}'")]
    TimestampFormat { segment: usize, value: String },

    #[error("Segment {segment}: start time ({start:.3}s) must be before end time ({end:.3}s)")]
    SegmentOrdering { segment: usize, start: f64, end: f64 },

    #[error("Invalid video duration: {0}")]
    InvalidVideoDuration(f64),

    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to export audio to {}: {source}", path.display())]
    Export {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Audio decoding failed: {0}")]
    AudioDecode(String),

    #[error("Media tool failed: {0}")]
    Media(String),

    #[error("Speech synthesis failed: {0}")]
    Synthesis(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Pipeline cancelled")]
    Cancelled,

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, NarrateError>;
