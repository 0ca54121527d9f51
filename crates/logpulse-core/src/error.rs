use thiserror::Error;

/// Core error types for LogPulse
#[derive(Debug, Error)]
pub enum LogPulseError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Ingestion error: {0}")]
    Ingestion(#[from] IngestionError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Output error: {0}")]
    Output(#[from] OutputError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors specific to line ingestion
#[derive(Debug, Error)]
pub enum IngestionError {
    #[error("Failed to read input: {0}")]
    Read(String),

    #[error("Channel closed")]
    ChannelClosed,
}

/// Errors raised while aggregating or reporting
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Statistics lock poisoned")]
    LockPoisoned,

    #[error("Task '{task}' failed: {message}")]
    Task { task: &'static str, message: String },
}

impl PipelineError {
    /// Fatal errors stop the aggregator; everything else is logged per line.
    pub fn is_fatal(&self) -> bool {
        matches!(self, PipelineError::LockPoisoned)
    }
}

/// Errors specific to report sinks
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Report write error: {0}")]
    Write(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Recoverable per-line parse failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Malformed timestamp '{value}': {reason}")]
    Timestamp { value: String, reason: String },
}

/// Result type alias for LogPulse operations
pub type Result<T> = std::result::Result<T, LogPulseError>;
