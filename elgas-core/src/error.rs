use thiserror::Error;

/// Main error type for ELGAS gateway operations
#[derive(Error, Debug)]
pub enum ElgasError {
    #[error("Connection error: {0}")]
    Connection(#[from] std::io::Error),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Security error: {0}")]
    Security(String),

    #[error("Timeout")]
    Timeout,

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Frame invalid: {0}")]
    FrameInvalid(String),

    #[error("Readout settings unavailable: HTTP {status}: {body}")]
    Settings { status: u16, body: String },

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Result type alias for ELGAS gateway operations
pub type ElgasResult<T> = Result<T, ElgasError>;
