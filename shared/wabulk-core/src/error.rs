//! Error types for the wabulk workspace

use thiserror::Error;

pub type Result<T> = std::result::Result<T, WabulkError>;

#[derive(Error, Debug)]
pub enum WabulkError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("CSV error: {0}")]
    Csv(String),

    #[error("Upload error: {0}")]
    Upload(String),

    #[error("A send is already in progress")]
    SendInProgress,
}

impl WabulkError {
    /// Short code used when an error is written into the sending log details.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG_ERROR",
            Self::Network(_) => "NETWORK_ERROR",
            Self::Auth(_) => "AUTH_ERROR",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Backend(_) => "BACKEND_ERROR",
            Self::Parse(_) => "PARSE_ERROR",
            Self::Csv(_) => "CSV_ERROR",
            Self::Upload(_) => "UPLOAD_ERROR",
            Self::SendInProgress => "SEND_IN_PROGRESS",
        }
    }

    /// Validation errors are reported to the user before any request is made.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::SendInProgress)
    }
}

impl From<std::io::Error> for WabulkError {
    fn from(err: std::io::Error) -> Self {
        WabulkError::Network(err.to_string())
    }
}
