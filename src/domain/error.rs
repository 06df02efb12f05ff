use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize)]
pub enum AppError {
    /// Empty input or a negative validation verdict. Carries the user-facing message.
    InputError(String),
    /// An uploaded document could not be read.
    ExtractionError(String),
    /// Completion output never parsed within the retry budget.
    FormatError { message: String, raw_output: String },
    LLMError(String),
    ConfigError(String),
    SecurityError(String),
    IoError(String),
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::InputError(msg) => write!(f, "{}", msg),
            AppError::ExtractionError(msg) => write!(f, "{}", msg),
            AppError::FormatError { message, .. } => write!(f, "{}", message),
            AppError::LLMError(msg) => write!(f, "LLM error: {}", msg),
            AppError::ConfigError(msg) => write!(f, "Config error: {}", msg),
            AppError::SecurityError(msg) => write!(f, "Security error: {}", msg),
            AppError::IoError(msg) => write!(f, "IO error: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::IoError(err.to_string())
    }
}

impl From<figment::Error> for AppError {
    fn from(err: figment::Error) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
