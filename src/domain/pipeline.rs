use crate::domain::error::AppError;
use crate::domain::test_artifacts::{TestCaseSet, TestDataSet};
use serde::{Deserialize, Serialize};

/// A document uploaded alongside the requirement text.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct GenerationRequest {
    pub raw_text: String,
    pub files: Vec<UploadedFile>,
    pub model_hint: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationOutput {
    pub test_cases: TestCaseSet,
    pub test_data_table: TestDataSet,
}

/// Result envelope of one pipeline run. Exactly one shape is ever populated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum PipelineResult {
    Success(GenerationOutput),
    Failure {
        error: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        raw_output: Option<String>,
    },
}

impl PipelineResult {
    pub fn failure(error: impl Into<String>) -> Self {
        PipelineResult::Failure {
            error: error.into(),
            raw_output: None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, PipelineResult::Success(_))
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            PipelineResult::Failure { error, .. } => Some(error),
            PipelineResult::Success(_) => None,
        }
    }
}

impl From<AppError> for PipelineResult {
    fn from(err: AppError) -> Self {
        match err {
            AppError::InputError(message) | AppError::ExtractionError(message) => {
                PipelineResult::failure(message)
            }
            AppError::FormatError {
                message,
                raw_output,
            } => PipelineResult::Failure {
                error: message,
                raw_output: Some(raw_output),
            },
            other => PipelineResult::failure(unexpected_message(&other.to_string())),
        }
    }
}

pub fn unexpected_message(detail: &str) -> String {
    format!("An unexpected error occurred during generation: {}", detail)
}
