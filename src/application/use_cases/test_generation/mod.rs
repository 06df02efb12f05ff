mod combiner;
mod llm_output;
mod prompts;
mod stages;
#[cfg(test)]
mod tests;

use combiner::combine;

use crate::application::use_cases::document_extraction::{extract_all, TextExtractor};
use crate::domain::app_config::PipelineConfig;
use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::LLMConfig;
use crate::domain::pipeline::{
    unexpected_message, GenerationOutput, GenerationRequest, PipelineResult,
};
use crate::infrastructure::llm_clients::LLMClient;
use std::sync::Arc;
use tracing::{error, info, warn};

const DEFAULT_INVALID_REASON: &str =
    "The provided input does not appear to be a valid user story or requirement.";

/// Runs validate -> test cases -> test data for one request.
pub struct TestGenerationUseCase {
    llm_client: Arc<dyn LLMClient + Send + Sync>,
    extractor: Arc<dyn TextExtractor + Send + Sync>,
    llm_config: LLMConfig,
    settings: PipelineConfig,
}

impl TestGenerationUseCase {
    pub fn new(
        llm_client: Arc<dyn LLMClient + Send + Sync>,
        extractor: Arc<dyn TextExtractor + Send + Sync>,
        llm_config: LLMConfig,
        settings: PipelineConfig,
    ) -> Self {
        Self {
            llm_client,
            extractor,
            llm_config,
            settings,
        }
    }

    /// Never fails: every error, including a panic inside the pipeline task,
    /// becomes a `PipelineResult::Failure`.
    pub async fn run(self: Arc<Self>, request: GenerationRequest) -> PipelineResult {
        let task = tokio::spawn(async move { self.execute(request).await });

        match task.await {
            Ok(Ok(output)) => PipelineResult::Success(output),
            Ok(Err(err)) => {
                warn!("Generation pipeline stopped: {}", err);
                PipelineResult::from(err)
            }
            Err(join_err) => {
                error!("Generation pipeline aborted: {}", join_err);
                PipelineResult::failure(unexpected_message(&join_err.to_string()))
            }
        }
    }

    async fn execute(&self, request: GenerationRequest) -> Result<GenerationOutput> {
        let config = self
            .llm_config
            .with_model_hint(request.model_hint.as_deref(), &self.settings.allowed_models);

        let extracted = if request.files.is_empty() {
            Vec::new()
        } else {
            info!("Extracting text from {} file(s)", request.files.len());
            let extractor = Arc::clone(&self.extractor);
            let files = request.files;
            tokio::task::spawn_blocking(move || extract_all(extractor.as_ref(), &files))
                .await
                .map_err(|e| AppError::Internal(format!("Extraction task failed: {}", e)))??
        };

        let input = combine(&request.raw_text, &extracted);
        if input.is_empty() {
            return Err(AppError::InputError(
                "Please provide input via text or files.".to_string(),
            ));
        }

        info!("Validating input ({} chars, model={})", input.len(), config.model);
        if let Some(verdict) = self.validate(&config, &input).await? {
            if !verdict.is_valid {
                let reason = verdict
                    .reason
                    .filter(|reason| !reason.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_INVALID_REASON.to_string());
                info!("Input validation failed: {}", reason);
                return Err(AppError::InputError(format!("Invalid Input: {}", reason)));
            }
        }

        let test_cases = self.generate_test_cases(&config, &input).await?;
        info!("Generated {} test case(s)", test_cases.len());

        let test_data_table = self.generate_test_data(&config, &input, &test_cases).await?;
        info!("Generated test data for {} user story group(s)", test_data_table.len());

        Ok(GenerationOutput {
            test_cases,
            test_data_table,
        })
    }
}
