use super::llm_output::prepare_json;
use super::prompts::{
    build_test_case_system_prompt, build_test_case_user_prompt, build_test_data_system_prompt,
    build_test_data_user_prompt, build_validation_system_prompt, build_validation_user_prompt,
};
use super::TestGenerationUseCase;
use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::LLMConfig;
use crate::domain::test_artifacts::{
    test_data_from_values, TestCaseSet, TestDataSet, ValidationVerdict,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

impl TestGenerationUseCase {
    /// One completion call, bounded by the configured timeout.
    async fn complete(&self, config: &LLMConfig, system: &str, user: &str) -> Result<String> {
        let limit = Duration::from_secs(config.timeout_secs.max(1));
        tokio::time::timeout(limit, self.llm_client.generate(config, system, user))
            .await
            .map_err(|_| {
                AppError::LLMError(format!(
                    "Completion timed out after {}s",
                    limit.as_secs()
                ))
            })?
    }

    /// Classifies the input. `None` means the verdict could not be parsed.
    pub(crate) async fn validate(
        &self,
        config: &LLMConfig,
        input: &str,
    ) -> Result<Option<ValidationVerdict>> {
        let raw_output = self
            .complete(
                config,
                &build_validation_system_prompt(),
                &build_validation_user_prompt(input),
            )
            .await?;

        match serde_json::from_str::<ValidationVerdict>(&prepare_json(&raw_output)) {
            Ok(verdict) => Ok(Some(verdict)),
            Err(e) => {
                warn!(
                    "Could not parse validation response ({}). Proceeding with generation.",
                    e
                );
                Ok(None)
            }
        }
    }

    pub(crate) async fn generate_test_cases(
        &self,
        config: &LLMConfig,
        input: &str,
    ) -> Result<TestCaseSet> {
        let values: Vec<Value> = self
            .parse_with_retries(
                config,
                "test case",
                &build_test_case_system_prompt(),
                &build_test_case_user_prompt(input),
            )
            .await?;
        let set = TestCaseSet::from_values(values);
        if set.is_empty() {
            warn!("Test case stage returned an empty list");
        }
        Ok(set)
    }

    pub(crate) async fn generate_test_data(
        &self,
        config: &LLMConfig,
        input: &str,
        test_cases: &TestCaseSet,
    ) -> Result<TestDataSet> {
        let values: Vec<Value> = self
            .parse_with_retries(
                config,
                "test data",
                &build_test_data_system_prompt(),
                &build_test_data_user_prompt(input, test_cases),
            )
            .await?;
        Ok(test_data_from_values(values))
    }

    /// Requests the same prompt until its output parses as `T`, at most
    /// `max_retries` times. Attempts run strictly one after another.
    /// Stages ask for `Vec<Value>`, so only non-JSON or a non-array fails an attempt.
    async fn parse_with_retries<T: DeserializeOwned>(
        &self,
        config: &LLMConfig,
        label: &str,
        system: &str,
        user: &str,
    ) -> Result<T> {
        let max_attempts = self.settings.max_retries.max(1);
        let mut last_output = String::new();

        for attempt in 1..=max_attempts {
            info!("{} generation attempt {}/{}", label, attempt, max_attempts);
            let raw_output = self.complete(config, system, user).await?;

            match serde_json::from_str::<T>(&prepare_json(&raw_output)) {
                Ok(parsed) => {
                    info!("Obtained valid {} JSON on attempt {}", label, attempt);
                    return Ok(parsed);
                }
                Err(e) => {
                    warn!("Attempt {} failed: invalid {} JSON: {}", attempt, label, e);
                    debug!("Rejected {} output: {}", label, raw_output);
                    last_output = raw_output;
                }
            }
        }

        Err(AppError::FormatError {
            message: format!(
                "Failed to get valid {} JSON after {} attempts.",
                label, max_attempts
            ),
            raw_output: last_output,
        })
    }
}
