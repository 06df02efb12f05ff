use super::TestGenerationUseCase;
use crate::application::use_cases::document_extraction::{DocumentTextExtractor, TextExtractor};
use crate::domain::app_config::PipelineConfig;
use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::LLMConfig;
use crate::domain::pipeline::{GenerationRequest, PipelineResult, UploadedFile};
use crate::domain::test_artifacts::TestCaseType;
use crate::infrastructure::llm_clients::LLMClient;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Validate,
    TestCases,
    TestData,
}

#[derive(Debug, Clone)]
struct Call {
    stage: Stage,
    model: String,
    user: String,
}

enum Reply {
    Text(String),
    Fail(AppError),
    Panic,
    Hang,
}

/// Replies with canned completions in order and records every call.
struct ScriptedClient {
    replies: Mutex<VecDeque<Reply>>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedClient {
    fn new(replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn stages(&self) -> Vec<Stage> {
        self.calls.lock().unwrap().iter().map(|call| call.stage).collect()
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

fn stage_of(system: &str) -> Stage {
    if system.contains("business analyst") {
        Stage::Validate
    } else if system.contains("QA data specialist") {
        Stage::TestData
    } else {
        Stage::TestCases
    }
}

#[async_trait]
impl LLMClient for ScriptedClient {
    async fn generate(&self, config: &LLMConfig, system: &str, user: &str) -> Result<String> {
        self.calls.lock().unwrap().push(Call {
            stage: stage_of(system),
            model: config.model.clone(),
            user: user.to_string(),
        });
        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            Some(Reply::Text(text)) => Ok(text),
            Some(Reply::Fail(err)) => Err(err),
            Some(Reply::Panic) => panic!("completion backend crashed"),
            Some(Reply::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(String::new())
            }
            None => Err(AppError::LLMError("no scripted reply left".to_string())),
        }
    }

    async fn list_models(&self, _config: &LLMConfig) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

struct PanickingExtractor;

impl TextExtractor for PanickingExtractor {
    fn extract(&self, _file: &UploadedFile) -> Result<Option<String>> {
        panic!("extractor crashed");
    }
}

fn text(value: &str) -> Reply {
    Reply::Text(value.to_string())
}

const VALID: &str =
    r#"{"is_valid": true, "reason": "The input appears to be a valid software requirement."}"#;

const PASSWORD_RESET_CASES: &str = r#"```json
[
  {
    "id": 1,
    "title": "Reset link sent to registered email",
    "type": "positive",
    "description": "Verify a reset email is sent for a registered address.",
    "preconditions": "User has an account.",
    "testSteps": ["Open 'Forgot password'.", "Enter registered email.", "Submit."],
    "expectedResult": "Reset email is delivered.",
    "priority": "High"
  },
  {
    "id": 2,
    "title": "Unregistered email",
    "type": "negative",
    "description": "Verify no reset link is sent for an unknown address.",
    "preconditions": "",
    "testSteps": ["Open 'Forgot password'.", "Enter unknown email.", "Submit."],
    "expectedResult": "Generic confirmation, no email sent.",
    "priority": "Medium",
  },
]
```"#;

const PASSWORD_RESET_DATA: &str = r#"[
  {
    "user_story": "Password Reset via Email",
    "test_cases": [
      {
        "type": "Positive",
        "description": "Reset link sent to registered email",
        "sample_data": "Email: `jane@example.com`",
        "notes": "Reset email delivered"
      },
      {
        "type": "Negative",
        "description": "Unregistered email",
        "sample_data": "Email: `nobody@example.com`",
        "notes": "No email sent"
      }
    ]
  }
]"#;

fn use_case(client: Arc<ScriptedClient>) -> Arc<TestGenerationUseCase> {
    use_case_with(client, Arc::new(DocumentTextExtractor::new()), PipelineConfig::default())
}

fn use_case_with(
    client: Arc<ScriptedClient>,
    extractor: Arc<dyn TextExtractor + Send + Sync>,
    settings: PipelineConfig,
) -> Arc<TestGenerationUseCase> {
    let config = LLMConfig {
        timeout_secs: 5,
        ..LLMConfig::default()
    };
    Arc::new(TestGenerationUseCase::new(client, extractor, config, settings))
}

fn request(raw_text: &str) -> GenerationRequest {
    GenerationRequest {
        raw_text: raw_text.to_string(),
        ..Default::default()
    }
}

fn expect_failure(result: &PipelineResult) -> (&str, Option<&str>) {
    match result {
        PipelineResult::Failure { error, raw_output } => (error.as_str(), raw_output.as_deref()),
        PipelineResult::Success(output) => panic!("expected failure, got {:?}", output),
    }
}

#[tokio::test]
async fn test_password_reset_end_to_end() {
    let client = ScriptedClient::new(vec![
        text(VALID),
        text(PASSWORD_RESET_CASES),
        text(PASSWORD_RESET_DATA),
    ]);
    let result = use_case(client.clone())
        .run(request("As a user, I want to reset my password via email."))
        .await;

    let PipelineResult::Success(output) = result else {
        panic!("expected success, got {:?}", result);
    };
    assert!(output.test_cases.count_of(TestCaseType::Positive) >= 1);
    assert!(output.test_cases.count_of(TestCaseType::Negative) >= 1);
    let ids: Vec<u32> = output.test_cases.cases().iter().map(|case| case.id).collect();
    assert_eq!(ids, vec![1, 2]);
    assert!(output
        .test_data_table
        .iter()
        .any(|group| group.user_story.to_lowercase().contains("password reset")));
    assert_eq!(
        client.stages(),
        vec![Stage::Validate, Stage::TestCases, Stage::TestData]
    );
}

#[tokio::test]
async fn test_invalid_input_stops_before_generation() {
    let client = ScriptedClient::new(vec![text(
        r#"{"is_valid": false, "reason": "The text is a greeting, not a requirement."}"#,
    )]);
    let result = use_case(client.clone()).run(request("hello how are you")).await;

    let (error, raw_output) = expect_failure(&result);
    assert_eq!(
        error,
        "Invalid Input: The text is a greeting, not a requirement."
    );
    assert!(raw_output.is_none());
    assert_eq!(client.stages(), vec![Stage::Validate]);
}

#[tokio::test]
async fn test_invalid_verdict_without_reason_uses_default() {
    let client = ScriptedClient::new(vec![text(r#"{"is_valid": false}"#)]);
    let result = use_case(client).run(request("1234")).await;
    let (error, _) = expect_failure(&result);
    assert_eq!(
        error,
        "Invalid Input: The provided input does not appear to be a valid user story or requirement."
    );
}

#[tokio::test]
async fn test_empty_input_makes_no_completion_calls() {
    let client = ScriptedClient::new(Vec::new());
    let result = use_case(client.clone()).run(request("   \n")).await;

    let (error, _) = expect_failure(&result);
    assert_eq!(error, "Please provide input via text or files.");
    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn test_files_without_text_count_as_empty_input() {
    let client = ScriptedClient::new(Vec::new());
    let mut req = request("");
    req.files = vec![
        UploadedFile::new("diagram.png", vec![1, 2, 3]),
        UploadedFile::new("blank.txt", b"   \n".to_vec()),
    ];
    let result = use_case(client.clone()).run(req).await;

    let (error, _) = expect_failure(&result);
    assert_eq!(error, "Please provide input via text or files.");
    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn test_file_text_is_combined_with_typed_text() {
    let client = ScriptedClient::new(vec![
        text(VALID),
        text(PASSWORD_RESET_CASES),
        text(PASSWORD_RESET_DATA),
    ]);
    let mut req = request("Typed part.");
    req.files = vec![UploadedFile::new("story.TXT", b"From file.".to_vec())];
    let result = use_case(client.clone()).run(req).await;

    assert!(result.is_success());
    let calls = client.calls();
    assert!(calls[0].user.contains("---\nTyped part.\n\nFrom file.\n---"));
}

#[tokio::test]
async fn test_extraction_error_aborts_without_calls() {
    let client = ScriptedClient::new(Vec::new());
    let mut req = request("Some requirement");
    req.files = vec![UploadedFile::new("broken.pdf", b"%PDF-garbage".to_vec())];
    let result = use_case(client.clone()).run(req).await;

    let (error, _) = expect_failure(&result);
    assert!(error.starts_with("Error parsing file broken.pdf: "), "{}", error);
    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn test_unparseable_verdict_proceeds_to_generation() {
    let client = ScriptedClient::new(vec![
        text("Sure! This looks like a requirement to me."),
        text(PASSWORD_RESET_CASES),
        text(PASSWORD_RESET_DATA),
    ]);
    let result = use_case(client.clone())
        .run(request("As a user, I want to reset my password via email."))
        .await;

    assert!(result.is_success());
    assert_eq!(
        client.stages(),
        vec![Stage::Validate, Stage::TestCases, Stage::TestData]
    );
}

#[tokio::test]
async fn test_test_case_stage_gives_up_after_max_retries() {
    let client = ScriptedClient::new(vec![
        text(VALID),
        text("Here are your test cases: [{"),
        text("not json at all"),
        text(r#"[{"id": 1, "title": "unterminated"#),
        text(PASSWORD_RESET_DATA),
    ]);
    let result = use_case(client.clone())
        .run(request("As a user, I want to reset my password via email."))
        .await;

    let (error, raw_output) = expect_failure(&result);
    assert_eq!(error, "Failed to get valid test case JSON after 3 attempts.");
    assert_eq!(raw_output, Some(r#"[{"id": 1, "title": "unterminated"#));
    assert_eq!(
        client.stages(),
        vec![
            Stage::Validate,
            Stage::TestCases,
            Stage::TestCases,
            Stage::TestCases
        ]
    );
}

#[tokio::test]
async fn test_test_case_stage_recovers_on_retry() {
    let client = ScriptedClient::new(vec![
        text(VALID),
        text("I cannot produce JSON today."),
        text(PASSWORD_RESET_CASES),
        text(PASSWORD_RESET_DATA),
    ]);
    let result = use_case(client.clone())
        .run(request("As a user, I want to reset my password via email."))
        .await;

    assert!(result.is_success());
    assert_eq!(
        client.stages(),
        vec![
            Stage::Validate,
            Stage::TestCases,
            Stage::TestCases,
            Stage::TestData
        ]
    );
}

#[tokio::test]
async fn test_json_object_instead_of_array_counts_as_failed_attempt() {
    let client = ScriptedClient::new(vec![
        text(VALID),
        text(r#"{"test_cases": []}"#),
        text(r#"[{"id": 1, "title": "no other fields"}]"#),
        text(PASSWORD_RESET_DATA),
    ]);
    let result = use_case(client.clone())
        .run(request("As a user, I want to reset my password via email."))
        .await;

    let PipelineResult::Success(output) = result else {
        panic!("expected success, got {:?}", result);
    };
    assert_eq!(output.test_cases.len(), 1);
    assert_eq!(output.test_cases.cases()[0].title, "no other fields");
    assert_eq!(client.stages().len(), 4);
}

#[tokio::test]
async fn test_unfamiliar_labels_are_accepted_on_first_attempt() {
    let cases = r#"[{"id": "TC-1", "title": "Audit log entry", "type": "functional",
        "description": "d", "testSteps": ["Reset password."], "expectedResult": "Logged.",
        "priority": "Critical"}]"#;
    let data = r#"[{"user_story": "Password reset", "test_cases": [
        {"type": "Positive", "description": "Audit log entry",
         "sample_data": {"email": "a@b.c"}, "notes": "Logged"}]}]"#;
    let client = ScriptedClient::new(vec![text(VALID), text(cases), text(data)]);
    let result = use_case(client.clone())
        .run(request("As a user, I want to reset my password via email."))
        .await;

    let PipelineResult::Success(output) = result else {
        panic!("expected success, got {:?}", result);
    };
    assert_eq!(output.test_cases.cases()[0].id, 1);
    assert_eq!(
        output.test_cases.count_of(TestCaseType::Other("functional".to_string())),
        1
    );
    assert_eq!(
        output.test_data_table[0].test_cases[0].sample_data["email"],
        "a@b.c"
    );
    assert_eq!(client.stages().len(), 3);
}

#[tokio::test]
async fn test_test_data_stage_failure_is_terminal() {
    let client = ScriptedClient::new(vec![
        text(VALID),
        text(PASSWORD_RESET_CASES),
        text("table:"),
        text("| story | data |"),
        text("{\"user_story\": "),
    ]);
    let result = use_case(client.clone())
        .run(request("As a user, I want to reset my password via email."))
        .await;

    let (error, raw_output) = expect_failure(&result);
    assert_eq!(error, "Failed to get valid test data JSON after 3 attempts.");
    assert_eq!(raw_output, Some("{\"user_story\": "));
    assert_eq!(client.stages().len(), 5);
}

#[tokio::test]
async fn test_test_data_prompt_carries_generated_cases() {
    let client = ScriptedClient::new(vec![
        text(VALID),
        text(PASSWORD_RESET_CASES),
        text(PASSWORD_RESET_DATA),
    ]);
    use_case(client.clone())
        .run(request("As a user, I want to reset my password via email."))
        .await;

    let calls = client.calls();
    let data_call = calls
        .iter()
        .find(|call| call.stage == Stage::TestData)
        .unwrap();
    assert!(data_call
        .user
        .contains("\"title\": \"Reset link sent to registered email\""));
    assert!(data_call.user.contains("\"type\": \"negative\""));
}

#[tokio::test]
async fn test_non_contiguous_ids_are_renumbered() {
    let cases = r#"[
      {"id": 7, "title": "a", "type": "edge", "description": "d", "testSteps": ["s"],
       "expectedResult": "r", "priority": "Low"},
      {"id": 3, "title": "b", "type": "boundary", "description": "d", "testSteps": ["s"],
       "expectedResult": "r", "priority": "Low"}
    ]"#;
    let client = ScriptedClient::new(vec![text(VALID), text(cases), text("[]")]);
    let result = use_case(client)
        .run(request("As an admin, I want to cap uploads at 10 MB."))
        .await;

    let PipelineResult::Success(output) = result else {
        panic!("expected success");
    };
    let ids: Vec<u32> = output.test_cases.cases().iter().map(|case| case.id).collect();
    assert_eq!(ids, vec![1, 2]);
}

#[tokio::test]
async fn test_transport_error_is_reported_generically_without_retry() {
    let client = ScriptedClient::new(vec![
        text(VALID),
        Reply::Fail(AppError::LLMError("API error (503): overloaded".to_string())),
    ]);
    let result = use_case(client.clone())
        .run(request("As a user, I want to reset my password via email."))
        .await;

    let (error, _) = expect_failure(&result);
    assert_eq!(
        error,
        "An unexpected error occurred during generation: LLM error: API error (503): overloaded"
    );
    assert_eq!(client.stages(), vec![Stage::Validate, Stage::TestCases]);
}

#[tokio::test]
async fn test_panicking_client_is_contained() {
    let client = ScriptedClient::new(vec![Reply::Panic]);
    let result = use_case(client)
        .run(request("As a user, I want to reset my password via email."))
        .await;

    let (error, _) = expect_failure(&result);
    assert!(error.starts_with("An unexpected error occurred during generation:"));
}

#[tokio::test]
async fn test_panicking_extractor_is_contained() {
    let client = ScriptedClient::new(Vec::new());
    let mut req = request("text");
    req.files = vec![UploadedFile::new("a.txt", b"x".to_vec())];
    let result = use_case_with(
        client.clone(),
        Arc::new(PanickingExtractor),
        PipelineConfig::default(),
    )
    .run(req)
    .await;

    let (error, _) = expect_failure(&result);
    assert!(error.starts_with("An unexpected error occurred during generation:"));
    assert!(client.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_hanging_completion_times_out() {
    let client = ScriptedClient::new(vec![Reply::Hang]);
    let result = use_case(client)
        .run(request("As a user, I want to reset my password via email."))
        .await;

    let (error, _) = expect_failure(&result);
    assert!(error.contains("Completion timed out after 5s"), "{}", error);
}

#[tokio::test]
async fn test_model_hint_reaches_every_call() {
    let client = ScriptedClient::new(vec![
        text(VALID),
        text(PASSWORD_RESET_CASES),
        text(PASSWORD_RESET_DATA),
    ]);
    let mut req = request("As a user, I want to reset my password via email.");
    req.model_hint = Some("llama-3.1-8b-instant".to_string());
    use_case(client.clone()).run(req).await;

    assert!(client
        .calls()
        .iter()
        .all(|call| call.model == "llama-3.1-8b-instant"));
}

#[tokio::test]
async fn test_retry_budget_follows_settings() {
    let client = ScriptedClient::new(vec![text(VALID), text("nope"), text("still nope")]);
    let settings = PipelineConfig {
        max_retries: 2,
        ..PipelineConfig::default()
    };
    let result = use_case_with(
        client.clone(),
        Arc::new(DocumentTextExtractor::new()),
        settings,
    )
    .run(request("As a user, I want to reset my password via email."))
    .await;

    let (error, raw_output) = expect_failure(&result);
    assert_eq!(error, "Failed to get valid test case JSON after 2 attempts.");
    assert_eq!(raw_output, Some("still nope"));
    assert_eq!(client.stages().len(), 3);
}
