use crate::domain::test_artifacts::TestCaseSet;

pub(crate) fn build_validation_system_prompt() -> String {
    "You are a senior business analyst. You validate whether a text contains coherent software \
requirements, user stories, or functional specifications. You never generate test cases."
        .to_string()
}

pub(crate) fn build_validation_user_prompt(input: &str) -> String {
    format!(
        r#"The input should describe a feature, a user action, or a system behavior. It must not be random text, a question, a generic statement, a conversation, a bare number, or a string of letters or digits.

Analyze the following text:
---
{input}
---

Respond with a single JSON object with two keys:
1. "is_valid": a boolean, true if the text is a valid requirement, false otherwise.
2. "reason": a brief explanation. If it is valid, say "The input appears to be a valid software requirement."

Example of a valid input:
"As a user, I want to be able to log in with my username and password so that I can access my account."

Example of an invalid input:
"hello how are you today"

Your entire output must be only the JSON object."#
    )
}

pub(crate) fn build_test_case_system_prompt() -> String {
    "You are an expert QA engineer specializing in test case generation. \
You answer with a JSON array only, without any introductory or concluding text."
        .to_string()
}

pub(crate) fn build_test_case_user_prompt(input: &str) -> String {
    format!(
        r#"Application requirements, user stories, or functional specifications:

{input}

Generate a comprehensive JSON array of test case objects. Each object must follow this structure exactly:

[
  {{
    "id": <unique integer id>,
    "title": "<concise title>",
    "type": "<positive|negative|edge|boundary>",
    "description": "<what the test case verifies>",
    "preconditions": "<setup needed, or empty string>",
    "testSteps": ["<step 1>", "<step 2>"],
    "expectedResult": "<what should happen after the steps>",
    "priority": "<High|Medium|Low>"
  }}
]

Rules:
1. Ids are unique integers starting from 1 and increasing by one.
2. Cover every scenario derivable from the requirements: positive, negative, edge, and boundary.
3. Keep descriptions, preconditions, steps, and expected results clear and unambiguous.
4. Assign High, Medium, or Low priority appropriately.
5. Keep related test cases next to each other.
6. Output only the JSON array.

Example of one test case object:
{{
  "id": 1,
  "title": "Successful Login with Valid Credentials",
  "type": "positive",
  "description": "Verify that a user can log in with correct username and password.",
  "preconditions": "User has a valid account.",
  "testSteps": [
    "Navigate to the login page.",
    "Enter valid username and password.",
    "Click the login button."
  ],
  "expectedResult": "User is redirected to the home page/dashboard.",
  "priority": "High"
}}"#
    )
}

pub(crate) fn build_test_data_system_prompt() -> String {
    "You are a QA data specialist. You produce realistic sample test data grouped by user story. \
You answer with a single valid JSON array only."
        .to_string()
}

pub(crate) fn build_test_data_user_prompt(input: &str, test_cases: &TestCaseSet) -> String {
    let test_cases_json =
        serde_json::to_string_pretty(test_cases).unwrap_or_else(|_| "[]".to_string());

    format!(
        r#"Original requirements: {input}

Test cases (JSON array):
{test_cases_json}

Generate a JSON array of objects, one per distinct user story or functional area, consistent with the test cases above. Each object must follow this structure exactly:
{{
  "user_story": "<name of the user story or functional area>",
  "test_cases": [
    {{
      "type": "<Positive|Negative|Edge|Boundary>",
      "description": "<description of the test case>",
      "sample_data": "<realistic, scenario-appropriate sample data>",
      "notes": "<brief notes on the expected outcome>"
    }}
  ]
}}

Example of the final output:
[
  {{
    "user_story": "Login Functionality",
    "test_cases": [
      {{
        "type": "Positive",
        "description": "Successful Login with Valid Credentials",
        "sample_data": "User: `user123`, Pass: `Pass@123`",
        "notes": "Redirected to home page/dashboard"
      }},
      {{
        "type": "Negative",
        "description": "Invalid Username Login",
        "sample_data": "User: `wronguser`, Pass: `Pass@123`",
        "notes": "Error message: 'Invalid username'"
      }}
    ]
  }}
]

Output only the JSON array."#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::test_artifacts::{Priority, TestCase, TestCaseType};

    #[test]
    fn test_validation_prompt_embeds_input() {
        let prompt = build_validation_user_prompt("As a user, I want to log out.");
        assert!(prompt.contains("---\nAs a user, I want to log out.\n---"));
        assert!(prompt.contains("\"is_valid\""));
    }

    #[test]
    fn test_test_case_prompt_shows_literal_braces() {
        let prompt = build_test_case_user_prompt("req");
        assert!(prompt.contains("\"testSteps\": [\"<step 1>\", \"<step 2>\"]"));
        assert!(prompt.contains("  {\n    \"id\""));
        assert!(!prompt.contains("{{"));
    }

    #[test]
    fn test_test_data_prompt_embeds_serialized_cases() {
        let cases = TestCaseSet::from_parsed(vec![TestCase {
            id: 1,
            title: "Reset link is sent".to_string(),
            case_type: TestCaseType::Positive,
            description: "d".to_string(),
            preconditions: String::new(),
            test_steps: vec!["Request reset.".to_string()],
            expected_result: "Email arrives.".to_string(),
            priority: Priority::High,
        }]);
        let prompt = build_test_data_user_prompt("Password reset", &cases);
        assert!(prompt.starts_with("Original requirements: Password reset"));
        assert!(prompt.contains("\"title\": \"Reset link is sent\""));
        assert!(prompt.contains("\"expectedResult\": \"Email arrives.\""));
    }
}
