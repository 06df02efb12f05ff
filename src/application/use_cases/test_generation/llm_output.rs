use once_cell::sync::Lazy;
use regex::Regex;

static HIDDEN_BLOCK_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<think>[\s\S]*?</think>|<think\s*/>|<reasoning>[\s\S]*?</reasoning>|<internal>[\s\S]*?</internal>")
        .unwrap()
});

// One or more commas (whitespace allowed between them) right before a closer.
static TRAILING_COMMA_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:,\s*)+([\]}])").unwrap());

/// Removes reasoning blocks some models emit ahead of their answer.
pub(crate) fn clean_completion(output: &str) -> String {
    HIDDEN_BLOCK_PATTERN
        .replace_all(output, "")
        .trim()
        .to_string()
}

pub(crate) fn strip_code_fence(value: &str) -> String {
    let trimmed = value.trim();
    if let Some(stripped) = trimmed.strip_prefix("```json") {
        return stripped.trim().trim_end_matches("```").trim().to_string();
    }
    if let Some(stripped) = trimmed.strip_prefix("```") {
        return stripped.trim().trim_end_matches("```").trim().to_string();
    }
    trimmed.to_string()
}

/// Drops dangling commas before `]` or `}`. No other repair is attempted.
pub fn sanitize_json(text: &str) -> String {
    TRAILING_COMMA_PATTERN.replace_all(text, "$1").into_owned()
}

/// Normalizes a raw completion into text ready for `serde_json`.
pub(crate) fn prepare_json(output: &str) -> String {
    sanitize_json(&strip_code_fence(&clean_completion(output)))
}
