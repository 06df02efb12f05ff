use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum LLMProvider {
    Local,
    OpenAI,
    Groq,
    Google,
}

impl std::str::FromStr for LLMProvider {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(LLMProvider::Local),
            "openai" => Ok(LLMProvider::OpenAI),
            "groq" => Ok(LLMProvider::Groq),
            "google" | "gemini" => Ok(LLMProvider::Google),
            other => Err(format!("Unknown provider: {}", other)),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LLMConfig {
    pub provider: LLMProvider,
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    /// Upper bound for a single completion call, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    120
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: LLMProvider::Groq,
            base_url: "https://api.groq.com/openai/v1".to_string(),
            model: "gemma2-9b-it".to_string(),
            api_key: None,
            max_tokens: Some(4096),
            temperature: Some(0.2),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl LLMConfig {
    /// Config used for one run: the hint replaces the model when it is non-blank
    /// and, if an allow-list is given, listed in it.
    pub fn with_model_hint(&self, hint: Option<&str>, allowed: &[String]) -> Self {
        let mut config = self.clone();
        let Some(hint) = hint.map(str::trim).filter(|value| !value.is_empty()) else {
            return config;
        };

        if allowed.is_empty() || allowed.iter().any(|model| model == hint) {
            config.model = hint.to_string();
        } else {
            tracing::warn!("Ignoring model hint '{}' (not in allowed models)", hint);
        }
        config
    }
}
