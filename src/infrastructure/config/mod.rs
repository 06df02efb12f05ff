use crate::domain::app_config::AppConfig;
use crate::domain::error::Result;
use crate::domain::llm_config::LLMProvider;
use crate::infrastructure::security::keyring::KeyringManager;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use tracing::{debug, info, warn};

const KEYRING_SERVICE: &str = "casegen";
const DEFAULT_CONFIG_FILE: &str = "casegen.toml";

pub struct ConfigService {
    keyring: KeyringManager,
}

impl ConfigService {
    pub fn new() -> Self {
        Self {
            keyring: KeyringManager::new(KEYRING_SERVICE),
        }
    }

    /// Defaults, then `casegen.toml`, then `CASEGEN_*` environment variables.
    pub fn load(&self) -> Result<AppConfig> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!("Loaded environment from {}", path.display());
        }

        let path = std::env::var("CASEGEN_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        let figment = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(&path))
            .merge(Env::prefixed("CASEGEN_").split("__"));

        let mut config = Self::extract(figment)?;
        apply_legacy_env(&mut config, |name| std::env::var(name).ok());
        if config.llm.api_key.is_none() {
            config.llm.api_key = self.stored_api_key(config.llm.provider);
        }

        info!(
            "Configuration loaded (provider={:?} model={} bind={}:{})",
            config.llm.provider, config.llm.model, config.server.host, config.server.port
        );
        Ok(config)
    }

    pub fn extract(figment: Figment) -> Result<AppConfig> {
        Ok(figment.extract()?)
    }

    pub fn save_api_key(&self, provider: LLMProvider, key: &str) -> Result<()> {
        self.keyring.set_secret(&provider_key(provider), key)
    }

    pub fn delete_api_key(&self, provider: LLMProvider) -> Result<()> {
        self.keyring.delete_secret(&provider_key(provider))
    }

    fn stored_api_key(&self, provider: LLMProvider) -> Option<String> {
        match self.keyring.get_secret(&provider_key(provider)) {
            Ok(secret) => secret,
            Err(e) => {
                warn!("Keyring unavailable, continuing without stored API key: {}", e);
                None
            }
        }
    }
}

impl Default for ConfigService {
    fn default() -> Self {
        Self::new()
    }
}

fn provider_key(provider: LLMProvider) -> String {
    format!("{:?}", provider).to_lowercase()
}

/// Variable names used by earlier deployments, consulted only when unset.
fn apply_legacy_env(config: &mut AppConfig, lookup: impl Fn(&str) -> Option<String>) {
    if config.llm.api_key.is_none() && config.llm.provider == LLMProvider::Groq {
        config.llm.api_key = lookup("GROQ_API_KEY").filter(|value| !value.is_empty());
    }
    if config.captcha.secret.is_none() {
        config.captcha.secret = lookup("HCAPTCHA_SECRET_KEY").filter(|value| !value.is_empty());
    }
}
