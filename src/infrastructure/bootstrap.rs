use std::sync::{Arc, Mutex};

use tracing::info;

use crate::application::use_cases::document_extraction::DocumentTextExtractor;
use crate::application::use_cases::rate_limiter::RateLimiter;
use crate::application::use_cases::test_generation::TestGenerationUseCase;
use crate::domain::app_config::AppConfig;
use crate::infrastructure::captcha::HCaptchaVerifier;
use crate::infrastructure::llm_clients::{LLMClient, RouterClient};
use crate::interfaces::http::{add_log, HttpState, LogEntry};

pub fn build_state(config: &AppConfig) -> HttpState {
    let logs: Arc<Mutex<Vec<LogEntry>>> = Arc::new(Mutex::new(Vec::new()));

    let llm_client: Arc<dyn LLMClient + Send + Sync> = Arc::new(RouterClient::new());
    let pipeline = Arc::new(TestGenerationUseCase::new(
        llm_client.clone(),
        Arc::new(DocumentTextExtractor::new()),
        config.llm.clone(),
        config.pipeline.clone(),
    ));

    if config.captcha.enabled && config.captcha.secret.is_none() {
        add_log(
            &logs,
            "WARN",
            "Bootstrap",
            "Captcha is enabled but no secret is configured; every request will be rejected",
        );
    }
    if config.llm.api_key.is_none() {
        add_log(
            &logs,
            "WARN",
            "Bootstrap",
            &format!("No API key configured for {:?}", config.llm.provider),
        );
    }

    HttpState {
        pipeline,
        verifier: Arc::new(HCaptchaVerifier::new(config.captcha.clone())),
        rate_limiter: Arc::new(RateLimiter::with_config(config.rate_limit.clone())),
        llm_client,
        llm_config: config.llm.clone(),
        logs,
    }
}

/// Periodically drops idle clients from the rate limiter. Must be called inside a runtime.
pub fn spawn_rate_limit_sweeper(limiter: Arc<RateLimiter>) -> tokio::task::JoinHandle<()> {
    let period = limiter.sweep_interval();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = limiter.cleanup_expired();
            if removed > 0 {
                info!("Rate limit sweep removed {} client(s)", removed);
            }
        }
    })
}
