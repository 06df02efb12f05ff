use crate::domain::app_config::CaptchaConfig;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

/// Pass/fail human verification of an incoming request.
#[async_trait]
pub trait HumanVerifier {
    async fn verify(&self, token: &str, remote_ip: Option<&str>) -> bool;
}

#[derive(Deserialize)]
struct SiteVerifyResponse {
    #[serde(default)]
    success: bool,
    #[serde(default, rename = "error-codes")]
    error_codes: Vec<String>,
}

pub struct HCaptchaVerifier {
    client: reqwest::Client,
    config: CaptchaConfig,
}

impl HCaptchaVerifier {
    pub fn new(config: CaptchaConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl HumanVerifier for HCaptchaVerifier {
    async fn verify(&self, token: &str, remote_ip: Option<&str>) -> bool {
        if !self.config.enabled {
            return true;
        }
        if token.trim().is_empty() {
            debug!("Captcha token missing");
            return false;
        }
        let Some(secret) = self.config.secret.as_deref() else {
            warn!("Captcha is enabled but no secret is configured");
            return false;
        };

        let mut form = vec![("secret", secret), ("response", token)];
        if let Some(ip) = remote_ip {
            form.push(("remoteip", ip));
        }

        let response = match self
            .client
            .post(&self.config.verify_url)
            .form(&form)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!("hCaptcha verification error: {}", e);
                return false;
            }
        };

        match response.json::<SiteVerifyResponse>().await {
            Ok(body) => {
                if !body.success {
                    debug!("hCaptcha rejected token: {:?}", body.error_codes);
                }
                body.success
            }
            Err(e) => {
                warn!("hCaptcha verification error: {}", e);
                false
            }
        }
    }
}
