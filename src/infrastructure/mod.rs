pub mod bootstrap;
pub mod captcha;
pub mod config;
pub mod llm_clients;
pub mod security;
