use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::domain::llm_config::LLMProvider;
use crate::infrastructure::bootstrap::{build_state, spawn_rate_limit_sweeper};
use crate::infrastructure::config::ConfigService;
use crate::interfaces::http::start_server;

const USAGE: &str = "usage: casegen [serve | set-key <provider> <key> | delete-key <provider>]";

pub fn run() -> std::io::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        None | Some("serve") => serve(),
        Some("set-key") => match (args.get(1), args.get(2)) {
            (Some(provider), Some(key)) => manage_key(provider, Some(key)),
            _ => usage_error(),
        },
        Some("delete-key") => match args.get(1) {
            Some(provider) => manage_key(provider, None),
            None => usage_error(),
        },
        Some(_) => usage_error(),
    }
}

fn serve() -> std::io::Result<()> {
    let config = ConfigService::new().load().map_err(|err| {
        error!("Failed to load configuration: {}", err);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, err.to_string())
    })?;

    actix_web::rt::System::new().block_on(async move {
        let state = build_state(&config);
        let sweeper = spawn_rate_limit_sweeper(state.rate_limiter.clone());

        info!(
            "Starting server on http://{}:{}",
            config.server.host, config.server.port
        );
        let result = start_server(state, &config.server, &config.cors)?.await;
        sweeper.abort();
        result
    })
}

fn manage_key(provider: &str, key: Option<&String>) -> std::io::Result<()> {
    let provider: LLMProvider = provider
        .parse()
        .map_err(|err: String| std::io::Error::new(std::io::ErrorKind::InvalidInput, err))?;
    let service = ConfigService::new();
    let outcome = match key {
        Some(key) => service.save_api_key(provider, key),
        None => service.delete_api_key(provider),
    };

    outcome.map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err.to_string()))?;
    info!("Updated stored API key for {:?}", provider);
    Ok(())
}

fn usage_error() -> std::io::Result<()> {
    eprintln!("{}", USAGE);
    Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, USAGE))
}
