use crate::application::use_cases::rate_limiter::{RateLimitResult, RateLimiter};
use crate::application::use_cases::test_generation::TestGenerationUseCase;
use crate::domain::app_config::{CorsConfig, ServerConfig};
use crate::domain::llm_config::LLMConfig;
use crate::domain::pipeline::{GenerationRequest, PipelineResult, UploadedFile};
use crate::infrastructure::captcha::HumanVerifier;
use crate::infrastructure::llm_clients::LLMClient;
use actix_cors::Cors;
use actix_multipart::form::{
    bytes::Bytes as FilePart, text::Text, MultipartForm, MultipartFormConfig,
};
use actix_web::{
    dev::Server, get, http::header, post, web, App, HttpRequest, HttpResponse, HttpServer,
    Responder,
};
use base64::Engine;
use chrono::Local;
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::{Arc, Mutex};
use validator::Validate;

const MAX_LOG_ENTRIES: usize = 100;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LogEntry {
    pub time: String,
    pub level: String,
    pub source: String,
    pub message: String,
}

pub struct HttpState {
    pub pipeline: Arc<TestGenerationUseCase>,
    pub verifier: Arc<dyn HumanVerifier + Send + Sync>,
    pub rate_limiter: Arc<RateLimiter>,
    pub llm_client: Arc<dyn LLMClient + Send + Sync>,
    pub llm_config: LLMConfig,
    pub logs: Arc<Mutex<Vec<LogEntry>>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FilePayload {
    pub filename: String,
    pub content_base64: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ProcessRequest {
    #[serde(default)]
    #[validate(length(max = 200000))]
    pub input_text: String,
    #[serde(default)]
    #[validate(length(max = 10))]
    pub files: Vec<FilePayload>,
    #[serde(rename = "h-captcha-response", alias = "hcaptcha_token", default)]
    pub captcha_token: String,
    #[serde(default)]
    pub model: Option<String>,
}

/// `multipart/form-data` body of `POST /process`.
#[derive(MultipartForm)]
pub struct ProcessForm {
    input_text: Option<Text<String>>,
    #[multipart(rename = "h-captcha-response")]
    captcha_token: Option<Text<String>>,
    model: Option<Text<String>>,
    files: Vec<FilePart>,
}

#[derive(Debug, Validate)]
struct FormLimits {
    #[validate(length(max = 200000))]
    input_text: String,
    #[validate(range(max = 10))]
    file_count: usize,
}

#[derive(Debug, Serialize)]
pub struct FileHash {
    pub filename: String,
    pub content_hash: String,
}

#[derive(Debug, Serialize)]
pub struct ProcessResponse {
    pub status: &'static str,
    pub file_hashes: Vec<FileHash>,
    pub output: PipelineResult,
    pub timestamp: f64,
}

fn client_key(req: &HttpRequest) -> String {
    req.peer_addr()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn decode_files(files: &[FilePayload]) -> Result<Vec<UploadedFile>, String> {
    files
        .iter()
        .map(|file| {
            base64::prelude::BASE64_STANDARD
                .decode(file.content_base64.trim())
                .map(|bytes| UploadedFile::new(file.filename.clone(), bytes))
                .map_err(|e| format!("File {} is not valid base64: {}", file.filename, e))
        })
        .collect()
}

fn content_hash(bytes: &[u8]) -> String {
    hex::encode(Md5::digest(bytes))
}

fn rejected_request(logs: &Mutex<Vec<LogEntry>>, error: &validator::ValidationErrors) -> HttpResponse {
    add_log(logs, "WARN", "HttpApi", &format!("Rejected request: {}", error));
    HttpResponse::BadRequest().json(json!({ "error": error.to_string() }))
}

/// Rate limit, then captcha. Returns the client key when the request may proceed.
async fn admit(data: &HttpState, http_req: &HttpRequest, captcha_token: &str) -> Result<String, HttpResponse> {
    let client = client_key(http_req);
    if let RateLimitResult::Exceeded {
        retry_after_seconds,
    } = data.rate_limiter.check(&client)
    {
        add_log(
            &data.logs,
            "WARN",
            "RateLimit",
            &format!("Rate limit exceeded for {}", client),
        );
        return Err(HttpResponse::TooManyRequests()
            .insert_header((header::RETRY_AFTER, retry_after_seconds.to_string()))
            .json(json!({
                "error": "Too many requests. Please try again later.",
                "retry_after_seconds": retry_after_seconds,
            })));
    }

    if !data.verifier.verify(captcha_token, Some(client.as_str())).await {
        add_log(
            &data.logs,
            "WARN",
            "Captcha",
            &format!("Captcha verification failed for {}", client),
        );
        return Err(HttpResponse::Forbidden().json(json!({ "error": "Captcha verification failed" })));
    }

    Ok(client)
}

async fn generate(
    data: &HttpState,
    client: &str,
    input_text: String,
    files: Vec<UploadedFile>,
    model: Option<String>,
) -> HttpResponse {
    let file_hashes: Vec<FileHash> = files
        .iter()
        .map(|file| FileHash {
            filename: file.filename.clone(),
            content_hash: content_hash(&file.bytes),
        })
        .collect();

    add_log(
        &data.logs,
        "INFO",
        "HttpApi",
        &format!(
            "Generating test cases ({} chars, {} file(s), client={})",
            input_text.len(),
            files.len(),
            client
        ),
    );

    let output = Arc::clone(&data.pipeline)
        .run(GenerationRequest {
            raw_text: input_text,
            files,
            model_hint: model,
        })
        .await;

    let status = if output.is_success() { "success" } else { "error" };
    if let Some(error) = output.error_message() {
        add_log(
            &data.logs,
            "ERROR",
            "HttpApi",
            &format!("Generation failed: {}", error),
        );
    }

    HttpResponse::Ok().json(ProcessResponse {
        status,
        file_hashes,
        output,
        timestamp: chrono::Utc::now().timestamp_millis() as f64 / 1000.0,
    })
}

#[post("/process")]
async fn process(
    data: web::Data<HttpState>,
    http_req: HttpRequest,
    req: web::Json<ProcessRequest>,
) -> impl Responder {
    let req = req.into_inner();
    if let Err(e) = req.validate() {
        return rejected_request(&data.logs, &e);
    }

    let client = match admit(&data, &http_req, &req.captcha_token).await {
        Ok(client) => client,
        Err(response) => return response,
    };

    let files = match decode_files(&req.files) {
        Ok(files) => files,
        Err(message) => return HttpResponse::BadRequest().json(json!({ "error": message })),
    };

    generate(&data, &client, req.input_text, files, req.model).await
}

/// Form upload used by the browser client: fields `input_text`,
/// `h-captcha-response`, `model` and repeated `files`.
#[post("/process")]
async fn process_form(
    data: web::Data<HttpState>,
    http_req: HttpRequest,
    MultipartForm(form): MultipartForm<ProcessForm>,
) -> impl Responder {
    let files: Vec<UploadedFile> = form
        .files
        .into_iter()
        .filter_map(|part| {
            let filename = part.file_name.filter(|name| !name.is_empty())?;
            Some(UploadedFile::new(filename, part.data.to_vec()))
        })
        .collect();
    let input_text = form.input_text.map(Text::into_inner).unwrap_or_default();

    let limits = FormLimits {
        input_text,
        file_count: files.len(),
    };
    if let Err(e) = limits.validate() {
        return rejected_request(&data.logs, &e);
    }

    let captcha_token = form.captcha_token.map(Text::into_inner).unwrap_or_default();
    let client = match admit(&data, &http_req, &captcha_token).await {
        Ok(client) => client,
        Err(response) => return response,
    };

    let model = form.model.map(Text::into_inner);
    generate(&data, &client, limits.input_text, files, model).await
}

#[get("/models")]
async fn list_models(data: web::Data<HttpState>) -> impl Responder {
    add_log(
        &data.logs,
        "INFO",
        "HttpApi",
        &format!(
            "Fetching models (provider={:?} base_url={})",
            data.llm_config.provider, data.llm_config.base_url
        ),
    );

    match data.llm_client.list_models(&data.llm_config).await {
        Ok(models) => HttpResponse::Ok().json(models),
        Err(e) => {
            add_log(
                &data.logs,
                "ERROR",
                "HttpApi",
                &format!("Failed to list models: {}", e),
            );
            HttpResponse::BadGateway().json(json!({ "error": e.to_string() }))
        }
    }
}

#[get("/rate-limit")]
async fn rate_limit_status(data: web::Data<HttpState>, http_req: HttpRequest) -> impl Responder {
    HttpResponse::Ok().json(data.rate_limiter.status(&client_key(&http_req)))
}

#[get("/health")]
async fn health() -> impl Responder {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

#[get("/logs")]
async fn get_logs(data: web::Data<HttpState>) -> impl Responder {
    let logs = data
        .logs
        .lock()
        .map(|logs| logs.clone())
        .unwrap_or_default();
    HttpResponse::Ok().json(logs)
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(process_form).service(
        web::scope("/api")
            .service(process)
            .service(list_models)
            .service(rate_limit_status)
            .service(health)
            .service(get_logs),
    );
}

fn build_cors(config: &CorsConfig) -> Cors {
    if config.allowed_origins.is_empty() {
        return Cors::permissive();
    }
    config
        .allowed_origins
        .iter()
        .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
        .allow_any_method()
        .allow_any_header()
        .max_age(3600)
}

pub fn add_log(logs: &Mutex<Vec<LogEntry>>, level: &str, source: &str, message: &str) {
    match level {
        "ERROR" => tracing::error!(source, "{}", message),
        "WARN" => tracing::warn!(source, "{}", message),
        _ => tracing::info!(source, "{}", message),
    }

    let entry = LogEntry {
        time: Local::now().format("%H:%M:%S").to_string(),
        level: level.to_string(),
        source: source.to_string(),
        message: message.to_string(),
    };
    if let Ok(mut logs) = logs.lock() {
        logs.push(entry);
        if logs.len() > MAX_LOG_ENTRIES {
            logs.remove(0);
        }
    }
}

pub fn start_server(
    state: HttpState,
    server_config: &ServerConfig,
    cors: &CorsConfig,
) -> std::io::Result<Server> {
    let state = web::Data::new(state);
    let max_body_bytes = server_config.max_body_bytes;
    let cors = cors.clone();

    let server = HttpServer::new(move || {
        App::new()
            .wrap(build_cors(&cors))
            .app_data(state.clone())
            .app_data(web::JsonConfig::default().limit(max_body_bytes))
            .app_data(
                MultipartFormConfig::default()
                    .total_limit(max_body_bytes)
                    .memory_limit(max_body_bytes),
            )
            .configure(configure_routes)
    })
    .bind((server_config.host.as_str(), server_config.port))?
    .run();

    Ok(server)
}
