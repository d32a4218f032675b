// Route exports
pub mod evaluation;
pub mod generation;
pub mod grading;
pub mod health;
pub mod input;
pub mod sandbox;
mod upload;

use std::sync::Arc;

use actix_web::{error, http::StatusCode, web, HttpRequest, HttpResponse, Responder};
use thiserror::Error;
use validator::ValidationErrors;

use crate::config::Settings;
use crate::models::ErrorResponse;
use crate::services::{
    ChromaError, ChromaStore, CodeGenerator, CohereClient, CohereError, FileTextExtractor,
    GeminiClient, GeminiError, GradingPipeline, LogicEvaluator, SandboxRunner, SolutionLibrary,
    VisionClient, VisionError,
};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub gemini: Arc<GeminiClient>,
    pub cohere: Arc<CohereClient>,
    pub chroma: Arc<ChromaStore>,
    pub extractor: Arc<FileTextExtractor>,
    pub generator: Arc<CodeGenerator>,
    pub library: Arc<SolutionLibrary>,
    pub evaluator: Arc<LogicEvaluator>,
    pub sandbox: Arc<SandboxRunner>,
    pub grading: Arc<GradingPipeline>,
    pub max_file_bytes: usize,
    pub max_files: usize,
}

/// A client could not be constructed at startup
#[derive(Debug, Error)]
pub enum StateError {
    #[error("Gemini client: {0}")]
    Gemini(#[from] GeminiError),
    #[error("Cohere client: {0}")]
    Cohere(#[from] CohereError),
    #[error("Vision client: {0}")]
    Vision(#[from] VisionError),
    #[error("ChromaDB client: {0}")]
    Chroma(#[from] ChromaError),
}

impl AppState {
    /// Wire every client and service from configuration
    pub fn from_settings(settings: &Settings) -> Result<Self, StateError> {
        let gemini = Arc::new(GeminiClient::from_settings(&settings.gemini)?);
        let cohere = Arc::new(CohereClient::from_settings(&settings.cohere)?);
        let vision = Arc::new(VisionClient::from_settings(&settings.vision)?);
        let chroma = Arc::new(ChromaStore::from_settings(&settings.chroma)?);

        let extractor = Arc::new(FileTextExtractor::new(vision, settings.upload.max_file_bytes));
        let generator = Arc::new(CodeGenerator::new(gemini.clone(), cohere.clone()));
        let library = Arc::new(SolutionLibrary::new(cohere.clone(), chroma.clone()));
        let evaluator = Arc::new(LogicEvaluator::new(
            cohere.clone(),
            library.clone(),
            settings.evaluation.clone(),
        ));
        let sandbox = Arc::new(SandboxRunner::from_settings(&settings.sandbox));
        let grading = Arc::new(GradingPipeline::new(
            extractor.clone(),
            generator.clone(),
            evaluator.clone(),
        ));

        Ok(Self {
            gemini,
            cohere,
            chroma,
            extractor,
            generator,
            library,
            evaluator,
            sandbox,
            grading,
            max_file_bytes: settings.upload.max_file_bytes,
            max_files: settings.upload.max_files,
        })
    }
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(root)).service(
        web::scope("/api/v1")
            .configure(health::configure)
            .configure(generation::configure)
            .configure(input::configure)
            .configure(evaluation::configure)
            .configure(sandbox::configure)
            .configure(grading::configure),
    );
}

async fn root() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "message": "Welcome to the CS Grader API",
        "docs_url": "/api/v1/health",
    }))
}

/// JSON error body with the given status
pub(crate) fn error_response(status: u16, error: &str, message: impl Into<String>) -> HttpResponse {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    HttpResponse::build(status).json(ErrorResponse {
        error: error.to_string(),
        message: message.into(),
        status_code: status.as_u16(),
    })
}

pub(crate) fn validation_error(errors: &ValidationErrors) -> HttpResponse {
    tracing::info!("Validation failed: field_errors={:?}", errors);
    error_response(400, "Validation failed", errors.to_string())
}

/// JSON error response for payload errors
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for JsonError {}

impl error::ResponseError for JsonError {
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST)
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(self)
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    }
    .into()
}

/// Handle query string errors
pub fn handle_query_payload_error(err: error::QueryPayloadError, req: &HttpRequest) -> actix_web::Error {
    tracing::info!("Query error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_query".to_string(),
        message: format!("Invalid query: {}", err),
        status_code: 400,
    }
    .into()
}

/// Extractor configuration shared by the server and the tests
pub fn json_config(limit: usize) -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(limit)
        .error_handler(handle_json_payload_error)
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(handle_query_payload_error)
}
