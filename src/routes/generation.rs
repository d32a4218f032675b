use actix_web::{web, HttpResponse, Responder};
use validator::Validate;

use crate::models::{GenerateCodeRequest, GenerationErrorResponse, PromptRequest, PromptResponse};
use crate::routes::{error_response, validation_error, AppState};
use crate::services::{GenerateParams, GenerationConfig};

const DEFAULT_COHERE_MAX_TOKENS: u32 = 2048;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/gemini/generate", web::post().to(gemini_generate))
        .route("/cohere/generate", web::post().to(cohere_generate))
        .route("/generate-code/generate", web::post().to(generate_code));
}

/// Raw Gemini completion
///
/// POST /api/v1/gemini/generate
async fn gemini_generate(state: web::Data<AppState>, req: web::Json<PromptRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(&errors);
    }

    let config = GenerationConfig {
        temperature: Some(req.temperature),
        max_output_tokens: req.max_tokens,
        ..GenerationConfig::default()
    };

    match state.gemini.generate(&req.prompt, &config).await {
        Ok(response) => HttpResponse::Ok().json(PromptResponse {
            response,
            model_used: state.gemini.model().to_string(),
        }),
        Err(e) => {
            tracing::error!("Gemini generation failed: {}", e);
            error_response(500, "Error generating response from Gemini", e.to_string())
        }
    }
}

/// Raw Cohere completion
///
/// POST /api/v1/cohere/generate
async fn cohere_generate(state: web::Data<AppState>, req: web::Json<PromptRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(&errors);
    }

    let params = GenerateParams::new(req.max_tokens.unwrap_or(DEFAULT_COHERE_MAX_TOKENS), req.temperature);

    match state.cohere.generate(&req.prompt, &params).await {
        Ok(response) => HttpResponse::Ok().json(PromptResponse {
            response: response.trim().to_string(),
            model_used: state.cohere.generate_model().to_string(),
        }),
        Err(e) => {
            tracing::error!("Cohere generation failed: {}", e);
            error_response(500, "Error generating response from Cohere", e.to_string())
        }
    }
}

/// Pseudocode to Python plus pytest cases
///
/// POST /api/v1/generate-code/generate
///
/// Request body:
/// ```json
/// {
///   "prompt": "pseudocode",
///   "description": "question text",
///   "max_retries": 3
/// }
/// ```
async fn generate_code(state: web::Data<AppState>, req: web::Json<GenerateCodeRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(&errors);
    }

    tracing::info!("Generating code: pseudocode_chars={}, max_retries={}", req.prompt.len(), req.max_retries);

    match state
        .generator
        .generate(&req.prompt, &req.description, req.max_retries)
        .await
    {
        Ok(generated) => HttpResponse::Ok().json(generated),
        Err(e) => HttpResponse::InternalServerError().json(GenerationErrorResponse {
            error: "Unexpected error in generate_response".to_string(),
            details: e.details,
            retries_attempted: e.retries_attempted,
        }),
    }
}
