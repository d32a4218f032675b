use actix_web::{web, HttpResponse, Responder};

use crate::models::HealthResponse;
use crate::routes::AppState;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check));
}

/// Health check endpoint
///
/// Reports `degraded` when the vector store does not answer its heartbeat.
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let (vector_store, docker) = tokio::join!(state.chroma.heartbeat(), state.sandbox.is_available());

    let status = if vector_store { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        vector_store,
        docker,
        timestamp: chrono::Utc::now(),
    })
}
