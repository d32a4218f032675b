use actix_web::{web, HttpResponse, Responder};

use crate::models::RunTestsRequest;
use crate::routes::{error_response, AppState};
use crate::services::SandboxError;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/pytest/run", web::post().to(run_tests));
}

/// Run code and optional tests under pytest in a container
///
/// POST /api/v1/pytest/run
async fn run_tests(state: web::Data<AppState>, req: web::Json<RunTestsRequest>) -> impl Responder {
    if req.code.trim().is_empty() {
        return error_response(400, "Validation failed", "No code provided");
    }

    match state.sandbox.run(&req.code, req.test_code.as_deref()).await {
        Ok(report) => HttpResponse::Ok().json(report),
        Err(e) => {
            let error = match &e {
                SandboxError::DockerUnavailable => "Docker unavailable",
                SandboxError::BuildFailed(_) => "Image build failed",
                SandboxError::BuildTimedOut(_) => "Image build timed out",
                SandboxError::Docker(_) | SandboxError::Io(_) => "Error running tests",
            };
            tracing::error!("Pytest run failed: {}", e);
            error_response(e.status_code(), error, e.to_string())
        }
    }
}
