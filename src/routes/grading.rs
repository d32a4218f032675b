use actix_multipart::Multipart;
use actix_web::{web, HttpResponse, Responder};

use crate::routes::upload::read_uploads;
use crate::routes::{error_response, AppState};
use crate::services::GradingError;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/response/get-response", web::post().to(get_response));
}

/// Full grading run over uploaded question and pseudocode files
///
/// POST /api/v1/response/get-response
async fn get_response(state: web::Data<AppState>, payload: Multipart) -> impl Responder {
    let mut uploads = match read_uploads(&state, payload).await {
        Ok(uploads) => uploads,
        Err(response) => return response,
    };

    let question_files = uploads.take("question_files");
    let pseudocode_files = uploads.take("pseudocode_files");

    match state.grading.run(&question_files, &pseudocode_files).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e @ GradingError::EmptyInput) => error_response(400, "Invalid input", e.to_string()),
    }
}
