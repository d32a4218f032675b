use actix_multipart::Multipart;
use actix_web::{web, HttpResponse, Responder};

use crate::core::ExtractionError;
use crate::models::{
    BatchResults, FilesToTextResponse, ImageTextResponse, MultipleFilesResponse, PageQuery,
    PageRange, ProcessFilesResponse,
};
use crate::routes::upload::read_uploads;
use crate::routes::{error_response, AppState};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/input/files-to-text", web::post().to(files_to_text))
        .route("/input/image-to-text", web::post().to(image_to_text))
        .route("/input/multiple-files-to-text", web::post().to(multiple_files_to_text))
        .route("/process/process-files", web::post().to(process_files));
}

fn extraction_error(e: &ExtractionError) -> HttpResponse {
    let error = if e.status_code() == 400 {
        "Invalid file"
    } else {
        "Error processing file"
    };
    error_response(e.status_code(), error, e.to_string())
}

/// Text of every uploaded file, one entry per file
///
/// POST /api/v1/input/files-to-text?start_page=1&end_page=3
async fn files_to_text(
    state: web::Data<AppState>,
    query: web::Query<PageQuery>,
    payload: Multipart,
) -> impl Responder {
    let mut uploads = match read_uploads(&state, payload).await {
        Ok(uploads) => uploads,
        Err(response) => return response,
    };

    let files = uploads.take("files");
    if files.is_empty() {
        return error_response(400, "Validation failed", "No files provided");
    }

    let range = PageRange::new(query.start_page, query.end_page);
    tracing::info!("Converting {} files to text", files.len());

    let content = state.extractor.content_for(&files, range).await;
    HttpResponse::Ok().json(FilesToTextResponse { content })
}

/// OCR of a single image
///
/// POST /api/v1/input/image-to-text
async fn image_to_text(state: web::Data<AppState>, payload: Multipart) -> impl Responder {
    let mut uploads = match read_uploads(&state, payload).await {
        Ok(uploads) => uploads,
        Err(response) => return response,
    };

    let Some(file) = uploads.take("file").into_iter().next() else {
        return error_response(400, "Validation failed", "No file provided");
    };

    match state.extractor.image_text(&file).await {
        Ok(text) => HttpResponse::Ok().json(ImageTextResponse { text }),
        Err(e) => {
            tracing::warn!("OCR failed for {}: {}", file.filename, e);
            extraction_error(&e)
        }
    }
}

/// OCR of several images, with a status per image
///
/// POST /api/v1/input/multiple-files-to-text
async fn multiple_files_to_text(state: web::Data<AppState>, payload: Multipart) -> impl Responder {
    let mut uploads = match read_uploads(&state, payload).await {
        Ok(uploads) => uploads,
        Err(response) => return response,
    };

    let files = uploads.take("files");
    if files.is_empty() {
        return error_response(400, "Validation failed", "No files provided");
    }

    match state.extractor.image_results(&files).await {
        Ok(results) => HttpResponse::Ok().json(MultipleFilesResponse { results }),
        Err(e) => extraction_error(&e),
    }
}

/// Text of question and pseudocode uploads, with per-file results
///
/// POST /api/v1/process/process-files
async fn process_files(state: web::Data<AppState>, payload: Multipart) -> impl Responder {
    let mut uploads = match read_uploads(&state, payload).await {
        Ok(uploads) => uploads,
        Err(response) => return response,
    };

    let question_files = uploads.take("question_files");
    let pseudocode_files = uploads.take("pseudocode_files");
    if question_files.is_empty() || pseudocode_files.is_empty() {
        return error_response(
            400,
            "Validation failed",
            "Both question_files and pseudocode_files are required",
        );
    }

    let (question, pseudocode) = tokio::join!(
        state.extractor.results_for(&question_files),
        state.extractor.results_for(&pseudocode_files),
    );

    HttpResponse::Ok().json(ProcessFilesResponse {
        question: BatchResults { results: question },
        pseudocode: BatchResults { results: pseudocode },
    })
}
