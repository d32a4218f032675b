use actix_web::{web, HttpResponse, Responder};
use validator::Validate;

use crate::models::{
    AddSolutionRequest, AddSolutionResponse, EvaluationRequest, QuickEvaluationRequest,
    SimilarSolutionsRequest, SimilarSolutionsResponse,
};
use crate::routes::{error_response, validation_error, AppState};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/evaluate-logic/evaluate", web::post().to(evaluate_logic))
        .route("/evaluate-logic/stats", web::get().to(collection_stats))
        .route("/pseudocode/evaluate", web::post().to(quick_evaluate))
        .route("/solutions", web::post().to(add_solution))
        .route("/solutions/similar", web::post().to(similar_solutions));
}

/// Structured evaluation against stored reference solutions
///
/// POST /api/v1/evaluate-logic/evaluate
async fn evaluate_logic(state: web::Data<AppState>, req: web::Json<EvaluationRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(&errors);
    }

    match state.evaluator.evaluate(&req.question, &req.pseudocode).await {
        Ok(evaluation) => HttpResponse::Ok().json(evaluation),
        Err(e) => {
            tracing::error!("Logic evaluation failed: {}", e);
            error_response(500, "Error evaluating logic", e.to_string())
        }
    }
}

/// GET /api/v1/evaluate-logic/stats
async fn collection_stats(state: web::Data<AppState>) -> impl Responder {
    match state.library.stats().await {
        Ok(stats) => HttpResponse::Ok().json(stats),
        Err(e) => {
            tracing::error!("Failed to read collection stats: {}", e);
            error_response(500, "Error getting collection stats", e.to_string())
        }
    }
}

/// Free-text evaluation
///
/// POST /api/v1/pseudocode/evaluate
async fn quick_evaluate(state: web::Data<AppState>, req: web::Json<QuickEvaluationRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(&errors);
    }

    match state
        .evaluator
        .quick_evaluate(&req.question, &req.pseudocode, req.context.as_deref())
        .await
    {
        Ok(evaluation) => HttpResponse::Ok().json(evaluation),
        Err(e) => {
            tracing::error!("Quick evaluation failed: {}", e);
            error_response(500, "Error evaluating pseudocode", e.to_string())
        }
    }
}

/// Store a reference solution
///
/// POST /api/v1/solutions
///
/// Request body:
/// ```json
/// {
///   "question": "string",
///   "pseudocode": "string",
///   "metadata": {"course": "CS101"}
/// }
/// ```
async fn add_solution(state: web::Data<AppState>, req: web::Json<AddSolutionRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(&errors);
    }

    let req = req.into_inner();
    match state
        .library
        .add_solution(&req.question, &req.pseudocode, req.metadata)
        .await
    {
        Ok(id) => HttpResponse::Created().json(AddSolutionResponse { id }),
        Err(e) => {
            tracing::error!("Failed to store solution: {}", e);
            error_response(500, "Error adding solution", e.to_string())
        }
    }
}

/// POST /api/v1/solutions/similar
async fn similar_solutions(state: web::Data<AppState>, req: web::Json<SimilarSolutionsRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(&errors);
    }

    match state
        .library
        .find_similar(&req.question, &req.pseudocode, req.n_results)
        .await
    {
        Ok(solutions) => HttpResponse::Ok().json(SimilarSolutionsResponse { solutions }),
        Err(e) => {
            tracing::error!("Similar solution search failed: {}", e);
            error_response(500, "Error finding similar solutions", e.to_string())
        }
    }
}
