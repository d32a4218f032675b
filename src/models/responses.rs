use serde::{Deserialize, Serialize};
use crate::models::domain::SimilarSolution;

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub vector_store: bool,
    pub docker: bool,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

/// Raw completion from a single model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptResponse {
    pub response: String,
    pub model_used: String,
}

/// Python implementation and pytest cases generated from pseudocode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedCode {
    pub code: String,
    pub testing_code: String,
    pub model_used: String,
}

/// Body returned when every code generation attempt failed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationErrorResponse {
    pub error: String,
    pub details: String,
    pub retries_attempted: u32,
}

/// Free-text evaluation, loosely split into sections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuickEvaluation {
    pub score: f64,
    pub feedback: String,
    pub logical_analysis: String,
    pub potential_issues: Vec<String>,
    pub model_used: String,
}

/// Per-file outcome of a text extraction batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FileTextResult {
    Extracted {
        filename: String,
        text: String,
    },
    Failed {
        filename: String,
        error: String,
        status: String,
    },
}

impl FileTextResult {
    pub fn failed(filename: impl Into<String>, error: impl Into<String>) -> Self {
        FileTextResult::Failed {
            filename: filename.into(),
            error: error.into(),
            status: "error".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilesToTextResponse {
    pub content: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageTextResponse {
    pub text: String,
}

/// OCR result for one image of a multi-image upload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageTextResult {
    pub filename: String,
    pub text: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultipleFilesResponse {
    pub results: Vec<ImageTextResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResults {
    pub results: Vec<FileTextResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessFilesResponse {
    pub question: BatchResults,
    pub pseudocode: BatchResults,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionStats {
    pub total_solutions: u64,
    pub collection_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddSolutionResponse {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarSolutionsResponse {
    pub solutions: Vec<SimilarSolution>,
}

/// Outcome of a sandboxed pytest run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxReport {
    pub exit_code: i64,
    pub logs: String,
    /// Parsed pytest-json-report output, when the container produced one
    pub report: Option<serde_json::Value>,
    pub timed_out: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputProcessing {
    pub question: FilesToTextResponse,
    pub pseudocode: FilesToTextResponse,
}

/// Combined payload of the grading workflow
///
/// `code_generation` and `logic_evaluation` hold either the stage result or
/// `{"error": ..., "status": "failed"}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteResponse {
    pub input_processing: InputProcessing,
    pub code_generation: serde_json::Value,
    pub logic_evaluation: serde_json::Value,
}
