use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::models::{CompleteResponse, FilesToTextResponse, InputProcessing, PageRange, UploadedFile};
use crate::services::evaluation::LogicEvaluator;
use crate::services::extractor::FileTextExtractor;
use crate::services::generation::CodeGenerator;

const GRADING_MAX_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum GradingError {
    #[error("Failed to process input files")]
    EmptyInput,
}

/// End-to-end grading of uploaded question and pseudocode files
///
/// Text extraction feeds code generation and logic evaluation, which run
/// side by side. A failed stage is reported inline and never fails the run.
pub struct GradingPipeline {
    extractor: Arc<FileTextExtractor>,
    generator: Arc<CodeGenerator>,
    evaluator: Arc<LogicEvaluator>,
}

impl GradingPipeline {
    pub fn new(
        extractor: Arc<FileTextExtractor>,
        generator: Arc<CodeGenerator>,
        evaluator: Arc<LogicEvaluator>,
    ) -> Self {
        Self {
            extractor,
            generator,
            evaluator,
        }
    }

    pub async fn run(
        &self,
        question_files: &[UploadedFile],
        pseudocode_files: &[UploadedFile],
    ) -> Result<CompleteResponse, GradingError> {
        let (question_content, pseudocode_content) = tokio::join!(
            self.extractor.content_for(question_files, PageRange::all()),
            self.extractor.content_for(pseudocode_files, PageRange::all()),
        );

        let question = question_content.join("\n");
        let pseudocode = pseudocode_content.join("\n");

        if question.is_empty() || pseudocode.is_empty() {
            tracing::warn!("Grading aborted: no text extracted from the uploaded files");
            return Err(GradingError::EmptyInput);
        }

        tracing::info!(
            "Grading submission: question_chars={}, pseudocode_chars={}",
            question.len(),
            pseudocode.len()
        );

        let (generated, evaluated) = tokio::join!(
            self.generator.generate(&pseudocode, &question, GRADING_MAX_RETRIES),
            self.evaluator.evaluate(&question, &pseudocode),
        );

        Ok(CompleteResponse {
            input_processing: InputProcessing {
                question: FilesToTextResponse { content: question_content },
                pseudocode: FilesToTextResponse { content: pseudocode_content },
            },
            code_generation: stage_value("code generation", generated),
            logic_evaluation: stage_value("logic evaluation", evaluated),
        })
    }
}

/// Serialize a stage outcome, or its `{"error", "status": "failed"}` marker
fn stage_value<T: Serialize, E: std::fmt::Display>(stage: &str, outcome: Result<T, E>) -> Value {
    let failed = |message: String| json!({ "error": message, "status": "failed" });

    match outcome {
        Ok(value) => serde_json::to_value(value).unwrap_or_else(|e| failed(e.to_string())),
        Err(e) => {
            tracing::error!("Grading stage {} failed: {}", stage, e);
            failed(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GeneratedCode;

    #[test]
    fn test_stage_value_success() {
        let generated = GeneratedCode {
            code: "x = 1".to_string(),
            testing_code: "from main import *".to_string(),
            model_used: "gemini-1.5-flash".to_string(),
        };
        let value = stage_value::<_, String>("code generation", Ok(generated));
        assert_eq!(value["code"], "x = 1");
    }

    #[test]
    fn test_stage_value_failure_marker() {
        let value = stage_value::<GeneratedCode, _>("code generation", Err("quota exceeded"));
        assert_eq!(value, json!({ "error": "quota exceeded", "status": "failed" }));
    }
}
