// Service exports
pub mod chroma;
pub mod cohere;
pub mod evaluation;
pub mod extractor;
pub mod gemini;
pub mod generation;
pub mod grading;
pub mod sandbox;
pub mod vision;

pub use chroma::{ChromaError, ChromaStore};
pub use cohere::{CohereClient, CohereError, EmbeddingKind, GenerateParams};
pub use evaluation::{EvaluationError, LogicEvaluator, SolutionLibrary};
pub use extractor::FileTextExtractor;
pub use gemini::{GeminiClient, GeminiError, GenerationConfig};
pub use generation::{CodeGenerator, GenerationError};
pub use grading::{GradingError, GradingPipeline};
pub use sandbox::{SandboxError, SandboxRunner};
pub use vision::{VisionClient, VisionError};

use std::time::Duration;

/// Shared reqwest client constructor for the upstream APIs
pub(crate) fn build_http_client(timeout_secs: u64) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
}

/// Cut `text` to at most `max` bytes on a char boundary, for log lines
pub(crate) fn truncate(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
