use serde::{Deserialize, Serialize};
use validator::Validate;

/// Free-form prompt forwarded to a single model
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PromptRequest {
    #[validate(length(min = 1))]
    pub prompt: String,
    #[serde(default = "default_temperature")]
    #[validate(range(min = 0.0, max = 2.0))]
    pub temperature: f64,
    #[serde(default)]
    #[validate(range(min = 1, max = 8192))]
    pub max_tokens: Option<u32>,
}

fn default_temperature() -> f64 {
    0.7
}

/// Request to turn pseudocode into Python plus pytest cases
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GenerateCodeRequest {
    /// The pseudocode
    #[validate(length(min = 1))]
    pub prompt: String,
    /// The question the pseudocode answers
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_max_retries")]
    #[validate(range(min = 1, max = 5))]
    pub max_retries: u32,
}

fn default_max_retries() -> u32 {
    3
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct EvaluationRequest {
    #[validate(length(min = 1))]
    pub question: String,
    #[validate(length(min = 1))]
    pub pseudocode: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct QuickEvaluationRequest {
    #[validate(length(min = 1))]
    pub question: String,
    #[validate(length(min = 1))]
    pub pseudocode: String,
    #[serde(default)]
    pub context: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AddSolutionRequest {
    #[validate(length(min = 1))]
    pub question: String,
    #[validate(length(min = 1))]
    pub pseudocode: String,
    #[serde(default)]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SimilarSolutionsRequest {
    #[validate(length(min = 1))]
    pub question: String,
    #[validate(length(min = 1))]
    pub pseudocode: String,
    #[serde(default = "default_n_results")]
    #[validate(range(min = 1, max = 50))]
    pub n_results: usize,
}

fn default_n_results() -> usize {
    5
}

/// Code to run under pytest in a sandbox
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunTestsRequest {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub test_code: Option<String>,
}

/// Optional PDF page selection on upload endpoints
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageQuery {
    pub start_page: Option<u32>,
    pub end_page: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_code_defaults() {
        let req: GenerateCodeRequest = serde_json::from_str(r#"{"prompt": "SET x TO 1"}"#).unwrap();
        assert_eq!(req.max_retries, 3);
        assert_eq!(req.description, "");
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_max_retries_bounds() {
        let req: GenerateCodeRequest =
            serde_json::from_str(r#"{"prompt": "x", "max_retries": 9}"#).unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_prompt_must_not_be_empty() {
        let req: PromptRequest = serde_json::from_str(r#"{"prompt": ""}"#).unwrap();
        assert_eq!(req.temperature, 0.7);
        assert!(req.validate().is_err());
    }
}
