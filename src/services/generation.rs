use std::sync::Arc;

use thiserror::Error;

use crate::core::{assemble_testing_code, code_prompt, strip_code_fences, test_prompt, test_schema};
use crate::models::GeneratedCode;
use crate::services::cohere::CohereClient;
use crate::services::gemini::{GeminiClient, GenerationConfig};

const CODE_MAX_OUTPUT_TOKENS: u32 = 1000;

/// Every attempt failed; carries the last failure
#[derive(Debug, Error)]
#[error("{details}")]
pub struct GenerationError {
    pub details: String,
    pub retries_attempted: u32,
}

/// Translates pseudocode into a Python module plus pytest cases
///
/// Gemini writes the implementation while Cohere writes the tests; both
/// requests of an attempt run concurrently.
pub struct CodeGenerator {
    gemini: Arc<GeminiClient>,
    cohere: Arc<CohereClient>,
}

impl CodeGenerator {
    pub fn new(gemini: Arc<GeminiClient>, cohere: Arc<CohereClient>) -> Self {
        Self { gemini, cohere }
    }

    pub async fn generate(
        &self,
        pseudocode: &str,
        description: &str,
        max_retries: u32,
    ) -> Result<GeneratedCode, GenerationError> {
        let attempts = max_retries.max(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match self.attempt(pseudocode, description).await {
                Ok(generated) => {
                    tracing::info!("Generated code on attempt {}/{}", attempt, attempts);
                    return Ok(generated);
                }
                Err(e) => {
                    tracing::warn!("Code generation attempt {}/{} failed: {}", attempt, attempts, e);
                    last_error = e;
                }
            }
        }

        tracing::error!("Code generation failed after {} attempts", attempts);
        Err(GenerationError {
            details: last_error,
            retries_attempted: attempts,
        })
    }

    async fn attempt(&self, pseudocode: &str, description: &str) -> Result<GeneratedCode, String> {
        let code_request = code_prompt(description, pseudocode);
        let test_request = test_prompt(description, pseudocode);
        let schema = test_schema();
        let config = GenerationConfig::deterministic(CODE_MAX_OUTPUT_TOKENS);

        let (code, tests) = tokio::join!(
            self.gemini.generate(&code_request, &config),
            self.cohere.chat_json(&test_request, &schema),
        );

        let code = strip_code_fences(&code.map_err(|e| e.to_string())?);
        if code.is_empty() {
            return Err("No response generated from Gemini".to_string());
        }

        let tests = tests.map_err(|e| e.to_string())?;
        let testing_code = assemble_testing_code(&tests);

        Ok(GeneratedCode {
            code,
            testing_code,
            model_used: self.gemini.model().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CohereSettings, GeminiSettings};

    fn generator(url: &str) -> CodeGenerator {
        let gemini = GeminiClient::from_settings(&GeminiSettings {
            api_key: "g".to_string(),
            base_url: url.to_string(),
            ..GeminiSettings::default()
        })
        .unwrap();
        let cohere = CohereClient::from_settings(&CohereSettings {
            api_key: "c".to_string(),
            base_url: url.to_string(),
            ..CohereSettings::default()
        })
        .unwrap();
        CodeGenerator::new(Arc::new(gemini), Arc::new(cohere))
    }

    #[tokio::test]
    async fn test_generate_combines_both_models() {
        let mut server = mockito::Server::new_async().await;
        let _gemini = server
            .mock("POST", mockito::Matcher::Regex(r"^/v1beta/models/.*:generateContent$".to_string()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"candidates":[{"content":{"parts":[{"text":"```python\ndef add(a, b):\n    return a + b\n```"}]}}]}"#)
            .create_async()
            .await;
        let _cohere = server
            .mock("POST", "/v2/chat")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"message":{"content":[{"type":"text","text":"{\"imports\":\"from main import add\",\"tests\":\"def test_add():\\n    assert add(1, 2) == 3\"}"}]}}"#)
            .create_async()
            .await;

        let generated = generator(&server.url()).generate("ADD a b", "", 3).await.unwrap();
        assert_eq!(generated.code, "def add(a, b):\n    return a + b");
        assert_eq!(
            generated.testing_code,
            "from main import add\n\ndef test_add():\n    assert add(1, 2) == 3"
        );
        assert_eq!(generated.model_used, "gemini-1.5-flash");
    }

    #[tokio::test]
    async fn test_retries_until_exhausted() {
        let mut server = mockito::Server::new_async().await;
        let gemini = server
            .mock("POST", mockito::Matcher::Regex(r"^/v1beta/models/.*:generateContent$".to_string()))
            .with_status(500)
            .with_body("boom")
            .expect(2)
            .create_async()
            .await;
        let _cohere = server
            .mock("POST", "/v2/chat")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"message":{"content":[{"type":"text","text":"def test_x(): pass"}]}}"#)
            .create_async()
            .await;

        let err = generator(&server.url()).generate("X", "", 2).await.unwrap_err();
        assert_eq!(err.retries_attempted, 2);
        assert!(err.details.contains("500"));
        gemini.assert_async().await;
    }
}
