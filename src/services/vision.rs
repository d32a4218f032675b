use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use crate::config::VisionSettings;

/// Errors that can occur when calling Google Cloud Vision
#[derive(Debug, Error)]
pub enum VisionError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Vision API returned {status}: {message}")]
    ApiError { status: u16, message: String },

    /// Error reported inside an otherwise successful annotate response
    #[error("{0}")]
    Annotation(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

#[derive(Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<AnnotateImageResponse>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateImageResponse {
    #[serde(default)]
    text_annotations: Vec<TextAnnotation>,
    error: Option<Status>,
}

#[derive(Deserialize)]
struct TextAnnotation {
    #[serde(default)]
    description: String,
}

#[derive(Deserialize)]
struct Status {
    #[serde(default)]
    message: String,
}

/// Google Cloud Vision `images:annotate` client for text detection
pub struct VisionClient {
    base_url: String,
    api_key: String,
    client: Client,
}

impl VisionClient {
    pub fn from_settings(settings: &VisionSettings) -> Result<Self, VisionError> {
        Ok(Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            client: super::build_http_client(settings.timeout_secs)?,
        })
    }

    /// Run TEXT_DETECTION on an image
    ///
    /// Returns the full-text annotation (the first one), or `None` when the
    /// image contains no text.
    pub async fn detect_text(&self, image: &[u8]) -> Result<Option<String>, VisionError> {
        let url = format!("{}/v1/images:annotate", self.base_url);

        let payload = json!({
            "requests": [{
                "image": { "content": STANDARD.encode(image) },
                "features": [{ "type": "TEXT_DETECTION" }]
            }]
        });

        tracing::debug!("Vision text detection for {} byte image", image.len());

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Vision API error: status={}, body={}", status, super::truncate(&body, 500));
            return Err(VisionError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        let parsed: AnnotateResponse = response
            .json()
            .await
            .map_err(|e| VisionError::InvalidResponse(e.to_string()))?;

        let result = parsed
            .responses
            .into_iter()
            .next()
            .ok_or_else(|| VisionError::InvalidResponse("Missing responses array".into()))?;

        if let Some(error) = result.error.filter(|e| !e.message.is_empty()) {
            return Err(VisionError::Annotation(error.message));
        }

        Ok(result
            .text_annotations
            .into_iter()
            .next()
            .map(|a| a.description))
    }
}
