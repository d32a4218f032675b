use std::sync::Arc;

use futures_util::future::join_all;

use crate::core::extraction::{error_line, format_megabytes};
use crate::core::{check_size, classify, decode_text, pdf_text, ExtractionError};
use crate::models::{FileKind, FileTextResult, ImageTextResult, PageRange, UploadedFile};
use crate::services::vision::{VisionClient, VisionError};

/// Converts uploaded text, PDF and image files to plain text
pub struct FileTextExtractor {
    vision: Arc<VisionClient>,
    max_file_bytes: usize,
}

impl FileTextExtractor {
    pub fn new(vision: Arc<VisionClient>, max_file_bytes: usize) -> Self {
        Self {
            vision,
            max_file_bytes,
        }
    }

    pub fn max_file_bytes(&self) -> usize {
        self.max_file_bytes
    }

    /// Text of one file; `range` only applies to PDFs
    pub async fn extract(&self, file: &UploadedFile, range: PageRange) -> Result<String, ExtractionError> {
        check_size(file, self.max_file_bytes)?;

        match classify(&file.content_type)? {
            FileKind::Text => decode_text(&file.bytes),
            FileKind::Pdf => {
                let bytes = file.bytes.clone();
                tokio::task::spawn_blocking(move || pdf_text(&bytes, range))
                    .await
                    .map_err(|e| ExtractionError::Pdf(e.to_string()))?
            }
            FileKind::Image => self.ocr(file).await,
        }
    }

    /// OCR a single upload that must be an image
    pub async fn image_text(&self, file: &UploadedFile) -> Result<String, ExtractionError> {
        check_size(file, self.max_file_bytes)?;
        if classify(&file.content_type)? != FileKind::Image {
            return Err(ExtractionError::NotAnImage);
        }
        self.ocr(file).await
    }

    async fn ocr(&self, file: &UploadedFile) -> Result<String, ExtractionError> {
        tracing::debug!("Running OCR on {} ({} bytes)", file.filename, file.size());

        match self.vision.detect_text(&file.bytes).await {
            Ok(Some(text)) => Ok(text),
            Ok(None) => Err(ExtractionError::NoTextDetected),
            Err(VisionError::Annotation(message)) => Err(ExtractionError::Ocr(message)),
            Err(e) => Err(ExtractionError::Upstream(e.to_string())),
        }
    }

    /// One entry per file: its text, or an `[Error in ...]` line
    pub async fn content_for(&self, files: &[UploadedFile], range: PageRange) -> Vec<String> {
        let outcomes = join_all(files.iter().map(|file| self.extract(file, range))).await;

        files
            .iter()
            .zip(outcomes)
            .map(|(file, outcome)| match outcome {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!("Failed to extract text from {}: {}", file.filename, e);
                    error_line(&file.filename, &e.to_string())
                }
            })
            .collect()
    }

    /// Per-file results with filenames, over the whole document
    pub async fn results_for(&self, files: &[UploadedFile]) -> Vec<FileTextResult> {
        let outcomes = join_all(files.iter().map(|file| self.extract(file, PageRange::all()))).await;

        files
            .iter()
            .zip(outcomes)
            .map(|(file, outcome)| match outcome {
                Ok(text) => FileTextResult::Extracted {
                    filename: file.filename.clone(),
                    text,
                },
                Err(e) => {
                    tracing::warn!("Failed to process {}: {}", file.filename, e);
                    FileTextResult::failed(&file.filename, e.to_string())
                }
            })
            .collect()
    }

    /// OCR every image of a batch
    ///
    /// Size and type are checked for all files up front; any violation fails
    /// the whole batch. OCR failures are reported per file.
    pub async fn image_results(&self, files: &[UploadedFile]) -> Result<Vec<ImageTextResult>, ExtractionError> {
        for file in files {
            if check_size(file, self.max_file_bytes).is_err() {
                return Err(ExtractionError::BatchTooLarge {
                    filename: file.filename.clone(),
                    limit: format_megabytes(self.max_file_bytes),
                });
            }
            if classify(&file.content_type).ok() != Some(FileKind::Image) {
                return Err(ExtractionError::BatchNotAnImage(file.filename.clone()));
            }
        }

        let outcomes = join_all(files.iter().map(|file| self.ocr(file))).await;

        Ok(files
            .iter()
            .zip(outcomes)
            .map(|(file, outcome)| {
                let (text, status) = match outcome {
                    Ok(text) => (text, "success".to_string()),
                    Err(ExtractionError::NoTextDetected) => (String::new(), "no_text_detected".to_string()),
                    Err(e) => {
                        tracing::warn!("OCR failed for {}: {}", file.filename, e);
                        (String::new(), format!("error: {}", e))
                    }
                };
                ImageTextResult {
                    filename: file.filename.clone(),
                    text,
                    status,
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VisionSettings;

    fn extractor(base_url: &str) -> FileTextExtractor {
        let settings = VisionSettings {
            api_key: "test-key".to_string(),
            base_url: base_url.to_string(),
            ..VisionSettings::default()
        };
        let vision = VisionClient::from_settings(&settings).unwrap();
        FileTextExtractor::new(Arc::new(vision), 1024)
    }

    #[tokio::test]
    async fn test_text_file_is_decoded() {
        let extractor = extractor("http://127.0.0.1:9");
        let file = UploadedFile::new("q.txt", "text/plain", b"Sum a list".to_vec());
        assert_eq!(extractor.extract(&file, PageRange::all()).await.unwrap(), "Sum a list");
    }

    #[tokio::test]
    async fn test_batch_keeps_going_after_failures() {
        let extractor = extractor("http://127.0.0.1:9");
        let files = vec![
            UploadedFile::new("a.txt", "text/plain", b"first".to_vec()),
            UploadedFile::new("b.doc", "application/msword", b"x".to_vec()),
            UploadedFile::new("c.txt", "text/plain", vec![b'x'; 2048]),
        ];

        let content = extractor.content_for(&files, PageRange::all()).await;
        assert_eq!(content.len(), 3);
        assert_eq!(content[0], "first");
        assert_eq!(content[1], "[Error in b.doc: File must be an image, PDF, or text file]");
        assert!(content[2].starts_with("[Error in c.txt: File size exceeds"));
    }

    #[tokio::test]
    async fn test_image_batch_rejects_non_images() {
        let extractor = extractor("http://127.0.0.1:9");
        let files = vec![
            UploadedFile::new("a.png", "image/png", vec![1]),
            UploadedFile::new("b.txt", "text/plain", b"x".to_vec()),
        ];
        let err = extractor.image_results(&files).await.unwrap_err();
        assert_eq!(err, ExtractionError::BatchNotAnImage("b.txt".to_string()));
        assert_eq!(err.to_string(), "File b.txt must be an image");
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn test_image_batch_names_oversized_file() {
        let extractor = extractor("http://127.0.0.1:9");
        let files = vec![UploadedFile::new("scan.png", "image/png", vec![0; 2048])];
        let err = extractor.image_results(&files).await.unwrap_err();

        assert_eq!(err.to_string(), "File scan.png exceeds maximum limit of 0.0MB");
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn test_image_text_statuses() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/images:annotate")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"responses":[{"textAnnotations":[{"description":"x = 1"}]}]}"#)
            .create_async()
            .await;

        let extractor = extractor(&server.url());
        let files = vec![UploadedFile::new("a.png", "image/png", vec![1, 2, 3])];
        let results = extractor.image_results(&files).await.unwrap();

        assert_eq!(results[0].status, "success");
        assert_eq!(results[0].text, "x = 1");
    }

    #[tokio::test]
    async fn test_empty_annotations_mean_no_text() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/images:annotate")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"responses":[{}]}"#)
            .create_async()
            .await;

        let extractor = extractor(&server.url());
        let file = UploadedFile::new("a.png", "image/png", vec![1]);
        assert_eq!(extractor.image_text(&file).await.unwrap_err(), ExtractionError::NoTextDetected);
    }
}
