use std::collections::HashMap;

use actix_multipart::{Multipart, MultipartError};
use actix_web::HttpResponse;
use futures_util::StreamExt;
use thiserror::Error;

use crate::models::UploadedFile;
use crate::routes::{error_response, AppState};

#[derive(Debug, Error)]
pub(crate) enum UploadError {
    #[error("{0}")]
    Multipart(MultipartError),

    #[error("Too many files in one request; the limit is {0}")]
    TooManyFiles(usize),
}

/// File parts of a multipart body, grouped by form field name
#[derive(Debug, Default)]
pub(crate) struct Uploads {
    fields: HashMap<String, Vec<UploadedFile>>,
    count: usize,
}

impl Uploads {
    /// Buffer every file part of the request
    ///
    /// A file larger than `max_file_bytes` is kept at `max_file_bytes + 1`
    /// bytes and the rest is discarded, so the size check still rejects it.
    /// Reading stops as soon as a part beyond `max_files` shows up.
    pub(crate) async fn read(
        mut payload: Multipart,
        max_file_bytes: usize,
        max_files: usize,
    ) -> Result<Self, UploadError> {
        let mut uploads = Uploads::default();

        while let Some(item) = payload.next().await {
            let mut field = item.map_err(UploadError::Multipart)?;

            let name = field.name().unwrap_or_default().to_string();
            let filename = field
                .content_disposition()
                .and_then(|cd| cd.get_filename())
                .map(str::to_string);

            // Plain form values are not uploads
            let Some(filename) = filename else {
                while let Some(chunk) = field.next().await {
                    chunk.map_err(UploadError::Multipart)?;
                }
                continue;
            };

            if uploads.count == max_files {
                tracing::info!("Rejecting multipart body with more than {} files", max_files);
                return Err(UploadError::TooManyFiles(max_files));
            }

            let content_type = field
                .content_type()
                .map(|mime| mime.to_string())
                .unwrap_or_else(|| "application/octet-stream".to_string());

            let mut bytes = Vec::new();
            while let Some(chunk) = field.next().await {
                let chunk = chunk.map_err(UploadError::Multipart)?;
                let room = (max_file_bytes + 1).saturating_sub(bytes.len());
                bytes.extend_from_slice(&chunk[..chunk.len().min(room)]);
            }

            tracing::debug!("Received upload {} ({}, {} bytes) in field {}", filename, content_type, bytes.len(), name);

            uploads.count += 1;
            uploads
                .fields
                .entry(name)
                .or_default()
                .push(UploadedFile::new(filename, content_type, bytes));
        }

        Ok(uploads)
    }

    /// Files sent under `name`, in upload order
    pub(crate) fn take(&mut self, name: &str) -> Vec<UploadedFile> {
        self.fields.remove(name).unwrap_or_default()
    }
}

/// Read the request's uploads with the configured limits; failures become a 400
pub(crate) async fn read_uploads(state: &AppState, payload: Multipart) -> Result<Uploads, HttpResponse> {
    Uploads::read(payload, state.max_file_bytes, state.max_files)
        .await
        .map_err(|e| match e {
            UploadError::TooManyFiles(_) => error_response(400, "Payload too large", e.to_string()),
            UploadError::Multipart(_) => {
                tracing::info!("Malformed multipart body: {}", e);
                error_response(400, "Invalid multipart body", e.to_string())
            }
        })
}
