use crate::models::{FileKind, PageRange, UploadedFile};
use thiserror::Error;

/// Errors produced while turning an upload into text
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExtractionError {
    #[error("File size exceeds maximum limit of {0}MB")]
    TooLarge(String),

    #[error("File must be an image, PDF, or text file")]
    UnsupportedType,

    #[error("File must be an image")]
    NotAnImage,

    #[error("File {0} must be an image")]
    BatchNotAnImage(String),

    #[error("File {filename} exceeds maximum limit of {limit}MB")]
    BatchTooLarge { filename: String, limit: String },

    #[error("Invalid text file encoding. Please use UTF-8 encoding.")]
    InvalidEncoding,

    #[error("{0}")]
    InvalidPageRange(String),

    #[error("Failed to process PDF: {0}")]
    Pdf(String),

    #[error("No text was detected in the image")]
    NoTextDetected,

    #[error("Error from Google Cloud Vision: {0}")]
    Ocr(String),

    #[error("OCR request failed: {0}")]
    Upstream(String),
}

impl ExtractionError {
    /// HTTP status the error maps to
    pub fn status_code(&self) -> u16 {
        match self {
            ExtractionError::TooLarge(_)
            | ExtractionError::UnsupportedType
            | ExtractionError::NotAnImage
            | ExtractionError::BatchNotAnImage(_)
            | ExtractionError::BatchTooLarge { .. }
            | ExtractionError::InvalidEncoding
            | ExtractionError::InvalidPageRange(_)
            | ExtractionError::Pdf(_) => 400,
            ExtractionError::NoTextDetected
            | ExtractionError::Ocr(_)
            | ExtractionError::Upstream(_) => 500,
        }
    }
}

/// Render a byte limit in megabytes, e.g. 10485760 -> "10"
pub fn format_megabytes(bytes: usize) -> String {
    const MB: usize = 1024 * 1024;
    if bytes % MB == 0 {
        format!("{}", bytes / MB)
    } else {
        format!("{:.1}", bytes as f64 / MB as f64)
    }
}

/// Reject uploads larger than `max_bytes`
pub fn check_size(file: &UploadedFile, max_bytes: usize) -> Result<(), ExtractionError> {
    if file.size() > max_bytes {
        return Err(ExtractionError::TooLarge(format_megabytes(max_bytes)));
    }
    Ok(())
}

/// Classify an upload by its declared content type
pub fn classify(content_type: &str) -> Result<FileKind, ExtractionError> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    match essence.as_str() {
        "text/plain" => Ok(FileKind::Text),
        "application/pdf" => Ok(FileKind::Pdf),
        other if other.starts_with("image/") => Ok(FileKind::Image),
        _ => Err(ExtractionError::UnsupportedType),
    }
}

pub fn decode_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    String::from_utf8(bytes.to_vec()).map_err(|_| ExtractionError::InvalidEncoding)
}

/// Resolve a page selection against a document with `total` pages
///
/// Returns the inclusive 1-based bounds to read.
pub fn resolve_page_range(range: PageRange, total: u32) -> Result<(u32, u32), ExtractionError> {
    if let Some(start) = range.start {
        if start < 1 || start > total {
            return Err(ExtractionError::InvalidPageRange(format!(
                "Start page must be between 1 and {}",
                total
            )));
        }
    }
    if let Some(end) = range.end {
        if end < 1 || end > total {
            return Err(ExtractionError::InvalidPageRange(format!(
                "End page must be between 1 and {}",
                total
            )));
        }
    }
    if let (Some(start), Some(end)) = (range.start, range.end) {
        if start > end {
            return Err(ExtractionError::InvalidPageRange(
                "Start page must be less than or equal to end page".to_string(),
            ));
        }
    }

    Ok((range.start.unwrap_or(1), range.end.unwrap_or(total)))
}

/// Extract the text layer of the selected PDF pages, one page per line block
///
/// Pages without text are skipped.
pub fn pdf_text(bytes: &[u8], range: PageRange) -> Result<String, ExtractionError> {
    let document = lopdf::Document::load_mem(bytes)
        .map_err(|e| ExtractionError::Pdf(e.to_string()))?;

    let total = document.get_pages().len() as u32;
    let (start, end) = resolve_page_range(range, total)?;

    let mut combined = Vec::new();
    for page in start..=end {
        let text = document
            .extract_text(&[page])
            .map_err(|e| ExtractionError::Pdf(e.to_string()))?;
        if !text.is_empty() {
            combined.push(text);
        }
    }

    tracing::debug!("Extracted text from PDF pages {}..={} of {}", start, end, total);

    Ok(combined.join("\n"))
}

/// Line placed in a content list when a file could not be converted
pub fn error_line(filename: &str, error: &str) -> String {
    format!("[Error in {}: {}]", filename, error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_ignores_parameters() {
        assert_eq!(classify("text/plain; charset=utf-8").unwrap(), FileKind::Text);
        assert_eq!(classify("image/PNG").unwrap(), FileKind::Image);
        assert_eq!(classify("application/pdf").unwrap(), FileKind::Pdf);
        assert_eq!(classify("application/zip"), Err(ExtractionError::UnsupportedType));
    }

    #[test]
    fn test_format_megabytes() {
        assert_eq!(format_megabytes(10 * 1024 * 1024), "10");
        assert_eq!(format_megabytes(1536 * 1024), "1.5");
    }

    #[test]
    fn test_page_range_defaults_to_whole_document() {
        assert_eq!(resolve_page_range(PageRange::all(), 4).unwrap(), (1, 4));
        assert_eq!(resolve_page_range(PageRange::new(Some(2), None), 4).unwrap(), (2, 4));
    }

    #[test]
    fn test_page_range_rejects_inverted_bounds() {
        let err = resolve_page_range(PageRange::new(Some(3), Some(2)), 4).unwrap_err();
        assert_eq!(err.to_string(), "Start page must be less than or equal to end page");
        assert_eq!(err.status_code(), 400);
    }

    /// A document with one line of Courier text per page
    fn pdf_with_pages(lines: &[&str]) -> Vec<u8> {
        use lopdf::content::{Content, Operation};
        use lopdf::{dictionary, Document, Object, Stream};

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for line in lines {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 24.into()]),
                    Operation::new("Td", vec![100.into(), 600.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*line)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => lines.len() as i64,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_pdf_page_selection() {
        let bytes = pdf_with_pages(&["Alpha", "Beta", "Gamma"]);

        let all = pdf_text(&bytes, PageRange::all()).unwrap();
        let alpha = all.find("Alpha").unwrap();
        let beta = all.find("Beta").unwrap();
        let gamma = all.find("Gamma").unwrap();
        assert!(alpha < beta && beta < gamma);

        let tail = pdf_text(&bytes, PageRange::new(Some(2), Some(3))).unwrap();
        assert!(!tail.contains("Alpha"));
        assert!(tail.contains("Beta") && tail.contains("Gamma"));

        let middle = pdf_text(&bytes, PageRange::new(Some(2), Some(2))).unwrap();
        assert!(middle.contains("Beta"));
        assert!(!middle.contains("Gamma"));
    }

    #[test]
    fn test_pdf_start_page_past_end() {
        let bytes = pdf_with_pages(&["Alpha", "Beta", "Gamma"]);
        let err = pdf_text(&bytes, PageRange::new(Some(4), None)).unwrap_err();

        assert_eq!(err.to_string(), "Start page must be between 1 and 3");
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_pdf_page_text_is_kept_as_extracted() {
        let bytes = pdf_with_pages(&["Alpha", "Beta"]);
        let document = lopdf::Document::load_mem(&bytes).unwrap();
        let expected = [1, 2]
            .iter()
            .map(|page| document.extract_text(&[*page]).unwrap())
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join("\n");

        assert_eq!(pdf_text(&bytes, PageRange::all()).unwrap(), expected);
    }

    #[test]
    fn test_invalid_pdf_is_bad_request() {
        let err = pdf_text(b"not a pdf", PageRange::all()).unwrap_err();
        assert!(matches!(err, ExtractionError::Pdf(_)));
        assert_eq!(err.status_code(), 400);
    }
}
