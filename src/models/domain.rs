use serde::{Deserialize, Serialize};

/// A file received through a multipart upload, fully buffered
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(filename: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// How an upload is turned into text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// UTF-8 text, used as-is
    Text,
    /// PDF, text layer extracted page by page
    Pdf,
    /// Image, sent to OCR
    Image,
}

/// 1-based inclusive page selection for PDF uploads
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageRange {
    pub start: Option<u32>,
    pub end: Option<u32>,
}

impl PageRange {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn new(start: Option<u32>, end: Option<u32>) -> Self {
        Self { start, end }
    }
}

/// A reference solution as stored in the vector collection's metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSolution {
    pub question: String,
    pub pseudocode: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A stored solution returned from a similarity query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarSolution {
    pub question: String,
    pub pseudocode: String,
    pub similarity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicalAnalysis {
    pub correctness: String,
    pub efficiency: String,
    pub readability: String,
}

impl Default for LogicalAnalysis {
    fn default() -> Self {
        Self {
            correctness: "No correctness analysis available.".to_string(),
            efficiency: "No efficiency analysis available.".to_string(),
            readability: "No readability analysis available.".to_string(),
        }
    }
}

/// Structured evaluation of a pseudocode submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub score: f64,
    pub feedback: String,
    pub logical_analysis: LogicalAnalysis,
    pub potential_issues: Vec<String>,
    pub similar_solutions: Vec<SimilarSolution>,
}
