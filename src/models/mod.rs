// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{FileKind, PageRange, UploadedFile, StoredSolution, SimilarSolution, LogicalAnalysis, Evaluation};
pub use requests::{PromptRequest, GenerateCodeRequest, EvaluationRequest, QuickEvaluationRequest, AddSolutionRequest, SimilarSolutionsRequest, RunTestsRequest, PageQuery};
pub use responses::{
    HealthResponse, ErrorResponse, PromptResponse, GeneratedCode, GenerationErrorResponse,
    QuickEvaluation, FileTextResult, FilesToTextResponse, ImageTextResponse, ImageTextResult,
    MultipleFilesResponse, BatchResults, ProcessFilesResponse, CollectionStats, AddSolutionResponse,
    SimilarSolutionsResponse, SandboxReport, InputProcessing, CompleteResponse,
};
