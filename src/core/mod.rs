// Pure request-shaping and response-parsing logic
pub mod codegen;
pub mod embedding;
pub mod evaluation;
pub mod extraction;

pub use codegen::{assemble_testing_code, code_prompt, strip_code_fences, test_prompt, test_schema};
pub use embedding::{average_embeddings, similarity_from_distance};
pub use evaluation::{
    evaluation_prompt, extract_json_object, parse_evaluation, parse_quick_evaluation,
    quick_evaluation_prompt, relevant_solutions, similar_solutions_context, EvaluationParseError,
};
pub use extraction::{check_size, classify, decode_text, pdf_text, resolve_page_range, ExtractionError};
