// Unit tests for CS Grader request shaping and response parsing

use cs_grader::core::extraction::{error_line, format_megabytes};
use cs_grader::core::{
    assemble_testing_code, average_embeddings, check_size, classify, code_prompt, decode_text,
    evaluation_prompt, extract_json_object, parse_evaluation, parse_quick_evaluation, pdf_text,
    quick_evaluation_prompt, relevant_solutions, resolve_page_range, similar_solutions_context,
    similarity_from_distance, strip_code_fences, test_prompt, test_schema, EvaluationParseError,
    ExtractionError,
};
use cs_grader::models::{FileKind, PageRange, SimilarSolution, UploadedFile};

fn solution(question: &str, similarity: f64) -> SimilarSolution {
    SimilarSolution {
        question: question.to_string(),
        pseudocode: format!("SOLVE {}", question),
        similarity,
    }
}

#[test]
fn test_size_limit_message_in_megabytes() {
    let file = UploadedFile::new("big.pdf", "application/pdf", vec![0; 11 * 1024 * 1024]);
    let err = check_size(&file, 10 * 1024 * 1024).unwrap_err();

    assert_eq!(err.to_string(), "File size exceeds maximum limit of 10MB");
    assert_eq!(err.status_code(), 400);
}

#[test]
fn test_file_at_limit_is_accepted() {
    let file = UploadedFile::new("ok.txt", "text/plain", vec![b'a'; 1024]);
    assert!(check_size(&file, 1024).is_ok());
}

#[test]
fn test_classification() {
    assert_eq!(classify("application/pdf").unwrap(), FileKind::Pdf);
    assert_eq!(classify("image/jpeg").unwrap(), FileKind::Image);
    assert_eq!(classify("text/plain").unwrap(), FileKind::Text);
    assert_eq!(classify("text/html").unwrap_err(), ExtractionError::UnsupportedType);
    assert_eq!(classify("").unwrap_err(), ExtractionError::UnsupportedType);
}

#[test]
fn test_decode_text_requires_utf8() {
    assert_eq!(decode_text("héllo".as_bytes()).unwrap(), "héllo");
    assert_eq!(decode_text(&[0xc3, 0x28]).unwrap_err(), ExtractionError::InvalidEncoding);
}

#[test]
fn test_page_range_bounds() {
    assert_eq!(resolve_page_range(PageRange::new(Some(2), Some(3)), 5).unwrap(), (2, 3));
    assert_eq!(resolve_page_range(PageRange::new(None, Some(2)), 5).unwrap(), (1, 2));
    assert_eq!(resolve_page_range(PageRange::new(Some(4), None), 5).unwrap(), (4, 5));

    let err = resolve_page_range(PageRange::new(Some(0), None), 5).unwrap_err();
    assert_eq!(err.to_string(), "Start page must be between 1 and 5");

    let err = resolve_page_range(PageRange::new(None, Some(6)), 5).unwrap_err();
    assert_eq!(err.to_string(), "End page must be between 1 and 5");
    assert_eq!(err.status_code(), 400);
}

#[test]
fn test_garbage_pdf() {
    let err = pdf_text(b"definitely not a pdf", PageRange::all()).unwrap_err();
    assert!(err.to_string().starts_with("Failed to process PDF: "));
}

#[test]
fn test_error_line_and_megabytes() {
    assert_eq!(error_line("a.txt", "boom"), "[Error in a.txt: boom]");
    assert_eq!(format_megabytes(10 * 1024 * 1024), "10");
    assert_eq!(format_megabytes(1536 * 1024), "1.5");
}

#[test]
fn test_ocr_errors_are_server_errors() {
    assert_eq!(ExtractionError::NoTextDetected.status_code(), 500);
    assert_eq!(ExtractionError::Ocr("bad image".to_string()).status_code(), 500);
    assert_eq!(
        ExtractionError::Ocr("bad image".to_string()).to_string(),
        "Error from Google Cloud Vision: bad image"
    );
}

#[test]
fn test_prompts_carry_inputs() {
    let code = code_prompt("Reverse a string", "RETURN s reversed");
    assert!(code.contains("Question Description:\nReverse a string"));
    assert!(code.contains("Pseudocode:\nRETURN s reversed"));

    let tests = test_prompt("Reverse a string", "RETURN s reversed");
    assert!(tests.contains("from main import *"));
    assert!(tests.contains("RETURN s reversed"));
}

#[test]
fn test_schema_requires_imports_and_tests() {
    let schema = test_schema();
    assert_eq!(schema["required"], serde_json::json!(["imports", "tests"]));
}

#[test]
fn test_fences_without_language() {
    assert_eq!(strip_code_fences("```\nx = 1\n```"), "x = 1");
    assert_eq!(strip_code_fences("  x = 1  "), "x = 1");
}

#[test]
fn test_testing_code_keeps_existing_import() {
    let raw = "from main import *\n\ndef test_a():\n    assert True";
    assert_eq!(assemble_testing_code(raw), raw);
}

#[test]
fn test_testing_code_from_fenced_json_tests() {
    let raw = r#"{"imports": "from main import *", "tests": "```python\ndef test_a():\n    pass\n```"}"#;
    assert_eq!(
        assemble_testing_code(raw),
        "from main import *\n\n\ndef test_a():\n    pass"
    );
}

#[test]
fn test_embeddings_average_and_similarity() {
    assert_eq!(average_embeddings(&[1.0, 3.0], &[3.0, 5.0]), vec![2.0, 4.0]);
    assert_eq!(similarity_from_distance(0.0), 1.0);
    assert_eq!(similarity_from_distance(0.25), 0.75);
}

#[test]
fn test_threshold_is_inclusive() {
    let solutions = vec![solution("a", 0.5), solution("b", 0.49), solution("c", 0.9)];
    let relevant = relevant_solutions(&solutions, 0.5);

    assert_eq!(relevant.len(), 2);
    assert_eq!(relevant[0].question, "a");
    assert_eq!(relevant[1].question, "c");
}

#[test]
fn test_evaluation_prompt_embeds_context() {
    let context = similar_solutions_context(&[solution("Sum a list", 0.9)], 0.5);
    let prompt = evaluation_prompt("Sum numbers", "ADD all", &context);

    assert!(prompt.contains("Question: Sum numbers"));
    assert!(prompt.contains("Solution 1 (Similarity: 0.90)"));
    assert!(prompt.contains("\"potential_issues\""));
}

#[test]
fn test_quick_prompt_context_is_optional() {
    let with = quick_evaluation_prompt("q", "p", Some("Week 3 material"));
    let without = quick_evaluation_prompt("q", "p", None);

    assert!(with.contains("Additional Context: Week 3 material"));
    assert!(!without.contains("Additional Context"));
}

#[test]
fn test_json_span_is_greedy() {
    let text = "prefix {\"a\": {\"b\": 1}} middle {\"c\": 2} suffix";
    assert_eq!(
        extract_json_object(text),
        Some("{\"a\": {\"b\": 1}} middle {\"c\": 2}")
    );
    assert_eq!(extract_json_object("no braces"), None);
}

#[test]
fn test_full_evaluation_parse() {
    let text = r#"Here is my evaluation:
{
    "score": 0.85,
    "feedback": "Solid",
    "logical_analysis": {
        "correctness": "Correct",
        "efficiency": "O(n)",
        "readability": "Clear"
    },
    "potential_issues": ["None significant", 42]
}"#;
    let similar = vec![solution("Sum a list", 0.8)];
    let evaluation = parse_evaluation(text, similar.clone()).unwrap();

    assert_eq!(evaluation.score, 0.85);
    assert_eq!(evaluation.logical_analysis.efficiency, "O(n)");
    assert_eq!(evaluation.potential_issues, vec!["None significant".to_string()]);
    assert_eq!(evaluation.similar_solutions, similar);
}

#[test]
fn test_negative_score_is_clamped() {
    let evaluation = parse_evaluation(r#"{"score": -2}"#, vec![]).unwrap();
    assert_eq!(evaluation.score, 0.0);
}

#[test]
fn test_evaluation_without_json_object() {
    assert_eq!(
        parse_evaluation("The answer is fine.", vec![]).unwrap_err(),
        EvaluationParseError::NoJsonObject
    );
}

#[test]
fn test_quick_evaluation_without_number() {
    let quick = parse_quick_evaluation("Looks right", "command");

    assert_eq!(quick.score, 0.5);
    assert_eq!(quick.feedback, "Looks right");
    assert_eq!(quick.logical_analysis, "No logical analysis available.");
    assert!(quick.potential_issues.is_empty());
}
