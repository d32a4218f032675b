use crate::models::{Evaluation, LogicalAnalysis, QuickEvaluation, SimilarSolution};
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;
use thiserror::Error;

const NO_SIMILAR_SOLUTIONS: &str = "No similar solutions found.";

#[derive(Debug, Error, PartialEq)]
pub enum EvaluationParseError {
    #[error("Invalid response format from Cohere")]
    NoJsonObject,

    #[error("Failed to parse evaluation response")]
    InvalidJson(String),
}

fn json_object_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?s)\{.*\}").expect("valid regex"))
}

fn number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(\d+\.?\d*)").expect("valid regex"))
}

/// Keep only solutions at or above the similarity threshold
pub fn relevant_solutions(solutions: &[SimilarSolution], threshold: f64) -> Vec<SimilarSolution> {
    solutions
        .iter()
        .filter(|s| s.similarity >= threshold)
        .cloned()
        .collect()
}

/// Render stored solutions as prompt context
///
/// Numbering follows the position in the query result, so filtered-out
/// solutions leave gaps.
pub fn similar_solutions_context(solutions: &[SimilarSolution], threshold: f64) -> String {
    let mut context = String::new();
    for (i, solution) in solutions.iter().enumerate() {
        if solution.similarity < threshold {
            continue;
        }
        context.push_str(&format!(
            "\nSolution {} (Similarity: {:.2}):\nQuestion: {}\nPseudocode:\n{}\n",
            i + 1,
            solution.similarity,
            solution.question,
            solution.pseudocode
        ));
    }

    if context.is_empty() {
        NO_SIMILAR_SOLUTIONS.to_string()
    } else {
        format!("\nSimilar Solutions Found:\n{}", context)
    }
}

/// Prompt requesting a JSON-formatted evaluation
pub fn evaluation_prompt(question: &str, pseudocode: &str, similar_context: &str) -> String {
    format!(
        r#"Question: {question}

Pseudocode Solution:
{pseudocode}

Similar Algorithms:
{similar_context}

Evaluate this pseudocode solution and answer with JSON in exactly this shape:
{{
    "score": <float between 0 and 1>,
    "feedback": "<general feedback about the solution>",
    "logical_analysis": {{
        "correctness": "<correctness of the solution>",
        "efficiency": "<efficiency of the solution>",
        "readability": "<readability of the solution>"
    }},
    "potential_issues": ["<issue 1>", "<issue 2>"]
}}

Consider:
1. Does it correctly address the question?
2. Is the logical flow sound?
3. Are edge cases left unhandled?
4. Could the solution be improved?
5. How does it compare to the similar solutions found?

Ignore comments and judge only the correctness of the pseudocode.
"#
    )
}

/// Prompt for the free-text evaluation
pub fn quick_evaluation_prompt(question: &str, pseudocode: &str, context: Option<&str>) -> String {
    let context = context
        .filter(|c| !c.trim().is_empty())
        .map(|c| format!("Additional Context: {}\n\n", c))
        .unwrap_or_default();

    format!(
        "Question: {question}\n\n\
         Pseudocode Solution:\n{pseudocode}\n\n\
         {context}\
         Evaluate this pseudocode solution considering:\n\
         1. Does it correctly address the question?\n\
         2. Is the logical flow sound?\n\
         3. Are edge cases left unhandled?\n\
         4. Could the solution be improved?\n\n\
         Give a detailed evaluation with a score from 0 to 1.\n"
    )
}

/// First `{` to last `}` of the text, across newlines
pub fn extract_json_object(text: &str) -> Option<&str> {
    json_object_pattern().find(text).map(|m| m.as_str())
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(|v| v.as_str()).map(str::to_string)
}

/// Parse the model's evaluation text, filling gaps with neutral defaults
pub fn parse_evaluation(
    text: &str,
    similar_solutions: Vec<SimilarSolution>,
) -> Result<Evaluation, EvaluationParseError> {
    let raw = extract_json_object(text).ok_or(EvaluationParseError::NoJsonObject)?;
    let json: Value = serde_json::from_str(raw)
        .map_err(|e| EvaluationParseError::InvalidJson(e.to_string()))?;

    let defaults = LogicalAnalysis::default();
    let analysis = json.get("logical_analysis").cloned().unwrap_or(Value::Null);
    let logical_analysis = LogicalAnalysis {
        correctness: string_field(&analysis, "correctness").unwrap_or(defaults.correctness),
        efficiency: string_field(&analysis, "efficiency").unwrap_or(defaults.efficiency),
        readability: string_field(&analysis, "readability").unwrap_or(defaults.readability),
    };

    let potential_issues = json
        .get("potential_issues")
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    let score = json
        .get("score")
        .and_then(|v| v.as_f64())
        .unwrap_or(0.5)
        .clamp(0.0, 1.0);

    Ok(Evaluation {
        score,
        feedback: string_field(&json, "feedback")
            .unwrap_or_else(|| "No detailed feedback available.".to_string()),
        logical_analysis,
        potential_issues,
        similar_solutions,
    })
}

/// Split a free-text evaluation into score, feedback, analysis and issues
pub fn parse_quick_evaluation(text: &str, model_used: &str) -> QuickEvaluation {
    let score = number_pattern()
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .map(|s| s.clamp(0.0, 1.0))
        .unwrap_or(0.5);

    let sections: Vec<&str> = text.split("\n\n").collect();
    let feedback = sections
        .first()
        .map(|s| s.to_string())
        .unwrap_or_else(|| "No detailed feedback available.".to_string());
    let logical_analysis = sections
        .get(1)
        .map(|s| s.to_string())
        .unwrap_or_else(|| "No logical analysis available.".to_string());

    let potential_issues = sections
        .iter()
        .filter(|section| {
            let lower = section.to_lowercase();
            lower.contains("issue") || lower.contains("problem")
        })
        .map(|section| section.trim().to_string())
        .collect();

    QuickEvaluation {
        score,
        feedback,
        logical_analysis,
        potential_issues,
        model_used: model_used.to_string(),
    }
}
