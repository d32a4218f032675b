use std::sync::Arc;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::config::EvaluationSettings;
use crate::core::{
    average_embeddings, evaluation_prompt, parse_evaluation, parse_quick_evaluation,
    quick_evaluation_prompt, relevant_solutions, similar_solutions_context, EvaluationParseError,
};
use crate::models::{CollectionStats, Evaluation, QuickEvaluation, SimilarSolution, StoredSolution};
use crate::services::chroma::{ChromaError, ChromaStore, RESERVED_METADATA};
use crate::services::cohere::{CohereClient, CohereError, EmbeddingKind, GenerateParams};

const EVALUATION_MAX_TOKENS: u32 = 1000;
const QUICK_EVALUATION_MAX_TOKENS: u32 = 500;

/// Errors that can occur while storing, searching or grading solutions
#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("Cohere request failed: {0}")]
    Cohere(#[from] CohereError),

    #[error("Vector store request failed: {0}")]
    VectorStore(#[from] ChromaError),

    #[error(transparent)]
    Parse(#[from] EvaluationParseError),
}

/// Reference solutions embedded into the vector store
pub struct SolutionLibrary {
    cohere: Arc<CohereClient>,
    chroma: Arc<ChromaStore>,
}

impl SolutionLibrary {
    pub fn new(cohere: Arc<CohereClient>, chroma: Arc<ChromaStore>) -> Self {
        Self { cohere, chroma }
    }

    /// Embedding of a solution: mean of its question and pseudocode vectors
    async fn solution_embedding(&self, question: &str, pseudocode: &str, kind: EmbeddingKind) -> Result<Vec<f32>, EvaluationError> {
        let (question_embedding, pseudocode_embedding) = tokio::try_join!(
            self.cohere.embed_one(question, kind),
            self.cohere.embed_one(pseudocode, kind),
        )?;
        Ok(average_embeddings(&question_embedding, &pseudocode_embedding))
    }

    /// Store a reference solution and return its id
    pub async fn add_solution(
        &self,
        question: &str,
        pseudocode: &str,
        metadata: Option<Map<String, Value>>,
    ) -> Result<String, EvaluationError> {
        let embedding = self
            .solution_embedding(question, pseudocode, EmbeddingKind::Document)
            .await?;

        let mut extra = metadata.unwrap_or_default();
        for key in RESERVED_METADATA {
            extra.remove(key);
        }

        let solution = StoredSolution {
            question: question.to_string(),
            pseudocode: pseudocode.to_string(),
            extra,
        };

        let id = format!("solution_{}", uuid::Uuid::new_v4());
        self.chroma.add(&id, &embedding, &solution).await?;

        tracing::info!("Stored solution {}", id);
        Ok(id)
    }

    /// Stored solutions closest to a question and pseudocode pair
    pub async fn find_similar(
        &self,
        question: &str,
        pseudocode: &str,
        n_results: usize,
    ) -> Result<Vec<SimilarSolution>, EvaluationError> {
        let embedding = self
            .solution_embedding(question, pseudocode, EmbeddingKind::Query)
            .await?;
        Ok(self.chroma.query(&embedding, n_results).await?)
    }

    /// Stored solutions closest to a question alone
    pub async fn find_by_question(&self, question: &str, n_results: usize) -> Result<Vec<SimilarSolution>, EvaluationError> {
        let embedding = self.cohere.embed_one(question, EmbeddingKind::Query).await?;
        Ok(self.chroma.query(&embedding, n_results).await?)
    }

    pub async fn stats(&self) -> Result<CollectionStats, EvaluationError> {
        let total_solutions = self.chroma.count().await?;
        Ok(CollectionStats {
            total_solutions,
            collection_name: self.chroma.collection_name().to_string(),
        })
    }
}

/// Grades pseudocode with Cohere, using stored solutions as context
pub struct LogicEvaluator {
    cohere: Arc<CohereClient>,
    library: Arc<SolutionLibrary>,
    settings: EvaluationSettings,
}

impl LogicEvaluator {
    pub fn new(cohere: Arc<CohereClient>, library: Arc<SolutionLibrary>, settings: EvaluationSettings) -> Self {
        Self {
            cohere,
            library,
            settings,
        }
    }

    /// Structured evaluation
    ///
    /// Similar solutions are looked up by question. If the vector store is
    /// unavailable the evaluation runs without them.
    pub async fn evaluate(&self, question: &str, pseudocode: &str) -> Result<Evaluation, EvaluationError> {
        let threshold = self.settings.similarity_threshold;

        let candidates = match self
            .library
            .find_by_question(question, self.settings.n_results)
            .await
        {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!("Similar solution lookup failed, evaluating without context: {}", e);
                Vec::new()
            }
        };

        let context = similar_solutions_context(&candidates, threshold);
        let prompt = evaluation_prompt(question, pseudocode, &context);

        let text = self
            .cohere
            .generate(&prompt, &GenerateParams::grading(EVALUATION_MAX_TOKENS))
            .await?;

        let evaluation = parse_evaluation(&text, relevant_solutions(&candidates, threshold))?;
        tracing::info!(
            "Evaluated pseudocode: score={:.2}, similar_solutions={}",
            evaluation.score,
            evaluation.similar_solutions.len()
        );
        Ok(evaluation)
    }

    /// Free-text evaluation without vector store context
    pub async fn quick_evaluate(
        &self,
        question: &str,
        pseudocode: &str,
        context: Option<&str>,
    ) -> Result<QuickEvaluation, EvaluationError> {
        let prompt = quick_evaluation_prompt(question, pseudocode, context);
        let text = self
            .cohere
            .generate(&prompt, &GenerateParams::grading(QUICK_EVALUATION_MAX_TOKENS))
            .await?;

        Ok(parse_quick_evaluation(&text, self.cohere.generate_model()))
    }
}
