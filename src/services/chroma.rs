use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::OnceCell;

use crate::config::ChromaSettings;
use crate::core::similarity_from_distance;
use crate::models::{SimilarSolution, StoredSolution};

/// Errors that can occur when talking to ChromaDB
#[derive(Debug, Error)]
pub enum ChromaError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("ChromaDB returned {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

#[derive(Serialize)]
struct CreateCollectionRequest<'a> {
    name: &'a str,
    metadata: Value,
    get_or_create: bool,
}

#[derive(Deserialize)]
struct CollectionInfo {
    id: String,
}

#[derive(Serialize)]
struct AddRequest<'a> {
    ids: Vec<&'a str>,
    embeddings: Vec<&'a [f32]>,
    documents: Vec<String>,
    metadatas: Vec<Map<String, Value>>,
}

#[derive(Serialize)]
struct QueryRequest<'a> {
    query_embeddings: Vec<&'a [f32]>,
    n_results: usize,
    include: Vec<&'a str>,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    distances: Option<Vec<Vec<Option<f64>>>>,
    #[serde(default)]
    metadatas: Option<Vec<Vec<Option<Map<String, Value>>>>>,
}

/// REST client for one ChromaDB collection using cosine distance
///
/// The collection is created (or looked up) on first use, so the service can
/// start while the vector store is still down.
pub struct ChromaStore {
    base_url: String,
    tenant: String,
    database: String,
    collection: String,
    client: Client,
    collection_id: OnceCell<String>,
}

impl ChromaStore {
    pub fn from_settings(settings: &ChromaSettings) -> Result<Self, ChromaError> {
        Ok(Self {
            base_url: settings.url.trim_end_matches('/').to_string(),
            tenant: settings.tenant.clone(),
            database: settings.database.clone(),
            collection: settings.collection.clone(),
            client: super::build_http_client(settings.timeout_secs)?,
            collection_id: OnceCell::new(),
        })
    }

    pub fn collection_name(&self) -> &str {
        &self.collection
    }

    fn collections_url(&self) -> String {
        format!(
            "{}/api/v2/tenants/{}/databases/{}/collections",
            self.base_url, self.tenant, self.database
        )
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, ChromaError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        tracing::error!("ChromaDB error: status={}, body={}", status, super::truncate(&body, 500));
        Err(ChromaError::ApiError {
            status: status.as_u16(),
            message: body,
        })
    }

    /// True when the server answers its heartbeat
    pub async fn heartbeat(&self) -> bool {
        let url = format!("{}/api/v2/heartbeat", self.base_url);
        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!("ChromaDB heartbeat failed: {}", e);
                false
            }
        }
    }

    async fn collection_id(&self) -> Result<&str, ChromaError> {
        let id = self
            .collection_id
            .get_or_try_init(|| async {
                let request = CreateCollectionRequest {
                    name: &self.collection,
                    metadata: serde_json::json!({ "hnsw:space": "cosine" }),
                    get_or_create: true,
                };

                let response = self
                    .client
                    .post(self.collections_url())
                    .json(&request)
                    .send()
                    .await?;
                let info: CollectionInfo = Self::check(response)
                    .await?
                    .json()
                    .await
                    .map_err(|e| ChromaError::InvalidResponse(e.to_string()))?;

                tracing::info!("Using ChromaDB collection {} ({})", self.collection, info.id);
                Ok::<String, ChromaError>(info.id)
            })
            .await?;

        Ok(id.as_str())
    }

    /// Store a solution under `id` with its embedding
    ///
    /// Only scalar metadata values are kept; the full record is also stored as
    /// the JSON document.
    pub async fn add(&self, id: &str, embedding: &[f32], solution: &StoredSolution) -> Result<(), ChromaError> {
        let collection_id = self.collection_id().await?;
        let url = format!("{}/{}/add", self.collections_url(), collection_id);

        let document = serde_json::to_string(solution)
            .map_err(|e| ChromaError::InvalidResponse(e.to_string()))?;

        let request = AddRequest {
            ids: vec![id],
            embeddings: vec![embedding],
            documents: vec![document],
            metadatas: vec![scalar_metadata(solution)],
        };

        let response = self.client.post(&url).json(&request).send().await?;
        Self::check(response).await?;

        tracing::debug!("Added solution {} to {}", id, self.collection);
        Ok(())
    }

    /// Nearest stored solutions to `embedding`, most similar first
    pub async fn query(&self, embedding: &[f32], n_results: usize) -> Result<Vec<SimilarSolution>, ChromaError> {
        let collection_id = self.collection_id().await?;
        let url = format!("{}/{}/query", self.collections_url(), collection_id);

        let request = QueryRequest {
            query_embeddings: vec![embedding],
            n_results,
            include: vec!["metadatas", "distances"],
        };

        let response = self.client.post(&url).json(&request).send().await?;
        let parsed: QueryResponse = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| ChromaError::InvalidResponse(e.to_string()))?;

        let distances = parsed
            .distances
            .and_then(|d| d.into_iter().next())
            .unwrap_or_default();
        let metadatas = parsed
            .metadatas
            .and_then(|m| m.into_iter().next())
            .unwrap_or_default();

        let solutions = metadatas
            .into_iter()
            .zip(distances)
            .filter_map(|(metadata, distance)| {
                let metadata = metadata?;
                let distance = distance?;
                Some(SimilarSolution {
                    question: metadata.get("question")?.as_str()?.to_string(),
                    pseudocode: metadata.get("pseudocode")?.as_str()?.to_string(),
                    similarity: similarity_from_distance(distance),
                })
            })
            .collect::<Vec<_>>();

        tracing::debug!("ChromaDB query returned {} solutions", solutions.len());
        Ok(solutions)
    }

    /// Number of stored solutions
    pub async fn count(&self) -> Result<u64, ChromaError> {
        let collection_id = self.collection_id().await?;
        let url = format!("{}/{}/count", self.collections_url(), collection_id);

        let response = self.client.get(&url).send().await?;
        Self::check(response)
            .await?
            .json::<u64>()
            .await
            .map_err(|e| ChromaError::InvalidResponse(e.to_string()))
    }
}

/// Metadata keys that carry the solution and cannot be set by callers
pub(crate) const RESERVED_METADATA: [&str; 2] = ["question", "pseudocode"];

fn scalar_metadata(solution: &StoredSolution) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("question".to_string(), Value::String(solution.question.clone()));
    map.insert("pseudocode".to_string(), Value::String(solution.pseudocode.clone()));
    for (key, value) in &solution.extra {
        if RESERVED_METADATA.contains(&key.as_str()) {
            tracing::debug!("Ignoring metadata field {} that shadows the solution itself", key);
            continue;
        }
        match value {
            Value::String(_) | Value::Number(_) | Value::Bool(_) => {
                map.insert(key.clone(), value.clone());
            }
            _ => tracing::debug!("Dropping non-scalar metadata field {}", key),
        }
    }
    map
}
