//! Qdrant-backed memory store
//!
//! Embeds text through the LLM endpoint's `/api/embeddings` route and
//! stores/searches points in a Qdrant collection over its REST API.
//! The collection is created on first use with the embedding dimension
//! observed from the first vector.

use async_trait::async_trait;
use conductor_application::ports::memory::{MemoryError, MemoryPort};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

pub struct QdrantMemoryStore {
    client: reqwest::Client,
    qdrant_url: String,
    collection: String,
    embed_url: String,
    embedding_model: String,
    collection_ready: AtomicBool,
}

impl QdrantMemoryStore {
    pub fn new(
        qdrant_url: impl Into<String>,
        collection: impl Into<String>,
        llm_api_url: impl Into<String>,
        embedding_model: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .unwrap_or_default();
        Self {
            client,
            qdrant_url: qdrant_url.into().trim_end_matches('/').to_string(),
            collection: collection.into(),
            embed_url: format!(
                "{}/api/embeddings",
                llm_api_url.into().trim_end_matches('/')
            ),
            embedding_model: embedding_model.into(),
            collection_ready: AtomicBool::new(false),
        }
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, MemoryError> {
        let response = self
            .client
            .post(&self.embed_url)
            .json(&json!({"model": self.embedding_model, "prompt": text}))
            .send()
            .await
            .map_err(|e| MemoryError::Embedding(e.to_string()))?;
        if !response.status().is_success() {
            return Err(MemoryError::Embedding(format!(
                "embedding endpoint returned HTTP {}",
                response.status()
            )));
        }
        let body: Value = response
            .json()
            .await
            .map_err(|e| MemoryError::Embedding(e.to_string()))?;
        let vector = body["embedding"]
            .as_array()
            .ok_or_else(|| MemoryError::Embedding("no embedding in response".to_string()))?
            .iter()
            .filter_map(|v| v.as_f64().map(|f| f as f32))
            .collect::<Vec<f32>>();
        if vector.is_empty() {
            return Err(MemoryError::Embedding("empty embedding".to_string()));
        }
        Ok(vector)
    }

    async fn ensure_collection(&self, dimension: usize) -> Result<(), MemoryError> {
        if self.collection_ready.load(Ordering::Relaxed) {
            return Ok(());
        }
        let url = format!("{}/collections/{}", self.qdrant_url, self.collection);
        let response = self
            .client
            .put(&url)
            .json(&json!({
                "vectors": {"size": dimension, "distance": "Cosine"}
            }))
            .send()
            .await
            .map_err(|e| MemoryError::Unavailable(e.to_string()))?;
        // 409 means it already exists; both count as ready
        if response.status().is_success() || response.status().as_u16() == 409 {
            self.collection_ready.store(true, Ordering::Relaxed);
            Ok(())
        } else {
            Err(MemoryError::Unavailable(format!(
                "failed to create collection: HTTP {}",
                response.status()
            )))
        }
    }
}

#[async_trait]
impl MemoryPort for QdrantMemoryStore {
    async fn search(
        &self,
        query: &str,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<String>, MemoryError> {
        let vector = self.embed(query).await?;
        self.ensure_collection(vector.len()).await?;

        let url = format!(
            "{}/collections/{}/points/search",
            self.qdrant_url, self.collection
        );
        let response = self
            .client
            .post(&url)
            .json(&json!({
                "vector": vector,
                "limit": limit,
                "with_payload": true,
                "filter": {
                    "must": [{"key": "session_id", "match": {"value": session_id}}]
                }
            }))
            .send()
            .await
            .map_err(|e| MemoryError::Unavailable(e.to_string()))?;
        if !response.status().is_success() {
            return Err(MemoryError::Store(format!(
                "search returned HTTP {}",
                response.status()
            )));
        }
        let body: Value = response
            .json()
            .await
            .map_err(|e| MemoryError::Store(e.to_string()))?;

        let memories: Vec<String> = body["result"]
            .as_array()
            .map(|hits| {
                hits.iter()
                    .filter_map(|hit| hit["payload"]["content"].as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();
        debug!(count = memories.len(), "memory search complete");
        Ok(memories)
    }

    async fn store(&self, content: &str, session_id: &str) -> Result<(), MemoryError> {
        let vector = self.embed(content).await?;
        self.ensure_collection(vector.len()).await?;

        let url = format!(
            "{}/collections/{}/points",
            self.qdrant_url, self.collection
        );
        let response = self
            .client
            .put(&url)
            .json(&json!({
                "points": [{
                    "id": Uuid::new_v4().to_string(),
                    "vector": vector,
                    "payload": {"content": content, "session_id": session_id}
                }]
            }))
            .send()
            .await
            .map_err(|e| MemoryError::Unavailable(e.to_string()))?;
        if !response.status().is_success() {
            return Err(MemoryError::Store(format!(
                "upsert returned HTTP {}",
                response.status()
            )));
        }
        Ok(())
    }
}
