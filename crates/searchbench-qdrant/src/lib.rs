//! Qdrant backend speaking the REST API.
//!
//! Collections carry a named dense vector for semantic search and a
//! named IDF-modified sparse vector for lexical search, so one
//! collection serves all three query modes. Hybrid queries prefer the
//! engine's server-side RRF via prefetch; with `server_side_fusion`
//! disabled the backend runs both searches itself and fuses client-side.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};

use searchbench_core::backend::{Batches, DocumentStream, SearchBackend};
use searchbench_core::config::QdrantConfig;
use searchbench_core::document::{
    Distance, Document, IndexSchema, Payload, SearchHit, SparseVector,
};
use searchbench_core::fusion::{reciprocal_rank_fusion, OVERFETCH_FACTOR, RRF_K};
use searchbench_core::sparse::SparseTextEncoder;

pub const ENGINE: &str = "qdrant";

/// Named dense vector holding the document embedding.
pub const DENSE_VECTOR: &str = "embedding";
/// Named sparse vector holding term frequencies for lexical scoring.
pub const SPARSE_VECTOR: &str = "bm25";

pub struct QdrantBackend {
    base_url: String,
    api_key: Option<String>,
    server_side_fusion: bool,
    text_fields: Vec<String>,
    encoder: SparseTextEncoder,
    client: Option<Client>,
}

impl QdrantBackend {
    pub fn new(config: &QdrantConfig, schema: &IndexSchema, encoder: SparseTextEncoder) -> Self {
        Self {
            base_url: config.base_url(),
            api_key: config.api_key.clone(),
            server_side_fusion: config.server_side_fusion,
            text_fields: schema.text_fields().iter().map(ToString::to_string).collect(),
            encoder,
            client: None,
        }
    }

    fn client(&self) -> Result<&Client> {
        self.client
            .as_ref()
            .ok_or_else(|| anyhow!("qdrant backend is not connected"))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.header("api-key", key.as_str()),
            None => request,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Sparse vector for a document: the pre-computed one when the
    /// corpus carries it, otherwise encoded from the text fields.
    fn sparse_for(&self, doc: &Document) -> SparseVector {
        if let Some(sparse) = &doc.sparse {
            return sparse.clone();
        }
        self.encoder.encode(&collect_text(&doc.fields, &self.text_fields))
    }

    async fn query_points(&self, collection: &str, body: Value) -> Result<Vec<SearchHit>> {
        let client = self.client()?;
        let response = self
            .authorize(client.post(self.url(&format!("collections/{collection}/points/query"))))
            .json(&body)
            .send()
            .await
            .context("sending query request")?;
        let status = response.status();
        let text = response.text().await.context("reading query response")?;
        if !status.is_success() {
            anyhow::bail!("query on '{collection}' returned {status}: {text}");
        }
        parse_query_hits(&text)
    }
}

#[async_trait]
impl SearchBackend for QdrantBackend {
    fn engine(&self) -> &str {
        ENGINE
    }

    async fn connect(&mut self) -> Result<()> {
        self.client = Some(Client::builder().build().context("building http client")?);
        Ok(())
    }

    async fn disconnect(&mut self) {
        self.client = None;
    }

    async fn health_check(&self) -> bool {
        let Ok(client) = self.client() else {
            return false;
        };
        match self.authorize(client.get(self.url("collections"))).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::warn!("Qdrant health check failed: {}", e);
                false
            }
        }
    }

    async fn reset_index(&self, index: &str) -> Result<()> {
        let client = self.client()?;
        let response = self
            .authorize(client.delete(self.url(&format!("collections/{index}"))))
            .send()
            .await
            .context("sending delete collection request")?;
        let status = response.status();
        if delete_succeeded(status) {
            tracing::debug!("Reset collection '{}' ({})", index, status);
            return Ok(());
        }
        let text = response.text().await.unwrap_or_default();
        anyhow::bail!("deleting collection '{index}' returned {status}: {text}")
    }

    async fn create_index(&self, index: &str, schema: &IndexSchema) -> Result<()> {
        let client = self.client()?;
        let response = self
            .authorize(client.put(self.url(&format!("collections/{index}"))))
            .json(&collection_body(schema))
            .send()
            .await
            .context("sending create collection request")?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("creating collection '{index}' returned {status}: {text}");
        }
        Ok(())
    }

    async fn index_documents(
        &self,
        index: &str,
        docs: DocumentStream<'_>,
        batch_size: usize,
    ) -> Result<u64> {
        let client = self.client()?;
        let mut acknowledged = 0u64;
        for batch in Batches::new(docs, batch_size) {
            let batch = batch?;
            let points: Vec<Value> = batch.iter().map(|doc| self.point_for(doc)).collect();
            // wait=true blocks until the points are persisted, so the
            // timed span covers real work rather than queueing.
            let response = self
                .authorize(
                    client.put(self.url(&format!("collections/{index}/points?wait=true"))),
                )
                .json(&json!({ "points": points }))
                .send()
                .await
                .context("sending upsert request")?;
            let status = response.status();
            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                anyhow::bail!("upsert into '{index}' returned {status}: {text}");
            }
            acknowledged += batch.len() as u64;
        }
        Ok(acknowledged)
    }

    async fn get_doc_count(&self, index: &str) -> Result<u64> {
        let client = self.client()?;
        let response = self
            .authorize(client.get(self.url(&format!("collections/{index}"))))
            .send()
            .await
            .context("sending collection info request")?;
        let status = response.status();
        let text = response.text().await.context("reading collection info")?;
        if !status.is_success() {
            anyhow::bail!("collection info for '{index}' returned {status}: {text}");
        }
        let info: CollectionInfoResponse =
            serde_json::from_str(&text).context("parsing collection info")?;
        Ok(info.result.points_count.unwrap_or(0))
    }

    async fn lexical_search(&self, index: &str, query: &str, limit: usize) -> Vec<SearchHit> {
        let sparse = self.encoder.encode(query);
        let body = sparse_query(&sparse, limit);
        match self.query_points(index, body).await {
            Ok(hits) => hits,
            Err(e) => {
                tracing::warn!("Qdrant lexical search failed: {:#}", e);
                Vec::new()
            }
        }
    }

    async fn vector_search(&self, index: &str, vector: &[f32], limit: usize) -> Vec<SearchHit> {
        let body = dense_query(vector, limit);
        match self.query_points(index, body).await {
            Ok(hits) => hits,
            Err(e) => {
                tracing::warn!("Qdrant vector search failed: {:#}", e);
                Vec::new()
            }
        }
    }

    async fn hybrid_search(
        &self,
        index: &str,
        query: &str,
        vector: &[f32],
        limit: usize,
    ) -> Vec<SearchHit> {
        if self.server_side_fusion {
            let sparse = self.encoder.encode(query);
            let body = fused_query(vector, &sparse, limit);
            return match self.query_points(index, body).await {
                Ok(hits) => hits,
                Err(e) => {
                    tracing::warn!("Qdrant hybrid search failed: {:#}", e);
                    Vec::new()
                }
            };
        }

        // Client-side fallback: run both modes wide, fuse by rank.
        let candidates = limit * OVERFETCH_FACTOR;
        let dense_hits = self.vector_search(index, vector, candidates).await;
        let sparse_hits = self.lexical_search(index, query, candidates).await;
        reciprocal_rank_fusion(&[&dense_hits, &sparse_hits], RRF_K, limit)
    }
}

impl QdrantBackend {
    fn point_for(&self, doc: &Document) -> Value {
        let sparse = self.sparse_for(doc);
        json!({
            "id": doc.id,
            "vector": {
                DENSE_VECTOR: doc.embedding,
                SPARSE_VECTOR: { "indices": sparse.indices, "values": sparse.values },
            },
            "payload": doc.fields,
        })
    }
}

/// Deleting a collection that never existed is part of the reset
/// contract, not a failure.
fn delete_succeeded(status: StatusCode) -> bool {
    status.is_success() || status == StatusCode::NOT_FOUND
}

/// Concatenate the values of the text fields for sparse encoding.
fn collect_text(fields: &Payload, text_fields: &[String]) -> String {
    let mut parts = Vec::new();
    for name in text_fields {
        if let Some(value) = fields.get(name).and_then(Value::as_str) {
            parts.push(value);
        }
    }
    parts.join(" ")
}

fn collection_body(schema: &IndexSchema) -> Value {
    json!({
        "vectors": {
            DENSE_VECTOR: {
                "size": schema.vector.dim,
                "distance": distance_name(schema.vector.distance),
            },
        },
        "sparse_vectors": {
            SPARSE_VECTOR: { "modifier": "idf" },
        },
    })
}

fn distance_name(distance: Distance) -> &'static str {
    match distance {
        Distance::Cosine => "Cosine",
        Distance::Dot => "Dot",
        Distance::Euclid => "Euclid",
    }
}

fn dense_query(vector: &[f32], limit: usize) -> Value {
    json!({
        "query": vector,
        "using": DENSE_VECTOR,
        "limit": limit,
        "with_payload": true,
    })
}

fn sparse_query(sparse: &SparseVector, limit: usize) -> Value {
    json!({
        "query": { "indices": sparse.indices, "values": sparse.values },
        "using": SPARSE_VECTOR,
        "limit": limit,
        "with_payload": true,
    })
}

/// Server-side hybrid: both modes run as prefetch branches and the
/// engine fuses them with RRF.
fn fused_query(vector: &[f32], sparse: &SparseVector, limit: usize) -> Value {
    let candidates = limit * OVERFETCH_FACTOR;
    json!({
        "prefetch": [
            { "query": vector, "using": DENSE_VECTOR, "limit": candidates },
            {
                "query": { "indices": sparse.indices, "values": sparse.values },
                "using": SPARSE_VECTOR,
                "limit": candidates,
            },
        ],
        "query": { "fusion": "rrf" },
        "limit": limit,
        "with_payload": true,
    })
}

#[derive(Debug, Deserialize)]
struct CollectionInfoResponse {
    result: CollectionInfo,
}

#[derive(Debug, Deserialize)]
struct CollectionInfo {
    #[serde(default)]
    points_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    result: QueryResult,
}

#[derive(Debug, Deserialize)]
struct QueryResult {
    #[serde(default)]
    points: Vec<ScoredPoint>,
}

#[derive(Debug, Deserialize)]
struct ScoredPoint {
    id: u64,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    payload: Payload,
}

fn parse_query_hits(body: &str) -> Result<Vec<SearchHit>> {
    let response: QueryResponse = serde_json::from_str(body).context("parsing query response")?;
    Ok(response
        .result
        .points
        .into_iter()
        .map(|point| SearchHit {
            id: point.id,
            score: point.score,
            payload: point.payload,
        })
        .collect())
}
