//! Elasticsearch backend speaking the REST API.
//!
//! Dense vectors live in a `dense_vector` mapping with an HNSW index;
//! lexical queries are `multi_match` over the schema's text fields.
//! Hybrid queries use the engine's native combination of a `query` and
//! a top-level `knn` clause, so fusion happens server-side.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};

use searchbench_core::backend::{Batches, DocumentStream, SearchBackend};
use searchbench_core::config::ElasticConfig;
use searchbench_core::document::{Distance, Document, FieldKind, IndexSchema, SearchHit};
use searchbench_core::fusion::OVERFETCH_FACTOR;

pub const ENGINE: &str = "elasticsearch";

pub struct ElasticBackend {
    host: String,
    api_key: Option<String>,
    text_fields: Vec<String>,
    client: Option<Client>,
}

impl ElasticBackend {
    pub fn new(config: &ElasticConfig, schema: &IndexSchema) -> Self {
        Self {
            host: config.host.trim_end_matches('/').to_string(),
            api_key: config.resolved_api_key(),
            text_fields: schema.text_fields().iter().map(ToString::to_string).collect(),
            client: None,
        }
    }

    fn client(&self) -> Result<&Client> {
        self.client
            .as_ref()
            .ok_or_else(|| anyhow!("elasticsearch backend is not connected"))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.header("Authorization", format!("ApiKey {key}")),
            None => request,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.host, path)
    }

    async fn search(&self, index: &str, body: Value) -> Result<Vec<SearchHit>> {
        let client = self.client()?;
        let response = self
            .authorize(client.post(self.url(&format!("{index}/_search"))))
            .json(&body)
            .send()
            .await
            .context("sending search request")?;
        let status = response.status();
        let text = response.text().await.context("reading search response")?;
        if !status.is_success() {
            anyhow::bail!("search on '{index}' returned {status}: {text}");
        }
        parse_search_hits(&text)
    }
}

#[async_trait]
impl SearchBackend for ElasticBackend {
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
        match self.authorize(client.get(self.url(""))).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::warn!("Elasticsearch health check failed: {}", e);
                false
            }
        }
    }

    async fn reset_index(&self, index: &str) -> Result<()> {
        let client = self.client()?;
        let response = self
            .authorize(client.delete(self.url(index)))
            .send()
            .await
            .context("sending delete index request")?;
        let status = response.status();
        if delete_succeeded(status) {
            tracing::debug!("Reset index '{}' ({})", index, status);
            return Ok(());
        }
        let text = response.text().await.unwrap_or_default();
        anyhow::bail!("deleting index '{index}' returned {status}: {text}")
    }

    async fn create_index(&self, index: &str, schema: &IndexSchema) -> Result<()> {
        let client = self.client()?;
        let response = self
            .authorize(client.put(self.url(index)))
            .json(&mappings_body(schema))
            .send()
            .await
            .context("sending create index request")?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("creating index '{index}' returned {status}: {text}");
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
            let body = bulk_body(index, &batch)?;
            let response = self
                .authorize(client.post(self.url("_bulk")))
                .header("Content-Type", "application/x-ndjson")
                .body(body)
                .send()
                .await
                .context("sending bulk request")?;
            let status = response.status();
            let text = response.text().await.context("reading bulk response")?;
            if !status.is_success() {
                anyhow::bail!("bulk indexing into '{index}' returned {status}: {text}");
            }
            acknowledged += parse_bulk_acknowledged(&text)?;
        }

        // Make everything searchable and countable before the clock stops.
        let response = self
            .authorize(client.post(self.url(&format!("{index}/_refresh"))))
            .send()
            .await
            .context("sending refresh request")?;
        if !response.status().is_success() {
            anyhow::bail!("refreshing index '{index}' returned {}", response.status());
        }
        Ok(acknowledged)
    }

    async fn get_doc_count(&self, index: &str) -> Result<u64> {
        let client = self.client()?;
        let response = self
            .authorize(client.get(self.url(&format!("{index}/_count"))))
            .send()
            .await
            .context("sending count request")?;
        let status = response.status();
        let text = response.text().await.context("reading count response")?;
        if !status.is_success() {
            anyhow::bail!("counting '{index}' returned {status}: {text}");
        }
        let counted: CountResponse = serde_json::from_str(&text).context("parsing count response")?;
        Ok(counted.count)
    }

    async fn lexical_search(&self, index: &str, query: &str, limit: usize) -> Vec<SearchHit> {
        let body = lexical_query(&self.text_fields, query, limit);
        match self.search(index, body).await {
            Ok(hits) => hits,
            Err(e) => {
                tracing::warn!("Elasticsearch lexical search failed: {:#}", e);
                Vec::new()
            }
        }
    }

    async fn vector_search(&self, index: &str, vector: &[f32], limit: usize) -> Vec<SearchHit> {
        let body = vector_query(vector, limit);
        match self.search(index, body).await {
            Ok(hits) => hits,
            Err(e) => {
                tracing::warn!("Elasticsearch vector search failed: {:#}", e);
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
        let body = hybrid_query(&self.text_fields, query, vector, limit);
        match self.search(index, body).await {
            Ok(hits) => hits,
            Err(e) => {
                tracing::warn!("Elasticsearch hybrid search failed: {:#}", e);
                Vec::new()
            }
        }
    }
}

/// Deleting an index that never existed is part of the reset contract,
/// not a failure.
fn delete_succeeded(status: StatusCode) -> bool {
    status.is_success() || status == StatusCode::NOT_FOUND
}

/// Translate the engine-agnostic schema into an index mapping.
fn mappings_body(schema: &IndexSchema) -> Value {
    let mut properties = serde_json::Map::new();
    for (name, kind) in &schema.fields {
        let mapped = match kind {
            FieldKind::Text => "text",
            FieldKind::Keyword => "keyword",
            FieldKind::Integer => "integer",
            FieldKind::Float => "float",
        };
        properties.insert(name.clone(), json!({ "type": mapped }));
    }
    properties.insert(
        "embedding".to_string(),
        json!({
            "type": "dense_vector",
            "dims": schema.vector.dim,
            "index": true,
            "similarity": similarity_name(schema.vector.distance),
            "index_options": { "type": "hnsw", "m": 16, "ef_construction": 100 },
        }),
    );
    json!({ "mappings": { "properties": properties } })
}

fn similarity_name(distance: Distance) -> &'static str {
    match distance {
        Distance::Cosine => "cosine",
        Distance::Dot => "dot_product",
        Distance::Euclid => "l2_norm",
    }
}

/// One action line plus one source line per document, newline
/// terminated as the bulk endpoint requires.
fn bulk_body(index: &str, batch: &[Document]) -> Result<String> {
    let mut body = String::new();
    for doc in batch {
        let action = json!({ "index": { "_index": index, "_id": doc.id } });
        let mut source = doc.fields.clone();
        source.insert("embedding".to_string(), json!(doc.embedding));
        body.push_str(&serde_json::to_string(&action)?);
        body.push('\n');
        body.push_str(&serde_json::to_string(&source)?);
        body.push('\n');
    }
    Ok(body)
}

fn lexical_query(fields: &[String], query: &str, limit: usize) -> Value {
    json!({
        "query": { "multi_match": { "query": query, "fields": fields } },
        "size": limit,
        "_source": { "excludes": ["embedding"] },
    })
}

fn vector_query(vector: &[f32], limit: usize) -> Value {
    json!({
        "knn": {
            "field": "embedding",
            "query_vector": vector,
            "k": limit,
            "num_candidates": limit * OVERFETCH_FACTOR,
        },
        "size": limit,
        "_source": { "excludes": ["embedding"] },
    })
}

/// Native hybrid ranking: the engine sums the lexical score and the
/// knn score for documents matched by either clause.
fn hybrid_query(fields: &[String], query: &str, vector: &[f32], limit: usize) -> Value {
    json!({
        "query": { "multi_match": { "query": query, "fields": fields } },
        "knn": {
            "field": "embedding",
            "query_vector": vector,
            "k": limit,
            "num_candidates": limit * OVERFETCH_FACTOR,
        },
        "size": limit,
        "_source": { "excludes": ["embedding"] },
    })
}

#[derive(Debug, Deserialize)]
struct CountResponse {
    count: u64,
}

#[derive(Debug, Deserialize)]
struct BulkResponse {
    #[serde(default)]
    items: Vec<BulkItem>,
}

#[derive(Debug, Deserialize)]
struct BulkItem {
    #[serde(default)]
    index: Option<BulkItemStatus>,
}

#[derive(Debug, Deserialize)]
struct BulkItemStatus {
    #[serde(default)]
    status: u16,
}

/// Count per-item successes; a rejected document lowers the total
/// instead of failing the batch.
fn parse_bulk_acknowledged(body: &str) -> Result<u64> {
    let response: BulkResponse = serde_json::from_str(body).context("parsing bulk response")?;
    Ok(response
        .items
        .iter()
        .filter_map(|item| item.index.as_ref())
        .filter(|status| status.status < 300)
        .count() as u64)
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: SearchHitsEnvelope,
}

#[derive(Debug, Deserialize)]
struct SearchHitsEnvelope {
    #[serde(default)]
    hits: Vec<RawHit>,
}

#[derive(Debug, Deserialize)]
struct RawHit {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_score", default)]
    score: Option<f32>,
    #[serde(rename = "_source", default)]
    source: serde_json::Map<String, Value>,
}

fn parse_search_hits(body: &str) -> Result<Vec<SearchHit>> {
    let response: SearchResponse = serde_json::from_str(body).context("parsing search response")?;
    let hits = response
        .hits
        .hits
        .into_iter()
        .filter_map(|raw| match raw.id.parse::<u64>() {
            Ok(id) => Some(SearchHit {
                id,
                score: raw.score.unwrap_or(0.0),
                payload: raw.source,
            }),
            Err(_) => {
                tracing::warn!("Skipping hit with non-ordinal id '{}'", raw.id);
                None
            }
        })
        .collect();
    Ok(hits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use searchbench_core::document::Payload;

    fn schema() -> IndexSchema {
        IndexSchema::product_catalog(384, Distance::Cosine)
    }

    #[test]
    fn mappings_cover_every_field_and_the_vector() {
        let body = mappings_body(&schema());
        let properties = &body["mappings"]["properties"];
        assert_eq!(properties["title"]["type"], "text");
        assert_eq!(properties["category"]["type"], "keyword");
        assert_eq!(properties["rating_number"]["type"], "integer");
        assert_eq!(properties["price"]["type"], "float");
        assert_eq!(properties["embedding"]["type"], "dense_vector");
        assert_eq!(properties["embedding"]["dims"], 384);
        assert_eq!(properties["embedding"]["similarity"], "cosine");
    }

    #[test]
    fn lexical_query_targets_text_fields() {
        let fields = vec!["description".to_string(), "title".to_string()];
        let body = lexical_query(&fields, "noise cancelling", 10);
        assert_eq!(body["query"]["multi_match"]["query"], "noise cancelling");
        assert_eq!(body["query"]["multi_match"]["fields"][1], "title");
        assert_eq!(body["size"], 10);
        assert_eq!(body["_source"]["excludes"][0], "embedding");
    }

    #[test]
    fn vector_query_overfetches_candidates() {
        let body = vector_query(&[0.1, 0.2], 10);
        assert_eq!(body["knn"]["k"], 10);
        assert_eq!(body["knn"]["num_candidates"], 100);
        assert_eq!(body["knn"]["field"], "embedding");
    }

    #[test]
    fn hybrid_query_carries_both_clauses() {
        let fields = vec!["title".to_string()];
        let body = hybrid_query(&fields, "running shoes", &[0.5; 4], 5);
        assert_eq!(body["query"]["multi_match"]["query"], "running shoes");
        assert_eq!(body["knn"]["k"], 5);
        assert_eq!(body["knn"]["num_candidates"], 50);
    }

    #[test]
    fn bulk_body_interleaves_actions_and_sources() {
        let mut fields = Payload::new();
        fields.insert("title".to_string(), json!("Widget"));
        let docs = vec![Document {
            id: 3,
            fields,
            embedding: vec![0.25, 0.75],
            sparse: None,
        }];
        let body = bulk_body("bench_write", &docs).expect("bulk body");
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines.len(), 2);
        let action: Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(action["index"]["_index"], "bench_write");
        assert_eq!(action["index"]["_id"], 3);
        let source: Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(source["title"], "Widget");
        assert_eq!(source["embedding"][1], 0.75);
        assert!(body.ends_with('\n'));
    }

    #[test]
    fn bulk_acknowledgement_counts_only_successes() {
        let body = r#"{
            "errors": true,
            "items": [
                {"index": {"_id": "0", "status": 201}},
                {"index": {"_id": "1", "status": 429, "error": {"type": "circuit_breaking_exception"}}},
                {"index": {"_id": "2", "status": 200}}
            ]
        }"#;
        assert_eq!(parse_bulk_acknowledged(body).expect("parse"), 2);
    }

    #[test]
    fn search_hits_parse_ids_scores_and_payloads() {
        let body = r#"{
            "took": 4,
            "hits": {
                "total": {"value": 2},
                "hits": [
                    {"_index": "bench_write", "_id": "11", "_score": 2.5, "_source": {"title": "first"}},
                    {"_index": "bench_write", "_id": "7", "_score": 1.25, "_source": {"title": "second"}}
                ]
            }
        }"#;
        let hits = parse_search_hits(body).expect("parse");
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, 11);
        assert_eq!(hits[0].score, 2.5);
        assert_eq!(hits[0].payload["title"], "first");
        assert_eq!(hits[1].id, 7);
    }

    #[test]
    fn non_ordinal_ids_are_skipped() {
        let body = r#"{
            "hits": { "hits": [
                {"_id": "not-a-number", "_score": 1.0, "_source": {}},
                {"_id": "42", "_score": 0.5, "_source": {}}
            ]}
        }"#;
        let hits = parse_search_hits(body).expect("parse");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 42);
    }

    #[test]
    fn empty_result_set_parses_to_no_hits() {
        let body = r#"{"hits": {"hits": []}}"#;
        assert!(parse_search_hits(body).expect("parse").is_empty());
    }

    #[test]
    fn resetting_a_missing_index_counts_as_success() {
        assert!(delete_succeeded(StatusCode::OK));
        assert!(delete_succeeded(StatusCode::NOT_FOUND));
        assert!(!delete_succeeded(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(!delete_succeeded(StatusCode::UNAUTHORIZED));
    }
}
