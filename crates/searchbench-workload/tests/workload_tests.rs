//! Workload tests against an in-memory backend.

use std::io::Write as _;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;

use searchbench_core::backend::{Batches, DocumentStream, SearchBackend};
use searchbench_core::corpus::JsonlCorpus;
use searchbench_core::document::{Distance, IndexSchema, Payload, SearchHit};
use searchbench_workload::query::{run_query_benchmarks, sample_queries, QuerySample};
use searchbench_workload::result::WorkloadKind;
use searchbench_workload::suite::ready_backends;
use searchbench_workload::write::benchmark_write;

/// Backend that records how it was driven instead of talking to an
/// engine. `fail_create_on` makes the Nth `create_index` call fail;
/// `dropped_per_flush` simulates an engine acknowledging fewer
/// documents than were submitted; the connectivity knobs make the
/// readiness gates fail.
#[derive(Default)]
struct MockBackend {
    name: Option<&'static str>,
    fail_connect: bool,
    unhealthy: bool,
    flushes: Mutex<Vec<usize>>,
    create_calls: AtomicUsize,
    fail_create_on: Option<usize>,
    dropped_per_flush: usize,
    lexical_calls: AtomicUsize,
    vector_calls: AtomicUsize,
    hybrid_calls: AtomicUsize,
}

impl MockBackend {
    fn named(name: &'static str) -> Self {
        Self { name: Some(name), ..Self::default() }
    }

    fn failing_connect(name: &'static str) -> Self {
        Self { fail_connect: true, ..Self::named(name) }
    }

    fn never_healthy(name: &'static str) -> Self {
        Self { unhealthy: true, ..Self::named(name) }
    }

    fn failing_create_on(call: usize) -> Self {
        Self { fail_create_on: Some(call), ..Self::default() }
    }

    fn dropping_per_flush(dropped: usize) -> Self {
        Self { dropped_per_flush: dropped, ..Self::default() }
    }

    fn hit(id: u64) -> SearchHit {
        SearchHit { id, score: 1.0, payload: Payload::new() }
    }
}

#[async_trait]
impl SearchBackend for MockBackend {
    fn engine(&self) -> &str {
        self.name.unwrap_or("mock")
    }

    async fn connect(&mut self) -> anyhow::Result<()> {
        if self.fail_connect {
            anyhow::bail!("connection refused");
        }
        Ok(())
    }

    async fn disconnect(&mut self) {}

    async fn health_check(&self) -> bool {
        !self.unhealthy
    }

    async fn reset_index(&self, _index: &str) -> anyhow::Result<()> {
        Ok(())
    }

    async fn create_index(&self, _index: &str, _schema: &IndexSchema) -> anyhow::Result<()> {
        let call = self.create_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_create_on == Some(call) {
            anyhow::bail!("mapping rejected");
        }
        Ok(())
    }

    async fn index_documents(
        &self,
        _index: &str,
        docs: DocumentStream<'_>,
        batch_size: usize,
    ) -> anyhow::Result<u64> {
        let mut acknowledged = 0u64;
        for batch in Batches::new(docs, batch_size) {
            let batch = batch?;
            self.flushes.lock().unwrap().push(batch.len());
            acknowledged += batch.len().saturating_sub(self.dropped_per_flush) as u64;
        }
        Ok(acknowledged)
    }

    async fn get_doc_count(&self, _index: &str) -> anyhow::Result<u64> {
        Ok(self.flushes.lock().unwrap().iter().map(|n| *n as u64).sum())
    }

    async fn lexical_search(&self, _index: &str, _query: &str, _limit: usize) -> Vec<SearchHit> {
        self.lexical_calls.fetch_add(1, Ordering::SeqCst);
        vec![Self::hit(1)]
    }

    async fn vector_search(&self, _index: &str, _vector: &[f32], _limit: usize) -> Vec<SearchHit> {
        self.vector_calls.fetch_add(1, Ordering::SeqCst);
        vec![Self::hit(2)]
    }

    async fn hybrid_search(
        &self,
        _index: &str,
        _query: &str,
        _vector: &[f32],
        _limit: usize,
    ) -> Vec<SearchHit> {
        self.hybrid_calls.fetch_add(1, Ordering::SeqCst);
        vec![Self::hit(3)]
    }
}

fn schema() -> IndexSchema {
    IndexSchema::product_catalog(3, Distance::Cosine)
}

fn write_corpus(docs: usize) -> (tempfile::TempDir, JsonlCorpus) {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("corpus.jsonl");
    let mut file = std::fs::File::create(&path).unwrap();
    for id in 0..docs {
        let line = json!({
            "id": id,
            "fields": {
                "title": format!("item {id} alpha beta gamma delta"),
                "category": "misc",
            },
            "embedding": [0.1, 0.2, 0.3],
        });
        writeln!(file, "{line}").unwrap();
    }
    (dir, JsonlCorpus::open(path).unwrap())
}

#[tokio::test]
async fn write_sweep_flushes_full_batches_then_remainder() {
    let (_dir, corpus) = write_corpus(1050);
    let backend = MockBackend::default();

    let runs = benchmark_write(&backend, &corpus, "bench_write", &schema(), &[500]).await;

    assert_eq!(runs.len(), 1);
    let result = runs[0].outcome.as_ref().expect("run succeeds");
    assert_eq!(*backend.flushes.lock().unwrap(), vec![500, 500, 50]);
    assert_eq!(result.total_operations, 1050);
    assert_eq!(result.batch_size, Some(500));
    assert_eq!(result.workload_type, WorkloadKind::Write);
    assert_eq!(result.name, "mock_write_batch_500");
    assert_eq!(result.engine, "mock");
}

#[tokio::test]
async fn sweep_continues_past_a_failed_batch_size() {
    let (_dir, corpus) = write_corpus(50);
    let backend = MockBackend::failing_create_on(2);

    let runs = benchmark_write(&backend, &corpus, "bench_write", &schema(), &[10, 20, 30]).await;

    assert_eq!(runs.len(), 3);
    assert!(runs[0].outcome.is_ok());
    assert!(runs[1].outcome.is_err());
    assert_eq!(runs[1].batch_size, 20);
    assert!(runs[2].outcome.is_ok());
}

#[tokio::test]
async fn acknowledged_documents_below_submitted_lower_the_count() {
    let (_dir, corpus) = write_corpus(10);
    let backend = MockBackend::dropping_per_flush(1);

    let runs = benchmark_write(&backend, &corpus, "bench_write", &schema(), &[4]).await;

    // Flushes of 4, 4 and 2 acknowledge one document fewer each.
    let result = runs[0].outcome.as_ref().expect("run succeeds");
    assert_eq!(result.total_operations, 7);
}

#[tokio::test]
async fn query_benchmarks_cover_the_three_modes_in_order() {
    let backend = MockBackend::default();
    let samples = vec![
        QuerySample { text: "alpha beta".to_string(), vector: vec![0.1, 0.2, 0.3] },
        QuerySample { text: "gamma delta".to_string(), vector: vec![0.3, 0.2, 0.1] },
    ];

    let results = run_query_benchmarks(&backend, "bench_write", &samples, 10).await;

    let kinds: Vec<WorkloadKind> = results.iter().map(|r| r.workload_type).collect();
    assert_eq!(
        kinds,
        vec![
            WorkloadKind::LexicalQuery,
            WorkloadKind::VectorQuery,
            WorkloadKind::HybridQuery,
        ]
    );
    for result in &results {
        assert_eq!(result.total_operations, 2);
        assert!(result.batch_size.is_none());
    }
    assert_eq!(results[0].name, "mock_lexical_search");
    assert_eq!(backend.lexical_calls.load(Ordering::SeqCst), 2);
    assert_eq!(backend.vector_calls.load(Ordering::SeqCst), 2);
    assert_eq!(backend.hybrid_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn query_sampling_is_capped_by_corpus_size() {
    let (_dir, corpus) = write_corpus(3);

    let samples = sample_queries(&corpus, 100).expect("sampling succeeds");

    assert_eq!(samples.len(), 3);
    for sample in &samples {
        assert!(sample.text.starts_with("item"));
        assert_eq!(sample.vector, vec![0.1, 0.2, 0.3]);
    }
}

#[tokio::test]
async fn sampled_documents_without_text_are_skipped() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("corpus.jsonl");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "{}", json!({"id": 1, "fields": {}, "embedding": [0.5]})).unwrap();
    writeln!(
        file,
        "{}",
        json!({"id": 2, "fields": {"title": "walnut bookshelf"}, "embedding": [0.5]})
    )
    .unwrap();
    let corpus = JsonlCorpus::open(path).unwrap();

    let samples = sample_queries(&corpus, 10).expect("sampling succeeds");

    assert_eq!(samples.len(), 1);
    assert_eq!(samples[0].text, "walnut bookshelf");
}

#[tokio::test]
async fn unreachable_backends_are_skipped_and_recorded() {
    let backends: Vec<Box<dyn SearchBackend>> = vec![
        Box::new(MockBackend::failing_connect("refused")),
        Box::new(MockBackend::never_healthy("degraded")),
        Box::new(MockBackend::named("reachable")),
    ];

    let mut failures = Vec::new();
    let ready = ready_backends(backends, &mut failures).await;

    assert_eq!(ready.len(), 1);
    assert_eq!(ready[0].engine(), "reachable");
    assert_eq!(failures.len(), 2);
    assert!(failures[0].starts_with("refused: connection failed"));
    assert_eq!(failures[1], "degraded: health check failed");
}
