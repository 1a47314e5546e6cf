//! Query workload: the three search modes timed per-query over the
//! same sampled query set.

use std::time::Instant;

use rand::seq::IteratorRandom;
use serde_json::Value;

use searchbench_core::backend::SearchBackend;
use searchbench_core::corpus::JsonlCorpus;
use searchbench_core::document::{Document, SearchHit};
use searchbench_core::monitor::ResourceMonitor;
use searchbench_core::stats::LatencyRecorder;

use crate::result::{BenchmarkResult, WorkloadKind};

/// Maximum words taken from a sampled document to form a query text.
const QUERY_WORDS: usize = 5;

/// One sampled query: the text drives lexical search, the vector
/// drives semantic search, hybrid uses both.
#[derive(Debug, Clone)]
pub struct QuerySample {
    pub text: String,
    pub vector: Vec<f32>,
}

/// Reservoir-sample up to `num_queries` documents from the corpus and
/// derive a query from each. Never yields more samples than the corpus
/// has documents; sampled documents without usable text are skipped.
pub fn sample_queries(corpus: &JsonlCorpus, num_queries: usize) -> anyhow::Result<Vec<QuerySample>> {
    let mut rng = rand::thread_rng();
    let sampled: Vec<Document> = corpus
        .stream()?
        .filter_map(std::result::Result::ok)
        .choose_multiple(&mut rng, num_queries);

    let mut samples = Vec::with_capacity(sampled.len());
    for doc in sampled {
        match query_text(&doc) {
            Some(text) => samples.push(QuerySample { text, vector: doc.embedding }),
            None => tracing::debug!("Skipping sampled document {} without query text", doc.id),
        }
    }
    Ok(samples)
}

/// First words of the document's title, falling back to description.
fn query_text(doc: &Document) -> Option<String> {
    let source = ["title", "description"].iter().find_map(|field| {
        doc.fields
            .get(*field)
            .and_then(Value::as_str)
            .filter(|text| !text.trim().is_empty())
    })?;
    let words: Vec<&str> = source.split_whitespace().take(QUERY_WORDS).collect();
    if words.is_empty() {
        None
    } else {
        Some(words.join(" "))
    }
}

/// The query modes, in the order the workload runs them. Distinct from
/// `WorkloadKind` so a write workload cannot be handed to the query
/// dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMode {
    Lexical,
    Vector,
    Hybrid,
}

impl QueryMode {
    pub const ALL: [QueryMode; 3] = [QueryMode::Lexical, QueryMode::Vector, QueryMode::Hybrid];

    pub fn workload_kind(self) -> WorkloadKind {
        match self {
            QueryMode::Lexical => WorkloadKind::LexicalQuery,
            QueryMode::Vector => WorkloadKind::VectorQuery,
            QueryMode::Hybrid => WorkloadKind::HybridQuery,
        }
    }
}

/// Run all three query modes against one backend, in a fixed order so
/// reports line up across engines.
pub async fn run_query_benchmarks(
    backend: &dyn SearchBackend,
    index: &str,
    samples: &[QuerySample],
    result_limit: usize,
) -> Vec<BenchmarkResult> {
    let mut results = Vec::with_capacity(QueryMode::ALL.len());
    for mode in QueryMode::ALL {
        let kind = mode.workload_kind();
        println!(
            "\n{} - {} SEARCH",
            backend.engine().to_uppercase(),
            kind.label().to_uppercase()
        );
        println!("{}", "-".repeat(50));
        let result = benchmark_query_mode(backend, index, samples, result_limit, mode).await;
        println!("  Queries: {}", result.total_operations);
        println!("  Duration: {:.2}s", result.duration_seconds);
        println!("  Throughput: {:.2} queries/sec", result.throughput_ops_per_sec);
        println!("  Mean Latency: {:.2}ms", result.latency_metrics.mean_ms);
        println!("  P99 Latency: {:.2}ms", result.latency_metrics.p99_ms);
        results.push(result);
    }
    results
}

/// Time one query mode: every sample is one timed operation, and the
/// run's duration is the wall clock across the whole loop.
pub async fn benchmark_query_mode(
    backend: &dyn SearchBackend,
    index: &str,
    samples: &[QuerySample],
    result_limit: usize,
    mode: QueryMode,
) -> BenchmarkResult {
    let kind = mode.workload_kind();
    let mut monitor = ResourceMonitor::new();
    monitor.start();
    let mut recorder = LatencyRecorder::new();

    let started = Instant::now();
    for sample in samples {
        let query_started = Instant::now();
        let hits = dispatch(backend, index, sample, result_limit, mode).await;
        recorder.record(query_started.elapsed());
        tracing::debug!("{} {} query returned {} hits", backend.engine(), kind.label(), hits.len());
    }
    let elapsed = started.elapsed();
    let resources = monitor.stop();

    BenchmarkResult::new(
        format!("{}_{}_search", backend.engine(), kind.label()),
        backend.engine(),
        kind,
        elapsed,
        samples.len() as u64,
        recorder.summarize(),
        resources,
    )
}

async fn dispatch(
    backend: &dyn SearchBackend,
    index: &str,
    sample: &QuerySample,
    limit: usize,
    mode: QueryMode,
) -> Vec<SearchHit> {
    match mode {
        QueryMode::Lexical => backend.lexical_search(index, &sample.text, limit).await,
        QueryMode::Vector => backend.vector_search(index, &sample.vector, limit).await,
        QueryMode::Hybrid => {
            backend
                .hybrid_search(index, &sample.text, &sample.vector, limit)
                .await
        }
    }
}
