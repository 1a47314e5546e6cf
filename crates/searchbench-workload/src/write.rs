//! Write workload: a batch-size sweep, each run ingesting the full
//! corpus into a freshly created index.

use std::time::Instant;

use anyhow::Context;

use searchbench_core::backend::SearchBackend;
use searchbench_core::corpus::JsonlCorpus;
use searchbench_core::document::IndexSchema;
use searchbench_core::monitor::ResourceMonitor;
use searchbench_core::stats::LatencyRecorder;

use crate::result::{BenchmarkResult, WorkloadKind};

/// Outcome of one batch-size run. A failed run carries its error so
/// the remaining batch sizes still execute.
pub struct WriteRun {
    pub batch_size: usize,
    pub outcome: anyhow::Result<BenchmarkResult>,
}

pub async fn benchmark_write(
    backend: &dyn SearchBackend,
    corpus: &JsonlCorpus,
    index: &str,
    schema: &IndexSchema,
    batch_sizes: &[usize],
) -> Vec<WriteRun> {
    let mut runs = Vec::with_capacity(batch_sizes.len());
    for &batch_size in batch_sizes {
        let outcome = run_batch_size(backend, corpus, index, schema, batch_size).await;
        match &outcome {
            Ok(result) => {
                println!("\n{} Write Benchmark (batch_size={}):", backend.engine(), batch_size);
                println!("  Duration: {:.2}s", result.duration_seconds);
                println!("  Operations: {}", result.total_operations);
                println!("  Throughput: {:.2} ops/sec", result.throughput_ops_per_sec);
                println!("  Avg CPU: {:.1}%", result.resources.avg_cpu_percent);
                println!("  Peak Memory: {:.1} MB", result.resources.peak_memory_mb);
            }
            Err(e) => {
                println!(
                    "\n❌ {} Write Benchmark (batch_size={}) failed: {:#}",
                    backend.engine(),
                    batch_size,
                    e
                );
            }
        }
        runs.push(WriteRun { batch_size, outcome });
    }
    runs
}

/// One measured run: reset, create, ingest, with the monitor spanning
/// only the timed ingestion.
async fn run_batch_size(
    backend: &dyn SearchBackend,
    corpus: &JsonlCorpus,
    index: &str,
    schema: &IndexSchema,
    batch_size: usize,
) -> anyhow::Result<BenchmarkResult> {
    backend
        .reset_index(index)
        .await
        .context("resetting index")?;
    backend
        .create_index(index, schema)
        .await
        .context("creating index")?;
    let docs = corpus.stream()?;

    let mut monitor = ResourceMonitor::new();
    monitor.start();
    let started = Instant::now();
    let indexed = backend.index_documents(index, docs, batch_size).await;
    let elapsed = started.elapsed();
    let resources = monitor.stop();
    let indexed = indexed.context("indexing documents")?;

    let mut recorder = LatencyRecorder::new();
    recorder.record(elapsed);

    Ok(BenchmarkResult::new(
        format!("{}_write_batch_{}", backend.engine(), batch_size),
        backend.engine(),
        WorkloadKind::Write,
        elapsed,
        indexed,
        recorder.summarize(),
        resources,
    )
    .with_batch_size(batch_size))
}
