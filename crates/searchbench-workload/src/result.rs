//! Benchmark measurement records.

use serde::Serialize;
use std::time::Duration;

use searchbench_core::monitor::ResourceUsage;
use searchbench_core::stats::LatencySummary;

/// What a benchmark run exercised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkloadKind {
    Write,
    LexicalQuery,
    VectorQuery,
    HybridQuery,
}

impl WorkloadKind {
    /// Short label used in result names and report tables.
    pub fn label(self) -> &'static str {
        match self {
            WorkloadKind::Write => "write",
            WorkloadKind::LexicalQuery => "lexical",
            WorkloadKind::VectorQuery => "vector",
            WorkloadKind::HybridQuery => "hybrid",
        }
    }

    /// The three query modes, in the order they run.
    pub fn query_kinds() -> [WorkloadKind; 3] {
        [
            WorkloadKind::LexicalQuery,
            WorkloadKind::VectorQuery,
            WorkloadKind::HybridQuery,
        ]
    }
}

/// One measurement: an (engine, workload, parameter) combination with
/// its timing, latency and resource numbers. Serializes flat so every
/// record in a report is self-describing.
#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkResult {
    pub name: String,
    pub engine: String,
    pub workload_type: WorkloadKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<usize>,
    pub duration_seconds: f64,
    pub total_operations: u64,
    pub latency_metrics: LatencySummary,
    pub throughput_ops_per_sec: f64,
    #[serde(flatten)]
    pub resources: ResourceUsage,
}

impl BenchmarkResult {
    /// Throughput is derived on construction; a zero-duration run has
    /// zero throughput rather than an infinity.
    pub fn new(
        name: String,
        engine: &str,
        workload_type: WorkloadKind,
        duration: Duration,
        total_operations: u64,
        latency_metrics: LatencySummary,
        resources: ResourceUsage,
    ) -> Self {
        let duration_seconds = duration.as_secs_f64();
        let throughput_ops_per_sec = if duration_seconds > 0.0 {
            total_operations as f64 / duration_seconds
        } else {
            0.0
        };
        Self {
            name,
            engine: engine.to_string(),
            workload_type,
            batch_size: None,
            duration_seconds,
            total_operations,
            latency_metrics,
            throughput_ops_per_sec,
            resources,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }
}
