//! Suite orchestration: connect the enabled engines, run the write
//! sweep and the query modes against each, then write the reports.
//!
//! Backend calls run without client-side timeouts. A timeout would
//! truncate the very measurement being taken, so a hung engine hangs
//! the run instead.

use anyhow::{bail, Context, Result};
use chrono::Local;

use searchbench_core::backend::SearchBackend;
use searchbench_core::config::BenchConfig;
use searchbench_core::corpus::JsonlCorpus;
use searchbench_core::document::IndexSchema;
use searchbench_core::sparse::SparseTextEncoder;
use searchbench_elastic::ElasticBackend;
use searchbench_qdrant::QdrantBackend;

use crate::query::{run_query_benchmarks, sample_queries};
use crate::report::{write_reports, ReportPaths};
use crate::result::BenchmarkResult;
use crate::write::benchmark_write;

pub struct BenchmarkSuite {
    config: BenchConfig,
    timestamp: String,
}

/// Everything a run produced. `failures` holds the steps that went
/// wrong while the rest of the suite carried on.
pub struct SuiteOutcome {
    pub results: Vec<BenchmarkResult>,
    pub failures: Vec<String>,
    pub reports: Option<ReportPaths>,
}

impl SuiteOutcome {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

impl BenchmarkSuite {
    pub fn new(config: BenchConfig) -> Self {
        let timestamp = Local::now().format("%Y-%m-%dT%H:%M:%S").to_string();
        Self { config, timestamp }
    }

    /// Run both phases against every healthy backend. A backend that
    /// fails to connect is skipped and recorded; a missing corpus or
    /// an unwritable results directory aborts the run.
    pub async fn run(&self) -> Result<SuiteOutcome> {
        println!("{}", "=".repeat(80));
        println!("SEARCH ENGINE BENCHMARK SUITE");
        println!("Started: {}", self.timestamp);
        println!("{}", "=".repeat(80));

        let corpus = JsonlCorpus::open(self.config.corpus_file())?;
        let schema = IndexSchema::product_catalog(
            self.config.schema.vector_dim,
            self.config.schema.distance,
        );

        let backends = self.build_backends(&schema);
        if backends.is_empty() {
            bail!("no backends enabled; enable at least one of [backends.elasticsearch], [backends.qdrant]");
        }

        let mut failures: Vec<String> = Vec::new();
        let mut ready = ready_backends(backends, &mut failures).await;
        if ready.is_empty() {
            println!("\nNo backend is reachable, nothing to benchmark");
            return Ok(SuiteOutcome { results: Vec::new(), failures, reports: None });
        }

        let mut results: Vec<BenchmarkResult> = Vec::new();

        let index = &self.config.workloads.write.index;
        for backend in &ready {
            banner(&format!(
                "PHASE 1: WRITE WORKLOAD - {}",
                backend.engine().to_uppercase()
            ));
            let runs = benchmark_write(
                backend.as_ref(),
                &corpus,
                index,
                &schema,
                &self.config.workloads.write.batch_sizes,
            )
            .await;
            for run in runs {
                match run.outcome {
                    Ok(result) => results.push(result),
                    Err(e) => failures.push(format!(
                        "{} write batch {}: {:#}",
                        backend.engine(),
                        run.batch_size,
                        e
                    )),
                }
            }
        }

        println!(
            "\nSampling {} queries from {}",
            self.config.workloads.query.num_queries,
            corpus.path().display()
        );
        let samples = sample_queries(&corpus, self.config.workloads.query.num_queries)?;
        for backend in &ready {
            banner(&format!(
                "PHASE 2: QUERY WORKLOAD - {}",
                backend.engine().to_uppercase()
            ));
            let query_results = run_query_benchmarks(
                backend.as_ref(),
                index,
                &samples,
                self.config.workloads.query.result_limit,
            )
            .await;
            results.extend(query_results);
        }

        for backend in &mut ready {
            backend.disconnect().await;
        }

        banner("BENCHMARK COMPLETE");

        let reports = write_reports(&self.config.results_dir(), &self.timestamp, &results)
            .context("writing reports")?;
        println!("\n📊 JSON Report: {}", reports.json.display());
        println!("📊 Markdown Report: {}", reports.markdown.display());

        if !failures.is_empty() {
            println!("\n⚠️  {} step(s) failed:", failures.len());
            for failure in &failures {
                println!("  - {failure}");
            }
        }

        Ok(SuiteOutcome { results, failures, reports: Some(reports) })
    }

    fn build_backends(&self, schema: &IndexSchema) -> Vec<Box<dyn SearchBackend>> {
        let mut backends: Vec<Box<dyn SearchBackend>> = Vec::new();
        if self.config.backends.elasticsearch.enabled {
            backends.push(Box::new(ElasticBackend::new(
                &self.config.backends.elasticsearch,
                schema,
            )));
        }
        if self.config.backends.qdrant.enabled {
            backends.push(Box::new(QdrantBackend::new(
                &self.config.backends.qdrant,
                schema,
                SparseTextEncoder::new(),
            )));
        }
        backends
    }
}

/// Connect and health-check each backend. Backends that fail either
/// gate are dropped from the run and recorded in `failures`; the rest
/// come back ready to benchmark.
pub async fn ready_backends(
    backends: Vec<Box<dyn SearchBackend>>,
    failures: &mut Vec<String>,
) -> Vec<Box<dyn SearchBackend>> {
    let mut ready = Vec::with_capacity(backends.len());
    for mut backend in backends {
        let engine = backend.engine().to_string();
        if let Err(e) = backend.connect().await {
            println!("❌ {engine} connection failed: {e:#}");
            failures.push(format!("{engine}: connection failed: {e:#}"));
            continue;
        }
        if !backend.health_check().await {
            println!("❌ {engine} is unhealthy, skipping");
            failures.push(format!("{engine}: health check failed"));
            continue;
        }
        println!("✅ {engine} connected");
        ready.push(backend);
    }
    ready
}

fn banner(title: &str) {
    println!("\n{}", "=".repeat(80));
    println!("{title}");
    println!("{}", "=".repeat(80));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_is_clean_only_without_failures() {
        let clean = SuiteOutcome { results: Vec::new(), failures: Vec::new(), reports: None };
        assert!(clean.is_clean());

        let failed = SuiteOutcome {
            results: Vec::new(),
            failures: vec!["qdrant: health check failed".to_string()],
            reports: None,
        };
        assert!(!failed.is_clean());
    }
}
