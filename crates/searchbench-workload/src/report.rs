//! JSON and markdown report generation.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::json;

use crate::result::{BenchmarkResult, WorkloadKind};

pub struct ReportPaths {
    pub json: PathBuf,
    pub markdown: PathBuf,
}

/// Write both report formats under `results_dir`, named after the run
/// timestamp with colons made filesystem-safe.
pub fn write_reports(
    results_dir: &Path,
    timestamp: &str,
    results: &[BenchmarkResult],
) -> Result<ReportPaths> {
    fs::create_dir_all(results_dir)
        .with_context(|| format!("creating results dir {}", results_dir.display()))?;
    let stamp = timestamp.replace(':', "-");

    let json_path = results_dir.join(format!("results_{stamp}.json"));
    let body = json!({ "generated": timestamp, "results": results });
    fs::write(&json_path, serde_json::to_string_pretty(&body)?)
        .with_context(|| format!("writing {}", json_path.display()))?;

    let markdown_path = results_dir.join(format!("report_{stamp}.md"));
    fs::write(&markdown_path, render_markdown(timestamp, results))
        .with_context(|| format!("writing {}", markdown_path.display()))?;

    Ok(ReportPaths { json: json_path, markdown: markdown_path })
}

/// Render the human-readable comparison tables.
pub fn render_markdown(timestamp: &str, results: &[BenchmarkResult]) -> String {
    let mut lines: Vec<String> = Vec::new();
    lines.push("# Search Engine Benchmark Report".to_string());
    lines.push(String::new());
    lines.push(format!("Generated: {timestamp}"));
    lines.push(String::new());

    lines.push("## Write Workload".to_string());
    lines.push(String::new());
    lines.push(
        "| Batch Size | Engine | Throughput (ops/sec) | Duration (s) | Avg CPU (%) | Peak Mem (MB) |"
            .to_string(),
    );
    lines.push(
        "|------------|--------|----------------------|--------------|-------------|---------------|"
            .to_string(),
    );
    let mut writes: Vec<&BenchmarkResult> = results
        .iter()
        .filter(|r| r.workload_type == WorkloadKind::Write)
        .collect();
    writes.sort_by(|a, b| {
        a.batch_size
            .cmp(&b.batch_size)
            .then_with(|| a.engine.cmp(&b.engine))
    });
    for result in &writes {
        lines.push(format!(
            "| {} | {} | {:.2} | {:.2} | {:.1} | {:.1} |",
            result.batch_size.unwrap_or(0),
            display_engine(&result.engine),
            result.throughput_ops_per_sec,
            result.duration_seconds,
            result.resources.avg_cpu_percent,
            result.resources.peak_memory_mb,
        ));
    }

    lines.push(String::new());
    lines.push("## Query Workload".to_string());
    lines.push(String::new());
    lines.push(
        "| Query Type | Engine | Throughput (queries/sec) | Mean Latency (ms) | P99 Latency (ms) |"
            .to_string(),
    );
    lines.push(
        "|------------|--------|--------------------------|-------------------|------------------|"
            .to_string(),
    );
    for kind in WorkloadKind::query_kinds() {
        for result in results.iter().filter(|r| r.workload_type == kind) {
            lines.push(format!(
                "| {} | {} | {:.2} | {:.2} | {:.2} |",
                capitalize(kind.label()),
                display_engine(&result.engine),
                result.throughput_ops_per_sec,
                result.latency_metrics.mean_ms,
                result.latency_metrics.p99_ms,
            ));
        }
    }

    lines.push(String::new());
    lines.push("## Comparative Analysis".to_string());
    lines.push(String::new());
    lines.push("### Speedup (Elasticsearch vs Qdrant)".to_string());
    lines.push(String::new());
    lines.push("**Write Operations:**".to_string());
    lines.push(String::new());
    let mut batch_sizes: Vec<usize> = writes.iter().filter_map(|r| r.batch_size).collect();
    batch_sizes.sort_unstable();
    batch_sizes.dedup();
    for batch_size in batch_sizes {
        let es = writes
            .iter()
            .find(|r| r.engine == "elasticsearch" && r.batch_size == Some(batch_size));
        let qdrant = writes
            .iter()
            .find(|r| r.engine == "qdrant" && r.batch_size == Some(batch_size));
        if let (Some(es), Some(qdrant)) = (es, qdrant) {
            if let Some(line) = speedup_line(&format!("Batch Size {batch_size}"), es, qdrant) {
                lines.push(line);
            }
        }
    }

    lines.push(String::new());
    lines.push("**Query Operations:**".to_string());
    lines.push(String::new());
    for kind in WorkloadKind::query_kinds() {
        let es = results
            .iter()
            .find(|r| r.engine == "elasticsearch" && r.workload_type == kind);
        let qdrant = results
            .iter()
            .find(|r| r.engine == "qdrant" && r.workload_type == kind);
        if let (Some(es), Some(qdrant)) = (es, qdrant) {
            if let Some(line) = speedup_line(&capitalize(kind.label()), es, qdrant) {
                lines.push(line);
            }
        }
    }

    lines.push(String::new());
    lines.join("\n")
}

fn speedup_line(label: &str, es: &BenchmarkResult, qdrant: &BenchmarkResult) -> Option<String> {
    if qdrant.throughput_ops_per_sec <= 0.0 {
        return None;
    }
    let speedup = es.throughput_ops_per_sec / qdrant.throughput_ops_per_sec;
    let direction = if speedup > 1.0 { "faster" } else { "slower" };
    Some(format!("- {label}: Elasticsearch is {speedup:.2}x {direction}"))
}

fn display_engine(engine: &str) -> String {
    capitalize(engine)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use searchbench_core::monitor::ResourceUsage;
    use searchbench_core::stats::LatencySummary;
    use std::time::Duration;

    fn write_result(engine: &str, batch_size: usize, throughput_base: f64) -> BenchmarkResult {
        let operations = (throughput_base * 2.0) as u64;
        BenchmarkResult::new(
            format!("{engine}_write_batch_{batch_size}"),
            engine,
            WorkloadKind::Write,
            Duration::from_secs(2),
            operations,
            LatencySummary::default(),
            ResourceUsage::default(),
        )
        .with_batch_size(batch_size)
    }

    fn query_result(engine: &str, kind: WorkloadKind) -> BenchmarkResult {
        BenchmarkResult::new(
            format!("{}_{}_search", engine, kind.label()),
            engine,
            kind,
            Duration::from_secs(1),
            100,
            LatencySummary { mean_ms: 4.5, p99_ms: 12.0, ..LatencySummary::default() },
            ResourceUsage::default(),
        )
    }

    fn sample_results() -> Vec<BenchmarkResult> {
        vec![
            write_result("elasticsearch", 100, 400.0),
            write_result("qdrant", 100, 200.0),
            query_result("elasticsearch", WorkloadKind::LexicalQuery),
            query_result("qdrant", WorkloadKind::LexicalQuery),
            query_result("elasticsearch", WorkloadKind::VectorQuery),
            query_result("qdrant", WorkloadKind::VectorQuery),
            query_result("elasticsearch", WorkloadKind::HybridQuery),
            query_result("qdrant", WorkloadKind::HybridQuery),
        ]
    }

    #[test]
    fn markdown_contains_write_and_query_tables() {
        let markdown = render_markdown("2026-01-01T00:00:00", &sample_results());
        assert!(markdown.contains("## Write Workload"));
        assert!(markdown.contains("| 100 | Elasticsearch | 400.00 |"));
        assert!(markdown.contains("| 100 | Qdrant | 200.00 |"));
        assert!(markdown.contains("## Query Workload"));
        assert!(markdown.contains("| Lexical | Elasticsearch | 100.00 | 4.50 | 12.00 |"));
        assert!(markdown.contains("| Hybrid | Qdrant |"));
    }

    #[test]
    fn speedups_compare_engines_per_parameter() {
        let markdown = render_markdown("2026-01-01T00:00:00", &sample_results());
        assert!(markdown.contains("- Batch Size 100: Elasticsearch is 2.00x faster"));
        assert!(markdown.contains("- Lexical: Elasticsearch is 1.00x slower"));
    }

    #[test]
    fn speedups_are_skipped_when_an_engine_is_missing() {
        let results = vec![write_result("elasticsearch", 100, 400.0)];
        let markdown = render_markdown("2026-01-01T00:00:00", &results);
        assert!(!markdown.contains("Elasticsearch is"));
    }

    #[test]
    fn reports_land_in_the_results_dir_with_safe_names() {
        let tmp = tempfile::TempDir::new().unwrap();
        let paths = write_reports(tmp.path(), "2026-01-01T12:30:45", &sample_results())
            .expect("write reports");
        assert!(paths.json.file_name().unwrap().to_str().unwrap().starts_with("results_"));
        assert!(!paths.json.to_str().unwrap().contains("12:30"));
        assert!(paths.json.is_file());
        assert!(paths.markdown.is_file());

        let body: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&paths.json).unwrap()).unwrap();
        assert_eq!(body["generated"], "2026-01-01T12:30:45");
        assert_eq!(body["results"].as_array().unwrap().len(), 8);
        assert_eq!(body["results"][0]["workload_type"], "write");
    }
}
