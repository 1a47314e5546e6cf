//! Benchmark configuration.
//!
//! Uses Figment to merge built-in defaults, `searchbench.toml`, and
//! `SEARCHBENCH_*` environment variables (nested keys separated by
//! `__`, e.g. `SEARCHBENCH_BACKENDS__QDRANT__PORT`). Paths accept `~`
//! and `${VAR}` expansion.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::document::Distance;
use crate::error::{Error, Result};

pub const DEFAULT_CONFIG_FILE: &str = "searchbench.toml";

const DEFAULT_CONFIG_TOML: &str = r#"# searchbench configuration

[data]
# Pre-embedded corpus, one JSON document per line.
corpus_file = "data/products.jsonl"
results_dir = "benchmark_results"

[schema]
vector_dim = 384
distance = "cosine"

[backends.elasticsearch]
enabled = true
host = "http://localhost:9200"
# api_key = "..."        # falls back to the ES_LOCAL_API_KEY env var

[backends.qdrant]
enabled = true
host = "localhost"
port = 6333
# url = "http://localhost:6333"   # overrides host/port when set
# api_key = "..."
server_side_fusion = true

[workloads.write]
batch_sizes = [100, 500, 1000]
index = "bench_write"

[workloads.query]
num_queries = 100
result_limit = 10
"#;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BenchConfig {
    pub data: DataConfig,
    pub schema: SchemaConfig,
    pub backends: BackendsConfig,
    pub workloads: WorkloadsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub corpus_file: String,
    pub results_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaConfig {
    pub vector_dim: usize,
    pub distance: Distance,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackendsConfig {
    pub elasticsearch: ElasticConfig,
    pub qdrant: QdrantConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElasticConfig {
    pub enabled: bool,
    pub host: String,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QdrantConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    /// Full base URL; overrides `host`/`port` when set.
    pub url: Option<String>,
    pub api_key: Option<String>,
    /// Rank hybrid queries inside the server. When disabled the
    /// backend falls back to client-side reciprocal rank fusion.
    pub server_side_fusion: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkloadsConfig {
    pub write: WriteConfig,
    pub query: QueryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteConfig {
    pub batch_sizes: Vec<usize>,
    pub index: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    pub num_queries: usize,
    pub result_limit: usize,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            corpus_file: "data/products.jsonl".to_string(),
            results_dir: "benchmark_results".to_string(),
        }
    }
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self { vector_dim: 384, distance: Distance::Cosine }
    }
}

impl Default for ElasticConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "http://localhost:9200".to_string(),
            api_key: None,
        }
    }
}

impl Default for QdrantConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "localhost".to_string(),
            port: 6333,
            url: None,
            api_key: None,
            server_side_fusion: true,
        }
    }
}

impl Default for WriteConfig {
    fn default() -> Self {
        Self {
            batch_sizes: vec![100, 500, 1000],
            index: "bench_write".to_string(),
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self { num_queries: 100, result_limit: 10 }
    }
}

impl ElasticConfig {
    /// API key from config, or the `ES_LOCAL_API_KEY` environment
    /// variable as used by local Elasticsearch dev installs.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("ES_LOCAL_API_KEY").ok())
    }
}

impl QdrantConfig {
    pub fn base_url(&self) -> String {
        match &self.url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("http://{}:{}", self.host, self.port),
        }
    }
}

impl BenchConfig {
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(Path::new(DEFAULT_CONFIG_FILE))
    }

    /// Load defaults, then the config file (if present), then
    /// `SEARCHBENCH_*` environment overrides.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let config: Self = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("SEARCHBENCH_").split("__"))
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.workloads.write.batch_sizes.is_empty() {
            return Err(Error::InvalidConfig(
                "workloads.write.batch_sizes must not be empty".to_string(),
            ));
        }
        if self.workloads.write.batch_sizes.iter().any(|&size| size == 0) {
            return Err(Error::InvalidConfig(
                "workloads.write.batch_sizes entries must be >= 1".to_string(),
            ));
        }
        if self.workloads.write.index.is_empty() {
            return Err(Error::InvalidConfig(
                "workloads.write.index must not be empty".to_string(),
            ));
        }
        if self.workloads.query.num_queries == 0 {
            return Err(Error::InvalidConfig(
                "workloads.query.num_queries must be >= 1".to_string(),
            ));
        }
        if self.workloads.query.result_limit == 0 {
            return Err(Error::InvalidConfig(
                "workloads.query.result_limit must be >= 1".to_string(),
            ));
        }
        if self.schema.vector_dim == 0 {
            return Err(Error::InvalidConfig(
                "schema.vector_dim must be >= 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn corpus_file(&self) -> PathBuf {
        expand_path(&self.data.corpus_file)
    }

    pub fn results_dir(&self) -> PathBuf {
        expand_path(&self.data.results_dir)
    }
}

/// Write the commented starter config. Refuses to clobber an existing
/// file.
pub fn write_default_config(path: &Path) -> anyhow::Result<()> {
    if path.exists() {
        anyhow::bail!("config file already exists: {}", path.display());
    }
    std::fs::write(path, DEFAULT_CONFIG_TOML)
        .map_err(|e| anyhow::anyhow!("Failed to write {}: {}", path.display(), e))?;
    Ok(())
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}
