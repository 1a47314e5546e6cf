use std::env;
use std::path::PathBuf;
use std::process;

use searchbench_core::config::{self, BenchConfig, DEFAULT_CONFIG_FILE};
use searchbench_workload::BenchmarkSuite;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn parse_args() -> (String, Vec<String>) {
    let mut args: Vec<String> = env::args().collect();
    let prog = args.remove(0);
    if args.is_empty() {
        eprintln!("Usage: {prog} <run|init-config> [args...]");
        process::exit(1);
    }
    let cmd = args.remove(0);
    (cmd, args)
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let (cmd, args) = parse_args();
    match cmd.as_str() {
        "run" => {
            let config_path = args
                .first()
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
            let config = BenchConfig::load_from(&config_path).map_err(|e| {
                eprintln!("Error loading config: {e:#}");
                e
            })?;
            let suite = BenchmarkSuite::new(config);
            let outcome = tokio::runtime::Runtime::new()?.block_on(suite.run())?;
            if !outcome.is_clean() {
                process::exit(1);
            }
        }
        "init-config" => {
            let path = args
                .first()
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
            config::write_default_config(&path)?;
            println!("✅ Wrote {}", path.display());
        }
        _ => {
            eprintln!("Unknown command: {cmd}");
            process::exit(1);
        }
    }
    Ok(())
}
