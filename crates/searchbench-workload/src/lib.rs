pub mod query;
pub mod report;
pub mod result;
pub mod suite;
pub mod write;

pub use result::{BenchmarkResult, WorkloadKind};
pub use suite::{BenchmarkSuite, SuiteOutcome};
