pub mod config;
pub mod error;
pub mod metrics;
pub mod report;
pub mod workload;

pub use config::{parse_profile, BenchmarkConfig, ClientConfig, WarmupConfig};
pub use error::{Result, ScaleBurnError};
pub use metrics::{LevelStatistic, RequestOutcome, WorkerTotal};
pub use report::{Report, ReportRow, RunInfo, ServerInfo};
pub use workload::{ChatMessage, Role, TestCase, DEFAULT_PROFILE};
