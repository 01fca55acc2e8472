use thiserror::Error;

use crate::Report;

#[derive(Error, Debug)]
pub enum ScaleBurnError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid workload: {0}")]
    InvalidWorkload(String),

    #[error("Worker panicked: {0}")]
    WorkerPanicked(String),

    #[error("Level with {concurrency} workers failed: {source}")]
    LevelFailed {
        concurrency: u32,
        #[source]
        source: Box<ScaleBurnError>,
    },

    /// A level failed mid-run. `completed` keeps the rows measured before it.
    #[error("Run aborted at level {concurrency}: {source}")]
    RunFailed {
        concurrency: u32,
        completed: Box<Report>,
        #[source]
        source: Box<ScaleBurnError>,
    },
}

impl ScaleBurnError {
    /// True for failures raised by the completion endpoint itself.
    pub fn is_transport(&self) -> bool {
        matches!(self, ScaleBurnError::Http(_) | ScaleBurnError::Server(_))
    }

    /// Innermost error, skipping level/run wrappers.
    pub fn root_cause(&self) -> &ScaleBurnError {
        match self {
            ScaleBurnError::LevelFailed { source, .. }
            | ScaleBurnError::RunFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, ScaleBurnError>;
