use std::path::PathBuf;
use std::time::Duration;

/// Everything that can go wrong between receiving a position and returning
/// an analysis. Every variant is produced only after the engine process (if
/// one was started) has been torn down.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("Invalid position: {0}")]
    InvalidPosition(String),

    #[error("Engine not available at {path}: {source}")]
    EngineUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write to engine: {0}")]
    EngineWriteError(#[source] std::io::Error),

    #[error("Engine crashed: {0}")]
    EngineCrashed(String),

    #[error("Engine timed out after {0:?}")]
    EngineTimeout(Duration),

    #[error("Analysis session already ran")]
    SessionAlreadyRun,
}

/// Caller-facing classification of an [`AnalysisError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The request itself was malformed; retrying it unchanged will not help.
    BadInput,
    /// The engine deployment or process misbehaved.
    ServerFault,
    /// The engine did not answer within the time budget.
    DeadlineExceeded,
}

impl AnalysisError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            AnalysisError::InvalidPosition(_) => ErrorCategory::BadInput,
            AnalysisError::EngineUnavailable { .. }
            | AnalysisError::EngineWriteError(_)
            | AnalysisError::EngineCrashed(_)
            | AnalysisError::SessionAlreadyRun => ErrorCategory::ServerFault,
            AnalysisError::EngineTimeout(_) => ErrorCategory::DeadlineExceeded,
        }
    }
}
