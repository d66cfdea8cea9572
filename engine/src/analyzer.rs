//! Entry point for callers: validate, run a fresh session, return its outcome.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Semaphore;

use crate::config::AnalysisConfig;
use crate::position::Position;
use crate::session::{AnalysisRequest, AnalysisResult, AnalysisSession};
use crate::AnalysisError;

/// Shared, cheap-to-call analysis front door. Every call gets its own engine
/// process; nothing is pooled between calls.
pub struct Analyzer {
    config: AnalysisConfig,
    limiter: Option<Semaphore>,
    spawn_attempts: AtomicU64,
}

impl Analyzer {
    pub fn new(config: AnalysisConfig) -> Self {
        let limiter = config.max_concurrent_sessions.map(Semaphore::new);
        Self {
            config,
            limiter,
            spawn_attempts: AtomicU64::new(0),
        }
    }

    /// Number of sessions that got as far as trying to start an engine.
    pub fn spawn_attempts(&self) -> u64 {
        self.spawn_attempts.load(Ordering::Relaxed)
    }

    /// Analyze `fen` to `depth` (or the configured default).
    pub async fn analyze(
        &self,
        fen: &str,
        depth: Option<u8>,
    ) -> Result<AnalysisResult, AnalysisError> {
        let position = Position::parse(fen).inspect_err(|e| {
            tracing::info!("Rejected position: {}", e);
        })?;

        let request = AnalysisRequest {
            position,
            depth: self.config.clamp_depth(depth),
            time_budget: self.config.time_budget,
        };

        // A closed semaphore only happens at shutdown; run unthrottled then.
        let _permit = match &self.limiter {
            Some(limiter) => limiter.acquire().await.ok(),
            None => None,
        };

        self.spawn_attempts.fetch_add(1, Ordering::Relaxed);
        let mut session = AnalysisSession::new(
            request,
            self.config.engine_path.clone(),
            self.config.engine_args.clone(),
        );
        session.run().await
    }
}
