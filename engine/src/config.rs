//! Runtime tunables for engine analysis.
//!
//! Every value has a compile-time default and can be overridden at runtime
//! via a dedicated environment variable.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Depth used when the caller does not ask for one.
pub const DEFAULT_DEPTH: u8 = 15;

/// Upper bound for requested depth.
pub const DEFAULT_MAX_DEPTH: u8 = 30;

/// Wall-clock budget from `go` to `bestmove`.
pub const DEFAULT_TIMEOUT_MS: u64 = 8_000;

/// Common install locations checked when no engine path is configured.
const ENGINE_SEARCH_PATHS: &[&str] = &[
    "./engines/stockfish",
    "/usr/local/bin/stockfish",
    "/usr/bin/stockfish",
    "/opt/homebrew/bin/stockfish",
    "/usr/games/stockfish",
];

#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub engine_path: PathBuf,
    /// Extra arguments passed to the engine binary.
    pub engine_args: Vec<String>,
    pub default_depth: u8,
    pub max_depth: u8,
    pub time_budget: Duration,
    /// Cap on simultaneously running sessions. `None` means unbounded.
    pub max_concurrent_sessions: Option<usize>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            engine_path: PathBuf::from("stockfish"),
            engine_args: Vec::new(),
            default_depth: DEFAULT_DEPTH,
            max_depth: DEFAULT_MAX_DEPTH,
            time_budget: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            max_concurrent_sessions: None,
        }
    }
}

impl AnalysisConfig {
    /// Build a config from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            engine_path: get_engine_path(),
            engine_args: Vec::new(),
            default_depth: get_default_depth(),
            max_depth: get_max_depth(),
            time_budget: Duration::from_millis(get_timeout_ms()),
            max_concurrent_sessions: get_max_sessions(),
        }
    }

    /// Resolve a requested depth into `1..=max_depth`.
    pub fn clamp_depth(&self, requested: Option<u8>) -> u8 {
        let max = self.max_depth.max(1);
        requested.unwrap_or(self.default_depth).clamp(1, max)
    }
}

/// Get the engine binary path.
///
/// Priority:
/// 1. `COACH_ENGINE_PATH` env variable if set
/// 2. The first existing path among common Stockfish install locations
/// 3. `stockfish`, resolved through `PATH` at spawn time
pub fn get_engine_path() -> PathBuf {
    if let Ok(path) = std::env::var("COACH_ENGINE_PATH") {
        return PathBuf::from(path);
    }

    find_engine_path().unwrap_or_else(|| PathBuf::from("stockfish"))
}

/// Find a Stockfish executable in common locations.
pub fn find_engine_path() -> Option<PathBuf> {
    ENGINE_SEARCH_PATHS
        .iter()
        .map(Path::new)
        .find(|path| path.is_file())
        .map(Path::to_path_buf)
}

/// Get the default search depth.
///
/// Priority:
/// 1. `COACH_ENGINE_DEPTH` env variable if set (falls back to default if the
///    value cannot be parsed as a `u8`)
/// 2. `15` as fallback
pub fn get_default_depth() -> u8 {
    parse_env("COACH_ENGINE_DEPTH").unwrap_or(DEFAULT_DEPTH)
}

/// Get the maximum accepted search depth (`COACH_ENGINE_MAX_DEPTH`, default `30`).
pub fn get_max_depth() -> u8 {
    parse_env("COACH_ENGINE_MAX_DEPTH").unwrap_or(DEFAULT_MAX_DEPTH)
}

/// Get the analysis time budget in milliseconds (`COACH_ENGINE_TIMEOUT_MS`,
/// default `8000`).
pub fn get_timeout_ms() -> u64 {
    parse_env("COACH_ENGINE_TIMEOUT_MS").unwrap_or(DEFAULT_TIMEOUT_MS)
}

/// Get the session cap (`COACH_MAX_SESSIONS`). Unset or `0` means unbounded.
pub fn get_max_sessions() -> Option<usize> {
    parse_env::<usize>("COACH_MAX_SESSIONS").filter(|n| *n > 0)
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok()?.trim().parse().ok()
}
