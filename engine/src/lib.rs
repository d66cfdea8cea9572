//! Chess engine analysis over UCI.
//!
//! Give [`Analyzer::analyze`] a FEN string and it spawns a fresh engine
//! process, runs a depth-limited search under a wall-clock budget, and returns
//! the best move, evaluation and principal variation. Each call owns its
//! engine exclusively, and the engine is gone by the time the call returns.

pub mod analyzer;
pub mod config;
pub mod error;
pub mod position;
pub mod process;
pub mod session;
pub mod uci;

pub use analyzer::Analyzer;
pub use config::AnalysisConfig;
pub use error::{AnalysisError, ErrorCategory};
pub use position::Position;
pub use session::{AnalysisRequest, AnalysisResult, AnalysisSession, Resolution, SessionState};
pub use uci::{Evaluation, LineOutcome, ParseState};
