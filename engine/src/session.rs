//! One analysis request, end to end.
//!
//! A session spawns its own engine, writes the UCI setup and `go` commands,
//! then races two sources against a single [`ResolutionSlot`]: a reader task
//! feeding stdout lines to the parser, and a deadline task. Whichever claims
//! the slot first decides the outcome; the engine is torn down before
//! [`AnalysisSession::run`] returns, whatever that outcome is.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::io::AsyncRead;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::position::Position;
use crate::process::{EngineOutput, EngineProcess};
use crate::uci::{Evaluation, LineOutcome, LineReader, ParseState};
use crate::AnalysisError;

/// What the engine concluded about a position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisResult {
    #[serde(rename = "bestMove")]
    pub best_move: Option<String>,
    #[serde(rename = "eval")]
    pub evaluation: Option<Evaluation>,
    #[serde(rename = "pv")]
    pub principal_variation: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub position: Position,
    pub depth: u8,
    pub time_budget: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Success,
    Failure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Created,
    Started,
    AwaitingResult,
    Resolved(Resolution),
}

type Outcome = Result<AnalysisResult, AnalysisError>;

/// Single-use result slot shared by competing producers.
///
/// The first [`resolve`](Self::resolve) wins the claim and delivers its value;
/// every later call is a no-op that returns `false`.
pub struct ResolutionSlot<T> {
    claimed: AtomicBool,
    tx: Mutex<Option<oneshot::Sender<T>>>,
}

impl<T> ResolutionSlot<T> {
    pub fn new() -> (Self, oneshot::Receiver<T>) {
        let (tx, rx) = oneshot::channel();
        let slot = Self {
            claimed: AtomicBool::new(false),
            tx: Mutex::new(Some(tx)),
        };
        (slot, rx)
    }

    pub fn resolve(&self, value: T) -> bool {
        if self
            .claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        let tx = self
            .tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(tx) = tx {
            // The receiver may already be gone if the caller was cancelled.
            let _ = tx.send(value);
        }
        true
    }

    pub fn is_resolved(&self) -> bool {
        self.claimed.load(Ordering::Acquire)
    }
}

/// Aborts the session's helper tasks when the session is done with them.
struct TaskGuard(Vec<JoinHandle<()>>);

impl Drop for TaskGuard {
    fn drop(&mut self) {
        for task in &self.0 {
            task.abort();
        }
    }
}

pub struct AnalysisSession {
    request: AnalysisRequest,
    engine_path: PathBuf,
    engine_args: Vec<String>,
    state: SessionState,
    pid: Option<u32>,
}

impl AnalysisSession {
    pub fn new(request: AnalysisRequest, engine_path: PathBuf, engine_args: Vec<String>) -> Self {
        Self {
            request,
            engine_path,
            engine_args,
            state: SessionState::Created,
            pid: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Pid of the engine this session spawned, if it got that far.
    pub fn engine_pid(&self) -> Option<u32> {
        self.pid
    }

    /// Drive the engine to a result.
    ///
    /// A session runs once; a second call fails with
    /// [`AnalysisError::SessionAlreadyRun`] without spawning anything. If the
    /// returned future is dropped before it resolves, the engine is killed and
    /// the session ends in `Resolved(Failure)`.
    #[tracing::instrument(
        level = "info",
        skip(self),
        fields(fen = %self.request.position, depth = self.request.depth)
    )]
    pub async fn run(&mut self) -> Result<AnalysisResult, AnalysisError> {
        if self.state != SessionState::Created {
            tracing::error!(state = ?self.state, "Session already ran");
            return Err(AnalysisError::SessionAlreadyRun);
        }
        tracing::info!("Starting analysis session");

        let mut state = StateGuard(&mut self.state);
        let (mut process, output) =
            match EngineProcess::start(&self.engine_path, &self.engine_args) {
                Ok(spawned) => spawned,
                Err(e) => {
                    state.set(SessionState::Resolved(Resolution::Failure));
                    return Err(e);
                }
            };
        self.pid = process.id();

        let outcome = drive(&self.request, &mut state, &mut process, output).await;
        process.terminate().await;

        match &outcome {
            Ok(result) => {
                state.set(SessionState::Resolved(Resolution::Success));
                tracing::info!(
                    best_move = ?result.best_move,
                    eval = ?result.evaluation.map(|e| e.to_string()),
                    "Analysis complete"
                );
            }
            Err(e) => {
                state.set(SessionState::Resolved(Resolution::Failure));
                tracing::warn!("Analysis failed: {}", e);
            }
        }
        outcome
    }
}

/// Marks the session failed if `run` is dropped before it resolves.
struct StateGuard<'a>(&'a mut SessionState);

impl StateGuard<'_> {
    fn set(&mut self, state: SessionState) {
        *self.0 = state;
    }
}

impl Drop for StateGuard<'_> {
    fn drop(&mut self) {
        if !matches!(*self.0, SessionState::Resolved(_)) {
            tracing::warn!(state = ?*self.0, "Session cancelled before resolving");
            *self.0 = SessionState::Resolved(Resolution::Failure);
        }
    }
}

async fn drive(
    request: &AnalysisRequest,
    state: &mut StateGuard<'_>,
    process: &mut EngineProcess,
    output: EngineOutput,
) -> Outcome {
    process.send("uci").await?;
    process.send("ucinewgame").await?;
    process
        .send(&format!("position fen {}", request.position))
        .await?;
    state.set(SessionState::Started);

    process.send(&format!("go depth {}", request.depth)).await?;
    state.set(SessionState::AwaitingResult);
    tracing::debug!("Search started, waiting for bestmove");

    let (slot, rx) = ResolutionSlot::new();
    let slot = Arc::new(slot);
    let _tasks = TaskGuard(vec![
        tokio::spawn(read_until_bestmove(output, Arc::clone(&slot))),
        tokio::spawn(expire_after(request.time_budget, Arc::clone(&slot))),
    ]);

    rx.await.unwrap_or_else(|_| {
        Err(AnalysisError::EngineCrashed(
            "session ended without an outcome".into(),
        ))
    })
}

async fn read_until_bestmove<R>(mut output: LineReader<R>, slot: Arc<ResolutionSlot<Outcome>>)
where
    R: AsyncRead + Unpin,
{
    let mut state = ParseState::default();
    let mut lines = 0usize;

    let outcome = loop {
        match output.next_line().await {
            Ok(Some(line)) => {
                lines += 1;
                tracing::trace!("UCI << {}", line);
                if state.apply(&line) == LineOutcome::Terminal {
                    break Ok(state.into_result());
                }
            }
            Ok(None) => {
                break Err(AnalysisError::EngineCrashed(format!(
                    "engine closed its output after {} lines without a bestmove",
                    lines
                )));
            }
            Err(e) => {
                break Err(AnalysisError::EngineCrashed(format!(
                    "failed to read engine output: {}",
                    e
                )));
            }
        }
    };

    if !slot.resolve(outcome) {
        tracing::debug!("Engine output arrived after the session resolved, discarding");
    }
}

async fn expire_after(budget: Duration, slot: Arc<ResolutionSlot<Outcome>>) {
    tokio::time::sleep(budget).await;
    if slot.resolve(Err(AnalysisError::EngineTimeout(budget))) {
        tracing::warn!("No bestmove within {:?}", budget);
    }
}
