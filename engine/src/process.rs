//! Ownership of a single engine subprocess.
//!
//! [`EngineProcess`] is the only holder of the OS process handle and its
//! stdin pipe. It is deliberately not `Clone`; the stdout pipe is handed out
//! once, at start, as a [`LineReader`].

use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use crate::uci::LineReader;
use crate::AnalysisError;

pub type EngineOutput = LineReader<ChildStdout>;

pub struct EngineProcess {
    child: Child,
    stdin: Option<ChildStdin>,
    pid: Option<u32>,
    terminated: bool,
}

impl EngineProcess {
    /// Spawn the engine binary with piped stdin/stdout.
    ///
    /// The child is killed if this handle is dropped without
    /// [`terminate`](Self::terminate), so a cancelled caller cannot leak it.
    #[tracing::instrument(level = "debug", skip(args))]
    pub fn start(path: &Path, args: &[String]) -> Result<(Self, EngineOutput), AnalysisError> {
        let unavailable = |source: io::Error| {
            tracing::error!("Failed to spawn engine at {}: {}", path.display(), source);
            AnalysisError::EngineUnavailable {
                path: PathBuf::from(path),
                source,
            }
        };

        let mut child = Command::new(path)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(unavailable)?;

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let (Some(stdin), Some(stdout)) = (stdin, stdout) else {
            // Unreachable with piped stdio, but never leave the child behind.
            let _ = child.start_kill();
            return Err(unavailable(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "engine pipes unavailable",
            )));
        };

        let pid = child.id();
        tracing::debug!(pid = ?pid, "Engine process spawned");

        Ok((
            Self {
                child,
                stdin: Some(stdin),
                pid,
                terminated: false,
            },
            LineReader::new(stdout),
        ))
    }

    /// OS process id captured at spawn time.
    pub fn id(&self) -> Option<u32> {
        self.pid
    }

    /// Write one command line to the engine.
    pub async fn send(&mut self, command: &str) -> Result<(), AnalysisError> {
        let stdin = self.stdin.as_mut().ok_or_else(|| {
            AnalysisError::EngineWriteError(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "engine already terminated",
            ))
        })?;

        tracing::trace!("UCI >> {}", command);
        let line = format!("{}\n", command);
        stdin.write_all(line.as_bytes()).await.map_err(|e| {
            tracing::error!("Failed to write '{}' to engine: {}", command, e);
            AnalysisError::EngineWriteError(e)
        })?;
        stdin.flush().await.map_err(|e| {
            tracing::error!("Failed to flush engine stdin: {}", e);
            AnalysisError::EngineWriteError(e)
        })
    }

    /// Kill and reap the process. Safe to call any number of times.
    pub async fn terminate(&mut self) {
        if self.terminated {
            return;
        }
        self.terminated = true;
        self.stdin = None;

        match self.child.try_wait() {
            Ok(Some(status)) => {
                tracing::debug!(pid = ?self.pid, %status, "Engine had already exited");
            }
            _ => {
                if let Err(e) = self.child.kill().await {
                    tracing::warn!(pid = ?self.pid, "Failed to kill engine: {}", e);
                } else {
                    tracing::debug!(pid = ?self.pid, "Engine killed");
                }
            }
        }
    }
}
