//! Reassembly of engine output into complete lines.
//!
//! Reads from a pipe return whatever bytes happen to be available, which
//! rarely lines up with the engine's line boundaries. [`LineBuffer`] holds the
//! trailing partial line between reads and only releases complete lines.

use std::collections::VecDeque;
use std::io;

use tokio::io::{AsyncRead, AsyncReadExt};

const READ_CHUNK: usize = 4096;

/// Longest line kept, in bytes. Real UCI lines are far shorter.
pub const MAX_LINE_LEN: usize = 16 * 1024;

#[derive(Debug)]
pub struct LineBuffer {
    partial: Vec<u8>,
    max_len: usize,
    /// Set while skipping the rest of an overlong line.
    discarding: bool,
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::with_max_length(MAX_LINE_LEN)
    }
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines longer than `max_len` bytes are dropped whole.
    pub fn with_max_length(max_len: usize) -> Self {
        Self {
            partial: Vec::new(),
            max_len,
            discarding: false,
        }
    }

    /// Append a chunk and return every line it completed, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &byte in chunk {
            if byte == b'\n' {
                if !self.discarding {
                    lines.push(decode(&self.partial));
                }
                self.partial.clear();
                self.discarding = false;
            } else if self.discarding {
                continue;
            } else if self.partial.len() >= self.max_len {
                tracing::warn!("Discarding engine output line longer than {} bytes", self.max_len);
                self.partial.clear();
                self.discarding = true;
            } else {
                self.partial.push(byte);
            }
        }
        lines
    }

    /// Flush the unterminated tail once the stream has ended.
    pub fn finish(&mut self) -> Option<String> {
        if std::mem::take(&mut self.discarding) || self.partial.is_empty() {
            return None;
        }
        let line = decode(&self.partial);
        self.partial.clear();
        Some(line)
    }
}

fn decode(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

/// Async line source over any byte stream (the engine's stdout in practice).
pub struct LineReader<R> {
    inner: R,
    buffer: LineBuffer,
    ready: VecDeque<String>,
    eof: bool,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buffer: LineBuffer::new(),
            ready: VecDeque::new(),
            eof: false,
        }
    }

    /// Next complete line, or `None` once the stream is exhausted.
    pub async fn next_line(&mut self) -> io::Result<Option<String>> {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            if let Some(line) = self.ready.pop_front() {
                return Ok(Some(line));
            }
            if self.eof {
                return Ok(None);
            }

            let n = self.inner.read(&mut chunk).await?;
            if n == 0 {
                self.eof = true;
                self.ready.extend(self.buffer.finish());
            } else {
                self.ready.extend(self.buffer.push(&chunk[..n]));
            }
        }
    }
}
