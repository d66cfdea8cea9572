//! Syntactic validation of incoming FEN strings.

use std::fmt;

use cozy_chess::Board;

use crate::AnalysisError;

/// Number of space-separated fields in a complete FEN record.
const FEN_FIELDS: usize = 6;

/// A FEN string that has been checked to describe a complete, parseable
/// position. Fields are re-joined with single spaces, so the descriptor can
/// be embedded in a `position fen` command without carrying stray newlines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position(String);

impl Position {
    pub fn parse(raw: &str) -> Result<Self, AnalysisError> {
        let fields: Vec<&str> = raw.split_whitespace().collect();
        if fields.is_empty() {
            return Err(AnalysisError::InvalidPosition("empty position".into()));
        }
        if fields.len() != FEN_FIELDS {
            return Err(AnalysisError::InvalidPosition(format!(
                "expected {} FEN fields, got {}",
                FEN_FIELDS,
                fields.len()
            )));
        }

        let fen = fields.join(" ");
        fen.parse::<Board>()
            .map_err(|e| AnalysisError::InvalidPosition(format!("{}: {:?}", fen, e)))?;

        Ok(Self(fen))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
