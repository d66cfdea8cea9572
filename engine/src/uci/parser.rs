use std::fmt;

use cozy_chess::Move;
use serde::{Serialize, Serializer};

use crate::AnalysisResult;

/// Engine evaluation, in the engine's own sign convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evaluation {
    Centipawns(i32),
    Mate(i32), // Negative when the engine side is being mated
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Evaluation::Centipawns(cp) => write!(f, "{:.2}", f64::from(*cp) / 100.0),
            Evaluation::Mate(n) => write!(f, "#{}", n),
        }
    }
}

impl Serialize for Evaluation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Whether the session still needs more output after a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOutcome {
    Continue,
    Terminal,
}

/// Facts accumulated from the engine's output so far. Deeper `info` lines
/// overwrite shallower ones, so lines must be applied in emission order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseState {
    pub evaluation: Option<Evaluation>,
    pub principal_variation: Option<Vec<String>>,
    pub best_move: Option<String>,
}

impl ParseState {
    /// Fold one output line into the state.
    pub fn apply(&mut self, line: &str) -> LineOutcome {
        let tokens: Vec<&str> = line.split_whitespace().collect();

        match tokens.first() {
            Some(&"info") => {
                self.apply_info(&tokens[1..]);
                LineOutcome::Continue
            }
            Some(&"bestmove") => {
                // "bestmove (none)" still ends the search, just without a move.
                self.best_move = tokens
                    .get(1)
                    .filter(|token| is_uci_move(token))
                    .map(|token| token.to_string());
                LineOutcome::Terminal
            }
            _ => LineOutcome::Continue,
        }
    }

    fn apply_info(&mut self, tokens: &[&str]) {
        let mut i = 0;

        while i < tokens.len() {
            match tokens[i] {
                // Free text runs to the end of the line.
                "string" => return,
                "score" => {
                    i += 1;
                    let kind = tokens.get(i).copied();
                    if matches!(kind, Some("cp") | Some("mate")) {
                        i += 1;
                        if let Some(value) = tokens.get(i).and_then(|s| s.parse::<i32>().ok()) {
                            self.evaluation = Some(match kind {
                                Some("cp") => Evaluation::Centipawns(value),
                                _ => Evaluation::Mate(value),
                            });
                            i += 1;
                        }
                    }
                }
                "pv" => {
                    i += 1;
                    let mut moves = Vec::new();
                    while i < tokens.len() && !is_keyword(tokens[i]) {
                        if is_uci_move(tokens[i]) {
                            moves.push(tokens[i].to_string());
                        }
                        i += 1;
                    }
                    if !moves.is_empty() {
                        self.principal_variation = Some(moves);
                    }
                }
                _ => i += 1,
            }
        }
    }

    pub fn into_result(self) -> AnalysisResult {
        AnalysisResult {
            best_move: self.best_move,
            evaluation: self.evaluation,
            principal_variation: self.principal_variation,
        }
    }
}

fn is_keyword(token: &str) -> bool {
    matches!(
        token,
        "depth"
            | "seldepth"
            | "time"
            | "nodes"
            | "score"
            | "pv"
            | "multipv"
            | "currmove"
            | "currmovenumber"
            | "hashfull"
            | "nps"
            | "tbhits"
            | "sbhits"
            | "cpuload"
            | "string"
            | "refutation"
            | "currline"
            | "wdl"
    )
}

/// Long algebraic move as UCI writes it (`e2e4`, `e7e8q`).
pub fn is_uci_move(token: &str) -> bool {
    token.parse::<Move>().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uci::LineBuffer;
    use proptest::prelude::*;

    fn feed(lines: &[&str]) -> (ParseState, Vec<LineOutcome>) {
        let mut state = ParseState::default();
        let outcomes = lines.iter().map(|l| state.apply(l)).collect();
        (state, outcomes)
    }

    #[test]
    fn test_centipawn_score_and_pv() {
        let (state, outcomes) = feed(&["info depth 12 score cp 35 nodes 15234 pv e2e4 e7e5"]);
        assert_eq!(outcomes, vec![LineOutcome::Continue]);
        assert_eq!(state.evaluation, Some(Evaluation::Centipawns(35)));
        assert_eq!(
            state.principal_variation,
            Some(vec!["e2e4".to_string(), "e7e5".to_string()])
        );
        assert_eq!(state.best_move, None);
    }

    #[test]
    fn test_later_info_overwrites_earlier() {
        let (state, _) = feed(&[
            "info depth 10 score cp 35 nodes 900 pv e2e4 e7e5",
            "info depth 15 score mate 3 pv d2d4 d7d5 c2c4",
            "bestmove d2d4",
        ]);
        assert_eq!(state.evaluation, Some(Evaluation::Mate(3)));
        assert_eq!(state.evaluation.unwrap().to_string(), "#3");
        assert_eq!(
            state.principal_variation,
            Some(vec!["d2d4".into(), "d7d5".into(), "c2c4".into()])
        );
        assert_eq!(state.best_move.as_deref(), Some("d2d4"));
    }

    #[test]
    fn test_bestmove_is_terminal() {
        let mut state = ParseState::default();
        assert_eq!(state.apply("bestmove e2e4 ponder e7e5"), LineOutcome::Terminal);
        assert_eq!(state.best_move.as_deref(), Some("e2e4"));
    }

    #[test]
    fn test_bestmove_none_is_terminal_without_move() {
        let mut state = ParseState::default();
        assert_eq!(state.apply("bestmove (none)"), LineOutcome::Terminal);
        assert_eq!(state.best_move, None);
    }

    #[test]
    fn test_noise_is_ignored() {
        let (state, outcomes) = feed(&[
            "Stockfish 16 by the Stockfish developers",
            "id name Stockfish 16",
            "option name Hash type spin default 16 min 1 max 33554432",
            "uciok",
            "info string NNUE evaluation using nn-5af11540bbfe.nnue enabled",
            "info depth 1 currmove e2e4 currmovenumber 1",
            "",
        ]);
        assert!(outcomes.iter().all(|o| *o == LineOutcome::Continue));
        assert_eq!(state, ParseState::default());
    }

    #[test]
    fn test_info_string_cannot_smuggle_fields() {
        let (state, _) = feed(&["info string score cp 900 pv a2a4"]);
        assert_eq!(state, ParseState::default());
    }

    #[test]
    fn test_malformed_score_keeps_previous_value() {
        let (state, _) = feed(&[
            "info depth 8 score cp 20 pv g1f3",
            "info depth 9 score cp pv e2e4",
            "info depth 9 score",
            "info depth 10 score mate x",
        ]);
        assert_eq!(state.evaluation, Some(Evaluation::Centipawns(20)));
        // The pv on the malformed line is still taken.
        assert_eq!(state.principal_variation, Some(vec!["e2e4".into()]));
    }

    #[test]
    fn test_malformed_moves_are_skipped() {
        let (state, _) = feed(&[
            "info depth 10 score cp 35 pv e2e4 e7e5",
            "info depth 15 score mate 3 pv ...",
            "info depth 16 score mate 3 pv e2e4 zz99 g8f6",
        ]);
        assert_eq!(
            state.principal_variation,
            Some(vec!["e2e4".into(), "g8f6".into()])
        );
    }

    #[test]
    fn test_pv_stops_at_keyword() {
        let (state, _) = feed(&["info pv e2e4 e7e5 nodes 100 score cp -15"]);
        assert_eq!(
            state.principal_variation,
            Some(vec!["e2e4".into(), "e7e5".into()])
        );
        assert_eq!(state.evaluation, Some(Evaluation::Centipawns(-15)));
    }

    #[test]
    fn test_score_bound_and_wdl() {
        let (state, _) = feed(&["info depth 20 score cp 27 lowerbound wdl 120 800 80 pv e7e8q"]);
        assert_eq!(state.evaluation, Some(Evaluation::Centipawns(27)));
        assert_eq!(state.principal_variation, Some(vec!["e7e8q".into()]));
    }

    #[test]
    fn test_evaluation_formatting() {
        assert_eq!(Evaluation::Centipawns(0).to_string(), "0.00");
        assert_eq!(Evaluation::Centipawns(35).to_string(), "0.35");
        assert_eq!(Evaluation::Centipawns(-120).to_string(), "-1.20");
        assert_eq!(Evaluation::Centipawns(-1).to_string(), "-0.01");
        assert_eq!(Evaluation::Centipawns(1234).to_string(), "12.34");
        assert_eq!(Evaluation::Mate(3).to_string(), "#3");
        assert_eq!(Evaluation::Mate(-2).to_string(), "#-2");
    }

    #[test]
    fn test_evaluation_serializes_as_string() {
        assert_eq!(
            serde_json::to_string(&Evaluation::Centipawns(35)).unwrap(),
            "\"0.35\""
        );
        assert_eq!(serde_json::to_string(&Evaluation::Mate(-4)).unwrap(), "\"#-4\"");
    }

    const TRANSCRIPT: &str = "id name Fake\nuciok\n\
        info depth 1 score cp 12 pv e2e4\n\
        info string thinking\n\
        info depth 10 score cp 35 nodes 4000 pv e2e4 e7e5 g1f3\n\
        info depth 15 score mate 3 pv d2d4 d7d5\n\
        bestmove d2d4 ponder d7d5\n";

    fn parse_chunked(chunks: &[&[u8]]) -> ParseState {
        let mut buffer = LineBuffer::new();
        let mut state = ParseState::default();
        for chunk in chunks {
            for line in buffer.push(chunk) {
                if state.apply(&line) == LineOutcome::Terminal {
                    return state;
                }
            }
        }
        state
    }

    #[test]
    fn test_chunking_one_line_per_read_vs_single_read() {
        let bytes = TRANSCRIPT.as_bytes();
        let whole = parse_chunked(&[bytes]);

        let per_line: Vec<&[u8]> = bytes.split_inclusive(|b| *b == b'\n').collect();
        assert_eq!(parse_chunked(&per_line), whole);

        let per_byte: Vec<&[u8]> = bytes.chunks(1).collect();
        assert_eq!(parse_chunked(&per_byte), whole);

        assert_eq!(whole.best_move.as_deref(), Some("d2d4"));
        assert_eq!(whole.evaluation, Some(Evaluation::Mate(3)));
    }

    proptest! {
        #[test]
        fn prop_chunk_boundaries_do_not_matter(mut cuts in prop::collection::vec(0..TRANSCRIPT.len(), 0..20)) {
            let bytes = TRANSCRIPT.as_bytes();
            cuts.sort_unstable();
            cuts.dedup();

            let mut chunks = Vec::new();
            let mut start = 0;
            for cut in cuts {
                chunks.push(&bytes[start..cut]);
                start = cut;
            }
            chunks.push(&bytes[start..]);

            prop_assert_eq!(parse_chunked(&chunks), parse_chunked(&[bytes]));
        }
    }
}
