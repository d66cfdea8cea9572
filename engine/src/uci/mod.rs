pub mod buffer;
pub mod parser;

pub use buffer::{LineBuffer, LineReader};
pub use parser::{is_uci_move, Evaluation, LineOutcome, ParseState};
