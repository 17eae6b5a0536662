//! Move history representation as a 5x9 tensor.
//!
//! Each of the 5 rows is one step of the window, oldest first. A row is the
//! one-hot vector of the symbol in that step, so row `t` has a single 1.0 at
//! column `symbol`. Rows that are not covered by the history are padding and
//! stay all zero. Note that this is different from a one-hot of the padding
//! symbol 0, which would set column 0.
//!
//! The history is right aligned: the most recent move is always in the last
//! row, so a history with 2 moves looks like
//!
//! ```text
//! [ 0 0 0 0 0 0 0 0 0 ]
//! [ 0 0 0 0 0 0 0 0 0 ]
//! [ 0 0 0 0 0 0 0 0 0 ]
//! [ 0 0 0 0 1 0 0 0 0 ]   <- second to last move, 4
//! [ 0 0 1 0 0 0 0 0 0 ]   <- last move, 2
//! ```
//!
//! Longer histories are truncated to the last 5 moves.

use crate::{Symbol, CLASSES, WINDOW_SIZE};

/// One-hot tensor representation of a window, row major.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Encoding {
    rows: [[f32; CLASSES]; WINDOW_SIZE],
}

impl Encoding {
    /// An encoding where every row is padding.
    pub const fn empty() -> Self {
        Encoding {
            rows: [[0.0; CLASSES]; WINDOW_SIZE],
        }
    }

    pub fn rows(&self) -> &[[f32; CLASSES]; WINDOW_SIZE] {
        &self.rows
    }

    /// Number of rows that hold an actual symbol.
    pub fn occupied_rows(&self) -> usize {
        self.rows
            .iter()
            .filter(|row| row.iter().any(|&x| x != 0.0))
            .count()
    }

    fn set(&mut self, row: usize, symbol: Symbol) {
        self.rows[row][symbol.class()] = 1.0;
    }
}

impl Default for Encoding {
    fn default() -> Self {
        Self::empty()
    }
}

/// Encodes the trailing window of `sequence`. Works for any length, including
/// an empty history which encodes to all padding.
pub fn encode(sequence: &[Symbol]) -> Encoding {
    let mut out = Encoding::empty();
    let used = sequence.len().min(WINDOW_SIZE);

    // Fill from right to left, starting with the most recent symbol.
    for i in 0..used {
        let symbol = sequence[sequence.len() - 1 - i];
        out.set(WINDOW_SIZE - 1 - i, symbol);
    }
    out
}

/// Training pairs for a long sequence. Every full window of `window` symbols
/// is an input, the symbol right after it is the target.
/// A sequence of length `N` yields `N - window` pairs, or none if it is too short.
pub fn encode_batch(sequence: &[Symbol], window: usize) -> (Vec<Encoding>, Vec<Symbol>) {
    let pairs = sequence.len().saturating_sub(window);
    let mut inputs = Vec::with_capacity(pairs);
    let mut targets = Vec::with_capacity(pairs);

    for i in 0..pairs {
        inputs.push(encode(&sequence[i..i + window]));
        targets.push(sequence[i + window]);
    }
    (inputs, targets)
}
