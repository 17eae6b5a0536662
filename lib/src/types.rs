use std::convert::TryFrom;
use std::fmt;
use std::fmt::Debug;
use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::MindReaderError;

/// How many of the most recent moves the model looks at.
pub const WINDOW_SIZE: usize = 5;
/// Symbols 0..=8, where 0 is the padding class.
pub const CLASSES: usize = 9;
/// Width of the recurrent hidden state.
pub const HIDDEN_SIZE: usize = 64;

/// A single choice on the keypad. Moves are 1..=8, the value 0 only ever
/// appears as padding inside an encoding or as a raw model output.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Symbol(pub(crate) u8);

impl Symbol {
    pub const PADDING: Symbol = Symbol(0);
    pub const MIN_MOVE: u8 = 1;
    pub const MAX_MOVE: u8 = 8;

    /// Creates a move symbol, returns `None` for anything outside 1..=8.
    pub const fn new_checked(value: u8) -> Option<Self> {
        if value >= Self::MIN_MOVE && value <= Self::MAX_MOVE {
            Some(Symbol(value))
        } else {
            None
        }
    }

    /// Turns a class index from the model output back into a symbol. This
    /// may return the padding symbol, callers have to intercept it.
    pub(crate) fn from_class(class: usize) -> Self {
        debug_assert!(class < CLASSES);
        Symbol(class as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Position of this symbol in a one-hot row or a logit vector.
    pub fn class(self) -> usize {
        self.0 as usize
    }

    pub fn is_padding(self) -> bool {
        self.0 == 0
    }

    /// All valid moves, padding excluded.
    pub fn all_moves() -> impl Iterator<Item = Self> {
        (Self::MIN_MOVE..=Self::MAX_MOVE).map(Symbol)
    }
}

impl TryFrom<u8> for Symbol {
    type Error = MindReaderError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new_checked(value).ok_or(MindReaderError::InvalidSymbol(value as i64))
    }
}

impl TryFrom<i64> for Symbol {
    type Error = MindReaderError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .ok()
            .and_then(Self::new_checked)
            .ok_or(MindReaderError::InvalidSymbol(value))
    }
}

impl From<Symbol> for u8 {
    fn from(symbol: Symbol) -> Self {
        symbol.0
    }
}

impl Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_padding() {
            write!(f, "_")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// How much the caller should trust a prediction. Serialized as "Low" and
/// "High" which is what the frontend expects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Confidence {
    Low,
    High,
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::TestResult;
    use quickcheck_macros::quickcheck;

    #[test]
    fn moves_are_one_to_eight() {
        let moves: Vec<u8> = Symbol::all_moves().map(u8::from).collect();
        assert_eq!(moves, vec![1, 2, 3, 4, 5, 6, 7, 8]);
        assert!(Symbol::PADDING.is_padding());
        assert!(Symbol::all_moves().all(|s| !s.is_padding()));
    }

    #[test]
    fn out_of_range_moves_are_rejected() {
        assert!(Symbol::try_from(0u8).is_err());
        assert!(Symbol::try_from(9u8).is_err());
        assert!(Symbol::try_from(-3i64).is_err());
        assert!(Symbol::try_from(300i64).is_err());
        assert_eq!(Symbol::try_from(4u8).map(u8::from).ok(), Some(4));
    }

    #[test]
    fn confidence_serializes_as_plain_string() {
        assert_eq!(serde_json::to_string(&Confidence::Low).unwrap(), r#""Low""#);
        assert_eq!(serde_json::to_string(&Confidence::High).unwrap(), r#""High""#);
    }

    /// Every byte either maps to a move with the same value or is rejected.
    #[quickcheck]
    fn checked_conversion_keeps_value(value: u8) -> TestResult {
        match Symbol::try_from(value) {
            Ok(symbol) => TestResult::from_bool(symbol.value() == value && (1..=8).contains(&value)),
            Err(_) => TestResult::from_bool(!(1..=8).contains(&value)),
        }
    }
}
