//! Predicts the next number a player is going to pick on a keypad with the
//! keys 1 to 8, and learns from every move the player actually makes.
//!
//! The [`service::MindReader`] is the entry point. It owns the shared model,
//! the per-session state and the online trainer.

pub mod ai;
pub mod bootstrap;
pub mod progress;
pub mod random;
pub mod service;
pub mod session;
pub mod types;
pub mod weights;

pub use ai::adam::AdamConfig;
pub use ai::lstm::Parameters;
pub use ai::training::{LearnOutcome, OnlineTrainer};
pub use service::{MindReader, Prediction};
pub use types::{Confidence, Symbol, CLASSES, HIDDEN_SIZE, WINDOW_SIZE};

#[derive(thiserror::Error, Debug)]
pub enum MindReaderError {
    #[error("A move must be a number between 1 and 8, got {0}.")]
    InvalidSymbol(i64),
    #[error("Could not read or write the weight file.")]
    WeightIo(#[from] std::io::Error),
    #[error("The weight file is malformed.")]
    WeightEncoding(#[from] bincode::Error),
    #[error("The weight file has format version {0}, which is not supported.")]
    UnsupportedWeightVersion(u32),
    #[error("The weight file was written for shape {found}, expected {expected}.")]
    WeightShapeMismatch { found: String, expected: String },
}
