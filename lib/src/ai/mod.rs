//! The learning part of the mind reader. A small LSTM reads the last few
//! moves of a player and scores every possible next move.
//!
//! Everything in here is synchronous and free of locks. Sharing the
//! parameters between sessions is the job of [`crate::service`].

pub mod adam;
pub mod lstm;
pub mod math;
pub mod repr;
pub mod training;
