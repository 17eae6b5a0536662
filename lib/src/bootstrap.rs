//! Offline pretraining. Real players don't pick numbers uniformly at random,
//! they tend to stay close to the last key they pressed. We generate long
//! synthetic sequences with that habit and bulk train a starting model on
//! them, so the server does not start from a completely random brain.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::ai::adam::{AdamConfig, AdamState};
use crate::ai::lstm::Parameters;
use crate::ai::repr::encode_batch;
use crate::ai::training::train_batch;
use crate::progress::Progress;
use crate::random::{random_move, random_move_except};
use crate::{Symbol, WINDOW_SIZE};

/// Anything that produces move sequences to pretrain on.
pub trait SequenceGenerator {
    /// Produces the starting move plus `steps` follow-up moves.
    fn generate(&mut self, steps: usize) -> Vec<Symbol>;
}

/// Neighbours of every key on the keypad
///
/// ```text
/// 1 2 3
/// 4 5 6
/// 7 8
/// ```
const KEYPAD_NEIGHBORS: [&[u8]; 9] = [
    &[],
    &[2, 4, 5],
    &[1, 3, 5, 4, 6],
    &[2, 5, 6],
    &[1, 2, 5, 7, 8],
    &[1, 2, 3, 4, 6, 7, 8],
    &[2, 3, 5, 8],
    &[4, 5, 8],
    &[4, 5, 6, 7],
];

/// A random walk over the keypad that mixes four habits:
///
/// - 10% jump anywhere,
/// - 40% move to a neighbouring key,
/// - 30% step one number up or down,
/// - 20% pick anything except the last key.
pub struct KeypadWalker<R> {
    rng: R,
}

impl<R: Rng> KeypadWalker<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    fn next_move(&mut self, previous: Symbol) -> Symbol {
        let decision: f64 = self.rng.gen();
        if decision < 0.1 {
            random_move(&mut self.rng)
        } else if decision < 0.5 {
            match KEYPAD_NEIGHBORS[previous.class()].choose(&mut self.rng) {
                Some(&neighbor) => Symbol(neighbor),
                None => random_move(&mut self.rng),
            }
        } else if decision < 0.8 {
            let up: bool = self.rng.gen();
            // Bounce back from the edges of the keypad.
            let next = match (previous.value(), up) {
                (1, false) => 2,
                (8, true) => 7,
                (value, true) => value + 1,
                (value, false) => value - 1,
            };
            Symbol(next)
        } else {
            random_move_except(&mut self.rng, previous)
        }
    }
}

impl<R: Rng> SequenceGenerator for KeypadWalker<R> {
    fn generate(&mut self, steps: usize) -> Vec<Symbol> {
        let mut sequence = Vec::with_capacity(steps + 1);
        let mut previous = random_move(&mut self.rng);
        sequence.push(previous);
        for _ in 0..steps {
            previous = self.next_move(previous);
            sequence.push(previous);
        }
        sequence
    }
}

/// Full batch training over every window of `sequence`. One optimizer step per
/// epoch, `on_epoch` is called after each of them. Returns the loss of every
/// epoch, measured before that epoch's step.
pub fn bulk_train<F>(
    params: &mut Parameters,
    sequence: &[Symbol],
    epochs: usize,
    config: &AdamConfig,
    mut on_epoch: F,
) -> Vec<f32>
where
    F: FnMut(&Progress, f32),
{
    let (inputs, targets) = encode_batch(sequence, WINDOW_SIZE);
    let mut optimizer = AdamState::new();
    let mut losses = Vec::with_capacity(epochs);

    for epoch in 0..epochs {
        let loss = train_batch(params, &mut optimizer, &inputs, &targets, config);
        losses.push(loss);
        on_epoch(&Progress::new("bulk_train", epochs, epoch + 1), loss);
    }
    losses
}
