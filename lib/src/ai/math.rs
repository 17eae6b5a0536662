//! Various AI helper functions.

use crate::CLASSES;

pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Numerically stable softmax over the output classes.
pub fn softmax(logits: &[f32; CLASSES]) -> [f32; CLASSES] {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mut out = [0.0; CLASSES];
    let mut sum = 0.0;
    for (o, &l) in out.iter_mut().zip(logits.iter()) {
        *o = (l - max).exp();
        sum += *o;
    }
    for o in &mut out {
        *o /= sum;
    }
    out
}

/// Index of the largest logit. Ties resolve to the lowest index.
pub fn argmax(logits: &[f32; CLASSES]) -> usize {
    let mut best = 0;
    for (i, &l) in logits.iter().enumerate().skip(1) {
        if l > logits[best] {
            best = i;
        }
    }
    best
}

/// Softmax cross entropy against a single target class.
/// Returns the loss and the gradient with respect to the logits.
pub fn cross_entropy(logits: &[f32; CLASSES], target: usize) -> (f32, [f32; CLASSES]) {
    let mut grad = softmax(logits);
    let loss = -grad[target].max(f32::MIN_POSITIVE).ln();
    grad[target] -= 1.0;
    (loss, grad)
}
