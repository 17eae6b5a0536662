//! Gradient steps on the model. The online trainer turns one observed move
//! into exactly one optimizer step, the batch functions are used by the
//! offline bootstrap.

use super::adam::{AdamConfig, AdamState};
use super::lstm::{backward, forward, forward_traced, Gradients, Parameters};
use super::math::cross_entropy;
use super::repr::{encode, Encoding};
use crate::{Symbol, WINDOW_SIZE};

/// What happened when a move was reported to the trainer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LearnOutcome {
    /// The history holds fewer than two moves, there is nothing to learn from.
    GatheringData,
    /// There is a target but no context in front of it.
    NeedMoreContext,
    /// One optimizer step was taken. The loss is the one before the step.
    Learned { loss: f32 },
}

/// Context and target of the most recent move in a history.
#[derive(Debug, PartialEq, Eq)]
pub enum TrailingExample<'a> {
    GatheringData,
    NeedMoreContext,
    Ready { context: &'a [Symbol], target: Symbol },
}

/// The target is the last move, the context are up to `WINDOW_SIZE` moves in
/// front of it.
pub fn trailing_example(history: &[Symbol]) -> TrailingExample<'_> {
    if history.len() < 2 {
        return TrailingExample::GatheringData;
    }
    let target = history[history.len() - 1];
    let end = history.len() - 1;
    let start = end.saturating_sub(WINDOW_SIZE);
    let context = &history[start..end];
    if context.is_empty() {
        return TrailingExample::NeedMoreContext;
    }
    TrailingExample::Ready { context, target }
}

/// Incorporates single observed moves into the shared parameters.
#[derive(Clone, Debug)]
pub struct OnlineTrainer {
    config: AdamConfig,
    /// Reset the session optimizer before every step instead of keeping its
    /// moment estimates around.
    fresh_optimizer_per_step: bool,
}

impl Default for OnlineTrainer {
    fn default() -> Self {
        Self::new(AdamConfig::default(), false)
    }
}

impl OnlineTrainer {
    pub fn new(config: AdamConfig, fresh_optimizer_per_step: bool) -> Self {
        Self {
            config,
            fresh_optimizer_per_step,
        }
    }

    pub fn config(&self) -> &AdamConfig {
        &self.config
    }

    /// Learns from the last move in `history`, which must already contain it.
    /// The parameters are only touched for `LearnOutcome::Learned`.
    pub fn learn(
        &self,
        params: &mut Parameters,
        optimizer: &mut AdamState,
        history: &[Symbol],
    ) -> LearnOutcome {
        match trailing_example(history) {
            TrailingExample::GatheringData => LearnOutcome::GatheringData,
            TrailingExample::NeedMoreContext => LearnOutcome::NeedMoreContext,
            TrailingExample::Ready { context, target } => {
                if self.fresh_optimizer_per_step {
                    optimizer.reset();
                }
                let loss = train_step(params, optimizer, &encode(context), target, &self.config);
                LearnOutcome::Learned { loss }
            }
        }
    }
}

/// Forward, cross entropy, backward and one optimizer step on a single
/// example. Returns the loss before the step.
pub fn train_step(
    params: &mut Parameters,
    optimizer: &mut AdamState,
    input: &Encoding,
    target: Symbol,
    config: &AdamConfig,
) -> f32 {
    let mut grads = Gradients::zeros();
    let loss = accumulate_gradients(params, input, target, &mut grads);
    optimizer.step(params, &mut grads, config);
    loss
}

/// Full batch step: averages loss and gradients over all examples and then
/// takes one optimizer step. Returns the mean loss before the step.
pub fn train_batch(
    params: &mut Parameters,
    optimizer: &mut AdamState,
    inputs: &[Encoding],
    targets: &[Symbol],
    config: &AdamConfig,
) -> f32 {
    assert_eq!(inputs.len(), targets.len(), "Every input needs a target");
    if inputs.is_empty() {
        return 0.0;
    }

    let mut grads = Gradients::zeros();
    let mut total = 0.0;
    for (input, &target) in inputs.iter().zip(targets) {
        total += accumulate_gradients(params, input, target, &mut grads);
    }
    let n = inputs.len() as f32;
    grads.scale(1.0 / n);
    optimizer.step(params, &mut grads, config);
    total / n
}

/// Mean cross entropy over a set of examples without touching anything.
pub fn evaluate_loss(params: &Parameters, inputs: &[Encoding], targets: &[Symbol]) -> f32 {
    if inputs.is_empty() {
        return 0.0;
    }
    let total: f32 = inputs
        .iter()
        .zip(targets)
        .map(|(input, target)| cross_entropy(&forward(params, input), target.class()).0)
        .sum();
    total / inputs.len() as f32
}

fn accumulate_gradients(
    params: &Parameters,
    input: &Encoding,
    target: Symbol,
    grads: &mut Gradients,
) -> f32 {
    let trace = forward_traced(params, input);
    let (loss, d_logits) = cross_entropy(&trace.logits, target.class());
    backward(params, &trace, &d_logits, grads);
    loss
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::math::softmax;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn moves(values: &[u8]) -> Vec<Symbol> {
        values.iter().map(|&v| Symbol::new_checked(v).unwrap()).collect()
    }

    #[test]
    fn trailing_example_needs_two_moves() {
        assert_eq!(trailing_example(&[]), TrailingExample::GatheringData);
        assert_eq!(trailing_example(&moves(&[4])), TrailingExample::GatheringData);

        let history = moves(&[4, 6]);
        assert_eq!(
            trailing_example(&history),
            TrailingExample::Ready {
                context: &history[..1],
                target: history[1]
            }
        );
    }

    #[test]
    fn trailing_context_is_capped_at_window() {
        let history = moves(&[1, 2, 3, 4, 5, 6, 7, 8]);
        match trailing_example(&history) {
            TrailingExample::Ready { context, target } => {
                assert_eq!(context, &moves(&[3, 4, 5, 6, 7])[..]);
                assert_eq!(target.value(), 8);
            }
            other => panic!("Expected an example, got {:?}", other),
        }
    }

    #[test]
    fn gathering_data_leaves_parameters_alone() {
        let mut params = Parameters::random(&mut StdRng::seed_from_u64(9));
        let before = params.clone();
        let mut adam = AdamState::new();

        let outcome = OnlineTrainer::default().learn(&mut params, &mut adam, &moves(&[3]));
        assert_eq!(outcome, LearnOutcome::GatheringData);
        assert_eq!(params, before);
        assert_eq!(adam.steps(), 0);
    }

    #[test]
    fn one_step_per_learn_call() {
        let mut params = Parameters::random(&mut StdRng::seed_from_u64(9));
        let before = params.clone();
        let mut adam = AdamState::new();
        let trainer = OnlineTrainer::default();

        let outcome = trainer.learn(&mut params, &mut adam, &moves(&[3, 5]));
        assert!(matches!(outcome, LearnOutcome::Learned { loss } if loss > 0.0));
        assert_ne!(params, before);
        assert_eq!(adam.steps(), 1);

        trainer.learn(&mut params, &mut adam, &moves(&[3, 5, 5]));
        assert_eq!(adam.steps(), 2);
    }

    #[test]
    fn fresh_optimizer_policy_resets_moments() {
        let mut params = Parameters::random(&mut StdRng::seed_from_u64(9));
        let mut adam = AdamState::new();
        let trainer = OnlineTrainer::new(AdamConfig::default(), true);

        trainer.learn(&mut params, &mut adam, &moves(&[3, 5]));
        trainer.learn(&mut params, &mut adam, &moves(&[3, 5, 5]));
        assert_eq!(adam.steps(), 1);
    }

    #[test]
    fn repeated_example_lowers_loss() {
        let mut params = Parameters::random(&mut StdRng::seed_from_u64(21));
        let mut adam = AdamState::new();
        let trainer = OnlineTrainer::default();
        let history = moves(&[1, 7, 2, 7]);

        let losses: Vec<f32> = (0..30)
            .map(|_| match trainer.learn(&mut params, &mut adam, &history) {
                LearnOutcome::Learned { loss } => loss,
                other => panic!("Unexpected outcome {:?}", other),
            })
            .collect();

        let first: f32 = losses[..5].iter().sum::<f32>() / 5.0;
        let last: f32 = losses[25..].iter().sum::<f32>() / 5.0;
        assert!(last < first, "Loss went from {} to {}", first, last);

        let p = softmax(&forward(&params, &encode(&history[..3])));
        assert!(p[7] > 1.0 / 9.0);
    }

    #[test]
    fn batch_training_reduces_loss() {
        let sequence = moves(&[1, 2, 3, 4, 5, 6, 7, 8, 1, 2, 3, 4, 5, 6, 7, 8, 1, 2, 3]);
        let (inputs, targets) = crate::ai::repr::encode_batch(&sequence, WINDOW_SIZE);
        let mut params = Parameters::random(&mut StdRng::seed_from_u64(4));
        let mut adam = AdamState::new();
        let config = AdamConfig::default();

        let before = evaluate_loss(&params, &inputs, &targets);
        for _ in 0..40 {
            train_batch(&mut params, &mut adam, &inputs, &targets, &config);
        }
        let after = evaluate_loss(&params, &inputs, &targets);
        assert!(after < before, "Loss went from {} to {}", before, after);
    }
}
