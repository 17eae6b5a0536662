//! The sequence model: a single LSTM layer over the encoded window followed by
//! a linear projection of the last hidden state onto the output classes.
//!
//! The network is a pure function of its parameters. [`forward`] takes the
//! parameters by reference and returns logits, nothing is cached between
//! calls. Training uses [`forward_traced`] to keep the activations of every
//! step around and [`backward`] to push a logit gradient back through time.
//!
//! Gate order inside the stacked weights is input, forget, cell, output.

use rand::Rng;
use rand_distr::{Distribution, Uniform};
use serde::{Deserialize, Serialize};

use super::math::sigmoid;
use super::repr::Encoding;
use crate::{CLASSES, HIDDEN_SIZE, WINDOW_SIZE};

/// Four gates, each `HIDDEN_SIZE` wide.
const GATES: usize = 4 * HIDDEN_SIZE;

pub type Logits = [f32; CLASSES];
type Hidden = [f32; HIDDEN_SIZE];

/// All trainable values of the model. Matrices are stored row major.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    /// Input to gates, `[GATES, CLASSES]`.
    pub(crate) w_input: Vec<f32>,
    /// Previous hidden state to gates, `[GATES, HIDDEN_SIZE]`.
    pub(crate) w_hidden: Vec<f32>,
    /// `[GATES]`
    pub(crate) bias: Vec<f32>,
    /// Last hidden state to logits, `[CLASSES, HIDDEN_SIZE]`.
    pub(crate) w_out: Vec<f32>,
    /// `[CLASSES]`
    pub(crate) b_out: Vec<f32>,
}

/// Gradients have exactly the same shape as the parameters.
pub type Gradients = Parameters;

impl Parameters {
    /// All values set to zero. Used for gradients and optimizer moments.
    pub fn zeros() -> Self {
        Parameters {
            w_input: vec![0.0; GATES * CLASSES],
            w_hidden: vec![0.0; GATES * HIDDEN_SIZE],
            bias: vec![0.0; GATES],
            w_out: vec![0.0; CLASSES * HIDDEN_SIZE],
            b_out: vec![0.0; CLASSES],
        }
    }

    /// Fresh, untrained parameters. Every value is drawn uniformly from
    /// `[-1/sqrt(H), 1/sqrt(H)]`.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let bound = 1.0 / (HIDDEN_SIZE as f32).sqrt();
        let dist = Uniform::new_inclusive(-bound, bound);
        let mut params = Self::zeros();
        for tensor in params.tensors_mut() {
            for value in tensor.iter_mut() {
                *value = dist.sample(rng);
            }
        }
        params
    }

    pub fn tensors(&self) -> [&[f32]; 5] {
        [
            &self.w_input[..],
            &self.w_hidden[..],
            &self.bias[..],
            &self.w_out[..],
            &self.b_out[..],
        ]
    }

    pub fn tensors_mut(&mut self) -> [&mut [f32]; 5] {
        [
            &mut self.w_input[..],
            &mut self.w_hidden[..],
            &mut self.bias[..],
            &mut self.w_out[..],
            &mut self.b_out[..],
        ]
    }

    /// Total number of scalar parameters.
    pub fn len(&self) -> usize {
        self.tensors().iter().map(|t| t.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Checks that every tensor has the length this build of the model expects.
    /// Deserialized parameters may come from a different configuration.
    pub fn has_expected_shape(&self) -> bool {
        let expected = Self::zeros();
        self.tensors()
            .iter()
            .zip(expected.tensors().iter())
            .all(|(a, b)| a.len() == b.len())
    }

    pub fn fill_zero(&mut self) {
        for tensor in self.tensors_mut() {
            tensor.fill(0.0);
        }
    }

    pub fn scale(&mut self, factor: f32) {
        for tensor in self.tensors_mut() {
            for value in tensor.iter_mut() {
                *value *= factor;
            }
        }
    }
}

/// Activations of a single time step, kept for backpropagation.
#[derive(Clone)]
struct Step {
    x: [f32; CLASSES],
    h_prev: Hidden,
    c_prev: Hidden,
    input_gate: Hidden,
    forget_gate: Hidden,
    cell_gate: Hidden,
    output_gate: Hidden,
    tanh_c: Hidden,
}

/// Everything the backward pass needs to know about a forward pass.
pub struct Trace {
    steps: Vec<Step>,
    h_last: Hidden,
    pub logits: Logits,
}

/// Runs the model on one encoded window and returns the logits.
pub fn forward(params: &Parameters, encoding: &Encoding) -> Logits {
    forward_traced(params, encoding).logits
}

/// Same as [`forward`], but keeps the activations of every step.
pub fn forward_traced(params: &Parameters, encoding: &Encoding) -> Trace {
    let mut h = [0.0; HIDDEN_SIZE];
    let mut c = [0.0; HIDDEN_SIZE];
    let mut steps = Vec::with_capacity(WINDOW_SIZE);

    for x in encoding.rows() {
        let z = gate_preactivations(params, x, &h);

        let mut step = Step {
            x: *x,
            h_prev: h,
            c_prev: c,
            input_gate: [0.0; HIDDEN_SIZE],
            forget_gate: [0.0; HIDDEN_SIZE],
            cell_gate: [0.0; HIDDEN_SIZE],
            output_gate: [0.0; HIDDEN_SIZE],
            tanh_c: [0.0; HIDDEN_SIZE],
        };

        for j in 0..HIDDEN_SIZE {
            step.input_gate[j] = sigmoid(z[j]);
            step.forget_gate[j] = sigmoid(z[HIDDEN_SIZE + j]);
            step.cell_gate[j] = z[2 * HIDDEN_SIZE + j].tanh();
            step.output_gate[j] = sigmoid(z[3 * HIDDEN_SIZE + j]);

            c[j] = step.forget_gate[j] * c[j] + step.input_gate[j] * step.cell_gate[j];
            step.tanh_c[j] = c[j].tanh();
            h[j] = step.output_gate[j] * step.tanh_c[j];
        }
        steps.push(step);
    }

    let mut logits = [0.0; CLASSES];
    for (k, logit) in logits.iter_mut().enumerate() {
        let row = &params.w_out[k * HIDDEN_SIZE..(k + 1) * HIDDEN_SIZE];
        *logit = params.b_out[k] + dot(row, &h);
    }

    Trace {
        steps,
        h_last: h,
        logits,
    }
}

fn gate_preactivations(params: &Parameters, x: &[f32; CLASSES], h: &Hidden) -> Vec<f32> {
    let mut z = params.bias.clone();
    for (k, zk) in z.iter_mut().enumerate() {
        let w_x = &params.w_input[k * CLASSES..(k + 1) * CLASSES];
        let w_h = &params.w_hidden[k * HIDDEN_SIZE..(k + 1) * HIDDEN_SIZE];
        *zk += dot(w_x, x) + dot(w_h, h);
    }
    z
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Backpropagation through time. Adds the gradients of the loss with respect
/// to every parameter into `grads`, given the gradient of the loss with
/// respect to the logits of `trace`.
pub fn backward(params: &Parameters, trace: &Trace, d_logits: &Logits, grads: &mut Gradients) {
    // Output projection.
    let mut dh = [0.0; HIDDEN_SIZE];
    for (k, &dl) in d_logits.iter().enumerate() {
        grads.b_out[k] += dl;
        for j in 0..HIDDEN_SIZE {
            grads.w_out[k * HIDDEN_SIZE + j] += dl * trace.h_last[j];
            dh[j] += params.w_out[k * HIDDEN_SIZE + j] * dl;
        }
    }

    let mut dc = [0.0; HIDDEN_SIZE];
    let mut dz = vec![0.0; GATES];

    for step in trace.steps.iter().rev() {
        for j in 0..HIDDEN_SIZE {
            let i = step.input_gate[j];
            let f = step.forget_gate[j];
            let g = step.cell_gate[j];
            let o = step.output_gate[j];
            let tanh_c = step.tanh_c[j];

            let d_o = dh[j] * tanh_c;
            dc[j] += dh[j] * o * (1.0 - tanh_c * tanh_c);

            dz[j] = dc[j] * g * i * (1.0 - i);
            dz[HIDDEN_SIZE + j] = dc[j] * step.c_prev[j] * f * (1.0 - f);
            dz[2 * HIDDEN_SIZE + j] = dc[j] * i * (1.0 - g * g);
            dz[3 * HIDDEN_SIZE + j] = d_o * o * (1.0 - o);

            // Carry the cell gradient to the previous step.
            dc[j] *= f;
        }

        let mut dh_prev = [0.0; HIDDEN_SIZE];
        for (k, &dzk) in dz.iter().enumerate() {
            grads.bias[k] += dzk;
            // Most inputs are one-hot, so only touch the non-zero columns.
            for (col, &x) in step.x.iter().enumerate() {
                if x != 0.0 {
                    grads.w_input[k * CLASSES + col] += dzk * x;
                }
            }
            let row = k * HIDDEN_SIZE;
            for j in 0..HIDDEN_SIZE {
                grads.w_hidden[row + j] += dzk * step.h_prev[j];
                dh_prev[j] += params.w_hidden[row + j] * dzk;
            }
        }
        dh = dh_prev;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::math::cross_entropy;
    use crate::ai::repr::encode;
    use crate::Symbol;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn moves(values: &[u8]) -> Vec<Symbol> {
        values.iter().map(|&v| Symbol::new_checked(v).unwrap()).collect()
    }

    #[test]
    fn parameter_count_matches_layer_sizes() {
        let params = Parameters::zeros();
        let expected = 4 * 64 * 9 + 4 * 64 * 64 + 4 * 64 + 9 * 64 + 9;
        assert_eq!(params.len(), expected);
        assert!(params.has_expected_shape());
    }

    #[test]
    fn random_init_is_bounded_and_seedable() {
        let a = Parameters::random(&mut StdRng::seed_from_u64(1));
        let b = Parameters::random(&mut StdRng::seed_from_u64(1));
        let c = Parameters::random(&mut StdRng::seed_from_u64(2));
        assert_eq!(a, b);
        assert_ne!(a, c);
        let bound = 1.0 / 8.0;
        assert!(a.tensors().iter().all(|t| t.iter().all(|v| v.abs() <= bound)));
    }

    #[test]
    fn zero_parameters_give_zero_logits() {
        let logits = forward(&Parameters::zeros(), &encode(&moves(&[1, 2, 3])));
        assert_eq!(logits, [0.0; CLASSES]);
    }

    #[test]
    fn forward_depends_on_order() {
        let params = Parameters::random(&mut StdRng::seed_from_u64(5));
        let a = forward(&params, &encode(&moves(&[1, 2, 3, 4, 5])));
        let b = forward(&params, &encode(&moves(&[5, 4, 3, 2, 1])));
        assert_ne!(a, b);
    }

    /// Compares the analytic gradient against central differences on a few
    /// parameters of every tensor.
    #[test]
    fn backward_matches_finite_differences() {
        let mut params = Parameters::random(&mut StdRng::seed_from_u64(3));
        let encoding = encode(&moves(&[2, 7, 7, 1]));
        let target = 6;

        let trace = forward_traced(&params, &encoding);
        let (_, d_logits) = cross_entropy(&trace.logits, target);
        let mut grads = Gradients::zeros();
        backward(&params, &trace, &d_logits, &mut grads);

        let loss_at = |p: &Parameters| cross_entropy(&forward(p, &encoding), target).0;
        let eps = 1e-2;

        for tensor_index in 0..5 {
            let len = params.tensors()[tensor_index].len();
            for &position in &[0, len / 3, len / 2, len - 1] {
                let original = params.tensors()[tensor_index][position];

                params.tensors_mut()[tensor_index][position] = original + eps;
                let plus = loss_at(&params);
                params.tensors_mut()[tensor_index][position] = original - eps;
                let minus = loss_at(&params);
                params.tensors_mut()[tensor_index][position] = original;

                let numeric = (plus - minus) / (2.0 * eps);
                let analytic = grads.tensors()[tensor_index][position];
                assert!(
                    (numeric - analytic).abs() < 2e-3 + 0.05 * numeric.abs(),
                    "Tensor {} position {}: numeric {} vs analytic {}",
                    tensor_index,
                    position,
                    numeric,
                    analytic
                );
            }
        }
    }
}
