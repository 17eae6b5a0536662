//! Adam optimizer with bias correction. The moment estimates live outside of
//! the parameters so several owners (one per session) can drive the same
//! parameter set with their own history.

use serde::{Deserialize, Serialize};

use super::lstm::{Gradients, Parameters};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AdamConfig {
    pub learning_rate: f32,
    pub beta1: f32,
    pub beta2: f32,
    pub epsilon: f32,
}

impl Default for AdamConfig {
    fn default() -> Self {
        Self {
            // High on purpose, a single observed move should visibly move the model.
            learning_rate: 0.01,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
        }
    }
}

impl AdamConfig {
    pub fn with_learning_rate(learning_rate: f32) -> Self {
        Self {
            learning_rate,
            ..Self::default()
        }
    }
}

/// First and second moment estimates for every parameter.
#[derive(Clone, Debug)]
pub struct AdamState {
    m: Parameters,
    v: Parameters,
    steps: u32,
}

impl Default for AdamState {
    fn default() -> Self {
        Self::new()
    }
}

impl AdamState {
    pub fn new() -> Self {
        AdamState {
            m: Parameters::zeros(),
            v: Parameters::zeros(),
            steps: 0,
        }
    }

    /// Number of steps taken since creation or the last reset.
    pub fn steps(&self) -> u32 {
        self.steps
    }

    /// Forget all moment estimates, as if the optimizer was just created.
    pub fn reset(&mut self) {
        self.m.fill_zero();
        self.v.fill_zero();
        self.steps = 0;
    }

    /// Applies one update to `params` and clears `grads` afterwards, so the
    /// next step starts without accumulated gradients.
    pub fn step(&mut self, params: &mut Parameters, grads: &mut Gradients, config: &AdamConfig) {
        self.steps += 1;
        let b1c = 1.0 - config.beta1.powi(self.steps as i32);
        let b2c = 1.0 - config.beta2.powi(self.steps as i32);

        let moments = self.m.tensors_mut().into_iter().zip(self.v.tensors_mut());
        let values = params.tensors_mut().into_iter().zip(grads.tensors_mut());

        for ((p, g), (m, v)) in values.zip(moments) {
            for j in 0..p.len() {
                let grad = g[j];
                m[j] = config.beta1 * m[j] + (1.0 - config.beta1) * grad;
                v[j] = config.beta2 * v[j] + (1.0 - config.beta2) * grad * grad;
                let m_hat = m[j] / b1c;
                let v_hat = v[j] / b2c;
                p[j] -= config.learning_rate * m_hat / (v_hat.sqrt() + config.epsilon);
                g[j] = 0.0;
            }
        }
    }
}
