//! The mind reader itself: answers "what comes next" for a session and learns
//! from the moves the player actually made.
//!
//! All sessions share one parameter set. Learning from one player changes the
//! predictions for every other player as well. This is a known limitation,
//! per-player adaptation would need per-session parameters.
//!
//! Locking: the parameters sit behind a reader/writer lock. Predictions run
//! the forward pass under the read lock, a learn call holds the write lock
//! from encoding until the optimizer step is done. A learn call takes the
//! session lock before the parameter lock, a prediction copies the history
//! and releases the session lock before it reads the parameters.

use std::sync::{Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use rand::rngs::StdRng;
use rand::Rng;

use crate::ai::lstm::{forward, Logits, Parameters};
use crate::ai::math::{argmax, softmax};
use crate::ai::repr::encode;
use crate::ai::training::{LearnOutcome, OnlineTrainer};
use crate::random::{random_move, seeded_rng};
use crate::session::{self, SessionHandle, SessionRegistry};
use crate::{Confidence, Symbol, CLASSES, WINDOW_SIZE};

/// A prediction as it is handed out to the player.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Prediction {
    pub symbol: Symbol,
    pub confidence: Confidence,
}

pub struct MindReader<R = StdRng> {
    model: RwLock<Parameters>,
    sessions: SessionRegistry,
    trainer: OnlineTrainer,
    rng: Mutex<R>,
}

impl MindReader<StdRng> {
    /// Creates a mind reader with a random source seeded from `seed`, or
    /// from the operating system if there is no seed.
    pub fn new(model: Parameters, trainer: OnlineTrainer, seed: Option<u64>) -> Self {
        Self::with_rng(model, trainer, seeded_rng(seed))
    }
}

impl<R: Rng> MindReader<R> {
    pub fn with_rng(model: Parameters, trainer: OnlineTrainer, rng: R) -> Self {
        MindReader {
            model: RwLock::new(model),
            sessions: SessionRegistry::new(),
            trainer,
            rng: Mutex::new(rng),
        }
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn session(&self, session_id: &str) -> SessionHandle {
        self.sessions.get_or_create(session_id)
    }

    /// Predicts the next move of the session.
    pub fn predict(&self, session_id: &str) -> Prediction {
        let handle = self.session(session_id);
        let window = self.window(handle);

        if window.is_empty() {
            return Prediction {
                symbol: self.random_move(),
                confidence: Confidence::Low,
            };
        }

        let candidate = Symbol::from_class(argmax(&self.logits(&window)));
        // The model may confidently pick the padding class. That is not a
        // move, so we guess instead but keep the confidence.
        let symbol = if candidate.is_padding() {
            self.random_move()
        } else {
            candidate
        };
        Prediction {
            symbol,
            confidence: Confidence::High,
        }
    }

    /// Records `symbol` as the latest move of the session and takes one
    /// training step on it if there is enough history.
    pub fn learn(&self, session_id: &str, symbol: Symbol) -> LearnOutcome {
        let handle = self.session(session_id);
        let session = self.sessions.session(handle);
        let mut session = session::lock(&session);
        session.push(symbol);

        let (history, optimizer) = session.training_parts();
        if history.len() < 2 {
            return LearnOutcome::GatheringData;
        }
        let mut model = self.write_model();
        self.trainer.learn(&mut model, optimizer, history)
    }

    /// Raw model output for a history. Mostly useful for diagnostics and for
    /// comparing how the model changes over time.
    pub fn logits(&self, history: &[Symbol]) -> Logits {
        let encoding = encode(history);
        forward(&self.read_model(), &encoding)
    }

    /// Softmax over [`Self::logits`], indexed by class.
    pub fn probabilities(&self, history: &[Symbol]) -> [f32; CLASSES] {
        softmax(&self.logits(history))
    }

    /// Copy of the current parameters, e.g. for persisting them.
    pub fn snapshot(&self) -> Parameters {
        self.read_model().clone()
    }

    /// The trailing window of the session history.
    fn window(&self, handle: SessionHandle) -> Vec<Symbol> {
        let session = self.sessions.session(handle);
        let session = session::lock(&session);
        let history = session.history();
        history[history.len().saturating_sub(WINDOW_SIZE)..].to_vec()
    }

    fn random_move(&self) -> Symbol {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        random_move(&mut *rng)
    }

    fn read_model(&self) -> RwLockReadGuard<'_, Parameters> {
        self.model.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_model(&self) -> RwLockWriteGuard<'_, Parameters> {
        self.model.write().unwrap_or_else(PoisonError::into_inner)
    }
}
