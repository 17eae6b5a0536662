//! Per-player state. A session holds the move history of one player together
//! with that player's optimizer moments.
//!
//! Sessions are stored in an arena and never removed, so a [`SessionHandle`]
//! stays valid for the whole lifetime of the registry. The id index uses the
//! entry API of the concurrent map, which makes creation atomic per id: two
//! requests racing on a new id end up with the same session.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use dashmap::DashMap;

use crate::ai::adam::AdamState;
use crate::Symbol;

/// Stable reference to a session inside a [`SessionRegistry`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SessionHandle(usize);

impl SessionHandle {
    pub fn index(self) -> usize {
        self.0
    }
}

pub struct Session {
    id: String,
    history: Vec<Symbol>,
    optimizer: AdamState,
}

impl Session {
    fn new(id: String) -> Self {
        Session {
            id,
            history: Vec::new(),
            optimizer: AdamState::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn history(&self) -> &[Symbol] {
        &self.history
    }

    pub fn push(&mut self, symbol: Symbol) {
        self.history.push(symbol);
    }

    pub fn optimizer(&self) -> &AdamState {
        &self.optimizer
    }

    /// History and optimizer borrowed at the same time, for a training step.
    pub fn training_parts(&mut self) -> (&[Symbol], &mut AdamState) {
        (&self.history, &mut self.optimizer)
    }
}

#[derive(Default)]
pub struct SessionRegistry {
    index: DashMap<String, SessionHandle>,
    arena: RwLock<Vec<Arc<Mutex<Session>>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the handle for `session_id`, creating an empty session on
    /// first use.
    pub fn get_or_create(&self, session_id: &str) -> SessionHandle {
        if let Some(handle) = self.index.get(session_id) {
            return *handle;
        }
        // The entry holds the shard lock until the session is in the arena.
        *self
            .index
            .entry(session_id.to_owned())
            .or_insert_with(|| {
                let mut arena = self.arena.write().unwrap_or_else(PoisonError::into_inner);
                arena.push(Arc::new(Mutex::new(Session::new(session_id.to_owned()))));
                SessionHandle(arena.len() - 1)
            })
    }

    /// Handle of an existing session.
    pub fn find(&self, session_id: &str) -> Option<SessionHandle> {
        self.index.get(session_id).map(|handle| *handle)
    }

    /// Shared reference to a session. Handles are only created by this
    /// registry and sessions are never removed, so the lookup can't miss.
    pub fn session(&self, handle: SessionHandle) -> Arc<Mutex<Session>> {
        let arena = self.arena.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&arena[handle.0])
    }

    /// Number of sessions created so far.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

/// Locks a session. A panic in another request does not leave the history in
/// a broken state, so a poisoned lock is simply taken over.
pub fn lock(session: &Mutex<Session>) -> MutexGuard<'_, Session> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}
