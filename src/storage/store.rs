use std::collections::{HashMap, hash_map::Entry};

use crate::tensor::ParamId;

/// The per-parameter state of an optimizer, keyed by the identity of each parameter.
///
/// Entries are created lazily the first time a parameter is updated and live for as long
/// as the store does, unless the store is cleared.
#[derive(Debug, Clone)]
pub struct StateStore<S> {
    states: HashMap<ParamId, S>,
}

impl<S> Default for StateStore<S> {
    fn default() -> Self {
        Self {
            states: HashMap::new(),
        }
    }
}

impl<S> StateStore<S> {
    /// Creates a new empty `StateStore`.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: ParamId) -> Option<&S> {
        self.states.get(&id)
    }

    /// Returns the state of the parameter, initializing it with `init` if it's absent.
    ///
    /// # Arguments
    /// * `id` - The identity of the parameter.
    /// * `init` - Creates the state on the parameter's first update.
    pub fn get_or_insert_with<F>(&mut self, id: ParamId, init: F) -> &mut S
    where
        F: FnOnce() -> S,
    {
        match self.states.entry(id) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(init()),
        }
    }

    /// Inserts a state, returning the previous one if there was any.
    pub fn insert(&mut self, id: ParamId, state: S) -> Option<S> {
        self.states.insert(id, state)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn clear(&mut self) {
        self.states.clear();
    }
}
