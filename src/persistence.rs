use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::HydrationError;
use crate::storage::{KeyValueStore, StorageError};
use crate::store::RootState;

pub const USER_KEY: &str = "user";
pub const TASKS_KEY: &str = "tasks";
pub const THEME_KEY: &str = "theme";
/// Stored as the bare priority name, not JSON.
pub const DEFAULT_PRIORITY_KEY: &str = "defaultPriority";

/// What a mutation left dirty. The store hands this to [`Persistence::flush`]
/// after the slice has been updated, so slices never touch storage themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOp {
    Session,
    Tasks,
    DefaultPriority,
    Theme,
}

impl PersistOp {
    pub fn key(self) -> &'static str {
        match self {
            PersistOp::Session => USER_KEY,
            PersistOp::Tasks => TASKS_KEY,
            PersistOp::DefaultPriority => DEFAULT_PRIORITY_KEY,
            PersistOp::Theme => THEME_KEY,
        }
    }
}

pub struct Persistence<S> {
    store: S,
}

impl<S: KeyValueStore> Persistence<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn load_raw(&self, key: &str) -> Option<String> {
        self.store.load(key)
    }

    /// Missing keys and values that fail to parse both come back as `None`;
    /// the latter are also removed from storage.
    pub fn read_json<T: DeserializeOwned>(&self, key: &'static str) -> Option<T> {
        let raw = self.store.load(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(source) => {
                self.discard(key, &HydrationError::Malformed { key, source });
                None
            }
        }
    }

    pub fn discard(&self, key: &str, reason: &HydrationError) {
        log::warn!("discarding stored value key={key} reason={reason}");
        self.store.clear(key);
    }

    pub fn write_json<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
    ) -> Result<(), StorageError> {
        let json = serde_json::to_string(value)?;
        self.store.save(key, &json)
    }

    pub fn clear(&self, key: &str) {
        self.store.clear(key);
    }

    /// Writes the slice named by `op` from `state`. A missing session clears its key.
    pub fn flush(&self, op: PersistOp, state: &RootState) -> Result<(), StorageError> {
        let key = op.key();
        match op {
            PersistOp::Session => match state.auth.session() {
                Some(session) => self.write_json(key, session),
                None => {
                    self.clear(key);
                    Ok(())
                }
            },
            PersistOp::Tasks => self.write_json(key, state.tasks.tasks()),
            PersistOp::DefaultPriority => self
                .store
                .save(key, state.tasks.default_priority().as_str()),
            PersistOp::Theme => self.write_json(key, state.theme.preferences()),
        }
    }
}
