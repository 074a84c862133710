use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use std::{collections::HashMap, convert::Infallible, error::Error};

use crate::types::ImdbId;

/// Storage slot holding the watchlist as a JSON array of ids.
pub const WATCHLIST_KEY: &str = "watchlistItems";

/// Minimal string key/value persistence. Anything that can hold a few strings
/// across restarts can back the watchlist.
pub trait KeyValueStore: Send + 'static {
    type Err: Error + Send + Sync + 'static;
    fn get(&self, key: &str) -> Result<Option<String>, Self::Err>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), Self::Err>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }
}

impl KeyValueStore for MemoryStore {
    type Err = Infallible;

    fn get(&self, key: &str) -> Result<Option<String>, Infallible> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), Infallible> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum LoadWatchlistError {
    #[error("failed to read watchlist from storage")]
    Read(#[source] Box<dyn Error + Send + Sync>),
    #[error("stored watchlist is not a list of ids")]
    Parse(#[source] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ToggleError {
    #[error("failed to load watchlist before toggling")]
    Load(#[from] LoadWatchlistError),
    #[error("failed to serialize watchlist")]
    Serialize(#[source] serde_json::Error),
    #[error("failed to write watchlist to storage")]
    Write(#[source] Box<dyn Error + Send + Sync>),
}

#[derive(Serialize, Debug, Clone, Copy, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ToggleOutcome {
    Added,
    Removed,
}

impl ToggleOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            ToggleOutcome::Added => "Movie added to watch list.",
            ToggleOutcome::Removed => "Movie removed from watch list.",
        }
    }
}

/// The user's watchlist. Nothing is read from the backing store until the
/// first [`WatchlistStore::load`] or toggle, and every change is written through
/// to the store before it becomes visible here.
#[derive(Debug)]
pub struct WatchlistStore<S> {
    store: S,
    ids: Option<Vec<ImdbId>>,
}

impl<S: KeyValueStore> WatchlistStore<S> {
    pub fn new(store: S) -> WatchlistStore<S> {
        WatchlistStore { store, ids: None }
    }

    /// Reads the persisted list on first call, no-op afterwards.
    pub fn load(&mut self) -> Result<&[ImdbId], LoadWatchlistError> {
        if self.ids.is_none() {
            let ids = read_ids(&self.store)?;
            debug!("Loaded watchlist with {} entries", ids.len());
            self.ids = Some(ids);
        }
        Ok(self.ids())
    }

    #[cfg(test)]
    pub fn is_loaded(&self) -> bool {
        self.ids.is_some()
    }

    pub fn contains(&self, id: &ImdbId) -> bool {
        self.ids().contains(id)
    }

    /// Ids in the order they were added. Empty until loaded.
    pub fn ids(&self) -> &[ImdbId] {
        self.ids.as_deref().unwrap_or_default()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.ids().len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.ids().is_empty()
    }

    pub fn toggle(&mut self, id: &ImdbId) -> Result<ToggleOutcome, ToggleError> {
        let current = self.load()?;

        let (outcome, ids) = if current.contains(id) {
            let ids = current.iter().filter(|v| *v != id).cloned().collect();
            (ToggleOutcome::Removed, ids)
        } else {
            let mut ids = current.to_vec();
            ids.push(id.clone());
            (ToggleOutcome::Added, ids)
        };

        let serialized = serde_json::to_string(&ids).map_err(ToggleError::Serialize)?;
        self.store
            .set(WATCHLIST_KEY, &serialized)
            .map_err(|e| ToggleError::Write(Box::new(e)))?;
        self.ids = Some(ids);

        info!("{id}: {}", outcome.message());
        Ok(outcome)
    }

    #[cfg(test)]
    pub fn into_store(self) -> S {
        self.store
    }
}

fn read_ids<S: KeyValueStore>(store: &S) -> Result<Vec<ImdbId>, LoadWatchlistError> {
    let stored = store
        .get(WATCHLIST_KEY)
        .map_err(|e| LoadWatchlistError::Read(Box::new(e)))?;

    let stored = match stored {
        Some(v) => v,
        None => return Ok(Vec::new()),
    };

    let stored: Vec<ImdbId> = serde_json::from_str(&stored).map_err(LoadWatchlistError::Parse)?;

    let mut ids = Vec::with_capacity(stored.len());
    for id in stored {
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    Ok(ids)
}
