use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error};

use std::{
    error::Error,
    sync::{Arc, Mutex},
};

use crate::{
    catalog::Catalog,
    controller::{SearchController, SearchTicket, SearchView},
    poster_cache::{GetPosterError, PosterCache},
    types::{DetailRecord, ImdbId, QueryEdit},
    watchlist::{KeyValueStore, LoadWatchlistError, ToggleError, ToggleOutcome, WatchlistStore},
};

#[derive(Debug, Error)]
pub enum DetailsError {
    #[error("failed to load watchlist")]
    LoadWatchlist(#[from] LoadWatchlistError),
}

#[derive(Debug, Error)]
pub enum PosterError {
    #[error("failed to look up poster url")]
    Lookup(#[source] Box<dyn Error + Send + Sync>),
    #[error("failed to fetch poster")]
    Fetch(#[from] GetPosterError),
}

#[derive(Serialize, Debug, Clone, Eq, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DetailState {
    Loaded { record: DetailRecord },
    Unavailable { reason: String },
}

#[derive(Serialize, Debug, Clone, Eq, PartialEq)]
pub struct DetailView {
    pub id: ImdbId,
    pub detail: DetailState,
    pub watchlisted: bool,
}

#[derive(Serialize, Debug, Clone, Eq, PartialEq)]
pub struct ToggleResponse {
    pub id: ImdbId,
    pub outcome: ToggleOutcome,
    pub message: String,
    pub watchlist: Vec<ImdbId>,
}

struct Inner<S> {
    controller: SearchController,
    watchlist: WatchlistStore<S>,
}

type SharedInner<S> = Arc<Mutex<Inner<S>>>;

/// Shared handle to the search state and watchlist. Catalog calls are made
/// without holding the state lock, so concurrent searches race and the
/// controller keeps whichever belongs to the newest query.
pub struct App<C, S> {
    inner: SharedInner<S>,
    catalog: Arc<C>,
    posters: Arc<PosterCache>,
}

impl<C, S> Clone for App<C, S> {
    fn clone(&self) -> Self {
        App {
            inner: Arc::clone(&self.inner),
            catalog: Arc::clone(&self.catalog),
            posters: Arc::clone(&self.posters),
        }
    }
}

impl<C: Catalog, S: KeyValueStore> App<C, S> {
    pub fn new(catalog: C, store: S, posters: PosterCache) -> App<C, S> {
        let inner = Inner {
            controller: SearchController::new(),
            watchlist: WatchlistStore::new(store),
        };

        App {
            inner: Arc::new(Mutex::new(inner)),
            catalog: Arc::new(catalog),
            posters: Arc::new(posters),
        }
    }

    /// Runs the search for the current query. Called once on startup.
    pub fn refresh(&self) -> SearchView {
        let ticket = self.inner.lock().expect("Poisoned lock").controller.mount();
        self.run_search(ticket)
    }

    pub fn edit(&self, edit: QueryEdit) -> SearchView {
        let ticket = self
            .inner
            .lock()
            .expect("Poisoned lock")
            .controller
            .apply(edit);
        self.run_search(ticket)
    }

    pub fn select(&self, id: ImdbId) -> SearchView {
        let mut inner = self.inner.lock().expect("Poisoned lock");
        inner.controller.select(id);
        inner.controller.view()
    }

    pub fn view(&self) -> SearchView {
        self.inner.lock().expect("Poisoned lock").controller.view()
    }

    fn run_search(&self, ticket: SearchTicket) -> SearchView {
        let outcome = self.catalog.search(ticket.query());

        let mut inner = self.inner.lock().expect("Poisoned lock");
        inner.controller.complete(ticket, outcome);
        inner.controller.view()
    }

    /// Details for `id`, or for the current selection when no id is given.
    /// Returns `None` when there is nothing selected.
    pub fn details(&self, id: Option<ImdbId>) -> Result<Option<DetailView>, DetailsError> {
        let id = {
            let mut inner = self.inner.lock().expect("Poisoned lock");
            inner.watchlist.load()?;
            match id.or_else(|| inner.controller.selected_id().cloned()) {
                Some(v) => v,
                None => return Ok(None),
            }
        };

        let detail = match self.catalog.get_by_id(&id) {
            Ok(record) => DetailState::Loaded { record },
            Err(e) => {
                error!("Failed to get details for {id}: {e}");
                DetailState::Unavailable {
                    reason: e.to_string(),
                }
            }
        };

        let watchlisted = self
            .inner
            .lock()
            .expect("Poisoned lock")
            .watchlist
            .contains(&id);

        Ok(Some(DetailView {
            id,
            detail,
            watchlisted,
        }))
    }

    pub fn toggle_watchlist(&self, id: ImdbId) -> Result<ToggleResponse, ToggleError> {
        let mut inner = self.inner.lock().expect("Poisoned lock");
        let outcome = inner.watchlist.toggle(&id)?;

        Ok(ToggleResponse {
            id,
            outcome,
            message: outcome.message().to_string(),
            watchlist: inner.watchlist.ids().to_vec(),
        })
    }

    pub fn watchlist(&self) -> Result<Vec<ImdbId>, LoadWatchlistError> {
        let mut inner = self.inner.lock().expect("Poisoned lock");
        Ok(inner.watchlist.load()?.to_vec())
    }

    pub fn poster(&self, id: &ImdbId) -> Result<Vec<u8>, PosterError> {
        let listed = self
            .inner
            .lock()
            .expect("Poisoned lock")
            .controller
            .results()
            .items
            .iter()
            .find(|item| item.id == *id)
            .map(|item| item.poster.clone());

        let url = match listed {
            Some(v) => v,
            None => {
                debug!("{id} not in current results, looking up poster by id");
                self.catalog
                    .get_by_id(id)
                    .map_err(|e| PosterError::Lookup(Box::new(e)))?
                    .poster
            }
        };

        let url = url.ok_or_else(|| GetPosterError::NoPoster(id.clone()))?;
        Ok(self.posters.get(id, &url)?)
    }
}
