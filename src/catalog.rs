use crate::types::{DetailRecord, ImdbId, ResultPage, SearchQuery};

use std::error::Error;

/// A remote catalog that can be searched and queried by id. Calls block until
/// the catalog answers; there is no retry or caching at this layer.
pub trait Catalog: Send + Sync + 'static {
    type Err: Error + Send + Sync + 'static;
    fn search(&self, query: &SearchQuery) -> Result<ResultPage, Self::Err>;
    fn get_by_id(&self, id: &ImdbId) -> Result<DetailRecord, Self::Err>;
}
