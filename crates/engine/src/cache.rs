//! Fetch cache with at-most-once fetching per request.
//!
//! Each request identity owns a [`OnceCell`]. Concurrent callers for the same
//! key await the same initialization, so the wrapped loader sees a single
//! in-flight fetch. A failed fetch leaves the cell empty and the next caller
//! tries again. The map lock is held only to look up or insert a cell.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use rpcl_types::{Locator, VersionRange};
use tokio::sync::OnceCell;
use tracing::debug;

use crate::{
    error::LoaderError,
    loader::{DocumentLoader, FetchedDocument},
};

type CacheKey = (Locator, Option<VersionRange>);

/// Memoizing wrapper around any [`DocumentLoader`].
pub struct CachingLoader<L> {
    inner: L,
    cells: Mutex<HashMap<CacheKey, Arc<OnceCell<FetchedDocument>>>>,
}

impl<L> CachingLoader<L> {
    pub fn new(inner: L) -> Self {
        Self {
            inner,
            cells: Mutex::new(HashMap::new()),
        }
    }

    pub fn inner(&self) -> &L {
        &self.inner
    }

    /// Number of requests with a completed fetch.
    pub fn cached_len(&self) -> usize {
        let cells = self.cells.lock().unwrap_or_else(PoisonError::into_inner);
        cells.values().filter(|cell| cell.initialized()).count()
    }

    /// Drops every cached document.
    pub fn clear(&self) {
        self.cells.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    fn cell(&self, key: &CacheKey) -> Arc<OnceCell<FetchedDocument>> {
        let mut cells = self.cells.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(cells.entry(key.clone()).or_default())
    }
}

#[async_trait::async_trait]
impl<L> DocumentLoader for CachingLoader<L>
where
    L: DocumentLoader,
{
    async fn fetch(&self, locator: &Locator, required: &VersionRange) -> Result<FetchedDocument, LoaderError> {
        let cell = self.cell(&(locator.clone(), Some(required.clone())));
        if cell.initialized() {
            debug!(%locator, %required, "list cache hit");
        }
        cell.get_or_try_init(|| self.inner.fetch(locator, required)).await.cloned()
    }

    async fn fetch_root(&self, locator: &Locator) -> Result<FetchedDocument, LoaderError> {
        let cell = self.cell(&(locator.clone(), None));
        if cell.initialized() {
            debug!(%locator, "list cache hit");
        }
        cell.get_or_try_init(|| self.inner.fetch_root(locator)).await.cloned()
    }
}
