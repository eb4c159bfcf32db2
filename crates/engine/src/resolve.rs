//! # Resolver
//!
//! Turns a list document into its final provider table by walking the
//! `extends` chain back to a list that carries its providers directly, then
//! replaying each extension's changes on the way back out. Base-most lists
//! resolve first; every hop is validated before it becomes the base of the
//! next one.
//!
//! The loader is the only suspension point. Nothing is locked across a fetch
//! and dropping the future at any fetch abandons the work in progress.

use std::sync::Arc;

use futures_util::future::{BoxFuture, FutureExt, join_all};
use rpcl_types::{ListDocument, Locator, ProviderTable, ResolvedList, VersionRange, satisfies};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    error::ResolveError,
    loader::{DocumentLoader, FetchedDocument},
    patch,
    validate::{validate_providers, validate_table},
};

/// Maximum number of `extends` hops followed from a root document.
pub const DEFAULT_MAX_DEPTH: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverOptions {
    pub max_depth: usize,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Resolves list documents against a shared loader.
#[derive(Clone)]
pub struct Resolver {
    loader: Arc<dyn DocumentLoader>,
    options: ResolverOptions,
}

impl Resolver {
    pub fn new(loader: Arc<dyn DocumentLoader>) -> Self {
        Self::with_options(loader, ResolverOptions::default())
    }

    pub fn with_options(loader: Arc<dyn DocumentLoader>, options: ResolverOptions) -> Self {
        Self { loader, options }
    }

    /// Resolves `document` to its provider table.
    pub async fn resolve(&self, document: &ListDocument) -> Result<ProviderTable, ResolveError> {
        resolve(document, self.loader.as_ref(), self.options.max_depth, &[]).await
    }

    /// Resolves `document` and pairs the table with the document's metadata.
    pub async fn resolve_list(&self, document: &ListDocument) -> Result<ResolvedList, ResolveError> {
        self.resolve_with_visited(document, Vec::new()).await
    }

    /// Fetches the root list through the loader, then resolves it.
    ///
    /// With `required` the root must satisfy that range like any base list;
    /// without it the loader picks the root on its own terms.
    pub async fn resolve_locator(&self, locator: &Locator, required: Option<&VersionRange>) -> Result<ResolvedList, ResolveError> {
        let fetched = match required {
            Some(required) => fetch_checked(self.loader.as_ref(), locator, required).await?,
            None => self.loader.fetch_root(locator).await?,
        };
        debug!(%locator, version = %fetched.version, "fetched root list");
        self.resolve_with_visited(&fetched.document, vec![locator.clone()]).await
    }

    /// Like [`Resolver::resolve_list`], but gives up with
    /// [`ResolveError::Cancelled`] as soon as `token` is cancelled.
    pub async fn resolve_cancellable(&self, document: &ListDocument, token: &CancellationToken) -> Result<ResolvedList, ResolveError> {
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                warn!(list = document.name(), "resolution cancelled");
                Err(ResolveError::Cancelled)
            }
            result = self.resolve_list(document) => result,
        }
    }

    /// Resolves independent roots concurrently. Results keep input order.
    pub async fn resolve_many(&self, documents: &[ListDocument]) -> Vec<Result<ResolvedList, ResolveError>> {
        join_all(documents.iter().map(|document| self.resolve_list(document))).await
    }

    async fn resolve_with_visited(&self, document: &ListDocument, visited: Vec<Locator>) -> Result<ResolvedList, ResolveError> {
        match resolve_hop(document, self.loader.as_ref(), self.options.max_depth, 0, visited).await {
            Ok(providers) => {
                info!(list = document.name(), providers = providers.len(), "resolved provider list");
                Ok(ResolvedList::new(document.metadata().clone(), providers))
            }
            Err(error) => {
                warn!(list = document.name(), %error, "provider list resolution failed");
                Err(error)
            }
        }
    }
}

/// Resolves `document` through `loader`, following at most `max_depth`
/// `extends` hops. `visited` holds locators already on the chain, such as
/// the locator the root itself was fetched from.
pub async fn resolve(document: &ListDocument, loader: &dyn DocumentLoader, max_depth: usize, visited: &[Locator]) -> Result<ProviderTable, ResolveError> {
    resolve_hop(document, loader, max_depth, 0, visited.to_vec()).await
}

fn resolve_hop<'a>(
    document: &'a ListDocument,
    loader: &'a dyn DocumentLoader,
    max_depth: usize,
    depth: usize,
    mut visited: Vec<Locator>,
) -> BoxFuture<'a, Result<ProviderTable, ResolveError>> {
    async move {
        let list = match document {
            ListDocument::Direct(list) => {
                validate_providers(&list.providers)?;
                debug!(list = %list.metadata.name, depth, "reached direct list");
                return Ok(list.providers.clone());
            }
            ListDocument::Extended(list) => list,
        };

        let locator = &list.extends.locator;
        if visited.contains(locator) {
            let mut chain = visited;
            chain.push(locator.clone());
            return Err(ResolveError::CyclicExtends {
                locator: locator.clone(),
                chain,
            });
        }
        if depth >= max_depth {
            return Err(ResolveError::DepthExceeded { limit: max_depth });
        }

        debug!(list = %list.metadata.name, %locator, required = %list.extends.version, depth, "fetching base list");
        let base = fetch_checked(loader, locator, &list.extends.version).await?;
        visited.push(locator.clone());
        let base_table = resolve_hop(&base.document, loader, max_depth, depth + 1, visited).await?;

        let patched = patch::apply_owned(serde_json::to_value(&base_table)?, &list.changes).map_err(|source| ResolveError::Patch {
            list: list.metadata.name.clone(),
            source,
        })?;
        let table = validate_table(patched)?;
        debug!(list = %list.metadata.name, changes = list.changes.len(), depth, "applied changes");
        Ok(table)
    }
    .boxed()
}

async fn fetch_checked(loader: &dyn DocumentLoader, locator: &Locator, required: &VersionRange) -> Result<FetchedDocument, ResolveError> {
    let fetched = loader.fetch(locator, required).await?;
    if !satisfies(&fetched.version, required) || !satisfies(fetched.document.version(), required) {
        warn!(%locator, %required, version = %fetched.version, "loader returned an incompatible version");
        return Err(ResolveError::NoCompatibleVersion {
            locator: locator.clone(),
            required: required.clone(),
        });
    }
    Ok(fetched)
}
