//! The seam between resolution and document retrieval.

use rpcl_types::{ListDocument, Locator, Version, VersionRange};

use crate::error::LoaderError;

/// A list document together with the concrete version the loader picked.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedDocument {
    pub document: ListDocument,
    pub version: Version,
}

impl FetchedDocument {
    /// Wraps a document, taking its version from the document metadata.
    pub fn new(document: ListDocument) -> Self {
        let version = document.version().clone();
        Self { document, version }
    }
}

impl From<ListDocument> for FetchedDocument {
    fn from(document: ListDocument) -> Self {
        Self::new(document)
    }
}

/// Retrieves list documents by locator.
///
/// Implementations must return a document whose version satisfies
/// `required`, or [`LoaderError::NoCompatibleVersion`] when none does. They
/// must not fall back to a different version.
#[async_trait::async_trait]
pub trait DocumentLoader: Send + Sync {
    /// Fetch a base list that satisfies `required`.
    async fn fetch(&self, locator: &Locator, required: &VersionRange) -> Result<FetchedDocument, LoaderError>;

    /// Fetch a top-level list with no version requirement.
    async fn fetch_root(&self, locator: &Locator) -> Result<FetchedDocument, LoaderError>;
}

#[async_trait::async_trait]
impl<L> DocumentLoader for std::sync::Arc<L>
where
    L: DocumentLoader + ?Sized,
{
    async fn fetch(&self, locator: &Locator, required: &VersionRange) -> Result<FetchedDocument, LoaderError> {
        (**self).fetch(locator, required).await
    }

    async fn fetch_root(&self, locator: &Locator) -> Result<FetchedDocument, LoaderError> {
        (**self).fetch_root(locator).await
    }
}
