//! In-memory catalog of versioned list documents.

use std::collections::HashMap;

use rpcl_engine::{DocumentLoader, FetchedDocument, ListDocument, LoaderError, Locator, VersionRange, compare, satisfies};
use tracing::debug;

/// Serves documents registered up front. Several versions may be registered
/// under one locator; requests get the highest version the range allows.
#[derive(Debug, Clone, Default)]
pub struct StaticLoader {
    catalog: HashMap<Locator, Vec<ListDocument>>,
}

impl StaticLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, locator: Locator, document: ListDocument) {
        self.catalog.entry(locator).or_default().push(document);
    }

    pub fn with_document(mut self, locator: Locator, document: ListDocument) -> Self {
        self.insert(locator, document);
        self
    }

    pub fn len(&self) -> usize {
        self.catalog.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.catalog.is_empty()
    }

    fn versions(&self, locator: &Locator) -> Result<&[ListDocument], LoaderError> {
        self.catalog
            .get(locator)
            .map(Vec::as_slice)
            .ok_or_else(|| LoaderError::NotFound { locator: locator.clone() })
    }
}

#[async_trait::async_trait]
impl DocumentLoader for StaticLoader {
    async fn fetch(&self, locator: &Locator, required: &VersionRange) -> Result<FetchedDocument, LoaderError> {
        let best = self
            .versions(locator)?
            .iter()
            .filter(|document| satisfies(document.version(), required))
            .max_by(|left, right| compare(left.version(), right.version()))
            .ok_or_else(|| LoaderError::NoCompatibleVersion {
                locator: locator.clone(),
                required: required.clone(),
            })?;
        debug!(%locator, %required, version = %best.version(), "selected catalog version");
        Ok(FetchedDocument::new(best.clone()))
    }

    async fn fetch_root(&self, locator: &Locator) -> Result<FetchedDocument, LoaderError> {
        let newest = self
            .versions(locator)?
            .iter()
            .max_by(|left, right| compare(left.version(), right.version()))
            .ok_or_else(|| LoaderError::NotFound { locator: locator.clone() })?;
        Ok(FetchedDocument::new(newest.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn list(version: serde_json::Value) -> ListDocument {
        ListDocument::from_value(json!({
            "name": "Base",
            "version": version,
            "timestamp": "2024-08-08T00:00:00Z",
            "providers": {}
        }))
        .expect("valid list")
    }

    fn catalog() -> StaticLoader {
        let locator = Locator::uri("https://base.invalid");
        StaticLoader::new()
            .with_document(locator.clone(), list(json!({"major": 1, "minor": 2, "patch": 0})))
            .with_document(locator.clone(), list(json!({"major": 1, "minor": 9, "patch": 3})))
            .with_document(locator.clone(), list(json!({"major": 2, "minor": 0, "patch": 0, "preRelease": "rc.1"})))
            .with_document(locator, list(json!({"major": 0, "minor": 3, "patch": 1})))
    }

    #[tokio::test]
    async fn picks_highest_satisfying_version() {
        let loader = catalog();
        let locator = Locator::uri("https://base.invalid");
        let fetched = loader.fetch(&locator, &VersionRange::caret(1, 0, 0)).await.expect("match");
        assert_eq!(fetched.version.to_string(), "1.9.3");

        let fetched = loader.fetch(&locator, &VersionRange::caret(0, 3, 0)).await.expect("match");
        assert_eq!(fetched.version.to_string(), "0.3.1");

        let pre = VersionRange::exact_pre_release(2, 0, 0, "rc.1").expect("range");
        assert_eq!(loader.fetch(&locator, &pre).await.expect("match").version.to_string(), "2.0.0-rc.1");
        assert_eq!(loader.len(), 4);
    }

    #[tokio::test]
    async fn never_falls_back_to_a_different_major() {
        let loader = catalog();
        let error = loader
            .fetch(&Locator::uri("https://base.invalid"), &VersionRange::caret(3, 0, 0))
            .await
            .expect_err("no 3.x");
        assert!(matches!(error, LoaderError::NoCompatibleVersion { .. }));

        let missing = loader.fetch(&Locator::uri("https://other.invalid"), &VersionRange::caret(1, 0, 0)).await;
        assert!(matches!(missing, Err(LoaderError::NotFound { .. })));
    }

    #[tokio::test]
    async fn root_fetch_returns_newest() {
        let fetched = catalog().fetch_root(&Locator::uri("https://base.invalid")).await.expect("root");
        assert_eq!(fetched.version.to_string(), "2.0.0-rc.1");
    }
}
