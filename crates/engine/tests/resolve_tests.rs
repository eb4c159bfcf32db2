use std::{collections::HashMap, sync::Arc, time::Duration};

use rpcl_engine::{
    DocumentLoader, FetchedDocument, ListDocument, LoaderError, Locator, PatchError, ResolveError, Resolver, ResolverOptions, VersionRange,
    satisfies,
};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

/// In-memory loader keyed by locator. With `honest` unset it ignores the
/// requested range, which lets tests exercise the resolver's own check.
struct FixtureLoader {
    lists: HashMap<Locator, ListDocument>,
    honest: bool,
}

impl FixtureLoader {
    fn new<S: Into<String>>(lists: impl IntoIterator<Item = (S, Value)>) -> Self {
        let lists = lists
            .into_iter()
            .map(|(uri, value)| (Locator::uri(uri), ListDocument::from_value(value).expect("fixture list")))
            .collect();
        Self { lists, honest: true }
    }

    fn empty() -> Self {
        Self::new(Vec::<(String, Value)>::new())
    }

    fn dishonest(mut self) -> Self {
        self.honest = false;
        self
    }

    fn into_resolver(self) -> Resolver {
        Resolver::new(Arc::new(self))
    }
}

#[async_trait::async_trait]
impl DocumentLoader for FixtureLoader {
    async fn fetch(&self, locator: &Locator, required: &VersionRange) -> Result<FetchedDocument, LoaderError> {
        let document = self.lists.get(locator).cloned().ok_or_else(|| LoaderError::NotFound { locator: locator.clone() })?;
        if self.honest && !satisfies(document.version(), required) {
            return Err(LoaderError::NoCompatibleVersion {
                locator: locator.clone(),
                required: required.clone(),
            });
        }
        Ok(FetchedDocument::new(document))
    }

    async fn fetch_root(&self, locator: &Locator) -> Result<FetchedDocument, LoaderError> {
        self.lists
            .get(locator)
            .cloned()
            .map(FetchedDocument::new)
            .ok_or_else(|| LoaderError::NotFound { locator: locator.clone() })
    }
}

/// Never answers; used to park a resolution on a fetch.
struct StalledLoader;

#[async_trait::async_trait]
impl DocumentLoader for StalledLoader {
    async fn fetch(&self, _locator: &Locator, _required: &VersionRange) -> Result<FetchedDocument, LoaderError> {
        std::future::pending().await
    }

    async fn fetch_root(&self, _locator: &Locator) -> Result<FetchedDocument, LoaderError> {
        std::future::pending().await
    }
}

fn fixture(source: &str) -> Value {
    serde_json::from_str(source).expect("fixture json")
}

fn direct(name: &str, major: u64, providers: Value) -> Value {
    json!({
        "name": name,
        "version": {"major": major, "minor": 0, "patch": 0},
        "timestamp": "2024-08-08T00:00:00Z",
        "providers": providers
    })
}

fn extension(name: &str, base: &str, required: Value, changes: Value) -> Value {
    json!({
        "name": name,
        "version": {"major": 1, "minor": 0, "patch": 0},
        "timestamp": "2024-08-08T00:00:00Z",
        "extends": {"uri": base, "version": required},
        "changes": changes
    })
}

fn provider(name: &str, endpoint: &str) -> Value {
    json!({"name": name, "chains": [{"chainId": 1, "endpoints": [endpoint]}]})
}

fn caret(major: u64) -> Value {
    json!({"major": major, "minor": 0, "patch": 0})
}

fn document(value: Value) -> ListDocument {
    ListDocument::from_value(value).expect("valid list document")
}

#[tokio::test]
async fn extension_adds_providers_to_empty_root() {
    let resolver = FixtureLoader::new([
        ("file://one", fixture(include_str!("data/root_list.json"))),
        ("file://two", fixture(include_str!("data/extension_list.json"))),
    ])
    .into_resolver();

    let list = resolver.resolve_locator(&Locator::uri("file://two"), None).await.expect("resolves");
    assert_eq!(list.name, "Extension List");
    assert_eq!(list.logo.as_deref(), Some("https://mylist2.invalid/logo.png"));
    assert_eq!(list.timestamp, "2024-08-08T00:00:00.0Z");
    assert_eq!((list.version.major, list.version.minor, list.version.patch), (10, 1, 0));
    assert_eq!(list.version.build(), Some("wWw"));

    let keys: Vec<_> = list.providers.keys().map(String::as_str).collect();
    assert_eq!(keys, ["some-key", "other-key"]);
    let frustrata = &list.providers["some-key"];
    assert_eq!(frustrata.name, "Frustrata");
    assert_eq!(frustrata.priority, None);
    assert_eq!(
        frustrata.chains[0].endpoints,
        ["https://mainnet1.frustrata.invalid/", "https://mainnet2.frustrana.invalid/"]
    );
    assert_eq!(list.providers["other-key"].priority, Some(3));

    let mainnet: Vec<_> = list.providers_for_chain(1).into_iter().map(|(key, _)| key).collect();
    assert_eq!(mainnet, ["other-key", "some-key"]);
    assert_eq!(list.providers_for_chain(42).len(), 1);
}

#[tokio::test]
async fn changes_apply_base_first_across_hops() {
    let resolver = FixtureLoader::new([
        ("https://a.invalid", direct("A", 1, json!({"a": provider("A", "https://a.invalid/rpc")}))),
        (
            "https://b.invalid",
            extension(
                "B",
                "https://a.invalid",
                caret(1),
                json!([{"op": "add", "path": "/b", "value": provider("B", "https://b.invalid/rpc")}]),
            ),
        ),
    ])
    .into_resolver();

    let root = document(extension(
        "C",
        "https://b.invalid",
        caret(1),
        json!([
            {"op": "test", "path": "/b/name", "value": "B"},
            {"op": "replace", "path": "/a/name", "value": "Renamed"},
            {"op": "remove", "path": "/b"}
        ]),
    ));
    let table = resolver.resolve(&root).await.expect("resolves");
    assert_eq!(table.len(), 1);
    assert_eq!(table["a"].name, "Renamed");
}

#[tokio::test]
async fn cyclic_extends_is_rejected() {
    let resolver = FixtureLoader::new([
        ("https://c.invalid", extension("C", "https://b.invalid", caret(1), json!([]))),
        ("https://b.invalid", extension("B", "https://c.invalid", caret(1), json!([]))),
    ])
    .into_resolver();

    let error = resolver.resolve_locator(&Locator::uri("https://c.invalid"), None).await.expect_err("cycle");
    match error {
        ResolveError::CyclicExtends { locator, chain } => {
            assert_eq!(locator, Locator::uri("https://c.invalid"));
            assert_eq!(chain.first(), Some(&Locator::uri("https://c.invalid")));
            assert_eq!(chain.last(), Some(&Locator::uri("https://c.invalid")));
        }
        other => panic!("expected CyclicExtends, got {other}"),
    }
}

#[tokio::test]
async fn self_extension_is_a_cycle_even_without_a_root_locator() {
    let resolver = FixtureLoader::new([("https://self.invalid", extension("Self", "https://self.invalid", caret(1), json!([])))]).into_resolver();
    let root = document(extension("Root", "https://self.invalid", caret(1), json!([])));
    let error = resolver.resolve(&root).await.expect_err("cycle");
    assert!(matches!(error, ResolveError::CyclicExtends { .. }), "got {error}");
}

#[tokio::test]
async fn extends_chain_depth_is_bounded() {
    let chain_length = 12;
    let mut lists = Vec::new();
    let uris: Vec<String> = (0..=chain_length).map(|hop| format!("https://hop{hop}.invalid")).collect();
    for hop in 0..chain_length {
        lists.push((uris[hop].clone(), extension("Hop", &uris[hop + 1], caret(1), json!([]))));
    }
    lists.push((uris[chain_length].clone(), direct("Base", 1, json!({}))));
    let loader = Arc::new(FixtureLoader::new(lists));

    let root = document(extension("Root", &uris[0], caret(1), json!([])));
    let error = Resolver::new(loader.clone()).resolve(&root).await.expect_err("too deep");
    assert!(matches!(error, ResolveError::DepthExceeded { limit: 10 }), "got {error}");

    let deep_enough = Resolver::with_options(loader, ResolverOptions { max_depth: chain_length + 1 });
    assert!(deep_enough.resolve(&root).await.expect("within bound").is_empty());
}

#[tokio::test]
async fn duplicate_endpoint_in_direct_list_is_a_structural_violation() {
    let resolver = FixtureLoader::empty().into_resolver();
    let root = document(direct(
        "Dupes",
        1,
        json!({"a": {"name": "A", "chains": [{"chainId": 1, "endpoints": ["https://x.invalid", "https://x.invalid"]}]}}),
    ));
    let error = resolver.resolve(&root).await.expect_err("duplicate");
    let ResolveError::StructuralViolation(validation) = error else {
        panic!("expected StructuralViolation, got {error}");
    };
    assert!(validation.has_rule("endpoint_duplicate"));
    assert!(validation.violations[0].message.contains("https://x.invalid"));
}

#[tokio::test]
async fn changes_that_break_the_table_are_violations() {
    let resolver = FixtureLoader::new([("https://a.invalid", direct("A", 1, json!({"a": provider("A", "https://a.invalid/rpc")})))]).into_resolver();
    let root = document(extension(
        "Broken",
        "https://a.invalid",
        caret(1),
        json!([
            {"op": "replace", "path": "/a/chains/0/endpoints", "value": []},
            {"op": "add", "path": "/a/priority", "value": -1}
        ]),
    ));
    let ResolveError::StructuralViolation(validation) = resolver.resolve(&root).await.expect_err("invalid") else {
        panic!("expected StructuralViolation");
    };
    let rules: Vec<_> = validation.violations.iter().map(|violation| violation.rule).collect();
    assert_eq!(rules, ["provider_priority", "endpoints_empty"]);
}

#[tokio::test]
async fn failed_test_op_aborts_resolution() {
    let resolver = FixtureLoader::new([("https://a.invalid", direct("A", 1, json!({"a": provider("A", "https://a.invalid/rpc")})))]).into_resolver();
    let root = document(extension(
        "Guarded",
        "https://a.invalid",
        caret(1),
        json!([{"op": "test", "path": "/a/name", "value": "Someone else"}]),
    ));
    match resolver.resolve(&root).await.expect_err("test fails") {
        ResolveError::Patch { list, source } => {
            assert_eq!(list, "Guarded");
            assert!(matches!(source, PatchError::TestFailed { index: 0, .. }));
        }
        other => panic!("expected Patch, got {other}"),
    }
}

#[tokio::test]
async fn incompatible_base_surfaces_from_loader() {
    let resolver = FixtureLoader::new([("https://a.invalid", direct("A", 1, json!({})))]).into_resolver();
    let root = document(extension("Wants Two", "https://a.invalid", caret(2), json!([])));
    let error = resolver.resolve(&root).await.expect_err("incompatible");
    assert!(matches!(error, ResolveError::NoCompatibleVersion { .. }), "got {error}");
}

#[tokio::test]
async fn resolver_rechecks_loader_version() {
    let resolver = FixtureLoader::new([("https://a.invalid", direct("A", 1, json!({})))]).dishonest().into_resolver();
    let root = document(extension("Wants Two", "https://a.invalid", caret(2), json!([])));
    match resolver.resolve(&root).await.expect_err("contract broken") {
        ResolveError::NoCompatibleVersion { locator, required } => {
            assert_eq!(locator, Locator::uri("https://a.invalid"));
            assert_eq!(required, VersionRange::caret(2, 0, 0));
        }
        other => panic!("expected NoCompatibleVersion, got {other}"),
    }
}

#[tokio::test]
async fn root_locator_honours_required_range() {
    let resolver = FixtureLoader::new([("https://a.invalid", direct("A", 1, json!({"a": provider("A", "https://a.invalid/rpc")})))]).into_resolver();
    let root = Locator::uri("https://a.invalid");

    let list = resolver
        .resolve_locator(&root, Some(&VersionRange::caret(1, 0, 0)))
        .await
        .expect("1.0.0 satisfies ^1.0.0");
    assert_eq!(list.name, "A");
    assert_eq!(list.providers.len(), 1);

    match resolver.resolve_locator(&root, Some(&VersionRange::caret(2, 0, 0))).await.expect_err("needs 2.x") {
        ResolveError::NoCompatibleVersion { locator, required } => {
            assert_eq!(locator, root);
            assert_eq!(required, VersionRange::caret(2, 0, 0));
        }
        other => panic!("expected NoCompatibleVersion, got {other}"),
    }
}

#[tokio::test]
async fn root_range_is_rechecked_when_loader_ignores_it() {
    let resolver = FixtureLoader::new([("https://a.invalid", direct("A", 1, json!({})))]).dishonest().into_resolver();
    let error = resolver
        .resolve_locator(&Locator::uri("https://a.invalid"), Some(&VersionRange::exact(1, 0, 1)))
        .await
        .expect_err("1.0.0 is not =1.0.1");
    assert!(matches!(error, ResolveError::NoCompatibleVersion { .. }), "got {error}");
}

#[tokio::test]
async fn missing_base_propagates_loader_error() {
    let resolver = FixtureLoader::empty().into_resolver();
    let root = document(extension("Orphan", "https://gone.invalid", caret(1), json!([])));
    let error = resolver.resolve(&root).await.expect_err("missing");
    assert!(matches!(error, ResolveError::Loader(LoaderError::NotFound { .. })), "got {error}");
}

#[tokio::test]
async fn cancellation_interrupts_a_pending_fetch() {
    let resolver = Resolver::new(Arc::new(StalledLoader));
    let root = document(extension("Waiting", "https://slow.invalid", caret(1), json!([])));
    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        canceller.cancel();
    });
    let error = resolver.resolve_cancellable(&root, &token).await.expect_err("cancelled");
    assert!(matches!(error, ResolveError::Cancelled));
}

#[tokio::test]
async fn resolve_many_keeps_input_order() {
    let resolver = FixtureLoader::new([("https://a.invalid", direct("A", 1, json!({"a": provider("A", "https://a.invalid/rpc")})))]).into_resolver();
    let roots = [
        document(extension("First", "https://a.invalid", caret(1), json!([]))),
        document(extension("Second", "https://missing.invalid", caret(1), json!([]))),
        document(direct("Third", 3, json!({}))),
    ];
    let results = resolver.resolve_many(&roots).await;
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].as_ref().expect("first").name, "First");
    assert!(results[1].is_err());
    assert_eq!(results[2].as_ref().expect("third").name, "Third");
}
