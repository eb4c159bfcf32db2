//! # Rpcl Engine
//!
//! Resolution of provider lists. A list either carries its provider table
//! directly or extends a base list, pinned by a version range, with an
//! ordered sequence of JSON Patch style changes. The engine follows the
//! `extends` chain through a [`DocumentLoader`], applies every extension's
//! changes base-first, and validates the table at each hop.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use rpcl_engine::{DocumentLoader, ListDocument, Resolver};
//!
//! # async fn run(loader: Arc<dyn DocumentLoader>, root: ListDocument) -> Result<(), rpcl_engine::ResolveError> {
//! let resolver = Resolver::new(loader);
//! let resolved = resolver.resolve_list(&root).await?;
//! for (key, provider) in resolved.providers_for_chain(1) {
//!     println!("{key}: {}", provider.name);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **`patch`**: the patch engine over `json-patch` (`add`, `remove`, `replace`, `move`, `copy`, `test`)
//! - **`validate`**: provider table validation and schema-checked document preconditions
//! - **`loader`**: the [`DocumentLoader`] seam
//! - **`cache`**: single-flight fetch cache over any loader
//! - **`resolve`**: the [`Resolver`]

pub mod cache;
pub mod error;
pub mod loader;
pub mod patch;
pub mod resolve;
pub mod validate;

pub use rpcl_types::{
    DirectList, ExtendedList, Extends, ListDocument, ListMetadata, Locator, Patch, PatchOp, Provider, ProviderChain, ProviderTable, RangeMode,
    ResolvedList, Version, VersionError, VersionRange, compare, satisfies,
};

pub use cache::CachingLoader;
pub use error::{LoaderError, PatchError, ResolveError, ValidationError, Violation};
pub use loader::{DocumentLoader, FetchedDocument};
pub use resolve::{DEFAULT_MAX_DEPTH, Resolver, ResolverOptions, resolve};
pub use validate::{check_document, collect_table_violations, parse_document, validate_providers, validate_table};
