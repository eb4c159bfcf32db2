//! Shared data model for provider lists.
//!
//! Provider lists are versioned documents describing JSON-RPC endpoints
//! grouped by chain id. A list either carries its providers directly or
//! extends a base list with an ordered patch. This crate holds the types and
//! the version ordering rules; resolution lives in `rpcl-engine`.

pub mod document;
pub mod patch;
pub mod version;

pub use document::{DirectList, ExtendedList, Extends, ListDocument, ListMetadata, Locator, Provider, ProviderChain, ProviderTable, ResolvedList};
pub use patch::{Patch, PatchOp, op_name, op_path};
pub use version::{RangeMode, Version, VersionError, VersionRange, compare, satisfies};
