//! List documents, providers, and locators.
//!
//! A [`ListDocument`] is either a [`DirectList`] that carries a provider table
//! or an [`ExtendedList`] that patches a base list found through its
//! `extends` locator. The two shapes are mutually exclusive on the wire; the
//! deserializer rejects documents that mix or omit them.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, de::Error as _};
use serde_json::Value;

use crate::{
    patch::Patch,
    version::{Version, VersionRange},
};

/// Provider key to provider, in document order.
pub type ProviderTable = IndexMap<String, Provider>;

/// Address of a list document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locator {
    /// Fetched from a URI, usually over HTTPS.
    Uri(String),
    /// Fetched through an ENS name.
    Ens(String),
}

impl Locator {
    pub fn uri(value: impl Into<String>) -> Self {
        Locator::Uri(value.into())
    }

    pub fn ens(value: impl Into<String>) -> Self {
        Locator::Ens(value.into())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Locator::Uri(_) => "uri",
            Locator::Ens(_) => "ens",
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Locator::Uri(value) | Locator::Ens(value) => value,
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.value())
    }
}

/// Endpoints serving one chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderChain {
    /// Chain identifier, e.g. `1` for Ethereum mainnet.
    #[serde(rename = "chainId")]
    pub chain_id: u64,
    /// JSON-RPC endpoint URIs. Kept as a sequence so duplicates reach validation.
    pub endpoints: Vec<String>,
}

/// An entity serving the JSON-RPC interface for one or more chains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    /// Zero is the highest priority.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u64>,
    pub chains: Vec<ProviderChain>,
}

impl Provider {
    /// Chain entries for `chain_id`, in document order.
    pub fn chain(&self, chain_id: u64) -> impl Iterator<Item = &ProviderChain> {
        self.chains.iter().filter(move |chain| chain.chain_id == chain_id)
    }
}

/// Fields shared by both list shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListMetadata {
    pub name: String,
    pub version: Version,
    /// RFC 3339 date-time.
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
}

/// Reference from an extension list to its base.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Extends {
    #[serde(flatten)]
    pub locator: Locator,
    /// Constraint the base list's own version must satisfy.
    pub version: VersionRange,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ExtendsFields {
    #[serde(default)]
    uri: Option<String>,
    #[serde(default)]
    ens: Option<String>,
    version: VersionRange,
}

impl<'de> Deserialize<'de> for Extends {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let fields = ExtendsFields::deserialize(deserializer)?;
        let locator = match (fields.uri, fields.ens) {
            (Some(uri), None) => Locator::Uri(uri),
            (None, Some(ens)) => Locator::Ens(ens),
            (Some(_), Some(_)) => return Err(D::Error::custom("extends must carry exactly one of 'uri' or 'ens', found both")),
            (None, None) => return Err(D::Error::custom("extends must carry exactly one of 'uri' or 'ens'")),
        };
        Ok(Extends {
            locator,
            version: fields.version,
        })
    }
}

/// A list that carries its provider table directly.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectList {
    #[serde(flatten)]
    pub metadata: ListMetadata,
    pub providers: ProviderTable,
}

/// A list defined as a patch over a base list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtendedList {
    #[serde(flatten)]
    pub metadata: ListMetadata,
    pub extends: Extends,
    pub changes: Patch,
}

/// Either shape of list document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ListDocument {
    Direct(DirectList),
    Extended(ExtendedList),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct DocumentFields {
    name: String,
    version: Version,
    timestamp: String,
    #[serde(default)]
    logo: Option<String>,
    #[serde(default)]
    providers: Option<ProviderTable>,
    #[serde(default)]
    extends: Option<Extends>,
    #[serde(default)]
    changes: Option<Patch>,
}

impl<'de> Deserialize<'de> for ListDocument {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let fields = DocumentFields::deserialize(deserializer)?;
        let metadata = ListMetadata {
            name: fields.name,
            version: fields.version,
            timestamp: fields.timestamp,
            logo: fields.logo,
        };
        match (fields.providers, fields.extends, fields.changes) {
            (Some(providers), None, None) => Ok(ListDocument::Direct(DirectList { metadata, providers })),
            (None, Some(extends), Some(changes)) => Ok(ListDocument::Extended(ExtendedList {
                metadata,
                extends,
                changes,
            })),
            (Some(_), _, _) => Err(D::Error::custom("a list with 'providers' must not carry 'extends' or 'changes'")),
            (None, Some(_), None) => Err(D::Error::custom("a list with 'extends' requires 'changes'")),
            (None, None, Some(_)) => Err(D::Error::custom("a list with 'changes' requires 'extends'")),
            (None, None, None) => Err(D::Error::custom("a list needs either 'providers' or 'extends' with 'changes'")),
        }
    }
}

impl ListDocument {
    pub fn metadata(&self) -> &ListMetadata {
        match self {
            ListDocument::Direct(list) => &list.metadata,
            ListDocument::Extended(list) => &list.metadata,
        }
    }

    pub fn version(&self) -> &Version {
        &self.metadata().version
    }

    pub fn name(&self) -> &str {
        &self.metadata().name
    }

    /// The base locator when this is an extension list.
    pub fn extends(&self) -> Option<&Extends> {
        match self {
            ListDocument::Direct(_) => None,
            ListDocument::Extended(list) => Some(&list.extends),
        }
    }

    /// Parses a document from an already-decoded JSON value.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}

impl From<DirectList> for ListDocument {
    fn from(list: DirectList) -> Self {
        ListDocument::Direct(list)
    }
}

impl From<ExtendedList> for ListDocument {
    fn from(list: ExtendedList) -> Self {
        ListDocument::Extended(list)
    }
}

/// Fully resolved list: the root document's metadata with the final table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedList {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    pub timestamp: String,
    pub version: Version,
    pub providers: ProviderTable,
}

impl ResolvedList {
    pub fn new(metadata: ListMetadata, providers: ProviderTable) -> Self {
        Self {
            name: metadata.name,
            logo: metadata.logo,
            timestamp: metadata.timestamp,
            version: metadata.version,
            providers,
        }
    }

    /// Providers serving `chain_id`, highest priority first. Providers without
    /// a priority sort after every prioritized one; ties keep document order.
    pub fn providers_for_chain(&self, chain_id: u64) -> Vec<(&str, &Provider)> {
        let mut matches: Vec<(&str, &Provider)> = self
            .providers
            .iter()
            .filter(|(_, provider)| provider.chain(chain_id).next().is_some())
            .map(|(key, provider)| (key.as_str(), provider))
            .collect();
        matches.sort_by_key(|(_, provider)| provider.priority.unwrap_or(u64::MAX));
        matches
    }
}
