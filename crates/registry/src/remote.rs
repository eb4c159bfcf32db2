//! Loads list documents from the filesystem and over HTTP(S).
//!
//! `file://` URIs and bare paths are read with `tokio::fs`; `http://` and
//! `https://` URIs go through a shared `reqwest::Client`. Files ending in
//! `.yaml` or `.yml` are parsed as YAML, everything else as JSON. Every
//! document is checked with [`parse_document`] before it is handed to the
//! resolver.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode, header};
use rpcl_engine::{DocumentLoader, FetchedDocument, LoaderError, Locator, VersionRange, parse_document, satisfies};
use rpcl_util::expand_tilde;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::config::ResolverConfig;

#[derive(Debug, Clone)]
pub struct RemoteLoader {
    http: Client,
    user_agent: String,
}

impl RemoteLoader {
    pub fn new(config: &ResolverConfig) -> Result<Self> {
        let http = Client::builder().timeout(config.http_timeout()).build().context("build http client")?;
        Ok(Self {
            http,
            user_agent: config.user_agent.clone(),
        })
    }

    async fn load(&self, locator: &Locator) -> Result<FetchedDocument, LoaderError> {
        let uri = match locator {
            Locator::Uri(uri) => uri,
            Locator::Ens(_) => {
                return Err(LoaderError::Unsupported {
                    locator: locator.clone(),
                    reason: "ENS names cannot be resolved by this loader".into(),
                });
            }
        };

        let (content, format) = if uri.starts_with("http://") || uri.starts_with("https://") {
            (self.read_http(locator, uri).await?, Format::from_location(uri))
        } else {
            let path = local_path(locator, uri)?;
            let format = Format::from_location(&path.to_string_lossy());
            (read_file(locator, &path).await?, format)
        };

        let value = format.parse(&content).map_err(|message| LoaderError::parse(locator, message))?;
        let document = parse_document(value).map_err(|source| LoaderError::Structural {
            locator: locator.clone(),
            source,
        })?;
        debug!(%locator, version = %document.version(), "loaded list document");
        Ok(FetchedDocument::new(document))
    }

    async fn read_http(&self, locator: &Locator, uri: &str) -> Result<String, LoaderError> {
        debug!(%uri, "fetching list over http");
        let response = self
            .http
            .get(uri)
            .header(header::USER_AGENT, &self.user_agent)
            .send()
            .await
            .map_err(|error| LoaderError::transport(locator, error.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(LoaderError::NotFound { locator: locator.clone() }),
            status if !status.is_success() => Err(LoaderError::transport(locator, format!("HTTP {status}"))),
            _ => response.text().await.map_err(|error| LoaderError::transport(locator, error.to_string())),
        }
    }
}

#[async_trait::async_trait]
impl DocumentLoader for RemoteLoader {
    async fn fetch(&self, locator: &Locator, required: &VersionRange) -> Result<FetchedDocument, LoaderError> {
        let fetched = self.load(locator).await?;
        if !satisfies(&fetched.version, required) {
            return Err(LoaderError::NoCompatibleVersion {
                locator: locator.clone(),
                required: required.clone(),
            });
        }
        Ok(fetched)
    }

    async fn fetch_root(&self, locator: &Locator) -> Result<FetchedDocument, LoaderError> {
        self.load(locator).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Yaml,
}

impl Format {
    fn from_location(location: &str) -> Self {
        let location = location.split(['?', '#']).next().unwrap_or(location).to_ascii_lowercase();
        if location.ends_with(".yaml") || location.ends_with(".yml") {
            Format::Yaml
        } else {
            Format::Json
        }
    }

    fn parse(self, content: &str) -> Result<Value, String> {
        match self {
            Format::Json => serde_json::from_str(content).map_err(|error| error.to_string()),
            Format::Yaml => serde_yaml::from_str(content).map_err(|error| error.to_string()),
        }
    }
}

fn local_path(locator: &Locator, uri: &str) -> Result<PathBuf, LoaderError> {
    if !uri.starts_with("file:") {
        return Ok(expand_tilde(uri));
    }
    Url::parse(uri)
        .ok()
        .and_then(|url| url.to_file_path().ok())
        .ok_or_else(|| LoaderError::Unsupported {
            locator: locator.clone(),
            reason: "file URI does not name a local path".into(),
        })
}

async fn read_file(locator: &Locator, path: &Path) -> Result<String, LoaderError> {
    tokio::fs::read_to_string(path).await.map_err(|error| match error.kind() {
        ErrorKind::NotFound => LoaderError::NotFound { locator: locator.clone() },
        _ => LoaderError::transport(locator, format!("{}: {error}", path.display())),
    })
}
