//! Loaders and configuration around the provider list resolver.
//!
//! The engine only sees the [`DocumentLoader`] seam; this crate supplies the
//! loaders behind it and the configuration that tunes them.

use std::sync::Arc;

use anyhow::Result;
use rpcl_engine::{CachingLoader, DocumentLoader, Resolver};

pub mod config;
pub mod remote;
pub mod static_loader;

pub use config::{ResolverConfig, default_config_path};
pub use remote::RemoteLoader;
pub use static_loader::StaticLoader;

/// Builds the loader described by `config`: a [`RemoteLoader`], wrapped in a
/// [`CachingLoader`] unless caching is disabled.
pub fn build_loader(config: &ResolverConfig) -> Result<Arc<dyn DocumentLoader>> {
    let remote = RemoteLoader::new(config)?;
    if config.enable_cache {
        Ok(Arc::new(CachingLoader::new(remote)))
    } else {
        Ok(Arc::new(remote))
    }
}

/// Builds a [`Resolver`] over [`build_loader`] with the configured options.
pub fn build_resolver(config: &ResolverConfig) -> Result<Resolver> {
    Ok(Resolver::with_options(build_loader(config)?, config.resolver_options()))
}
