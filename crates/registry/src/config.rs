use std::{env, path::Path, path::PathBuf, time::Duration};

use dirs_next::config_dir;
use rpcl_engine::{DEFAULT_MAX_DEPTH, ResolverOptions};
use rpcl_util::expand_tilde;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Environment variable naming an alternative configuration file.
pub const CONFIG_PATH_ENV: &str = "RPCL_CONFIG_PATH";
/// Environment variable overriding [`ResolverConfig::max_depth`].
pub const MAX_DEPTH_ENV: &str = "RPCL_MAX_DEPTH";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub max_depth: usize,
    pub http_timeout_secs: u64,
    pub user_agent: String,
    pub enable_cache: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            http_timeout_secs: 30,
            user_agent: format!("rpcl/{}; {}", env!("CARGO_PKG_VERSION"), env::consts::OS),
            enable_cache: true,
        }
    }
}

impl ResolverConfig {
    /// Loads the configuration file and applies environment overrides.
    /// A missing or unreadable file yields the defaults.
    pub fn load() -> Self {
        let mut config = Self::load_from(&default_config_path());
        config.apply_env_overrides(|key| env::var(key).ok());
        config
    }

    pub fn load_from(path: &Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        match serde_json::from_str(&content) {
            Ok(config) => config,
            Err(error) => {
                warn!(path = %path.display(), %error, "ignoring unreadable resolver config");
                Self::default()
            }
        }
    }

    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let Some(raw) = lookup(MAX_DEPTH_ENV) else {
            return;
        };
        match raw.trim().parse() {
            Ok(max_depth) => self.max_depth = max_depth,
            Err(error) => warn!(variable = MAX_DEPTH_ENV, value = %raw, %error, "ignoring invalid override"),
        }
    }

    pub fn resolver_options(&self) -> ResolverOptions {
        ResolverOptions { max_depth: self.max_depth }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

/// Get the default path for the resolver configuration file.
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = env::var(CONFIG_PATH_ENV)
        && !path.trim().is_empty()
    {
        return expand_tilde(&path);
    }

    config_dir().unwrap_or_else(|| PathBuf::from(".")).join("rpcl").join("config.json")
}
