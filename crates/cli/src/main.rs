use std::{
    cmp::Ordering,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use rpcl_engine::{Locator, Version, VersionRange, check_document, compare, satisfies};
use rpcl_registry::{ResolverConfig, build_resolver};
use rpcl_util::source_to_uri;
use serde_json::Value;
use tracing::info;

/// Resolve and inspect provider lists.
#[derive(Parser, Debug)]
#[command(name = "rpcl", version, about)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve a list through its extends chain and print the result
    Resolve {
        /// Path or URI of the root list
        source: String,

        /// Maximum number of extends hops to follow
        #[arg(long)]
        max_depth: Option<usize>,

        /// Pretty-print the resolved list
        #[arg(long)]
        pretty: bool,
    },
    /// Check a list document and print every violation
    Check {
        file: PathBuf,
    },
    /// Compare two versions
    Compare {
        left: Version,
        right: Version,
    },
    /// Test whether a version satisfies a range such as ^1.2.0 or =2.0.0-rc.1
    Satisfies {
        version: Version,
        range: VersionRange,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    match Args::parse().command {
        Command::Resolve { source, max_depth, pretty } => run_resolve(&source, max_depth, pretty).await,
        Command::Check { file } => run_check(&file),
        Command::Compare { left, right } => {
            let ordering = match compare(&left, &right) {
                Ordering::Less => "less",
                Ordering::Equal => "equal",
                Ordering::Greater => "greater",
            };
            println!("{ordering}");
            Ok(())
        }
        Command::Satisfies { version, range } => {
            println!("{}", satisfies(&version, &range));
            Ok(())
        }
    }
}

fn init_tracing() {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn run_resolve(source: &str, max_depth: Option<usize>, pretty: bool) -> Result<()> {
    let mut config = ResolverConfig::load();
    if let Some(max_depth) = max_depth {
        config.max_depth = max_depth;
    }
    let resolver = build_resolver(&config)?;
    let locator = Locator::uri(source_to_uri(source));
    info!(%locator, max_depth = config.max_depth, "resolving provider list");

    let resolved = tokio::select! {
        result = resolver.resolve_locator(&locator, None) => result.with_context(|| format!("resolve {source}"))?,
        _ = tokio::signal::ctrl_c() => bail!("interrupted while resolving {source}"),
    };

    let output = if pretty {
        serde_json::to_string_pretty(&resolved)?
    } else {
        serde_json::to_string(&resolved)?
    };
    println!("{output}");
    Ok(())
}

fn run_check(file: &Path) -> Result<()> {
    let content = std::fs::read_to_string(file).with_context(|| format!("Failed to read list file: {}", file.display()))?;
    let is_yaml = matches!(file.extension().and_then(|extension| extension.to_str()), Some("yaml" | "yml"));
    let document: Value = if is_yaml {
        serde_yaml::from_str(&content).with_context(|| format!("parse {} as YAML", file.display()))?
    } else {
        serde_json::from_str(&content).with_context(|| format!("parse {} as JSON", file.display()))?
    };

    let violations = check_document(&document);
    if violations.is_empty() {
        println!("{}: ok", file.display());
        return Ok(());
    }
    for violation in &violations {
        println!("{violation}");
    }
    bail!("{} has {} violation(s)", file.display(), violations.len())
}
