//! Demo harness for the configuration repository notification core.
//!
//! Stands in for the out-of-scope storage engine: it keeps a single
//! in-memory `serde_json::Value` tree and a revision counter, applies
//! patches read from stdin with `dogma-patch`, and fans out commits
//! through a `dogma-watch` registry, exactly as the data flow in the
//! notification core's overview describes it. Not a production server:
//! no persistence, no concurrency beyond one stdin reader.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use dogma_model::{Path as RepoPath, Revision};
use dogma_watch::{Registry, RegistryConfig, RegistryError};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "dogma-cored")]
#[command(about = "Interactive demo of the commit-watch registry and JSON patch engine")]
struct Cli {
    /// Soft cap on idle pattern entries retained by the watch registry.
    #[arg(long, default_value_t = 8192)]
    bucket_capacity: usize,
}

/// The demo's stand-in for the storage engine: an in-memory tree plus the
/// revision counter the real Git-backed repository would otherwise own.
struct Store {
    tree: Mutex<Value>,
    revision: Mutex<Revision>,
    registry: Registry,
}

impl Store {
    fn new(registry: Registry) -> Self {
        Self {
            tree: Mutex::new(json!({})),
            revision: Mutex::new(Revision::INIT),
            registry,
        }
    }

    /// Applies a patch read from `patch_json`, committing a new revision
    /// and notifying the registry for every path the patch touched.
    fn apply(&self, patch_json: &str) -> Result<Revision> {
        let touched = touched_paths(patch_json)?;

        let next_revision = {
            let mut tree = self.tree.lock();
            let updated = dogma_patch::apply_str(&tree, patch_json)
                .map_err(|e| anyhow::anyhow!("{e}"))?;
            *tree = updated;

            let mut revision = self.revision.lock();
            *revision = Revision::new(revision.as_i64() + 1);
            *revision
        };

        for path in touched {
            self.registry.notify(next_revision, &path);
        }

        Ok(next_revision)
    }

    fn show(&self) -> Value {
        self.tree.lock().clone()
    }
}

/// Pulls every `path`/`from` pointer a patch document touches, so the
/// demo can notify watches without re-deriving the patch engine's own op
/// dispatch. A production storage engine would instead know this from the
/// commit it just authored; here the patch *is* the commit.
fn touched_paths(patch_json: &str) -> Result<Vec<RepoPath>> {
    let ops: Vec<Value> =
        serde_json::from_str(patch_json).context("patch file is not a JSON array of operations")?;
    let mut paths = Vec::new();
    for op in &ops {
        for field in ["path", "from"] {
            if let Some(raw) = op.get(field).and_then(Value::as_str)
                && let Ok(path) = RepoPath::parse(raw)
            {
                paths.push(path);
            }
        }
    }
    Ok(paths)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").compact().init();

    let cli = Cli::parse();
    let registry = Registry::new(RegistryConfig::new(cli.bucket_capacity));
    let store = Arc::new(Store::new(registry.clone()));

    info!(bucket_capacity = cli.bucket_capacity, "dogma-cored ready");
    print_help();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Err(error) = dispatch(line, &store, &registry).await {
            warn!(%error, "command failed");
        }
    }

    registry.close(|| RegistryError::Closed("dogma-cored shutting down".to_owned()));
    Ok(())
}

async fn dispatch(line: &str, store: &Arc<Store>, registry: &Registry) -> Result<()> {
    let mut parts = line.split_whitespace();
    match parts.next() {
        Some("apply") => {
            let path = parts
                .next()
                .context("usage: apply <patch.json>")
                .map(PathBuf::from)?;
            let patch_json = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let revision = store.apply(&patch_json)?;
            info!(revision = %revision, "patch applied");
        }
        Some("watch") => {
            let pattern = parts.next().context("usage: watch <pattern> <baseline>")?;
            let baseline: i64 = parts
                .next()
                .context("usage: watch <pattern> <baseline>")?
                .parse()
                .context("baseline must be an integer revision")?;

            let handle = registry.add(Revision::new(baseline), pattern)?;
            let pattern = pattern.to_owned();
            // The caller owns the timeout; the registry itself never
            // imposes one (see the notification core's concurrency model).
            tokio::spawn(async move {
                match tokio::time::timeout(Duration::from_secs(30), handle).await {
                    Ok(Ok(revision)) => {
                        info!(%pattern, revision = %revision, "watch delivered");
                    }
                    Ok(Err(error)) => {
                        warn!(%pattern, %error, "watch failed");
                    }
                    Err(_) => {
                        warn!(%pattern, "watch timed out after 30s, caller cancels on drop");
                    }
                }
            });
        }
        Some("show") => {
            println!("{}", serde_json::to_string_pretty(&store.show())?);
        }
        Some("help") => print_help(),
        Some(other) => anyhow::bail!("unknown command {other:?} (try: apply, watch, show, help)"),
        None => {}
    }
    Ok(())
}

fn print_help() {
    println!("commands:");
    println!("  apply <patch.json>       apply a json patch file, committing a new revision");
    println!("  watch <pattern> <rev>    register a watch, printing the result when it fires");
    println!("  show                     print the current tree");
    println!("  help                     print this message");
}
