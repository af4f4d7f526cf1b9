//! # Sync Command Implementation
//!
//! Runs one sync pass. With no path every directory under `src_dir` is
//! synced by the provider for its host name; `host/scope` or
//! `host/scope/repo` narrows the pass to that organization, group or single
//! repository.
//!
//! SIGINT and SIGTERM stop the pass cooperatively: running git commands
//! finish, nothing new starts, and the run exits non-zero. A second signal
//! exits immediately.

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use signal_hook::consts::{SIGINT, SIGTERM};

use codesync::output::{emoji, format_report, OutputConfig};
use codesync::sync::{SyncOptions, Syncer};

use super::load_config;

/// Sync local clones with their providers
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Only sync this path below src_dir: host, host/scope or host/scope/repo
    #[arg(value_name = "PATH")]
    pub path: Option<String>,

    /// Worker threads per pool (0 runs everything sequentially)
    #[arg(long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// Path to the configuration file (defaults to ~/.codesync.yaml)
    #[arg(long, value_name = "FILE", env = "CODESYNC_CONFIG")]
    pub config_file: Option<PathBuf>,

    /// Resolve and log every decision without running git or deleting anything
    #[arg(short = 'n', long)]
    pub dry_run: bool,
}

/// Execute the `sync` command.
pub fn execute(args: SyncArgs, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    let store = load_config(args.config_file.as_deref())?;

    let shutdown = Arc::new(AtomicBool::new(false));
    install_signal_handlers(&shutdown)?;

    if args.dry_run {
        eprintln!(
            "{} DRY RUN MODE - No changes will be made",
            emoji(&out, "🔎", "[DRY RUN]")
        );
    }

    let report = Syncer::new(store)
        .with_shutdown(shutdown)
        .run(&SyncOptions {
            target: args.path,
            dry_run: args.dry_run,
            concurrency: args.concurrency,
        })
        .context("Sync failed")?;

    if !report.is_success() {
        eprint!("{}", format_report(&out, &report));
        anyhow::bail!("{} sync error(s)", report.failures.len());
    }
    Ok(())
}

/// Set `shutdown` on the first SIGINT/SIGTERM; exit with status 1 on the next.
fn install_signal_handlers(shutdown: &Arc<AtomicBool>) -> Result<()> {
    for signal in [SIGINT, SIGTERM] {
        // Registered first so it sees the flag before this signal sets it.
        signal_hook::flag::register_conditional_shutdown(signal, 1, Arc::clone(shutdown))
            .context("Failed to install signal handler")?;
        signal_hook::flag::register(signal, Arc::clone(shutdown))
            .context("Failed to install signal handler")?;
    }
    Ok(())
}
