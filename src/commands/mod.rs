//! # CLI Command Implementations
//!
//! Each subcommand of the `codesync` tool lives in its own file with:
//! - An `Args` struct that defines the command-specific arguments and options,
//!   derived using `clap`.
//! - An `execute` function that takes the parsed `Args` and calls into the
//!   `codesync` library.

pub mod completions;
pub mod sync;
pub mod validate;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use codesync::config::ConfigStore;

/// Load and validate the configuration. An unsupported version is fatal
/// here, before any sync work starts.
pub fn load_config(path: Option<&Path>) -> Result<Arc<ConfigStore>> {
    let store = ConfigStore::from_file(path).context("Failed to load configuration")?;
    store.validate().context("Invalid configuration")?;
    Ok(Arc::new(store))
}
