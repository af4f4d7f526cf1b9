//! # Validate Command Implementation
//!
//! Loads the configuration exactly as `sync` would (built-in defaults merged
//! with the user document), validates it and prints a summary. This command
//! never touches the source tree or the network.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use codesync::config::ConfigStore;
use codesync::output::{emoji, OutputConfig};

/// Validate the configuration file
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Path to the configuration file (defaults to ~/.codesync.yaml)
    #[arg(long, value_name = "FILE", env = "CODESYNC_CONFIG")]
    pub config_file: Option<PathBuf>,
}

/// Execute the `validate` command.
pub fn execute(args: ValidateArgs, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);

    let store = match ConfigStore::from_file(args.config_file.as_deref()) {
        Ok(store) => store,
        Err(e) => {
            println!(
                "{} Configuration parsing failed: {}",
                emoji(&out, "❌", "[ERR]"),
                e
            );
            return Err(anyhow::anyhow!("Configuration parsing failed: {}", e));
        }
    };

    let version = match store.validate() {
        Ok(version) => version,
        Err(e) => {
            println!("{} {}", emoji(&out, "❌", "[ERR]"), e);
            return Err(anyhow::anyhow!("Configuration validation failed"));
        }
    };

    let settings = store.settings();
    println!("{} Configuration is valid", emoji(&out, "✅", "[OK]"));
    println!("   Version: {}", version);
    println!("   Source directory: {}", settings.src_dir.display());
    println!("   Concurrency: {}", settings.concurrency);

    let providers = store.literal_keys(&["providers"]);
    if !providers.is_empty() {
        println!("   Providers: {}", providers.join(", "));
    }

    Ok(())
}
