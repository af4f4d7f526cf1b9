//! CLI argument parsing and command dispatch

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands;

/// codesync - Keep a tree of git clones in sync with their hosting providers
#[derive(Parser, Debug)]
#[command(name = "codesync")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL", default_value = "info")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sync every provider directory under src_dir, or just one path
    Sync(commands::sync::SyncArgs),

    /// Load and validate the configuration without syncing
    Validate(commands::validate::ValidateArgs),

    /// Generate shell completion scripts
    Completions(commands::completions::CompletionsArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        init_logging(&self.log_level, &self.color);

        match self.command {
            Commands::Sync(args) => commands::sync::execute(args, &self.color),
            Commands::Validate(args) => commands::validate::execute(args, &self.color),
            Commands::Completions(args) => commands::completions::execute(args),
        }
    }
}

/// `RUST_LOG` wins over `--log-level` when set.
fn init_logging(level: &str, color: &str) {
    let style = match color.to_lowercase().as_str() {
        "always" => env_logger::WriteStyle::Always,
        "never" => env_logger::WriteStyle::Never,
        _ => env_logger::WriteStyle::Auto,
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .write_style(style)
        .format_target(false)
        .try_init()
        .ok();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_sync_args_parse() {
        let cli = Cli::try_parse_from([
            "codesync",
            "--log-level",
            "debug",
            "sync",
            "github.com/acme",
            "--concurrency",
            "0",
            "--dry-run",
        ])
        .unwrap();
        assert_eq!(cli.log_level, "debug");
        match cli.command {
            Commands::Sync(args) => {
                assert_eq!(args.path.as_deref(), Some("github.com/acme"));
                assert_eq!(args.concurrency, Some(0));
                assert!(args.dry_run);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
