//! # codesync CLI
//!
//! This is the binary entry point for the `codesync` command-line tool.
//!
//! It parses arguments with `clap`, initialises logging and dispatches to the
//! command implementations. All sync logic lives in the `codesync` library;
//! the binary is a thin wrapper that turns library results into output and
//! exit codes.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli.execute()
}
