//! # langrepo CLI
//!
//! Binary entry point for the `langrepo` command-line tool.
//!
//! It parses arguments with `clap`, resolves settings, and runs the chosen
//! command. All repository logic lives in the `langrepo` library; the binary
//! only wires it to files, flags and the terminal.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli.execute()
}
