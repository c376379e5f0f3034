//! # Export Command Implementation
//!
//! Writes a component snapshot as a PHP declaration file, either to an
//! explicit `--output` file, under `--dir` at the component's canonical
//! location, or to stdout.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::Args;

use langrepo::component::{Component, SnapshotOptions};

use super::{ComponentArgs, Context, parse_timestamp};

/// Export a component as a declaration file
#[derive(Args, Debug)]
pub struct ExportArgs {
    #[command(flatten)]
    pub target: ComponentArgs,

    /// Export the state at this time
    #[arg(long, value_name = "TIME")]
    pub as_of: Option<String>,

    /// Write to this file
    #[arg(short, long, value_name = "FILE", conflicts_with = "dir")]
    pub output: Option<PathBuf>,

    /// Write below this directory at the component's canonical path
    #[arg(short, long, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// File whose content replaces the default documentation header
    #[arg(long, value_name = "FILE")]
    pub header: Option<PathBuf>,
}

/// Execute the `export` command.
pub fn execute(ctx: &Context, args: ExportArgs) -> Result<()> {
    let (language, version) = args.target.resolve(ctx)?;
    let options = SnapshotOptions {
        as_of: args.as_of.as_deref().map(parse_timestamp).transpose()?,
        ..Default::default()
    };
    let log = ctx.open_log();
    let component = Component::from_snapshot(log.as_ref(), &args.target.component, &language, version, &options)?;
    let header = args
        .header
        .as_ref()
        .map(|path| {
            fs::read_to_string(path).with_context(|| format!("Failed to read header {}", path.display()))
        })
        .transpose()?;

    let destination = match (args.output, args.dir) {
        (Some(file), _) => Some(file),
        (None, Some(dir)) => Some(dir.join(component.storage_path()?)),
        (None, None) => None,
    };
    match destination {
        Some(path) => {
            component.export(&path, header.as_deref())?;
            println!("Exported {} string(s) to {}", component.len(), path.display());
        }
        None => print!("{}", component.render(header.as_deref())),
    }
    Ok(())
}
