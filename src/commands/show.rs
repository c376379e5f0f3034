//! # Show Command Implementation
//!
//! Prints a component as the repository holds it now, or as it was at an
//! earlier moment with `--as-of`. Read-only.

use std::collections::BTreeSet;

use anyhow::Result;
use clap::{Args, ValueEnum};

use langrepo::component::{Component, SnapshotOptions};
use langrepo::output::OutputStyle;

use super::{ComponentArgs, Context, format_timestamp, parse_timestamp};

/// Print a component snapshot
#[derive(Args, Debug)]
pub struct ShowArgs {
    #[command(flatten)]
    pub target: ComponentArgs,

    /// Show the state at this time (epoch seconds, RFC 3339 or YYYY-MM-DD)
    #[arg(long, value_name = "TIME")]
    pub as_of: Option<String>,

    /// Include strings whose latest change is a deletion
    #[arg(long)]
    pub deleted: bool,

    /// Show modification time, sequence and commit message of every string
    #[arg(long)]
    pub full: bool,

    /// Only show these string identifiers
    #[arg(long = "id", value_name = "ID")]
    pub ids: Vec<String>,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub format: ShowFormat,
}

/// Output formats of `show`
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum ShowFormat {
    /// One `id = text` line per string
    #[default]
    Text,
    /// A JSON array of strings
    Json,
}

/// Execute the `show` command.
pub fn execute(ctx: &Context, args: ShowArgs) -> Result<()> {
    let (language, version) = args.target.resolve(ctx)?;
    let options = SnapshotOptions {
        as_of: args.as_of.as_deref().map(parse_timestamp).transpose()?,
        include_deleted: args.deleted,
        with_metadata: args.full,
        string_ids: (!args.ids.is_empty()).then(|| args.ids.iter().cloned().collect::<BTreeSet<_>>()),
    };
    let log = ctx.open_log();
    let component = Component::from_snapshot(log.as_ref(), &args.target.component, &language, version, &options)?;

    match args.format {
        ShowFormat::Json => {
            let strings: Vec<_> = component.iter().collect();
            println!("{}", serde_json::to_string_pretty(&strings)?);
        }
        ShowFormat::Text => print!("{}", render_text(&component, args.full, &ctx.output)),
    }
    Ok(())
}

/// Plain-text listing of a component.
pub fn render_text(component: &Component, full: bool, out: &OutputStyle) -> String {
    let mut text = format!(
        "{} ({} strings)\n",
        out.heading(&component.identifier().to_string()),
        component.len()
    );
    for entity in component.iter() {
        let marker = if entity.deleted {
            format!(" {}", out.deleted())
        } else {
            String::new()
        };
        text.push_str(&format!(
            "{}{} = {}\n",
            out.key(&entity.id),
            marker,
            entity.text_or_empty().replace('\n', "\\n")
        ));
        if let Some(extra) = entity.extra.as_ref().filter(|_| full) {
            let detail = format!(
                "    #{} at {}: {}",
                extra.get("sequence").map_or("?", String::as_str),
                format_timestamp(entity.modified_at),
                extra.get("message").map_or("", String::as_str)
            );
            text.push_str(&out.dim(&detail));
            text.push('\n');
        }
    }
    text
}
