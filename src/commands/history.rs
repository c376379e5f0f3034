//! # History Command Implementation
//!
//! Lists every row the repository holds for one string, oldest commit first.

use anyhow::Result;
use clap::Args;

use langrepo::repository::{LogRow, RepositoryLog, StringKey};
use langrepo::output::OutputStyle;

use super::{ComponentArgs, Context, format_timestamp};

/// Show the change history of one string
#[derive(Args, Debug)]
pub struct HistoryArgs {
    #[command(flatten)]
    pub target: ComponentArgs,

    /// String identifier
    #[arg(value_name = "ID")]
    pub string_id: String,
}

/// Execute the `history` command.
pub fn execute(ctx: &Context, args: HistoryArgs) -> Result<()> {
    let (language, version) = args.target.resolve(ctx)?;
    let key = StringKey {
        branch: version.code,
        language,
        component: args.target.component.clone(),
        string_id: args.string_id.clone(),
    };
    let rows = ctx.open_log().history(&key)?;
    if rows.is_empty() {
        println!("No history for '{}' in {}", args.string_id, args.target.component);
        return Ok(());
    }
    for row in &rows {
        println!("{}", render_row(row, &ctx.output));
    }
    Ok(())
}

fn render_row(row: &LogRow, out: &OutputStyle) -> String {
    let head = out.dim(&format!("#{} {}", row.sequence, format_timestamp(row.modified_at)));
    let body = if row.deleted {
        out.deleted()
    } else {
        row.text.clone().unwrap_or_default().replace('\n', "\\n")
    };
    if row.message.is_empty() {
        format!("{} {}", head, body)
    } else {
        format!("{} {} ({})", head, body, row.message)
    }
}
