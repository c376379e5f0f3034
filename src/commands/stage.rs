//! # Stage Command Implementation
//!
//! Works with the persistent stage of the current actor. Unlike `import`,
//! which stages and commits in one go, these subcommands let changes pile up
//! over several invocations:
//!
//! ```bash
//! langrepo stage add --lang cs --version 2.0 forum.php
//! langrepo stage add --lang cs --version 2.0 quiz.php
//! langrepo stage rebase --delete-missing
//! langrepo stage commit -m "Czech forum and quiz"
//! ```
//!
//! The stage is saved under `stage_dir` in one file per actor.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use clap::{Args, Subcommand};

use langrepo::component::{Component, SnapshotOptions};
use langrepo::entity::Metadata;
use langrepo::output::OutputStyle;
use langrepo::stage::{FileStageStore, PersistentStage, RebaseOptions, RebaseReport, Stage, decide};

use super::import::{SourceArgs, load_components};
use super::{Context, parse_timestamp};

/// Work with your persistent stage
#[derive(Args, Debug)]
pub struct StageArgs {
    /// Owner of the stage; defaults to `actor` from the settings, then $USER
    #[arg(long, global = true, value_name = "NAME")]
    pub actor: Option<String>,

    #[command(subcommand)]
    pub action: StageAction,
}

#[derive(Subcommand, Debug)]
pub enum StageAction {
    /// Stage declaration files
    Add(AddArgs),
    /// Show what is staged and what rebase would do with it
    Status,
    /// Rebase the stage against the repository
    Rebase(RebaseArgs),
    /// Commit the stage
    Commit(CommitArgs),
    /// Throw the stage away
    Clear,
}

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Declaration files or directories
    #[arg(required = true, value_name = "PATH")]
    pub paths: Vec<PathBuf>,

    #[command(flatten)]
    pub source: SourceArgs,

    /// Replace strings that are already staged
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct RebaseArgs {
    /// Rebase against the state at this time instead of the latest
    #[arg(long, value_name = "TIME")]
    pub base: Option<String>,

    /// Delete strings the repository has and the stage does not
    #[arg(long)]
    pub delete_missing: bool,

    /// Modification time of the injected deletions
    #[arg(long, value_name = "TIME", requires = "delete_missing")]
    pub delete_timestamp: Option<String>,
}

#[derive(Args, Debug)]
pub struct CommitArgs {
    /// Commit message
    #[arg(short, long)]
    pub message: String,

    /// Extra metadata stored with every row, as KEY=VALUE
    #[arg(long = "meta", value_name = "KEY=VALUE", value_parser = parse_meta)]
    pub metadata: Vec<(String, String)>,

    /// Commit the stage as it is, without rebasing first
    #[arg(long)]
    pub skip_rebase: bool,
}

fn parse_meta(value: &str) -> std::result::Result<(String, String), String> {
    value
        .split_once('=')
        .filter(|(k, _)| !k.is_empty())
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", value))
}

/// Execute the `stage` command.
pub fn execute(ctx: &Context, args: StageArgs) -> Result<()> {
    let actor = args.actor.clone().unwrap_or_else(|| ctx.settings.actor());
    let store = Arc::new(FileStageStore::new(ctx.settings.stage_dir()));
    let mut stage = PersistentStage::open(&actor, ctx.open_log(), store)?;

    match args.action {
        StageAction::Add(add) => {
            for component in load_components(ctx, &add.paths, &add.source)? {
                stage.add(&component, add.force)?;
            }
            stage.persist()?;
            println!(
                "Staged {} string(s) in {} component(s) for {}",
                stage.string_count(),
                stage.len(),
                actor
            );
        }
        StageAction::Status => print!("{}", render_status(&stage, &ctx.output)?),
        StageAction::Rebase(rebase) => {
            let options = RebaseOptions {
                base_timestamp: rebase.base.as_deref().map(parse_timestamp).transpose()?,
                delete_missing: rebase.delete_missing,
                delete_timestamp: rebase.delete_timestamp.as_deref().map(parse_timestamp).transpose()?,
            };
            let report = stage.rebase(&options)?;
            stage.persist()?;
            println!("{}", describe_report(&report));
        }
        StageAction::Commit(commit) => {
            if stage.is_empty() {
                return Err(anyhow!(
                    "Nothing staged for {actor}\n\n\
                     hint: Use 'langrepo stage add' to stage declaration files"
                ));
            }
            let metadata: Metadata = commit.metadata.into_iter().collect();
            let summary = stage.commit(&commit.message, Some(&metadata), commit.skip_rebase)?;
            stage.persist()?;
            if let Some(report) = &summary.rebase {
                println!("{}", describe_report(report));
            }
            println!(
                "Committed {} string(s) from {} component(s)",
                summary.rows(),
                summary.components.len()
            );
        }
        StageAction::Clear => {
            stage.discard()?;
            println!("Cleared the stage of {}", actor);
        }
    }
    Ok(())
}

fn describe_report(report: &RebaseReport) -> String {
    format!(
        "Rebased: {} new, {} updated, {} deleted kept; {} unchanged, {} stale dropped",
        report.kept_new, report.kept_update, report.kept_deletion, report.dropped_noop, report.dropped_stale
    )
}

/// Staged components and the fate each string would meet on a rebase now.
fn render_status(stage: &Stage, out: &OutputStyle) -> Result<String> {
    if stage.is_empty() {
        return Ok("Nothing staged\n".to_string());
    }
    let snapshot = SnapshotOptions {
        include_deleted: true,
        ..Default::default()
    };
    let mut text = String::new();
    for component in stage.iter() {
        let cap = Component::from_snapshot(
            stage.log().as_ref(),
            &component.name,
            &component.language,
            component.version,
            &snapshot,
        )?;
        text.push_str(&format!(
            "{} ({} strings)\n",
            out.heading(&component.identifier().to_string()),
            component.len()
        ));
        for entity in component.iter() {
            let fate = decide(entity, cap.get_string(&entity.id));
            text.push_str(&format!("  {:<10} {}\n", out.fate(fate), out.key(&entity.id)));
        }
    }
    Ok(text)
}
