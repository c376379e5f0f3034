//! # Import Command Implementation
//!
//! Loads declaration files as components, rebases them against the
//! repository and commits whatever changed.
//!
//! Directories are walked recursively; every `.php`, `.json`, `.yaml` and
//! `.yml` file below them is one component named after the file. A progress
//! bar is shown while a directory import is running.
//!
//! Imported text is read as legacy-dialect text and normalized for the target
//! version, so importing the same pack twice commits nothing the second time.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use log::warn;
use walkdir::WalkDir;

use langrepo::component::Component;
use langrepo::entity::Metadata;
use langrepo::source::SourceFormat;
use langrepo::stage::{RebaseOptions, Stage};
use langrepo::suggestions;
use langrepo::version::Version;

use super::{Context, parse_timestamp};

/// Import declaration files into the repository
#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Declaration files or directories to import
    #[arg(required = true, value_name = "PATH")]
    pub paths: Vec<PathBuf>,

    #[command(flatten)]
    pub source: SourceArgs,

    /// Commit message
    #[arg(short, long, default_value = "Import")]
    pub message: String,

    /// Delete strings the repository has and the imported files do not
    #[arg(long)]
    pub delete_missing: bool,
}

/// Options shared by every command that loads declaration files.
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Language of the imported strings
    #[arg(short, long, value_name = "CODE")]
    pub lang: Option<String>,

    /// Version code, branch or label of the imported strings
    #[arg(long, value_name = "VERSION")]
    pub version: Option<String>,

    /// Component name; defaults to the file name (single file only)
    #[arg(long, value_name = "NAME")]
    pub name: Option<String>,

    /// Modification time of the strings; defaults to each file's mtime
    #[arg(long, value_name = "TIME")]
    pub timestamp: Option<String>,
}

/// Execute the `import` command.
pub fn execute(ctx: &Context, args: ImportArgs) -> Result<()> {
    let components = load_components(ctx, &args.paths, &args.source)?;
    let file_count = components.len();

    let mut stage = Stage::new(ctx.open_log());
    for component in &components {
        stage.add(component, true)?;
    }
    let report = stage.rebase(&RebaseOptions {
        delete_missing: args.delete_missing,
        ..Default::default()
    })?;

    let mut metadata = Metadata::new();
    metadata.insert("source".to_string(), "import".to_string());
    let summary = stage
        .commit(&args.message, Some(&metadata), true)
        .with_context(|| format!("Failed to commit into {}", ctx.repository.display()))?;

    println!(
        "Imported {} file(s): {} new, {} updated, {} deleted, {} unchanged, {} stale",
        file_count,
        report.kept_new,
        report.kept_update,
        report.kept_deletion,
        report.dropped_noop,
        report.dropped_stale
    );
    println!(
        "Committed {} string(s) from {} component(s)",
        summary.rows(),
        summary.components.len()
    );
    Ok(())
}

/// Load every declaration file named by `paths` as a component.
pub fn load_components(ctx: &Context, paths: &[PathBuf], source: &SourceArgs) -> Result<Vec<Component>> {
    let language = ctx.language(source.lang.clone())?;
    let version = ctx.version(source.version.as_deref())?;
    if !version.translatable {
        warn!("Version {} is not open for translation", version);
    }
    let timestamp = source.timestamp.as_deref().map(parse_timestamp).transpose()?;

    let walks_directories = paths.iter().any(|p| p.is_dir());
    let files = collect_files(paths)?;
    if source.name.is_some() && (files.len() != 1 || walks_directories) {
        return Err(suggestions::name_needs_single_file());
    }

    let progress = if walks_directories {
        let bar = ProgressBar::new(files.len() as u64);
        bar.set_style(
            ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} {msg}")
                .map(|s| s.progress_chars("=> "))
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar
    } else {
        ProgressBar::hidden()
    };

    let mut components = Vec::with_capacity(files.len());
    for file in &files {
        progress.set_message(file.display().to_string());
        let component = load_one(file, &language, version, timestamp, source.name.as_deref())?;
        components.push(component);
        progress.inc(1);
    }
    progress.finish_and_clear();
    Ok(components)
}

fn load_one(
    file: &Path,
    language: &str,
    version: &'static Version,
    timestamp: Option<i64>,
    name: Option<&str>,
) -> Result<Component> {
    Component::from_source(file, language, version, timestamp, name)
        .with_context(|| format!("Failed to import {}", file.display()))
}

/// Expand directories into the declaration files below them, sorted.
fn collect_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if !path.is_dir() {
            files.push(path.clone());
            continue;
        }
        for entry in WalkDir::new(path).sort_by_file_name() {
            let entry = entry.with_context(|| format!("Failed to walk {}", path.display()))?;
            if entry.file_type().is_file() && SourceFormat::from_path(entry.path()).is_some() {
                files.push(entry.into_path());
            }
        }
    }
    Ok(files)
}
