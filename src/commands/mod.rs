//! # CLI Command Implementations
//!
//! One module per subcommand of the `langrepo` tool. Each module defines an
//! `Args` struct derived with `clap` and an `execute` function that calls
//! into the `langrepo` library.
//!
//! Commands that touch the repository receive a [`Context`] holding the
//! resolved settings and the location of the repository log.

pub mod completions;
pub mod export;
pub mod history;
pub mod import;
pub mod normalize;
pub mod show;
pub mod stage;
pub mod tree;
pub mod versions;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use chrono::{DateTime, NaiveDate, Utc};
use clap::Args;

use langrepo::config::Settings;
use langrepo::output::OutputStyle;
use langrepo::repository::FileLog;
use langrepo::suggestions;
use langrepo::version::Version;

/// Settings resolved from flags, environment and `.langrepo.yaml`.
#[derive(Debug)]
pub struct Context {
    pub settings: Settings,
    pub repository: PathBuf,
    pub output: OutputStyle,
}

impl Context {
    /// The repository log at the resolved location.
    pub fn open_log(&self) -> Arc<FileLog> {
        Arc::new(FileLog::open(&self.repository))
    }

    /// The `--lang` flag, or the configured default language.
    pub fn language(&self, flag: Option<String>) -> Result<String> {
        flag.or_else(|| self.settings.default_language.clone())
            .ok_or_else(suggestions::missing_language)
    }

    /// The `--version` flag, or the configured default version.
    pub fn version(&self, flag: Option<&str>) -> Result<&'static Version> {
        match flag {
            Some(value) => resolve_version(value),
            None => self
                .settings
                .default_version()
                .ok_or_else(suggestions::missing_version),
        }
    }
}

/// Selects one component in the repository.
#[derive(Args, Debug, Clone)]
pub struct ComponentArgs {
    /// Component name, e.g. `forum` or `block_html`
    #[arg(long, value_name = "NAME")]
    pub component: String,

    /// Language code; defaults to `default_language` from the settings
    #[arg(short, long, value_name = "CODE")]
    pub lang: Option<String>,

    /// Version code, branch or label; defaults to `default_version`
    #[arg(long, value_name = "VERSION")]
    pub version: Option<String>,
}

impl ComponentArgs {
    /// Resolve language and version against the settings.
    pub fn resolve(&self, ctx: &Context) -> Result<(String, &'static Version)> {
        Ok((ctx.language(self.lang.clone())?, ctx.version(self.version.as_deref())?))
    }
}

/// Resolve a version code, branch tag or label.
pub fn resolve_version(value: &str) -> Result<&'static Version> {
    Version::resolve(value).ok_or_else(|| suggestions::unknown_version(value))
}

/// Parse epoch seconds, an RFC 3339 timestamp or a `YYYY-MM-DD` date (UTC midnight).
pub fn parse_timestamp(value: &str) -> Result<i64> {
    if let Ok(seconds) = value.parse::<i64>() {
        return Ok(seconds);
    }
    if let Ok(datetime) = DateTime::parse_from_rfc3339(value) {
        return Ok(datetime.timestamp());
    }
    if let Some(midnight) = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    {
        return Ok(midnight.and_utc().timestamp());
    }
    Err(anyhow!(
        "Invalid timestamp: {value}\n\n\
         hint: Use epoch seconds (1288000000), RFC 3339 (2010-10-25T09:46:40Z) or a date (2010-10-25)"
    ))
}

/// Human-readable form of epoch seconds.
pub fn format_timestamp(seconds: i64) -> String {
    DateTime::<Utc>::from_timestamp(seconds, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| seconds.to_string())
}
