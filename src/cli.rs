//! CLI argument parsing and command dispatch

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};

use langrepo::config::Settings;
use langrepo::output::OutputStyle;
use langrepo::suggestions;

use crate::commands::{self, Context};

/// langrepo - Versioned repository of translated UI strings
#[derive(Parser, Debug)]
#[command(name = "langrepo")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Repository log file.
    ///
    /// Defaults to `repository` from .langrepo.yaml, then to the platform data
    /// directory (e.g. `~/.local/share/langrepo/repository.jsonl` on Linux).
    #[arg(long, global = true, value_name = "FILE", env = "LANGREPO_REPOSITORY")]
    repository: Option<PathBuf>,

    /// Settings file. Defaults to .langrepo.yaml in the current directory.
    #[arg(short, long, global = true, value_name = "FILE", env = "LANGREPO_CONFIG")]
    config: Option<PathBuf>,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL", default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Import declaration files and commit them to the repository
    Import(commands::import::ImportArgs),
    /// Print a component as it is (or was) in the repository
    Show(commands::show::ShowArgs),
    /// Write a component out as a PHP declaration file
    Export(commands::export::ExportArgs),
    /// List every recorded change of one string
    History(commands::history::HistoryArgs),
    /// Display the components held in the repository as a tree
    Tree(commands::tree::TreeArgs),
    /// List known versions
    Versions(commands::versions::VersionsArgs),
    /// Normalize text between placeholder dialects
    Normalize(commands::normalize::NormalizeArgs),
    /// Work with your persistent stage
    Stage(commands::stage::StageArgs),
    /// Generate shell completion scripts
    Completions(commands::completions::CompletionsArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        init_logging(&self.log_level);

        let command = match self.command {
            Commands::Completions(args) => return commands::completions::execute(args),
            Commands::Versions(args) => return commands::versions::execute(args),
            Commands::Normalize(args) => return commands::normalize::execute(args),
            command => command,
        };

        let settings = match &self.config {
            Some(path) if !path.is_file() => return Err(suggestions::config_not_found(path)),
            Some(path) => Settings::from_file(path)
                .with_context(|| format!("Failed to load settings from {}", path.display()))?,
            None => Settings::discover(&std::env::current_dir()?)?.unwrap_or_default(),
        };
        let repository = self
            .repository
            .clone()
            .unwrap_or_else(|| settings.repository_path());
        let ctx = Context {
            settings,
            repository,
            output: OutputStyle::from_env_and_flag(&self.color),
        };

        match command {
            Commands::Import(args) => commands::import::execute(&ctx, args),
            Commands::Show(args) => commands::show::execute(&ctx, args),
            Commands::Export(args) => commands::export::execute(&ctx, args),
            Commands::History(args) => commands::history::execute(&ctx, args),
            Commands::Tree(args) => commands::tree::execute(&ctx, args),
            Commands::Stage(args) => commands::stage::execute(&ctx, args),
            Commands::Completions(_) | Commands::Versions(_) | Commands::Normalize(_) => Ok(()),
        }
    }
}

/// Route `log` records to stderr. `RUST_LOG` wins over `--log-level`.
fn init_logging(level: &str) {
    let env = env_logger::Env::default().default_filter_or(level);
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .format_target(false)
        .try_init();
}
