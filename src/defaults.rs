//! Default values for langrepo settings.
//!
//! Centralized here so the CLI, the settings file and the tests agree.

use std::path::PathBuf;

/// Name of the settings file looked up in the current directory.
pub const CONFIG_FILE_NAME: &str = ".langrepo.yaml";

/// Returns the default location of the repository log.
///
/// Uses the platform data directory:
/// - Linux: `~/.local/share/langrepo/repository.jsonl`
/// - macOS: `~/Library/Application Support/langrepo/repository.jsonl`
/// - Windows: `{FOLDERID_RoamingAppData}\langrepo\repository.jsonl`
///
/// Falls back to `.langrepo/repository.jsonl` in the current directory if the
/// data directory cannot be determined.
///
/// Overridden by `repository` in the settings file, the `--repository` flag
/// or the `LANGREPO_REPOSITORY` environment variable.
pub fn default_repository() -> PathBuf {
    data_root().join("repository.jsonl")
}

/// Returns the default directory holding persisted stages, one file per actor.
pub fn default_stage_dir() -> PathBuf {
    data_root().join("stages")
}

/// Returns the actor the persistent stage belongs to when none is configured.
///
/// Taken from `USER` (or `USERNAME` on Windows), falling back to `default`.
pub fn default_actor() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "default".to_string())
}

fn data_root() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("langrepo"))
        .unwrap_or_else(|| PathBuf::from(".langrepo"))
}
