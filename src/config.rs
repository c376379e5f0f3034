//! # Settings
//!
//! The optional `.langrepo.yaml` file holds defaults for the command-line
//! tool so that everyday invocations need few flags:
//!
//! ```yaml
//! repository: /srv/langrepo/repository.jsonl
//! stage_dir: /srv/langrepo/stages
//! actor: jdoe
//! default_language: cs
//! default_version: MOODLE_20_STABLE
//! ```
//!
//! Every field is optional. Command-line flags and environment variables take
//! precedence over the file, and [`crate::defaults`] fills whatever is left.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::defaults;
use crate::error::{Error, Result};
use crate::version::Version;

/// Contents of a `.langrepo.yaml` file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Repository log file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<PathBuf>,
    /// Directory of persisted stages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage_dir: Option<PathBuf>,
    /// Owner of the persistent stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    /// Language used when `--lang` is omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_language: Option<String>,
    /// Version code, branch or label used when `--version` is omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_version: Option<String>,
}

impl Settings {
    /// Parse settings from YAML. An empty document gives default settings.
    pub fn parse(yaml_content: &str) -> Result<Self> {
        if yaml_content.trim().is_empty() {
            return Ok(Self::default());
        }
        let settings: Settings = serde_yaml::from_str(yaml_content).map_err(|e| {
            let message = e.to_string();
            let hint = message.contains("unknown field").then(|| {
                "valid fields are repository, stage_dir, actor, default_language, default_version"
                    .to_string()
            });
            Error::ConfigParse { message, hint }
        })?;
        if let Some(value) = settings
            .default_version
            .as_deref()
            .filter(|v| Version::resolve(v).is_none())
        {
            return Err(Error::ConfigParse {
                message: format!("default_version '{}' is not a known version", value),
                hint: Some("run 'langrepo versions' to list known versions".to_string()),
            });
        }
        Ok(settings)
    }

    /// Load settings from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Load `.langrepo.yaml` from `dir` if it exists.
    pub fn discover(dir: &Path) -> Result<Option<Self>> {
        let path = dir.join(defaults::CONFIG_FILE_NAME);
        if !path.is_file() {
            return Ok(None);
        }
        Self::from_file(&path).map(Some)
    }

    /// Repository log location, falling back to the platform default.
    pub fn repository_path(&self) -> PathBuf {
        self.repository
            .clone()
            .unwrap_or_else(defaults::default_repository)
    }

    /// Persisted stage directory, falling back to the platform default.
    pub fn stage_dir(&self) -> PathBuf {
        self.stage_dir
            .clone()
            .unwrap_or_else(defaults::default_stage_dir)
    }

    /// Owner of the persistent stage.
    pub fn actor(&self) -> String {
        self.actor.clone().unwrap_or_else(defaults::default_actor)
    }

    /// The default version, if configured.
    pub fn default_version(&self) -> Option<&'static Version> {
        self.default_version.as_deref().and_then(Version::resolve)
    }
}
