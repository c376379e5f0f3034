//! # Components
//!
//! A [`Component`] is the set of translated strings for one
//! `(name, language, version)` triple, e.g. the Czech strings of the forum
//! module on the 2.0 release line. It is an in-memory aggregate: it is
//! created by a factory, edited through its own methods, then staged or
//! exported and dropped. Components are never stored as such; only the rows
//! a commit appends to the repository log are durable.
//!
//! ## Factories
//!
//! - [`Component::from_source`] / [`Component::from_declarations`] build a
//!   component from an imported declaration file, normalizing each text for
//!   the target release line.
//! - [`Component::from_snapshot`] reconstructs a component from the
//!   repository log as it was at a moment in time.
//!
//! ## Ownership
//!
//! Strings are owned by the component in a map keyed by identifier. A string
//! holds no reference back to its component; code that needs both passes the
//! component and the identifier together.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Write as _};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::entity::{Metadata, StringEntity};
use crate::error::{Error, Result};
use crate::layout;
use crate::repository::{RepositoryLog, SnapshotQuery};
use crate::source::{self, Declarations};
use crate::syntax::{self, Dialect};
use crate::version::Version;

/// Identity of a component: its name, language and version code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComponentId {
    pub name: String,
    pub language: String,
    pub version: u32,
}

impl ComponentId {
    pub fn new(name: &str, language: &str, version: &Version) -> Self {
        Self {
            name: name.to_string(),
            language: language.to_string(),
            version: version.code,
        }
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.name, self.language, self.version)
    }
}

/// Options for reconstructing a component from the repository log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotOptions {
    /// Time of the snapshot; `None` for the most recent state.
    pub as_of: Option<i64>,
    /// Keep strings whose latest row is a deletion.
    pub include_deleted: bool,
    /// Attach every non-core column of the winning row as `extra`.
    pub with_metadata: bool,
    /// Only reconstruct these string identifiers.
    pub string_ids: Option<BTreeSet<String>>,
}

/// The strings of one component in one language on one release line.
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    pub name: String,
    pub language: String,
    pub version: &'static Version,
    strings: BTreeMap<String, StringEntity>,
}

impl Component {
    /// Create an empty component.
    pub fn new(name: &str, language: &str, version: &'static Version) -> Self {
        Self {
            name: name.to_string(),
            language: language.to_string(),
            version,
            strings: BTreeMap::new(),
        }
    }

    /// Guess a component name from a declaration file name: `forum.php` is `forum`.
    pub fn name_from_path(path: &Path) -> Option<&str> {
        path.file_stem().and_then(|s| s.to_str())
    }

    /// Load a component from a declaration file.
    ///
    /// The component name defaults to the file stem and the modification
    /// time of every string defaults to the file's own modification time.
    pub fn from_source(
        path: &Path,
        language: &str,
        version: &'static Version,
        timestamp: Option<i64>,
        name: Option<&str>,
    ) -> Result<Self> {
        let unreadable = |message: String| Error::UnreadableSource {
            path: path.to_path_buf(),
            message,
        };
        let name = match name {
            Some(name) => name,
            None => Self::name_from_path(path)
                .ok_or_else(|| unreadable("cannot derive a component name".to_string()))?,
        };
        let declarations = source::read(path)?;
        let timestamp = match timestamp {
            Some(t) => t,
            None => {
                let modified = fs::metadata(path)
                    .and_then(|m| m.modified())
                    .map_err(|e| unreadable(e.to_string()))?;
                modified
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_secs() as i64)
                    .unwrap_or_default()
            }
        };
        if declarations.is_empty() {
            warn!("No strings defined in {}", path.display());
        }
        Self::from_declarations(&declarations, name, language, version, timestamp)
    }

    /// Build a component from parsed declarations.
    ///
    /// Imported text is always treated as legacy-dialect input: it is
    /// sanitized in place on legacy release lines and migrated to the modern
    /// dialect on later ones.
    pub fn from_declarations(
        declarations: &Declarations,
        name: &str,
        language: &str,
        version: &'static Version,
        timestamp: i64,
    ) -> Result<Self> {
        let mut component = Self::new(name, language, version);
        if declarations.is_empty() {
            debug!("Component {} has no declarations", component.identifier());
        }
        for (id, raw) in declarations.iter() {
            let text = syntax::normalize(raw, version.dialect(), Dialect::Legacy)?;
            component.add_string(StringEntity::at(id, text, timestamp), true)?;
        }
        Ok(component)
    }

    /// Reconstruct a component from the repository log.
    ///
    /// For every string the winning row is the one with the greatest
    /// modification time not after `as_of`, the higher sequence breaking
    /// ties. A component the log has never seen comes back empty.
    pub fn from_snapshot(
        log: &dyn RepositoryLog,
        name: &str,
        language: &str,
        version: &'static Version,
        options: &SnapshotOptions,
    ) -> Result<Self> {
        let query = SnapshotQuery {
            as_of: options.as_of,
            string_ids: options.string_ids.clone(),
            ..SnapshotQuery::new(version.code, language, name)
        };
        let mut component = Self::new(name, language, version);
        for row in log.latest(&query)? {
            if row.deleted && !options.include_deleted {
                continue;
            }
            let extra = options.with_metadata.then(|| {
                let mut extra = row.metadata.clone();
                extra.insert("sequence".to_string(), row.sequence.to_string());
                extra.insert("branch".to_string(), row.branch.to_string());
                extra.insert("language".to_string(), row.language.clone());
                extra.insert("component".to_string(), row.component.clone());
                extra.insert("message".to_string(), row.message.clone());
                extra
            });
            let entity = StringEntity {
                id: row.string_id,
                text: row.text,
                modified_at: row.modified_at,
                deleted: row.deleted,
                extra,
            };
            component.add_string(entity, true)?;
        }
        Ok(component)
    }

    /// The identity of this component.
    pub fn identifier(&self) -> ComponentId {
        ComponentId::new(&self.name, &self.language, self.version)
    }

    /// Add a string. Fails if the identifier exists unless `force` is set.
    pub fn add_string(&mut self, entity: StringEntity, force: bool) -> Result<()> {
        if !force && self.strings.contains_key(&entity.id) {
            return Err(Error::DuplicateIdentifier {
                component: self.identifier().to_string(),
                id: entity.id,
            });
        }
        self.strings.insert(entity.id.clone(), entity);
        Ok(())
    }

    /// Remove and return a string. Absent identifiers are ignored.
    pub fn remove_string(&mut self, id: &str) -> Option<StringEntity> {
        self.strings.remove(id)
    }

    /// Remove every string.
    pub fn clear(&mut self) {
        self.strings.clear();
    }

    /// With `None`, whether any string is present; otherwise whether `id` is.
    pub fn has_string(&self, id: Option<&str>) -> bool {
        match id {
            None => !self.strings.is_empty(),
            Some(id) => self.strings.contains_key(id),
        }
    }

    pub fn get_string(&self, id: &str) -> Option<&StringEntity> {
        self.strings.get(id)
    }

    /// Identifiers of all strings, sorted.
    pub fn string_keys(&self) -> impl Iterator<Item = &str> {
        self.strings.keys().map(String::as_str)
    }

    /// All strings, sorted by identifier.
    pub fn iter(&self) -> impl Iterator<Item = &StringEntity> {
        self.strings.values()
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Keep only the strings that `mask` also defines.
    ///
    /// Typically used to drop strings from a translation that the master
    /// English pack no longer defines. A string that `mask` holds as deleted
    /// still counts as defined. Returns the number of strings removed.
    pub fn intersect(&mut self, mask: &Component) -> usize {
        let before = self.strings.len();
        self.strings.retain(|id, _| mask.strings.contains_key(id));
        before - self.strings.len()
    }

    /// Relative path this component is exported to when packaging.
    pub fn storage_path(&self) -> Result<PathBuf> {
        layout::storage_path(&self.name, &self.language, self.version)
    }

    /// Render the component in the PHP declaration format.
    ///
    /// `header` replaces the default documentation block. Deleted strings and
    /// strings without text are not rendered.
    pub fn render(&self, header: Option<&str>) -> String {
        let mut out = String::from(FILE_PROLOGUE);
        match header {
            Some(header) => out.push_str(header),
            None => {
                let _ = write!(
                    out,
                    "/**\n * Strings for component '{name}', language '{lang}', branch '{branch}'\n *\n * @package   {name}\n */\n\n",
                    name = self.name,
                    lang = self.language,
                    branch = self.version.branch,
                );
            }
        }
        for entity in self.iter().filter(|e| !e.deleted) {
            if let Some(text) = &entity.text {
                let _ = writeln!(out, "$string[{}] = {};", quote(&entity.id), quote(text));
            }
        }
        out
    }

    /// Export the component into a PHP declaration file at `path`.
    pub fn export(&self, path: &Path, header: Option<&str>) -> Result<()> {
        let export_error = |e: std::io::Error| Error::Export {
            path: path.to_path_buf(),
            message: e.to_string(),
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(export_error)?;
        }
        fs::write(path, self.render(header)).map_err(export_error)?;
        debug!("Exported {} strings of {} to {}", self.len(), self.identifier(), path.display());
        Ok(())
    }

    /// Metadata of every string that carries some, keyed by identifier.
    pub fn extras(&self) -> BTreeMap<&str, &Metadata> {
        self.iter()
            .filter_map(|e| e.extra.as_ref().map(|x| (e.id.as_str(), x)))
            .collect()
    }
}

const FILE_PROLOGUE: &str = "<?php\n\n\
// This file is part of a language pack exported from the string repository.\n\
// Edits made here are overwritten by the next export.\n\n";

/// Quote `value` as a single-quoted literal.
fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        if c == '\\' || c == '\'' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('\'');
    out
}
