//! # Repository Log
//!
//! The repository log is the append-only, durable history of every string
//! change and the single source of truth for the current state of a
//! translation. Rows are never updated or deleted; the state of a component
//! at any moment is reconstructed by querying.
//!
//! ## Design
//!
//! The log is accessed through the [`RepositoryLog`] trait so that the
//! component factory and the staging area never depend on a concrete store.
//! Three queries are required by the rest of the crate:
//!
//! - **`latest`**: for every string of one component, the row with the
//!   greatest modification time (optionally bounded from above), with the
//!   row's `sequence` breaking ties.
//! - **`append`**: insert a batch of new rows as one atomic unit.
//! - **`components`**: distinct `(branch, language, component)` triples for
//!   discovery and tree views.
//!
//! Two implementations are provided:
//!
//! - [`MemoryLog`] keeps rows in a shared vector. It is used by tests and by
//!   embedders that persist rows themselves.
//! - [`FileLog`] stores one JSON line per committed batch. A batch is either
//!   fully present, newline included, or ignored, so a crash in the middle
//!   of a commit never exposes a partial set of rows.
//!
//! ## Concurrency
//!
//! Sequences are assigned while appends are serialized: [`MemoryLog`] holds
//! a mutex, [`FileLog`] an exclusive lock on the log file that also keeps out
//! other processes. Nothing here detects conflicting commits from two
//! sessions: the later append simply becomes the newest state.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use fd_lock::RwLock;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::entity::Metadata;
use crate::error::{Error, Result};

/// A row of the repository log, as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRow {
    /// Monotonic insertion order, assigned by the log.
    pub sequence: u64,
    /// Version code of the release line.
    pub branch: u32,
    pub language: String,
    pub component: String,
    pub string_id: String,
    pub text: Option<String>,
    /// Modification time in epoch seconds.
    pub modified_at: i64,
    pub deleted: bool,
    /// Commit message of the commit that appended this row.
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: Metadata,
}

/// A row waiting to be appended. The log assigns its sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRow {
    pub branch: u32,
    pub language: String,
    pub component: String,
    pub string_id: String,
    pub text: Option<String>,
    pub modified_at: i64,
    pub deleted: bool,
    pub message: String,
    pub metadata: Metadata,
}

impl NewRow {
    fn into_row(self, sequence: u64) -> LogRow {
        LogRow {
            sequence,
            branch: self.branch,
            language: self.language,
            component: self.component,
            string_id: self.string_id,
            text: self.text,
            modified_at: self.modified_at,
            deleted: self.deleted,
            message: self.message,
            metadata: self.metadata,
        }
    }
}

/// Parameters of the group-by-latest query for one component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotQuery {
    pub branch: u32,
    pub language: String,
    pub component: String,
    /// Only consider rows modified at or before this time.
    pub as_of: Option<i64>,
    /// Only consider these string identifiers.
    pub string_ids: Option<BTreeSet<String>>,
}

impl SnapshotQuery {
    pub fn new(branch: u32, language: &str, component: &str) -> Self {
        Self {
            branch,
            language: language.to_string(),
            component: component.to_string(),
            as_of: None,
            string_ids: None,
        }
    }

    fn matches(&self, row: &LogRow) -> bool {
        row.branch == self.branch
            && row.language == self.language
            && row.component == self.component
            && self.as_of.is_none_or(|t| row.modified_at <= t)
            && self
                .string_ids
                .as_ref()
                .is_none_or(|ids| ids.contains(&row.string_id))
    }
}

/// Optional filters for listing components. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentFilter {
    pub branch: Option<u32>,
    pub language: Option<String>,
    pub component: Option<String>,
}

impl ComponentFilter {
    fn matches(&self, row: &LogRow) -> bool {
        self.branch.is_none_or(|b| row.branch == b)
            && self.language.as_ref().is_none_or(|l| &row.language == l)
            && self.component.as_ref().is_none_or(|c| &row.component == c)
    }
}

/// A distinct `(branch, language, component)` combination present in the log.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ComponentTriple {
    pub branch: u32,
    pub language: String,
    pub component: String,
}

/// Full address of one string in the log.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StringKey {
    pub branch: u32,
    pub language: String,
    pub component: String,
    pub string_id: String,
}

impl StringKey {
    fn matches(&self, row: &LogRow) -> bool {
        row.branch == self.branch
            && row.language == self.language
            && row.component == self.component
            && row.string_id == self.string_id
    }
}

/// Access to the append-only repository log.
pub trait RepositoryLog: Send + Sync {
    /// For every string matching `query`, the winning row: greatest
    /// `modified_at`, then greatest `sequence`. Deleted winners are included.
    /// Rows are returned in string identifier order.
    fn latest(&self, query: &SnapshotQuery) -> Result<Vec<LogRow>>;

    /// Append `rows` as one atomic unit and return their sequences.
    fn append(&self, rows: Vec<NewRow>) -> Result<Vec<u64>>;

    /// Distinct components matching `filter`, ordered.
    fn components(&self, filter: &ComponentFilter) -> Result<Vec<ComponentTriple>>;

    /// Every row ever appended for one string, in sequence order.
    fn history(&self, key: &StringKey) -> Result<Vec<LogRow>>;
}

/// Pick the winning row per string identifier.
fn select_latest<'a>(
    rows: impl IntoIterator<Item = &'a LogRow>,
    query: &SnapshotQuery,
) -> Vec<LogRow> {
    let mut winners: BTreeMap<&str, &LogRow> = BTreeMap::new();
    for row in rows.into_iter().filter(|r| query.matches(r)) {
        let replace = winners.get(row.string_id.as_str()).is_none_or(|best| {
            (row.modified_at, row.sequence) > (best.modified_at, best.sequence)
        });
        if replace {
            winners.insert(&row.string_id, row);
        }
    }
    winners.into_values().cloned().collect()
}

fn distinct_components<'a>(
    rows: impl IntoIterator<Item = &'a LogRow>,
    filter: &ComponentFilter,
) -> Vec<ComponentTriple> {
    rows.into_iter()
        .filter(|r| filter.matches(r))
        .map(|r| ComponentTriple {
            branch: r.branch,
            language: r.language.clone(),
            component: r.component.clone(),
        })
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Components grouped as `branch -> language -> {component}`.
pub type ComponentsTree = BTreeMap<u32, BTreeMap<String, BTreeSet<String>>>;

/// Build the tree of all known components matching `filter`.
pub fn components_tree(log: &dyn RepositoryLog, filter: &ComponentFilter) -> Result<ComponentsTree> {
    let mut tree = ComponentsTree::new();
    for triple in log.components(filter)? {
        tree.entry(triple.branch)
            .or_default()
            .entry(triple.language)
            .or_default()
            .insert(triple.component);
    }
    Ok(tree)
}

/// In-memory repository log.
///
/// Clones share the same rows, so a clone handed to a stage observes every
/// append made through any other clone.
#[derive(Debug, Clone, Default)]
pub struct MemoryLog {
    rows: Arc<Mutex<Vec<LogRow>>>,
}

impl MemoryLog {
    /// Create a new empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of every row in insertion order.
    pub fn rows(&self) -> Result<Vec<LogRow>> {
        let rows = self.rows.lock().map_err(|_| Error::poisoned("memory log"))?;
        Ok(rows.clone())
    }

    /// Number of rows in the log
    pub fn len(&self) -> Result<usize> {
        let rows = self.rows.lock().map_err(|_| Error::poisoned("memory log"))?;
        Ok(rows.len())
    }

    /// Check if the log is empty
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl RepositoryLog for MemoryLog {
    fn latest(&self, query: &SnapshotQuery) -> Result<Vec<LogRow>> {
        let rows = self.rows.lock().map_err(|_| Error::poisoned("memory log"))?;
        Ok(select_latest(rows.iter(), query))
    }

    fn append(&self, new_rows: Vec<NewRow>) -> Result<Vec<u64>> {
        let mut rows = self.rows.lock().map_err(|_| Error::poisoned("memory log"))?;
        let first = rows.last().map_or(1, |r| r.sequence + 1);
        let mut sequences = Vec::with_capacity(new_rows.len());
        for (offset, row) in new_rows.into_iter().enumerate() {
            let sequence = first + offset as u64;
            sequences.push(sequence);
            rows.push(row.into_row(sequence));
        }
        Ok(sequences)
    }

    fn components(&self, filter: &ComponentFilter) -> Result<Vec<ComponentTriple>> {
        let rows = self.rows.lock().map_err(|_| Error::poisoned("memory log"))?;
        Ok(distinct_components(rows.iter(), filter))
    }

    fn history(&self, key: &StringKey) -> Result<Vec<LogRow>> {
        let rows = self.rows.lock().map_err(|_| Error::poisoned("memory log"))?;
        Ok(rows.iter().filter(|r| key.matches(r)).cloned().collect())
    }
}

/// One committed batch, stored as a single line.
#[derive(Debug, Serialize, Deserialize)]
struct Batch {
    rows: Vec<LogRow>,
}

/// Rows loaded from disk plus the length of the intact prefix of the file.
#[derive(Default)]
struct Loaded {
    rows: Vec<LogRow>,
    intact_len: u64,
    torn: bool,
}

/// Durable repository log stored as JSON lines.
///
/// Each line holds one committed batch. A line only counts once it is
/// complete, trailing newline included; a trailing partial line left by an
/// interrupted append is ignored when reading and cut off before the next
/// append.
///
/// Every access takes an advisory lock on the log file: shared for reads,
/// exclusive for an append. Separate handles on the same path, in one
/// process or in several, therefore never assign the same sequence twice.
#[derive(Debug)]
pub struct FileLog {
    path: PathBuf,
}

impl FileLog {
    /// Open (or lazily create) the log stored at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Loaded> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Loaded::default()),
            Err(e) => return Err(e.into()),
        };
        let lock = RwLock::new(file);
        let guard = lock.read()?;
        let mut file: &File = &guard;
        let mut content = String::new();
        file.read_to_string(&mut content)?;
        self.parse(&content)
    }

    fn parse(&self, content: &str) -> Result<Loaded> {
        let mut loaded = Loaded::default();
        for (index, line) in content.split_inclusive('\n').enumerate() {
            if !line.ends_with('\n') {
                warn!(
                    "Ignoring incomplete batch at the end of {} (interrupted commit)",
                    self.path.display()
                );
                loaded.torn = true;
                break;
            }
            loaded.intact_len += line.len() as u64;
            if line.trim().is_empty() {
                continue;
            }
            let batch: Batch = serde_json::from_str(line).map_err(|e| Error::Storage {
                message: format!(
                    "{} line {} is corrupt: {}",
                    self.path.display(),
                    index + 1,
                    e
                ),
            })?;
            loaded.rows.extend(batch.rows);
        }
        Ok(loaded)
    }
}

impl RepositoryLog for FileLog {
    fn latest(&self, query: &SnapshotQuery) -> Result<Vec<LogRow>> {
        let loaded = self.load()?;
        Ok(select_latest(loaded.rows.iter(), query))
    }

    fn append(&self, new_rows: Vec<NewRow>) -> Result<Vec<u64>> {
        if new_rows.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)?;
        let mut lock = RwLock::new(file);
        // Held until the batch is synced: load, numbering and write happen
        // as one step for every writer of this path.
        let guard = lock.write()?;
        let mut file: &File = &guard;

        let mut content = String::new();
        file.read_to_string(&mut content)?;
        let loaded = self.parse(&content)?;
        let first = loaded.rows.iter().map(|r| r.sequence).max().map_or(1, |s| s + 1);
        let rows: Vec<LogRow> = new_rows
            .into_iter()
            .enumerate()
            .map(|(offset, row)| row.into_row(first + offset as u64))
            .collect();
        let sequences = rows.iter().map(|r| r.sequence).collect();

        let mut line = serde_json::to_string(&Batch { rows })?;
        line.push('\n');

        if loaded.torn {
            file.set_len(loaded.intact_len)?;
        }
        file.write_all(line.as_bytes())?;
        file.sync_data()?;
        debug!("Appended batch {:?} to {}", sequences, self.path.display());
        Ok(sequences)
    }

    fn components(&self, filter: &ComponentFilter) -> Result<Vec<ComponentTriple>> {
        let loaded = self.load()?;
        Ok(distinct_components(loaded.rows.iter(), filter))
    }

    fn history(&self, key: &StringKey) -> Result<Vec<LogRow>> {
        let loaded = self.load()?;
        let mut rows: Vec<LogRow> = loaded.rows.into_iter().filter(|r| key.matches(r)).collect();
        rows.sort_by_key(|r| r.sequence);
        Ok(rows)
    }
}
