//! # Staging Area
//!
//! The stage is the workspace where proposed string changes wait before they
//! become part of the repository log. Typical use:
//!
//! 1. build components from an import or a snapshot and [`Stage::add`] them,
//! 2. [`Stage::rebase`] the stage against the log,
//! 3. [`Stage::commit`] what survived, which appends one row per string.
//!
//! ## Rebase
//!
//! Rebasing compares every staged string with the *cap*, the state the log
//! held for the same component at the base timestamp, tombstones included.
//! Each staged string ends in one of the [`Fate`]s: genuinely new strings,
//! updates and deletions are kept; strings equal to the cap and strings
//! older than the cap are dropped. With `delete_missing`, strings the cap
//! has and the stage lacks are turned into deletions first.
//!
//! ## Persistence
//!
//! [`Stage`] lives in memory. [`PersistentStage`] wraps it for one owner and
//! delegates saving and reloading to a [`StageStore`] so a stage survives
//! between sessions. [`FileStageStore`] keeps one JSON document per owner.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::component::{Component, ComponentId, SnapshotOptions};
use crate::entity::{self, Metadata, StringEntity, differ};
use crate::error::{Error, Result};
use crate::repository::{NewRow, RepositoryLog};
use crate::version::Version;

/// Parameters of [`Stage::rebase`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RebaseOptions {
    /// Rebase against the state at this time; `None` for the latest state.
    pub base_timestamp: Option<i64>,
    /// Delete strings the cap has and the stage does not.
    pub delete_missing: bool,
    /// Modification time of injected deletions; defaults to now.
    pub delete_timestamp: Option<i64>,
}

impl RebaseOptions {
    fn validate(&self) -> Result<()> {
        if let Some(base) = self.base_timestamp.filter(|t| *t < 0) {
            return Err(Error::InvalidArgument {
                message: format!("base timestamp must not be negative, got {}", base),
            });
        }
        if let Some(ts) = self.delete_timestamp.filter(|t| *t < 0) {
            return Err(Error::InvalidArgument {
                message: format!("delete timestamp must not be negative, got {}", ts),
            });
        }
        Ok(())
    }
}

/// What rebase decided for one staged string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Fate {
    /// Not in the cap at all.
    KeptNew,
    /// Differs from the cap and is not older than it.
    KeptUpdate,
    /// Deletes a string the cap still has live.
    KeptDeletion,
    /// Same as the cap.
    DroppedNoOp,
    /// Older than the cap.
    DroppedStale,
}

impl Fate {
    pub fn is_kept(self) -> bool {
        matches!(self, Fate::KeptNew | Fate::KeptUpdate | Fate::KeptDeletion)
    }
}

impl fmt::Display for Fate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Fate::KeptNew => "new",
            Fate::KeptUpdate => "update",
            Fate::KeptDeletion => "deletion",
            Fate::DroppedNoOp => "unchanged",
            Fate::DroppedStale => "stale",
        };
        f.write_str(name)
    }
}

/// Decide the fate of `staged` against the cap's entity for the same id.
pub fn decide(staged: &StringEntity, cap: Option<&StringEntity>) -> Fate {
    let Some(cap) = cap else {
        return Fate::KeptNew;
    };
    if staged.deleted && !cap.deleted {
        Fate::KeptDeletion
    } else if !differ(staged, cap) {
        Fate::DroppedNoOp
    } else if staged.modified_at < cap.modified_at {
        Fate::DroppedStale
    } else {
        Fate::KeptUpdate
    }
}

/// Outcome of a rebase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RebaseReport {
    pub kept_new: usize,
    pub kept_update: usize,
    pub kept_deletion: usize,
    pub dropped_noop: usize,
    pub dropped_stale: usize,
    /// Deletions synthesized because of `delete_missing`.
    pub injected_deletions: usize,
    /// Components removed from the stage because nothing was left in them.
    pub emptied_components: Vec<ComponentId>,
}

impl RebaseReport {
    fn record(&mut self, fate: Fate) {
        match fate {
            Fate::KeptNew => self.kept_new += 1,
            Fate::KeptUpdate => self.kept_update += 1,
            Fate::KeptDeletion => self.kept_deletion += 1,
            Fate::DroppedNoOp => self.dropped_noop += 1,
            Fate::DroppedStale => self.dropped_stale += 1,
        }
    }

    /// Number of strings that survived.
    pub fn kept(&self) -> usize {
        self.kept_new + self.kept_update + self.kept_deletion
    }

    /// Number of strings removed from the stage.
    pub fn dropped(&self) -> usize {
        self.dropped_noop + self.dropped_stale
    }
}

/// Outcome of a commit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommitSummary {
    /// Sequences assigned to the appended rows, in append order.
    pub sequences: Vec<u64>,
    /// Components that contributed rows.
    pub components: Vec<ComponentId>,
    /// The rebase performed before committing, unless it was skipped.
    pub rebase: Option<RebaseReport>,
}

impl CommitSummary {
    pub fn rows(&self) -> usize {
        self.sequences.len()
    }
}

/// A workspace of proposed component changes.
pub struct Stage {
    log: Arc<dyn RepositoryLog>,
    components: BTreeMap<ComponentId, Component>,
}

impl fmt::Debug for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stage")
            .field("components", &self.components)
            .finish_non_exhaustive()
    }
}

impl Stage {
    /// Create an empty stage committing into `log`.
    pub fn new(log: Arc<dyn RepositoryLog>) -> Self {
        Self {
            log,
            components: BTreeMap::new(),
        }
    }

    /// The log this stage rebases against and commits into.
    pub fn log(&self) -> &Arc<dyn RepositoryLog> {
        &self.log
    }

    /// Merge a copy of `component`'s strings into the staged copy of it.
    ///
    /// Staging an empty component still tracks it, which is how a whole
    /// component is scheduled for deletion with `delete_missing`. Without
    /// `force`, a string that is already staged fails with
    /// [`Error::DuplicateIdentifier`] and nothing from `component` is staged.
    pub fn add(&mut self, component: &Component, force: bool) -> Result<()> {
        let id = component.identifier();
        let staged = self
            .components
            .entry(id)
            .or_insert_with(|| Component::new(&component.name, &component.language, component.version));
        if !force {
            if let Some(existing) = component.string_keys().find(|k| staged.has_string(Some(*k))) {
                return Err(Error::DuplicateIdentifier {
                    component: staged.identifier().to_string(),
                    id: existing.to_string(),
                });
            }
        }
        for entity in component.iter() {
            staged.add_string(entity.clone(), true)?;
        }
        debug!("Staged {} strings of {}", component.len(), staged.identifier());
        Ok(())
    }

    /// Remove every staged component.
    pub fn clear(&mut self) {
        self.components.clear();
    }

    /// The staged copy of a component, if any.
    pub fn get_component(&self, name: &str, language: &str, version: &Version) -> Option<&Component> {
        self.components.get(&ComponentId::new(name, language, version))
    }

    /// Whether the component is staged; with `None`, whether anything is.
    pub fn has_component(&self, id: Option<&ComponentId>) -> bool {
        match id {
            None => !self.components.is_empty(),
            Some(id) => self.components.contains_key(id),
        }
    }

    /// Staged components in identity order.
    pub fn iter(&self) -> impl Iterator<Item = &Component> {
        self.components.values()
    }

    /// Number of staged components.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Number of staged strings across every component.
    pub fn string_count(&self) -> usize {
        self.components.values().map(Component::len).sum()
    }

    /// Reconcile the stage with the log.
    pub fn rebase(&mut self, options: &RebaseOptions) -> Result<RebaseReport> {
        options.validate()?;
        let delete_timestamp = options.delete_timestamp.unwrap_or_else(entity::now);
        let snapshot = SnapshotOptions {
            as_of: options.base_timestamp,
            include_deleted: true,
            ..Default::default()
        };

        let mut report = RebaseReport::default();
        for (id, staged) in self.components.iter_mut() {
            let cap = Component::from_snapshot(
                self.log.as_ref(),
                &staged.name,
                &staged.language,
                staged.version,
                &snapshot,
            )?;

            if options.delete_missing {
                for capped in cap.iter().filter(|c| !c.deleted) {
                    if !staged.has_string(Some(capped.id.as_str())) {
                        staged.add_string(capped.clone().into_deletion(delete_timestamp), true)?;
                        report.injected_deletions += 1;
                    }
                }
            }

            let fates: Vec<(String, Fate)> = staged
                .iter()
                .map(|s| (s.id.clone(), decide(s, cap.get_string(&s.id))))
                .collect();
            for (string_id, fate) in fates {
                debug!("{} {}: {}", id, string_id, fate);
                report.record(fate);
                if !fate.is_kept() {
                    staged.remove_string(&string_id);
                }
            }
        }

        self.components.retain(|id, component| {
            if component.is_empty() {
                report.emptied_components.push(id.clone());
                false
            } else {
                true
            }
        });
        debug!(
            "Rebase kept {} and dropped {} strings",
            report.kept(),
            report.dropped()
        );
        Ok(report)
    }

    /// Append every staged string to the log in one atomic batch.
    ///
    /// Unless `skip_rebase` is set the stage is rebased with default options
    /// first. The stage is cleared only once the log accepted the batch; if
    /// the append fails the stage is left as it was after the rebase.
    pub fn commit(
        &mut self,
        message: &str,
        metadata: Option<&Metadata>,
        skip_rebase: bool,
    ) -> Result<CommitSummary> {
        let rebase = if skip_rebase {
            None
        } else {
            Some(self.rebase(&RebaseOptions::default())?)
        };

        let message = message.trim();
        let mut rows = Vec::new();
        let mut components = Vec::new();
        for (id, component) in &self.components {
            if component.is_empty() {
                continue;
            }
            components.push(id.clone());
            for entity in component.iter() {
                rows.push(NewRow {
                    branch: component.version.code,
                    language: component.language.clone(),
                    component: component.name.clone(),
                    string_id: entity.id.clone(),
                    text: entity.text.clone(),
                    modified_at: entity.modified_at,
                    deleted: entity.deleted,
                    message: message.to_string(),
                    metadata: metadata.cloned().unwrap_or_default(),
                });
            }
        }

        let sequences = if rows.is_empty() {
            Vec::new()
        } else {
            self.log.append(rows)?
        };
        self.components.clear();
        info!(
            "Committed {} strings from {} components",
            sequences.len(),
            components.len()
        );
        Ok(CommitSummary {
            sequences,
            components,
            rebase,
        })
    }
}

/// Saves and reloads the staged components of an owner.
pub trait StageStore: Send + Sync {
    /// Components previously saved for `owner`; empty if none were.
    fn load(&self, owner: &str) -> Result<Vec<Component>>;

    /// Replace whatever was saved for `owner` with `components`.
    fn save(&self, owner: &str, components: &[&Component]) -> Result<()>;

    /// Forget everything saved for `owner`.
    fn remove(&self, owner: &str) -> Result<()>;
}

/// A stage owned by one actor, saved between sessions.
pub struct PersistentStage {
    owner: String,
    store: Arc<dyn StageStore>,
    stage: Stage,
}

impl PersistentStage {
    /// Open the stage of `owner`, reloading whatever was persisted for it.
    pub fn open(owner: &str, log: Arc<dyn RepositoryLog>, store: Arc<dyn StageStore>) -> Result<Self> {
        let mut stage = Stage::new(log);
        for component in store.load(owner)? {
            stage.add(&component, true)?;
        }
        debug!("Opened stage of {} with {} components", owner, stage.len());
        Ok(Self {
            owner: owner.to_string(),
            store,
            stage,
        })
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Save the current state of the stage.
    pub fn persist(&self) -> Result<()> {
        let components: Vec<&Component> = self.stage.iter().collect();
        if components.is_empty() {
            return self.store.remove(&self.owner);
        }
        self.store.save(&self.owner, &components)
    }

    /// Clear the stage and forget what was persisted for the owner.
    pub fn discard(&mut self) -> Result<()> {
        self.stage.clear();
        self.store.remove(&self.owner)
    }
}

impl Deref for PersistentStage {
    type Target = Stage;

    fn deref(&self) -> &Stage {
        &self.stage
    }
}

impl DerefMut for PersistentStage {
    fn deref_mut(&mut self) -> &mut Stage {
        &mut self.stage
    }
}

/// Serialized form of a staged component.
#[derive(Debug, Serialize, Deserialize)]
struct StoredComponent {
    name: String,
    language: String,
    version: u32,
    strings: Vec<StringEntity>,
}

impl From<&Component> for StoredComponent {
    fn from(component: &Component) -> Self {
        Self {
            name: component.name.clone(),
            language: component.language.clone(),
            version: component.version.code,
            strings: component.iter().cloned().collect(),
        }
    }
}

impl StoredComponent {
    fn into_component(self) -> Result<Component> {
        let version = Version::by_code(self.version).ok_or_else(|| Error::UnknownVersion {
            value: self.version.to_string(),
        })?;
        let mut component = Component::new(&self.name, &self.language, version);
        for entity in self.strings {
            component.add_string(entity, true)?;
        }
        Ok(component)
    }
}

/// Stage store keeping one `<owner>.json` file per owner in a directory.
#[derive(Debug, Clone)]
pub struct FileStageStore {
    dir: PathBuf,
}

impl FileStageStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, owner: &str) -> Result<PathBuf> {
        let valid = !owner.is_empty()
            && owner
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@'))
            && !owner.starts_with('.');
        if !valid {
            return Err(Error::InvalidArgument {
                message: format!("invalid stage owner '{}'", owner),
            });
        }
        Ok(self.dir.join(format!("{}.json", owner)))
    }
}

impl StageStore for FileStageStore {
    fn load(&self, owner: &str) -> Result<Vec<Component>> {
        let path = self.path_for(owner)?;
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let stored: Vec<StoredComponent> = serde_json::from_str(&content).map_err(|e| Error::Storage {
            message: format!("stage file {} is corrupt: {}", path.display(), e),
        })?;
        stored.into_iter().map(StoredComponent::into_component).collect()
    }

    fn save(&self, owner: &str, components: &[&Component]) -> Result<()> {
        let path = self.path_for(owner)?;
        fs::create_dir_all(&self.dir)?;
        let stored: Vec<StoredComponent> = components.iter().map(|c| StoredComponent::from(*c)).collect();
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(&stored)?)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, owner: &str) -> Result<()> {
        let path = self.path_for(owner)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{ComponentFilter, ComponentTriple, LogRow, MemoryLog, SnapshotQuery, StringKey};
    use crate::version::{MOODLE_19, MOODLE_20};

    fn v20() -> &'static Version {
        Version::by_code(MOODLE_20).unwrap()
    }

    fn forum(strings: &[StringEntity]) -> Component {
        let mut c = Component::new("forum", "en", v20());
        for s in strings {
            c.add_string(s.clone(), false).unwrap();
        }
        c
    }

    fn seeded_log(strings: &[StringEntity]) -> MemoryLog {
        let log = MemoryLog::new();
        let mut stage = Stage::new(Arc::new(log.clone()));
        stage.add(&forum(strings), false).unwrap();
        stage.commit("seed", None, true).unwrap();
        log
    }

    /// Log whose appends always fail.
    struct FailingLog {
        inner: MemoryLog,
    }

    impl RepositoryLog for FailingLog {
        fn latest(&self, query: &SnapshotQuery) -> Result<Vec<LogRow>> {
            self.inner.latest(query)
        }

        fn append(&self, _rows: Vec<NewRow>) -> Result<Vec<u64>> {
            Err(Error::Storage {
                message: "disk full".to_string(),
            })
        }

        fn components(&self, filter: &ComponentFilter) -> Result<Vec<ComponentTriple>> {
            self.inner.components(filter)
        }

        fn history(&self, key: &StringKey) -> Result<Vec<LogRow>> {
            self.inner.history(key)
        }
    }

    #[test]
    fn test_decide() {
        let cap = StringEntity::at("x", "Save", 100);
        assert_eq!(decide(&StringEntity::at("x", "Save", 50), None), Fate::KeptNew);
        assert_eq!(decide(&StringEntity::at("x", " Save ", 200), Some(&cap)), Fate::DroppedNoOp);
        assert_eq!(decide(&StringEntity::at("x", "Old", 50), Some(&cap)), Fate::DroppedStale);
        assert_eq!(decide(&StringEntity::at("x", "New", 100), Some(&cap)), Fate::KeptUpdate);
        assert_eq!(decide(&StringEntity::at("x", "Save", 1).into_deletion(1), Some(&cap)), Fate::KeptDeletion);

        let gone = StringEntity::tombstone("x", 100);
        assert_eq!(decide(&StringEntity::tombstone("x", 200), Some(&gone)), Fate::DroppedNoOp);
        assert_eq!(decide(&StringEntity::at("x", "Back", 200), Some(&gone)), Fate::KeptUpdate);
    }

    #[test]
    fn test_add_merges_into_tracked_copy() {
        let mut stage = Stage::new(Arc::new(MemoryLog::new()));
        stage.add(&forum(&[StringEntity::at("a", "A", 1)]), false).unwrap();
        stage.add(&forum(&[StringEntity::at("b", "B", 1)]), false).unwrap();
        assert_eq!(stage.len(), 1);
        let staged = stage.get_component("forum", "en", v20()).unwrap();
        assert_eq!(staged.string_keys().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_add_is_a_deep_copy() {
        let mut stage = Stage::new(Arc::new(MemoryLog::new()));
        let mut source = forum(&[StringEntity::at("a", "A", 1)]);
        stage.add(&source, false).unwrap();
        source.add_string(StringEntity::at("a", "changed", 2), true).unwrap();
        let staged = stage.get_component("forum", "en", v20()).unwrap();
        assert_eq!(staged.get_string("a").unwrap().text.as_deref(), Some("A"));
    }

    #[test]
    fn test_add_duplicate_without_force() {
        let mut stage = Stage::new(Arc::new(MemoryLog::new()));
        stage.add(&forum(&[StringEntity::at("a", "A", 1)]), false).unwrap();
        let err = stage
            .add(&forum(&[StringEntity::at("a", "A2", 2), StringEntity::at("b", "B", 2)]), false)
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateIdentifier { .. }));
        let staged = stage.get_component("forum", "en", v20()).unwrap();
        assert_eq!(staged.len(), 1);

        stage.add(&forum(&[StringEntity::at("a", "A2", 2)]), true).unwrap();
        let staged = stage.get_component("forum", "en", v20()).unwrap();
        assert_eq!(staged.get_string("a").unwrap().text.as_deref(), Some("A2"));
    }

    #[test]
    fn test_has_component_and_clear() {
        let mut stage = Stage::new(Arc::new(MemoryLog::new()));
        assert!(!stage.has_component(None));
        let c = forum(&[StringEntity::at("a", "A", 1)]);
        stage.add(&c, false).unwrap();
        assert!(stage.has_component(None));
        assert!(stage.has_component(Some(&c.identifier())));
        let other = Component::new("forum", "en", Version::by_code(MOODLE_19).unwrap());
        assert!(!stage.has_component(Some(&other.identifier())));
        stage.clear();
        assert!(stage.is_empty());
    }

    #[test]
    fn test_rebase_drop_and_keep_rules() {
        let log = seeded_log(&[
            StringEntity::at("same", "Same", 100),
            StringEntity::at("stale", "Current", 100),
            StringEntity::at("update", "Before", 100),
        ]);
        let mut stage = Stage::new(Arc::new(log));
        stage
            .add(
                &forum(&[
                    StringEntity::at("same", "Same  ", 150),
                    StringEntity::at("stale", "Older", 50),
                    StringEntity::at("update", "After", 150),
                    StringEntity::at("fresh", "Fresh", 10),
                ]),
                false,
            )
            .unwrap();

        let report = stage.rebase(&RebaseOptions::default()).unwrap();
        assert_eq!(report.kept_new, 1);
        assert_eq!(report.kept_update, 1);
        assert_eq!(report.dropped_noop, 1);
        assert_eq!(report.dropped_stale, 1);
        let staged = stage.get_component("forum", "en", v20()).unwrap();
        assert_eq!(staged.string_keys().collect::<Vec<_>>(), vec!["fresh", "update"]);
    }

    #[test]
    fn test_rebase_drops_deletion_of_deleted_string() {
        let log = seeded_log(&[StringEntity::at("old", "Old", 100)]);
        let mut stage = Stage::new(Arc::new(log.clone()));
        stage.add(&forum(&[StringEntity::tombstone("old", 200)]), false).unwrap();
        stage.commit("remove", None, false).unwrap();
        assert_eq!(log.len().unwrap(), 2);

        stage.add(&forum(&[StringEntity::tombstone("old", 300)]), false).unwrap();
        let report = stage.rebase(&RebaseOptions::default()).unwrap();
        assert_eq!(report.dropped_noop, 1);
        assert!(stage.is_empty());
        assert_eq!(report.emptied_components.len(), 1);
    }

    #[test]
    fn test_rebase_delete_missing_injects_surviving_deletions() {
        let log = seeded_log(&[StringEntity::at("keep", "Keep", 100), StringEntity::at("drop", "Drop", 100)]);
        let mut stage = Stage::new(Arc::new(log));
        stage.add(&forum(&[StringEntity::at("keep", "Keep", 100)]), false).unwrap();

        let report = stage
            .rebase(&RebaseOptions {
                delete_missing: true,
                delete_timestamp: Some(500),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(report.injected_deletions, 1);
        assert_eq!(report.kept_deletion, 1);
        assert_eq!(report.dropped_noop, 1);

        let staged = stage.get_component("forum", "en", v20()).unwrap();
        let deletion = staged.get_string("drop").unwrap();
        assert!(deletion.deleted);
        assert_eq!(deletion.modified_at, 500);
        assert_eq!(deletion.text.as_deref(), Some("Drop"));
        assert!(!staged.has_string(Some("keep")));
    }

    #[test]
    fn test_rebase_against_base_timestamp() {
        let log = MemoryLog::new();
        let mut stage = Stage::new(Arc::new(log.clone()));
        stage.add(&forum(&[StringEntity::at("s", "One", 100)]), false).unwrap();
        stage.commit("one", None, true).unwrap();
        stage.add(&forum(&[StringEntity::at("s", "Two", 200)]), false).unwrap();
        stage.commit("two", None, true).unwrap();

        stage.add(&forum(&[StringEntity::at("s", "One", 300)]), false).unwrap();
        let report = stage
            .rebase(&RebaseOptions {
                base_timestamp: Some(150),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(report.dropped_noop, 1);

        stage.add(&forum(&[StringEntity::at("s", "One", 300)]), false).unwrap();
        let report = stage.rebase(&RebaseOptions::default()).unwrap();
        assert_eq!(report.kept_update, 1);
    }

    #[test]
    fn test_rebase_invalid_arguments() {
        let mut stage = Stage::new(Arc::new(MemoryLog::new()));
        let err = stage
            .rebase(&RebaseOptions {
                base_timestamp: Some(-1),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { .. }));

        let err = stage
            .rebase(&RebaseOptions {
                delete_missing: true,
                delete_timestamp: Some(-5),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { .. }));
    }

    #[test]
    fn test_rebase_ignores_delete_timestamp_without_delete_missing() {
        let log = seeded_log(&[StringEntity::at("old", "Old", 100)]);
        let mut stage = Stage::new(Arc::new(log));
        stage.add(&forum(&[StringEntity::at("new", "New", 200)]), false).unwrap();

        let report = stage
            .rebase(&RebaseOptions {
                delete_timestamp: Some(10),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(report.injected_deletions, 0);
        assert_eq!(report.kept_new, 1);
        let staged = stage.get_component("forum", "en", v20()).unwrap();
        assert!(!staged.has_string(Some("old")));
    }

    #[test]
    fn test_rebase_delete_missing_skips_existing_tombstones() {
        let log = seeded_log(&[StringEntity::at("gone", "Gone", 100), StringEntity::at("live", "Live", 100)]);
        let mut stage = Stage::new(Arc::new(log));
        stage
            .add(&forum(&[StringEntity::at("gone", "Gone", 100).into_deletion(200)]), false)
            .unwrap();
        stage.commit("delete gone", None, true).unwrap();

        stage.add(&forum(&[]), false).unwrap();
        let report = stage
            .rebase(&RebaseOptions {
                delete_missing: true,
                delete_timestamp: Some(300),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(report.injected_deletions, 1);
        assert_eq!(report.kept_deletion, 1);
        assert_eq!(report.dropped_noop, 0);
        let staged = stage.get_component("forum", "en", v20()).unwrap();
        assert!(staged.has_string(Some("live")));
        assert!(!staged.has_string(Some("gone")));
    }

    #[test]
    fn test_commit_appends_one_row_per_string() {
        let log = MemoryLog::new();
        let mut stage = Stage::new(Arc::new(log.clone()));
        stage
            .add(&forum(&[StringEntity::at("a", "A", 1), StringEntity::at("b", "B", 1)]), false)
            .unwrap();
        let metadata: Metadata = [("author".to_string(), "jdoe".to_string())].into_iter().collect();

        let summary = stage.commit("  initial import \n", Some(&metadata), false).unwrap();
        assert_eq!(summary.sequences, vec![1, 2]);
        assert_eq!(summary.components.len(), 1);
        assert_eq!(summary.rebase.as_ref().unwrap().kept_new, 2);
        assert!(stage.is_empty());

        let rows = log.rows().unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.message == "initial import"));
        assert!(rows.iter().all(|r| r.metadata["author"] == "jdoe"));
        assert_eq!(rows[0].branch, MOODLE_20);
    }

    #[test]
    fn test_commit_empty_stage() {
        let log = MemoryLog::new();
        let mut stage = Stage::new(Arc::new(log.clone()));
        let summary = stage.commit("nothing", None, false).unwrap();
        assert_eq!(summary.rows(), 0);
        assert!(log.is_empty().unwrap());
    }

    #[test]
    fn test_failed_commit_leaves_log_and_stage_untouched() {
        let failing = FailingLog {
            inner: seeded_log(&[StringEntity::at("a", "A", 1)]),
        };
        let inner = failing.inner.clone();
        let mut stage = Stage::new(Arc::new(failing));
        stage
            .add(&forum(&[StringEntity::at("a", "A2", 5), StringEntity::at("b", "B", 5)]), false)
            .unwrap();

        let err = stage.commit("boom", None, false).unwrap_err();
        assert!(matches!(err, Error::Storage { .. }));
        assert_eq!(inner.len().unwrap(), 1);
        assert_eq!(stage.string_count(), 2);
    }

    #[derive(Default)]
    struct MemoryStageStore {
        saved: std::sync::Mutex<BTreeMap<String, String>>,
    }

    impl StageStore for MemoryStageStore {
        fn load(&self, owner: &str) -> Result<Vec<Component>> {
            let saved = self.saved.lock().unwrap();
            match saved.get(owner) {
                None => Ok(Vec::new()),
                Some(json) => {
                    let stored: Vec<StoredComponent> = serde_json::from_str(json)?;
                    stored.into_iter().map(StoredComponent::into_component).collect()
                }
            }
        }

        fn save(&self, owner: &str, components: &[&Component]) -> Result<()> {
            let stored: Vec<StoredComponent> = components.iter().map(|c| StoredComponent::from(*c)).collect();
            self.saved
                .lock()
                .unwrap()
                .insert(owner.to_string(), serde_json::to_string(&stored)?);
            Ok(())
        }

        fn remove(&self, owner: &str) -> Result<()> {
            self.saved.lock().unwrap().remove(owner);
            Ok(())
        }
    }

    #[test]
    fn test_persistent_stage_survives_reopen() {
        let log: Arc<dyn RepositoryLog> = Arc::new(MemoryLog::new());
        let store: Arc<dyn StageStore> = Arc::new(MemoryStageStore::default());

        let mut first = PersistentStage::open("jdoe", log.clone(), store.clone()).unwrap();
        first.add(&forum(&[StringEntity::at("a", "A", 1)]), false).unwrap();
        first.persist().unwrap();

        let other = PersistentStage::open("alice", log.clone(), store.clone()).unwrap();
        assert!(other.is_empty());

        let mut second = PersistentStage::open("jdoe", log.clone(), store.clone()).unwrap();
        assert_eq!(second.owner(), "jdoe");
        assert_eq!(second.string_count(), 1);
        second.discard().unwrap();

        let third = PersistentStage::open("jdoe", log, store).unwrap();
        assert!(third.is_empty());
    }

    #[test]
    fn test_file_stage_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStageStore::new(dir.path().join("stages"));
        assert!(store.load("jdoe").unwrap().is_empty());

        let mut c = forum(&[StringEntity::at("a", "A", 1)]);
        c.add_string(StringEntity::tombstone("gone", 2), false).unwrap();
        store.save("jdoe", &[&c]).unwrap();

        let loaded = store.load("jdoe").unwrap();
        assert_eq!(loaded, vec![c]);

        store.remove("jdoe").unwrap();
        store.remove("jdoe").unwrap();
        assert!(store.load("jdoe").unwrap().is_empty());
    }

    #[test]
    fn test_file_stage_store_rejects_unsafe_owner() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStageStore::new(dir.path());
        assert!(matches!(store.load("../x"), Err(Error::InvalidArgument { .. })));
        assert!(matches!(store.load(""), Err(Error::InvalidArgument { .. })));
    }

    #[test]
    fn test_file_stage_store_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("jdoe.json"), "{not json").unwrap();
        let store = FileStageStore::new(dir.path());
        assert!(matches!(store.load("jdoe"), Err(Error::Storage { .. })));
    }
}
