//! # langrepo
//!
//! A repository of translated UI strings for many concurrently maintained
//! release lines of a product. Every string is versioned on its own: changes
//! are proposed on a stage, reconciled with the recorded history, and
//! appended to an append-only log.
//!
//! ## Quick Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use langrepo::component::{Component, SnapshotOptions};
//! use langrepo::entity::StringEntity;
//! use langrepo::repository::MemoryLog;
//! use langrepo::stage::Stage;
//! use langrepo::version::{Version, MOODLE_20};
//!
//! let log = MemoryLog::new();
//! let version = Version::by_code(MOODLE_20).unwrap();
//!
//! let mut forum = Component::new("forum", "en", version);
//! forum.add_string(StringEntity::at("save", "Save", 1_000), false).unwrap();
//!
//! let mut stage = Stage::new(Arc::new(log.clone()));
//! stage.add(&forum, false).unwrap();
//! let summary = stage.commit("initial", None, false).unwrap();
//! assert_eq!(summary.rows(), 1);
//!
//! let snapshot =
//!     Component::from_snapshot(&log, "forum", "en", version, &SnapshotOptions::default()).unwrap();
//! assert_eq!(snapshot.get_string("save").unwrap().text.as_deref(), Some("Save"));
//! ```
//!
//! ## Core Concepts
//!
//! - **Versions (`version`)**: the fixed registry of release lines. Lines up
//!   to 1.9 use the legacy placeholder dialect.
//! - **Normalizer (`syntax`)**: sanitizes text and migrates legacy
//!   placeholders (`$a`) to the modern form (`{$a}`).
//! - **Strings and components (`entity`, `component`)**: a component holds
//!   the strings of one name, language and version. Components come from
//!   declaration files (`source`) or from log snapshots, and can be exported
//!   to their canonical location (`layout`).
//! - **Repository log (`repository`)**: the append-only history behind the
//!   [`RepositoryLog`](repository::RepositoryLog) trait, in memory or in a
//!   JSON-lines file.
//! - **Stage (`stage`)**: where proposed changes are rebased against the log
//!   and committed in one atomic batch.
//!
//! ## Execution Flow
//!
//! 1.  **Build**: load components from declaration files or snapshots.
//! 2.  **Stage**: merge them into a [`Stage`](stage::Stage).
//! 3.  **Rebase**: drop no-ops and stale edits, optionally delete strings
//!     that disappeared.
//! 4.  **Commit**: append what is left to the log and clear the stage.

pub mod component;
pub mod config;
pub mod defaults;
pub mod entity;
pub mod error;
pub mod layout;
pub mod output;
pub mod repository;
pub mod source;
pub mod stage;
pub mod suggestions;
pub mod syntax;
pub mod version;

mod syntax_proptest;
