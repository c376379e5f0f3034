//! # Version Registry
//!
//! Static reference data describing the release lines ("versions") that
//! strings are tracked on. The set is compiled in and read-only: adding a new
//! release line is a change to [`VERSIONS`], never a runtime operation.
//!
//! Every lookup is a pure function over the table and returns a shared
//! `&'static Version`, so versions are never constructed ad hoc and never
//! mutated. An unknown code or branch tag is reported as `None`.
//!
//! ## Dialects
//!
//! Release lines up to and including [`LEGACY_BOUNDARY`] render placeholders
//! with the legacy syntax (`$a`, escaped dollars, doubled percent signs).
//! Later release lines use the modern brace syntax (`{$a}`). See
//! [`crate::syntax`] for the transformations between the two.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::syntax::Dialect;

/// Internal code of the 1.6 release line
pub const MOODLE_16: u32 = 1600;
/// Internal code of the 1.7 release line
pub const MOODLE_17: u32 = 1700;
/// Internal code of the 1.8 release line
pub const MOODLE_18: u32 = 1800;
/// Internal code of the 1.9 release line
pub const MOODLE_19: u32 = 1900;
/// Internal code of the 2.0 release line
pub const MOODLE_20: u32 = 2000;
/// Internal code of the 2.1 release line
pub const MOODLE_21: u32 = 2100;

/// The last release line that uses the legacy placeholder dialect.
pub const LEGACY_BOUNDARY: u32 = MOODLE_19;

/// A known release line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Version {
    /// Internal code stored in the repository log's `branch` column.
    pub code: u32,
    /// Human-readable label, e.g. `2.0`.
    pub label: &'static str,
    /// Name of the corresponding source-control branch.
    pub branch: &'static str,
    /// Directory name used when packaging this line's language packs.
    pub dir: &'static str,
    /// Whether strings on this line may be translated.
    pub translatable: bool,
    /// Whether translators should focus on this line.
    pub current: bool,
}

/// All known release lines, newest first.
pub static VERSIONS: &[Version] = &[
    Version {
        code: MOODLE_21,
        label: "2.1",
        branch: "MOODLE_21_STABLE",
        dir: "lang21",
        translatable: false,
        current: false,
    },
    Version {
        code: MOODLE_20,
        label: "2.0",
        branch: "MOODLE_20_STABLE",
        dir: "lang20",
        translatable: true,
        current: true,
    },
    Version {
        code: MOODLE_19,
        label: "1.9",
        branch: "MOODLE_19_STABLE",
        dir: "lang19",
        translatable: true,
        current: true,
    },
    Version {
        code: MOODLE_18,
        label: "1.8",
        branch: "MOODLE_18_STABLE",
        dir: "lang18",
        translatable: true,
        current: false,
    },
    Version {
        code: MOODLE_17,
        label: "1.7",
        branch: "MOODLE_17_STABLE",
        dir: "lang17",
        translatable: true,
        current: false,
    },
    Version {
        code: MOODLE_16,
        label: "1.6",
        branch: "MOODLE_16_STABLE",
        dir: "lang16",
        translatable: true,
        current: false,
    },
];

impl Version {
    /// Every known release line, newest first.
    pub fn all() -> &'static [Version] {
        VERSIONS
    }

    /// Look up a release line by its internal code.
    pub fn by_code(code: u32) -> Option<&'static Version> {
        VERSIONS.iter().find(|v| v.code == code)
    }

    /// Look up a release line by its branch tag, e.g. `MOODLE_20_STABLE`.
    pub fn by_branch(branch: &str) -> Option<&'static Version> {
        VERSIONS.iter().find(|v| v.branch == branch)
    }

    /// Look up a release line by its human-readable label, e.g. `1.9`.
    pub fn by_label(label: &str) -> Option<&'static Version> {
        VERSIONS.iter().find(|v| v.label == label)
    }

    /// Resolve user input that may be a code, a branch tag or a label.
    ///
    /// Codes are tried first, so `2000` and `2.0` resolve to the same line.
    pub fn resolve(value: &str) -> Option<&'static Version> {
        let value = value.trim();
        if let Some(version) = value.parse::<u32>().ok().and_then(Self::by_code) {
            return Some(version);
        }
        Self::by_branch(value).or_else(|| Self::by_label(value))
    }

    /// All translatable release lines keyed by code.
    pub fn list_translatable() -> BTreeMap<u32, &'static Version> {
        VERSIONS
            .iter()
            .filter(|v| v.translatable)
            .map(|v| (v.code, v))
            .collect()
    }

    /// True for release lines that still use the legacy placeholder dialect.
    pub fn is_legacy(&self) -> bool {
        self.code <= LEGACY_BOUNDARY
    }

    /// The placeholder dialect strings on this line are stored in.
    pub fn dialect(&self) -> Dialect {
        if self.is_legacy() {
            Dialect::Legacy
        } else {
            Dialect::Modern
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label, self.branch)
    }
}
