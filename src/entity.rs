//! Translated string value objects

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::syntax;

/// Free-form key/value columns attached to a string or a commit.
pub type Metadata = BTreeMap<String, String>;

/// Current time as epoch seconds.
pub fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

/// A single translated string.
///
/// Identity is `id`, which is unique within the owning
/// [`Component`](crate::component::Component). The entity holds no reference
/// back to its component; the component owns it by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringEntity {
    /// String identifier, e.g. `savechanges`.
    pub id: String,
    /// Text of the string. `None` for rows that carry no text.
    pub text: Option<String>,
    /// Modification time in epoch seconds.
    pub modified_at: i64,
    /// Whether this entity marks the string as deleted.
    #[serde(default)]
    pub deleted: bool,
    /// Additional columns, present only when explicitly requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<Metadata>,
}

impl StringEntity {
    /// Create a live string modified right now.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::at(id, text, now())
    }

    /// Create a live string with an explicit modification time.
    pub fn at(id: impl Into<String>, text: impl Into<String>, modified_at: i64) -> Self {
        Self {
            id: id.into(),
            text: Some(text.into()),
            modified_at,
            deleted: false,
            extra: None,
        }
    }

    /// Create a tombstone for `id` at `modified_at`.
    pub fn tombstone(id: impl Into<String>, modified_at: i64) -> Self {
        Self {
            id: id.into(),
            text: None,
            modified_at,
            deleted: true,
            extra: None,
        }
    }

    /// Turn this entity into a deletion of itself at `modified_at`.
    ///
    /// The text is kept so the tombstone still records what was removed.
    pub fn into_deletion(mut self, modified_at: i64) -> Self {
        self.deleted = true;
        self.modified_at = modified_at;
        self
    }

    /// Text or an empty string.
    pub fn text_or_empty(&self) -> &str {
        self.text.as_deref().unwrap_or_default()
    }
}

/// Returns true if the two strings should be considered different.
///
/// Two deleted strings never differ, whatever their text. A missing text
/// differs from any present text. Present texts are compared after
/// [`syntax::trim`]; any other difference counts.
pub fn differ(a: &StringEntity, b: &StringEntity) -> bool {
    if a.deleted && b.deleted {
        return false;
    }
    match (&a.text, &b.text) {
        (None, None) => false,
        (None, Some(_)) | (Some(_), None) => true,
        (Some(x), Some(y)) => syntax::trim(x) != syntax::trim(y),
    }
}
