//! # Placeholder Syntax Normalizer
//!
//! Pure text transformations between the two placeholder dialects used by
//! translated strings.
//!
//! - **Legacy** strings are evaluated by a string formatter that expands
//!   `$a` and `$a->property` placeholders, so literal dollar signs must be
//!   escaped as `\$`, double quotes as `\"`, and percent signs are doubled.
//! - **Modern** strings only expand the brace forms `{$a}` and
//!   `{$a->property}` and store everything else literally.
//!
//! Three transitions are defined:
//!
//! | from   | to     | purpose                                   |
//! |--------|--------|-------------------------------------------|
//! | modern | modern | sanitize a new translation                |
//! | legacy | legacy | sanitize a string kept on a legacy line   |
//! | legacy | modern | migrate a legacy string onto a modern line |
//!
//! Converting modern text back into the legacy dialect is not supported and
//! reported as [`Error::UnsupportedNormalization`].

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Placeholder dialect of a string's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// `$a` placeholders, escaped dollars and quotes, doubled percent signs.
    Legacy,
    /// `{$a}` placeholders, everything else literal.
    Modern,
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::Legacy => f.write_str("legacy"),
            Dialect::Modern => f.write_str("modern"),
        }
    }
}

impl FromStr for Dialect {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "legacy" | "1" => Ok(Dialect::Legacy),
            "modern" | "2" => Ok(Dialect::Modern),
            other => Err(Error::InvalidArgument {
                message: format!("unknown dialect '{}' (expected legacy or modern)", other),
            }),
        }
    }
}

/// Stands in for `\$` while backslashes are being stripped.
const ESCAPED_DOLLAR: &str = "\u{E000}";

static BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid blank line pattern"));

static PERCENT_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%+").expect("valid percent pattern"));

// No look-behind in `regex`: the preceding character is captured and put back.
static BARE_PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(^|[^{])\$a\b(->[a-zA-Z0-9_]+)?").expect("valid placeholder pattern")
});

static ESCAPED_PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\\$a\b(->[a-zA-Z0-9_]+)?").expect("valid escaped placeholder pattern")
});

/// Strip the blanks translators leave around a string: space, tab, line
/// breaks, NUL and vertical tab. Other whitespace, such as a no-break space
/// or an ideographic space, is part of the text and kept.
pub fn trim(text: &str) -> &str {
    text.trim_matches(&[' ', '\t', '\n', '\r', '\0', '\x0B'][..])
}

/// Normalize `text` written in the `from` dialect into the `to` dialect.
pub fn normalize(text: &str, to: Dialect, from: Dialect) -> Result<String> {
    match (from, to) {
        (Dialect::Modern, Dialect::Modern) => Ok(sanitize_modern(text)),
        (Dialect::Legacy, Dialect::Modern) => Ok(migrate_legacy(text)),
        (Dialect::Legacy, Dialect::Legacy) => Ok(sanitize_legacy(text)),
        (Dialect::Modern, Dialect::Legacy) => Err(Error::UnsupportedNormalization {
            from: from.to_string(),
            to: to.to_string(),
        }),
    }
}

/// Normalize `text` that is already in `dialect`.
pub fn sanitize(text: &str, dialect: Dialect) -> String {
    match dialect {
        Dialect::Modern => sanitize_modern(text),
        Dialect::Legacy => sanitize_legacy(text),
    }
}

fn sanitize_modern(text: &str) -> String {
    let clean = trim(text).replace('\r', "").replace('\\', "");
    let clean = BLANK_LINES.replace_all(&clean, "\n\n\n");
    // Stripping may expose surrounding whitespace; trim again so a second
    // pass is a no-op.
    trim(&clean).to_string()
}

fn migrate_legacy(text: &str) -> String {
    let clean = trim(text).replace('\r', "");
    let clean = BLANK_LINES.replace_all(&clean, "\n\n\n");
    let clean = PERCENT_RUNS.replace_all(&clean, "%");
    let clean = clean.replace("\\$", ESCAPED_DOLLAR).replace('\\', "");
    let clean = BARE_PLACEHOLDER.replace_all(&clean, |caps: &Captures<'_>| {
        format!(
            "{}{{$a{}}}",
            &caps[1],
            caps.get(2).map_or("", |m| m.as_str())
        )
    });
    clean.replace(ESCAPED_DOLLAR, "$").replace("&#36;", "$")
}

fn sanitize_legacy(text: &str) -> String {
    let clean = trim(text).replace('\r', "");
    let clean = BLANK_LINES.replace_all(&clean, "\n\n");
    let clean = clean
        .replace("\\$", ESCAPED_DOLLAR)
        .replace('\\', "")
        .replace('$', "\\$");
    let clean = ESCAPED_PLACEHOLDER.replace_all(&clean, |caps: &Captures<'_>| {
        format!("$a{}", caps.get(1).map_or("", |m| m.as_str()))
    });
    let clean = clean.replace(ESCAPED_DOLLAR, "\\$").replace('"', "\\\"");
    let clean = PERCENT_RUNS.replace_all(&clean, "%");
    clean.replace('%', "%%")
}
