//! # Output Styling
//!
//! Color handling for the command-line tool. Colors follow the `--color`
//! flag, and in `auto` mode the usual environment conventions:
//!
//! - `NO_COLOR` (any value) disables colors
//! - `CLICOLOR=0` disables colors
//! - `CLICOLOR_FORCE=1` forces colors even when stdout is not a terminal
//! - `TERM=dumb` disables colors

use std::env;

use console::{Style, style};

use crate::stage::Fate;

/// Whether command output should be colored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputStyle {
    pub use_color: bool,
}

impl OutputStyle {
    /// Resolve the `--color` flag (`always`, `never` or `auto`).
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };
        Self { use_color }
    }

    fn detect_color_support() -> bool {
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }
        if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            return false;
        }
        if env::var("CLICOLOR_FORCE").is_ok_and(|v| v != "0" && !v.is_empty()) {
            return true;
        }
        if env::var("TERM").is_ok_and(|v| v == "dumb") {
            return false;
        }
        console::Term::stdout().features().colors_supported()
    }

    pub fn plain() -> Self {
        Self { use_color: false }
    }

    fn paint(&self, text: &str, with: Style) -> String {
        if self.use_color {
            with.force_styling(true).apply_to(text).to_string()
        } else {
            text.to_string()
        }
    }

    /// Marker for a string whose latest row is a deletion.
    pub fn deleted(&self) -> String {
        self.paint("[deleted]", Style::new().red())
    }

    /// String identifiers and other keys.
    pub fn key(&self, text: &str) -> String {
        self.paint(text, Style::new().cyan())
    }

    /// Timestamps, sequences and other secondary detail.
    pub fn dim(&self, text: &str) -> String {
        self.paint(text, Style::new().dim())
    }

    /// A rebase decision, green when kept and yellow when dropped.
    pub fn fate(&self, fate: Fate) -> String {
        let label = fate.to_string();
        if fate.is_kept() {
            self.paint(&label, Style::new().green())
        } else {
            self.paint(&label, Style::new().yellow())
        }
    }

    /// Section headings.
    pub fn heading(&self, text: &str) -> String {
        if self.use_color {
            style(text).bold().force_styling(true).to_string()
        } else {
            text.to_string()
        }
    }
}

impl Default for OutputStyle {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}
