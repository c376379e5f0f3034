//! # Error Handling
//!
//! This module defines the centralized error type for the `langrepo` library.
//! It uses the `thiserror` library to build a single `Error` enum that covers
//! every failure mode of the string repository, with descriptive messages.
//!
//! ## Key Components
//!
//! - **`Error`**: The enum of all errors raised by the library. Each variant
//!   carries enough context (paths, identifiers, line numbers) to explain the
//!   failure without a debugger.
//!
//! - **`Result<T>`**: A type alias for `std::result::Result<T, Error>`, used
//!   throughout the crate.
//!
//! ## Soft failures
//!
//! Not everything that "fails" is an error. Looking up an unknown version
//! returns `None`, and reconstructing a snapshot of a component the log has
//! never seen returns an empty component. Importing a source that declares no
//! strings logs a warning and yields an empty component. Only the variants
//! below abort the current call, and none of them can corrupt rows that are
//! already committed to the repository log.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for langrepo operations
#[derive(Error, Debug)]
pub enum Error {
    /// The normalizer was asked for a dialect transition it does not define.
    ///
    /// Converting modern text back into the legacy dialect is the only
    /// combination that hits this today.
    #[error("Unsupported normalization: cannot convert {from} text into the {to} dialect")]
    UnsupportedNormalization { from: String, to: String },

    /// A string with this identifier is already present in the component and
    /// the caller did not ask to overwrite it.
    #[error("Duplicate string identifier '{id}' in component {component} (pass force to overwrite)")]
    DuplicateIdentifier { component: String, id: String },

    /// A declaration source could not be read.
    #[error("Unreadable source {}: {message}", path.display())]
    UnreadableSource { path: PathBuf, message: String },

    /// A declaration source was readable but is not in the restricted format.
    #[error("Syntax error in {} at line {line}: {message}", path.display())]
    SourceSyntax {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// A malformed parameter was passed to a staging operation.
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// A component could not be written to its export destination.
    #[error("Export to {} failed: {message}", path.display())]
    Export { path: PathBuf, message: String },

    /// A version code, branch tag or label that is not in the registry.
    #[error("Unknown version: {value}")]
    UnknownVersion { value: String },

    /// A plugin type with no known storage directory.
    #[error("Unknown plugin type: {plugin_type}")]
    UnknownPluginType { plugin_type: String },

    /// The durable repository log is unreadable or inconsistent.
    #[error("Repository storage error: {message}")]
    Storage { message: String },

    /// An error occurred while parsing the `.langrepo.yaml` settings file.
    #[error("Configuration parsing error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    ConfigParse {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// An error indicating that a mutex guarding shared state has been poisoned.
    #[error("Lock poisoned: {context}")]
    LockPoisoned { context: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON error, wrapped from `serde_json::Error`.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Build a `LockPoisoned` error for the named piece of shared state.
    pub(crate) fn poisoned(context: &str) -> Self {
        Error::LockPoisoned {
            context: context.to_string(),
        }
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
