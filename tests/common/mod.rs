//! Shared test utilities for the CLI end-to-end tests.
//!
//! ## Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new().with_file("forum.php", sources::FORUM);
//!     fixture.command().args(["import", "forum.php"]).assert().success();
//! }
//! ```

use assert_fs::prelude::*;
use std::path::{Path, PathBuf};

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    pub use assert_fs::prelude::*;
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::sources;
    pub use super::TestFixture;
}

/// Declaration files used across tests.
#[allow(dead_code)]
pub mod sources {
    /// A small forum component in the legacy dialect.
    pub const FORUM: &str = r#"<?php
defined('MOODLE_INTERNAL') || die();

$string['modulename'] = 'Forum';
$string['greeting'] = 'Hello $a';
$string['cost'] = 'Cost: \$a';
"#;

    /// The forum component after one string was edited and one removed.
    pub const FORUM_EDITED: &str = r#"<?php
$string['modulename'] = 'Discussion forum';
$string['greeting'] = 'Hello $a';
"#;

    /// A source that declares nothing.
    pub const EMPTY: &str = "<?php\n// nothing translated yet\n";

    /// A source that is not in the restricted declaration format.
    pub const INVALID: &str = "<?php\necho 'hi';\n";
}

/// A temporary working directory with a `.langrepo.yaml` that keeps the
/// repository and the stages inside it.
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

impl TestFixture {
    /// Create a fixture with settings for language `en` on version 2.0.
    pub fn new() -> Self {
        let temp_dir = assert_fs::TempDir::new().expect("Failed to create temp directory");
        let settings = format!(
            "repository: {}\nstage_dir: {}\nactor: tester\ndefault_language: en\ndefault_version: '2.0'\n",
            temp_dir.path().join("repo.jsonl").display(),
            temp_dir.path().join("stages").display()
        );
        temp_dir
            .child(".langrepo.yaml")
            .write_str(&settings)
            .expect("Failed to write settings file");
        Self { temp_dir }
    }

    /// Add a file with the given path and content.
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.write(path, content);
        self
    }

    /// Write (or overwrite) a file in the fixture directory.
    pub fn write(&self, path: &str, content: &str) {
        self.temp_dir
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
    }

    /// Get the path to the temporary directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Location of the repository log.
    #[allow(dead_code)]
    pub fn repository(&self) -> PathBuf {
        self.path().join("repo.jsonl")
    }

    /// Create a command configured to run in this fixture's directory.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("langrepo");
        cmd.current_dir(self.path())
            .env_remove("LANGREPO_REPOSITORY")
            .env_remove("LANGREPO_CONFIG")
            .env_remove("RUST_LOG")
            .env("NO_COLOR", "1");
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}
