//! Shared test utilities for E2E tests.
//!
//! ## Usage
//!
//! Add `mod common;` to your test file, then use the helpers:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new().with_config(configs::GENERIC_DELETE);
//!     fixture.git_repo("git.example.org/tools");
//!     fixture.command().arg("sync").assert().success();
//! }
//! ```

use assert_fs::prelude::*;
use std::path::{Path, PathBuf};

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::configs;
    pub use super::TestFixture;
}

/// Configuration snippets. `src_dir` is added by [`TestFixture::with_config`].
#[allow(dead_code)]
pub mod configs {
    /// Built-in defaults only.
    pub const EMPTY: &str = "";

    /// Generic repositories: `tools` is deleted, `legacy` is raised,
    /// `keep` has nothing to do, anything else stays disabled.
    pub const GENERIC: &str = r#"
providers:
  generic:
    repos:
      tools:
        enabled: true
        actions:
          active: [delete]
      legacy:
        enabled: true
        actions:
          active: [raise]
      keep:
        enabled: true
        actions:
          active: []
"#;

    /// Declares a version newer than any this build understands.
    pub const FUTURE_VERSION: &str = "version: 9.0\n";

    /// Well-formed YAML that violates the schema.
    pub const BAD_CONCURRENCY: &str = "concurrency: lots\n";

    pub const INVALID_YAML: &str = "providers: [unclosed\n";
}

/// A temporary home holding a source tree (`src/`) and a config file.
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

impl TestFixture {
    /// Create a new fixture with an empty source tree.
    pub fn new() -> Self {
        let temp_dir = assert_fs::TempDir::new().expect("Failed to create temp directory");
        temp_dir
            .child("src")
            .create_dir_all()
            .expect("Failed to create src dir");
        Self { temp_dir }
    }

    /// Write the config file, pointing `src_dir` at this fixture's tree.
    pub fn with_config(self, content: &str) -> Self {
        let document = format!("src_dir: {}\n{}", self.src_dir().display(), content);
        self.temp_dir
            .child(".codesync.yaml")
            .write_str(&document)
            .expect("Failed to write config file");
        self
    }

    /// Write the config file verbatim.
    #[allow(dead_code)]
    pub fn with_raw_config(self, content: &str) -> Self {
        self.temp_dir
            .child(".codesync.yaml")
            .write_str(content)
            .expect("Failed to write config file");
        self
    }

    /// Create `src/<relative>/.git`.
    #[allow(dead_code)]
    pub fn git_repo(&self, relative: &str) -> PathBuf {
        let repo = self.src_dir().join(relative);
        std::fs::create_dir_all(repo.join(".git")).expect("Failed to create repo");
        repo
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn src_dir(&self) -> PathBuf {
        self.path().join("src")
    }

    pub fn config_path(&self) -> PathBuf {
        self.path().join(".codesync.yaml")
    }

    /// The binary with `HOME` set to the fixture and provider credentials
    /// cleared, so nothing outside the fixture is read.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("codesync");
        cmd.current_dir(self.path())
            .env("HOME", self.path())
            .env("NO_COLOR", "1")
            .env_remove("CODESYNC_CONFIG")
            .env_remove("GITHUB_TOKEN")
            .env_remove("GITLAB_TOKEN")
            .env_remove("RUST_LOG");
        cmd
    }

    /// [`command`](Self::command) with `--config-file` after `subcommand`.
    #[allow(dead_code)]
    pub fn command_with_config(&self, subcommand: &str) -> assert_cmd::Command {
        let mut cmd = self.command();
        cmd.arg(subcommand)
            .arg("--config-file")
            .arg(self.config_path());
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_writes_src_dir() {
        let fixture = TestFixture::new().with_config(configs::EMPTY);
        let content = std::fs::read_to_string(fixture.config_path()).unwrap();
        assert!(content.contains(&fixture.src_dir().display().to_string()));
    }

    #[test]
    fn test_configs_are_valid_yaml() {
        for config in [configs::GENERIC, configs::FUTURE_VERSION, configs::BAD_CONCURRENCY] {
            serde_yaml::from_str::<serde_yaml::Value>(config).expect("Config should be valid YAML");
        }
        assert!(serde_yaml::from_str::<serde_yaml::Value>(configs::INVALID_YAML).is_err());
    }
}
