//! Default values for codesync configuration.
//!
//! This module provides centralized default values, including the built-in
//! policy document every user document is merged onto.

use std::path::{Path, PathBuf};

use serde_yaml::Value;

use crate::error::Result;

/// Newest configuration version this build understands.
pub const SUPPORTED_VERSION: &str = "0.8";

pub const DEFAULT_SRC_DIR: &str = "~/src";

/// Fallback when neither the repository nor its organization names a
/// default branch.
pub const DEFAULT_DEFAULT_BRANCH: &str = "main";

pub const DEFAULT_CONCURRENCY: usize = 4;

/// Name of the per-user configuration file in the home directory.
pub const CONFIG_FILE_NAME: &str = ".codesync.yaml";

/// The built-in policy.
///
/// Generic directories are left alone unless enabled, GitHub and GitLab
/// repositories are pulled while active and otherwise left untouched.
pub const DEFAULT_DOCUMENT: &str = r#"
version: 0.8
src_dir: ~/src
concurrency: 4
clean_on_raise: false
git:
  clone:
    args: []
  fetch:
    args: []
  pull:
    args: []
providers:
  generic:
    repos:
      /.*/:
        enabled: false
        state: active
        default_branch: main
  github.com:
    orgs:
      /.*/:
        enabled: true
        default_branches: [main]
        repos:
          /.*/:
            enabled: true
            clone_scheme: https
            actions:
              active: [pull]
              archived: []
              orphaned: []
  gitlab.com:
    groups:
      /.*/:
        default_branches: [main]
        projects:
          /.*/:
            clone_scheme: https
            actions:
              active: [pull]
              archived: []
              orphaned: []
"#;

/// Parse [`DEFAULT_DOCUMENT`].
pub fn default_document() -> Result<Value> {
    Ok(serde_yaml::from_str(DEFAULT_DOCUMENT)?)
}

/// Returns the default configuration file location, `~/.codesync.yaml`.
///
/// Falls back to the current directory when no home directory can be
/// determined.
pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_FILE_NAME)
}

/// Expand a leading `~` to the home directory.
pub fn expand_home(path: &str) -> PathBuf {
    let home = dirs::home_dir();
    match (path.strip_prefix('~'), home) {
        (Some(""), Some(home)) => home,
        (Some(rest), Some(home)) if rest.starts_with('/') || rest.starts_with('\\') => {
            home.join(&rest[1..])
        }
        _ => Path::new(path).to_path_buf(),
    }
}
