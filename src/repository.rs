//! # Working Tree Operations
//!
//! Jobs never call `git` directly. They go through the `GitOperations`
//! trait, which covers every side effect a job may have on a working tree:
//! cloning, fetching, pulling, reading the checked-out branch, pruning stale
//! branches and removing the tree altogether.
//!
//! In the main application `DefaultGitOperations` is used, which wraps the
//! system `git` command and the host filesystem. In tests it is replaced
//! with a recording mock so that job execution can be checked without
//! network access or real repositories.

use std::fs;
use std::path::Path;

use log::debug;

use crate::error::Result;

/// Trait for working tree operations - allows mocking in tests
pub trait GitOperations: Send + Sync {
    /// Clones `url` into `target_dir`, creating parent directories.
    fn clone_repository(&self, url: &str, target_dir: &Path, args: &[String]) -> Result<()>;

    fn fetch(&self, path: &Path, args: &[String]) -> Result<()>;

    fn pull(&self, path: &Path, args: &[String]) -> Result<()>;

    /// The checked-out branch, `None` when detached.
    fn current_branch(&self, path: &Path) -> Result<Option<String>>;

    /// Deletes local branches whose upstream is gone, never the checked-out
    /// one. Returns the deleted branch names.
    fn prune_stale_branches(&self, path: &Path) -> Result<Vec<String>>;

    /// Removes the working tree from disk.
    fn remove(&self, path: &Path) -> Result<()>;
}

/// The default implementation of `GitOperations`, which uses the system's
/// `git` command and the host filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultGitOperations;

impl GitOperations for DefaultGitOperations {
    fn clone_repository(&self, url: &str, target_dir: &Path, args: &[String]) -> Result<()> {
        crate::git::clone(url, target_dir, args)
    }

    fn fetch(&self, path: &Path, args: &[String]) -> Result<()> {
        crate::git::fetch(path, args)
    }

    fn pull(&self, path: &Path, args: &[String]) -> Result<()> {
        crate::git::pull(path, args)
    }

    fn current_branch(&self, path: &Path) -> Result<Option<String>> {
        crate::git::head_branch(path)
    }

    fn prune_stale_branches(&self, path: &Path) -> Result<Vec<String>> {
        crate::git::prune_stale_branches(path)
    }

    fn remove(&self, path: &Path) -> Result<()> {
        debug!("Removing {}", path.display());
        fs::remove_dir_all(path)?;
        Ok(())
    }
}
