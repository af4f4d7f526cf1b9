//! Local directory discovery under the source tree.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use glob::Pattern;
use walkdir::WalkDir;

use crate::error::Result;

/// Directories under `dir` matching the glob `pattern`, sorted, with their
/// final path component.
///
/// A missing `dir` yields nothing.
pub fn path_glob(dir: &Path, pattern: &str) -> Result<Vec<(PathBuf, String)>> {
    let base = Pattern::escape(&dir.to_string_lossy());
    let full = format!("{}/{}", base.trim_end_matches('/'), pattern);

    let mut dirs: Vec<(PathBuf, String)> = glob::glob(&full)?
        .filter_map(|entry| entry.ok())
        .filter(|path| path.is_dir())
        .filter_map(|path| {
            let name = path.file_name()?.to_string_lossy().into_owned();
            Some((path, name))
        })
        .collect();
    dirs.sort();
    Ok(dirs)
}

/// Immediate subdirectories of `dir`.
pub fn child_dirs(dir: &Path) -> Result<Vec<(PathBuf, String)>> {
    path_glob(dir, "*")
}

/// Whether `path` is the top of a git working tree.
pub fn is_git_repo(path: &Path) -> bool {
    path.join(".git").exists()
}

/// Every directory below `root` that is not inside a working tree, as a
/// `/`-separated path relative to `root`.
///
/// These are the candidate (sub)group names for providers with nested
/// namespaces: `a`, `a/b` and `a/b/c` for `root/a/b/c/repo/.git`.
pub fn local_group_names(root: &Path) -> BTreeSet<String> {
    WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| entry.file_type().is_dir() && !is_git_repo(entry.path()))
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let relative = entry.path().strip_prefix(root).ok()?;
            let parts: Vec<String> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            Some(parts.join("/"))
        })
        .collect()
}
