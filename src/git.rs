use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use log::debug;

use crate::error::Error;

/// Clone `url` into `target_dir`, including submodules.
///
/// This uses the system git command, which automatically handles:
/// - SSH keys from ~/.ssh/
/// - Git credential helpers
/// - Personal access tokens
/// - Any authentication configured in ~/.gitconfig
pub fn clone(url: &str, target_dir: &Path, args: &[String]) -> Result<(), Error> {
    // Create parent directory if it doesn't exist
    if let Some(parent) = target_dir.parent() {
        fs::create_dir_all(parent)?;
    }

    debug!("git clone {} {}", url, target_dir.display());
    let output = Command::new("git")
        .args(["clone", "--recurse-submodules", url])
        .arg(target_dir)
        .args(args)
        .output()
        .map_err(|e| Error::GitClone {
            url: url.to_string(),
            path: target_dir.display().to_string(),
            message: e.to_string(),
            hint: Some("Make sure git is installed and on PATH".to_string()),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);

        // Provide a hint for common auth failures
        let hint = if stderr.contains("Authentication failed")
            || stderr.contains("Permission denied")
            || stderr.contains("Could not read from remote repository")
        {
            Some(
                "Make sure you have access to the repository: add your SSH key to \
                 ssh-agent, configure git credentials, or switch clone_scheme"
                    .to_string(),
            )
        } else {
            None
        };

        return Err(Error::GitClone {
            url: url.to_string(),
            path: target_dir.display().to_string(),
            message: stderr.trim().to_string(),
            hint,
        });
    }

    Ok(())
}

/// `git fetch` in an existing working tree.
pub fn fetch(path: &Path, args: &[String]) -> Result<(), Error> {
    run(path, &["fetch"], args).map(|_| ())
}

/// `git pull` in an existing working tree.
pub fn pull(path: &Path, args: &[String]) -> Result<(), Error> {
    run(path, &["pull"], args).map(|_| ())
}

/// The branch HEAD points at, or `None` when HEAD is detached or unreadable.
pub fn head_branch(path: &Path) -> Result<Option<String>, Error> {
    let head = path.join(".git").join("HEAD");
    if !head.is_file() {
        return Ok(None);
    }
    let content = fs::read_to_string(head)?;
    Ok(parse_head(&content))
}

fn parse_head(content: &str) -> Option<String> {
    content
        .trim()
        .strip_prefix("ref: refs/heads/")
        .filter(|branch| !branch.is_empty())
        .map(str::to_string)
}

/// Delete local branches whose upstream is gone, except the one checked out.
///
/// Returns the names of the deleted branches.
pub fn prune_stale_branches(path: &Path) -> Result<Vec<String>, Error> {
    let output = run(
        path,
        &[
            "for-each-ref",
            "--format=%(refname:short) %(upstream:track)",
            "refs/heads",
        ],
        &[],
    )?;
    let stdout = String::from_utf8_lossy(&output.stdout);
    let current = head_branch(path)?;

    let stale: Vec<String> = parse_gone_branches(&stdout)
        .into_iter()
        .filter(|branch| Some(branch) != current.as_ref())
        .collect();

    for branch in &stale {
        debug!("Deleting stale branch {} in {}", branch, path.display());
        run(path, &["branch", "-D", branch], &[])?;
    }
    Ok(stale)
}

/// Branch names from `for-each-ref` output whose tracking state is `[gone]`.
pub fn parse_gone_branches(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| {
            let (branch, track) = line.trim().split_once(' ')?;
            (track.trim() == "[gone]").then(|| branch.to_string())
        })
        .collect()
}

fn run(path: &Path, command: &[&str], args: &[String]) -> Result<Output, Error> {
    let display = command.join(" ");
    debug!("git -C {} {}", path.display(), display);

    let output = Command::new("git")
        .arg("-C")
        .arg(path)
        .args(command)
        .args(args)
        .output()
        .map_err(|e| Error::GitCommand {
            command: display.clone(),
            path: path.display().to_string(),
            stderr: e.to_string(),
        })?;

    if !output.status.success() {
        return Err(Error::GitCommand {
            command: display,
            path: path.display().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(output)
}
