//! # Sync Jobs
//!
//! A `Job` is the fully resolved side effect for one repository: exactly one
//! [`JobAction`] plus the independent `clean` flag. Jobs are built once by
//! the resolver and consumed by the execution pool; nothing in here looks at
//! the policy document again.

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use log::{info, warn};

use crate::action::{JobAction, RepoAction, RepoState};
use crate::config::GitArgs;
use crate::error::{Error, Result};
use crate::repository::GitOperations;

/// Everything a job needs from its surroundings to run.
#[derive(Clone)]
pub struct ExecContext {
    pub git: Arc<dyn GitOperations>,
    pub args: GitArgs,
    /// Log decisions without touching the working tree.
    pub dry_run: bool,
    /// Whether `clean` still runs after a `raise`.
    pub clean_on_raise: bool,
}

/// One repository's resolved work item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub provider: String,
    /// Scope-qualified name such as `acme/widgets` or `group/sub/project`.
    pub full_name: String,
    pub state: RepoState,
    pub path: PathBuf,
    pub clone_url: Option<String>,
    /// The candidate list the action was reduced from, kept for reporting.
    pub actions: Vec<RepoAction>,
    pub action: JobAction,
    pub clean: bool,
    /// Branches on which `pull` pulls; anywhere else it only fetches.
    pub default_branches: BTreeSet<String>,
    pub exists_locally: bool,
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.provider, self.full_name)
    }
}

impl Job {
    /// Run the primary action, then `clean` if requested.
    ///
    /// `clean` is skipped after `delete`. After a failed primary action it
    /// runs only for `raise` with `clean_on_raise` set; the primary error is
    /// returned either way.
    pub fn execute(&self, ctx: &ExecContext) -> Result<()> {
        info!(
            "{}: state={} action={} clean={}{}",
            self,
            self.state,
            self.action,
            self.clean,
            if ctx.dry_run { " (dry run)" } else { "" }
        );

        let clean = self.clean && self.action != JobAction::Delete;
        match self.run_action(ctx) {
            Ok(()) => {
                if clean {
                    self.run_clean(ctx)?;
                }
                Ok(())
            }
            Err(error) => {
                if clean && ctx.clean_on_raise && matches!(error, Error::NeedsAttention { .. }) {
                    if let Err(clean_error) = self.run_clean(ctx) {
                        warn!("{}: clean after raise failed: {}", self, clean_error);
                    }
                }
                Err(error)
            }
        }
    }

    fn run_action(&self, ctx: &ExecContext) -> Result<()> {
        match self.action {
            JobAction::Nop => Ok(()),
            JobAction::Raise => Err(self.needs_attention()),
            JobAction::Delete => {
                if self.exists_locally && !ctx.dry_run {
                    ctx.git.remove(&self.path)?;
                }
                Ok(())
            }
            JobAction::Clone => match &self.clone_url {
                Some(url) if !ctx.dry_run => {
                    ctx.git.clone_repository(url, &self.path, &ctx.args.clone)
                }
                Some(_) => Ok(()),
                None => {
                    warn!("{}: no clone URL, skipping clone", self);
                    Ok(())
                }
            },
            JobAction::Pull => {
                if ctx.dry_run {
                    return Ok(());
                }
                match ctx.git.current_branch(&self.path)? {
                    Some(branch) if self.default_branches.contains(&branch) => {
                        ctx.git.pull(&self.path, &ctx.args.pull)
                    }
                    Some(_) => ctx.git.fetch(&self.path, &ctx.args.fetch),
                    // Detached HEAD: leave the working tree alone.
                    None => Ok(()),
                }
            }
        }
    }

    fn run_clean(&self, ctx: &ExecContext) -> Result<()> {
        if ctx.dry_run {
            return Ok(());
        }
        let pruned = ctx.git.prune_stale_branches(&self.path)?;
        if !pruned.is_empty() {
            info!("{}: pruned {}", self, pruned.join(", "));
        }
        Ok(())
    }

    fn needs_attention(&self) -> Error {
        Error::NeedsAttention {
            provider: self.provider.clone(),
            full_name: self.full_name.clone(),
            state: self.state.to_string(),
            path: self.path.display().to_string(),
            clone_url: self.clone_url.clone(),
            actions: self.actions.iter().map(ToString::to_string).collect(),
        }
    }
}
