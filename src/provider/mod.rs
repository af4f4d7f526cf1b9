//! # Providers
//!
//! A provider knows how repositories are laid out for one hosting service:
//! which scopes (organizations, groups) exist, how to list a scope's
//! repositories remotely, where they live on disk, and where their policy
//! lives in the document. Each directory under `src_dir` is handled by the
//! provider for that host name.
//!
//! Enumeration is the first pipeline stage. A provider queues one
//! [`ScopeJob`] per organization or group on its own [`WorkerPool`]; each
//! scope job lists remote and local repositories, resolves policy for every
//! one of them and submits the resulting [`Job`]s to the shared execution
//! pool in [`SyncContext`]. A scope that fails to list is recorded and does
//! not hold up the others.

pub mod generic;
pub mod github;
pub mod gitlab;
pub mod http;

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::action::RepoState;
use crate::config::ConfigStore;
use crate::error::Result;
use crate::job::Job;
use crate::pool::{Handler, WorkerPool};
use crate::resolve::{CloneUrls, RawRepo};
use crate::sync::Failure;

pub use generic::GenericProvider;
pub use github::{GitHubApi, GitHubProvider};
pub use gitlab::{GitLabApi, GitLabProvider};

/// A repository as reported by a hosting service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRepo {
    /// Directory name on disk: the repository name on GitHub, the project
    /// path slug on GitLab.
    pub name: String,
    pub clone_urls: CloneUrls,
    pub archived: bool,
    pub topics: Vec<String>,
}

/// Read-only access to a hosting service's API.
pub trait RepositorySource: Send + Sync {
    /// Every repository in `scope`.
    fn list_repositories(&self, scope: &str) -> Result<Vec<RemoteRepo>>;

    /// One repository, `None` when the service does not know it.
    fn get_repository(&self, scope: &str, name: &str) -> Result<Option<RemoteRepo>>;

    /// Whether `scope` names an organization, user or group.
    fn scope_exists(&self, scope: &str) -> Result<bool>;
}

/// One hosting service's share of a sync pass.
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;

    /// Enumerate and submit every scope. Returns enumeration failures.
    fn sync_all(&self, ctx: &SyncContext) -> Result<Vec<Failure>>;

    /// Enumerate and submit only `sub_path`: a scope, or a single repository
    /// inside one.
    fn sync_path(&self, ctx: &SyncContext, sub_path: &str) -> Result<Vec<Failure>>;
}

/// Shared state for one sync pass.
#[derive(Clone)]
pub struct SyncContext {
    /// The execution stage.
    pub executor: Arc<WorkerPool<Job>>,
    /// Worker count for enumeration pools.
    pub concurrency: usize,
    pub shutdown: Arc<AtomicBool>,
}

impl SyncContext {
    /// Hand a resolved job to the execution stage.
    pub fn submit(&self, job: Job) -> Result<()> {
        self.executor.push(job)
    }

    pub fn cancelled(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }
}

/// Enumeration work for one organization or group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeJob {
    pub provider: String,
    pub scope: String,
    /// List the scope through the API, not just the local directories.
    pub remote: bool,
    /// Restrict to one named repository, force-enabled.
    pub repo: Option<String>,
}

impl fmt::Display for ScopeJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.repo {
            Some(repo) => write!(f, "{}/{}/{}", self.provider, self.scope, repo),
            None => write!(f, "{}/{}", self.provider, self.scope),
        }
    }
}

/// Run `enumerate` over `scopes` on a fresh pool sized from `ctx`.
pub fn run_scopes(
    ctx: &SyncContext,
    provider: &str,
    scopes: Vec<ScopeJob>,
    enumerate: Handler<ScopeJob>,
) -> Result<Vec<Failure>> {
    let pool = WorkerPool::new(
        &format!("{}-scan", provider),
        ctx.concurrency,
        enumerate,
        Arc::clone(&ctx.shutdown),
    );
    pool.start()?;
    for scope in scopes {
        pool.push(scope)?;
    }
    Ok(pool.join()?.into_iter().map(Failure::from).collect())
}

/// Merge a remote listing with the directories found locally.
///
/// Remote repositories take their state from the archived flag. Local
/// directories missing from the listing are orphans.
pub fn discover(
    provider: &str,
    scope: &str,
    scope_dir: &Path,
    remote: Vec<RemoteRepo>,
    local: Vec<(PathBuf, String)>,
) -> Vec<RawRepo> {
    let remote_names: BTreeSet<String> = remote.iter().map(|r| r.name.clone()).collect();

    let mut repos: Vec<RawRepo> = remote
        .into_iter()
        .map(|repo| from_remote(provider, scope, scope_dir, repo))
        .collect();
    repos.extend(
        local
            .into_iter()
            .filter(|(_, name)| !remote_names.contains(name))
            .map(|(path, name)| RawRepo {
                provider: provider.to_string(),
                scope: scope.to_string(),
                name,
                state: RepoState::Orphaned,
                path,
                clone_urls: None,
                topics: Vec::new(),
                force_enable: false,
            }),
    );
    repos
}

/// A listed repository as a [`RawRepo`] under `scope_dir`.
pub fn from_remote(provider: &str, scope: &str, scope_dir: &Path, repo: RemoteRepo) -> RawRepo {
    RawRepo {
        provider: provider.to_string(),
        scope: scope.to_string(),
        path: scope_dir.join(&repo.name),
        state: RepoState::from_archived(repo.archived),
        clone_urls: Some(repo.clone_urls),
        topics: repo.topics,
        name: repo.name,
        force_enable: false,
    }
}

/// The provider for directory `host` under `src_dir`.
pub fn for_host(host: &str, src_dir: &Path, store: &Arc<ConfigStore>) -> Box<dyn Provider> {
    let root = src_dir.join(host);
    match host {
        github::PROVIDER => {
            let api = GitHubApi::from_config(store);
            Box::new(GitHubProvider::new(root, Arc::clone(store), Arc::new(api)))
        }
        gitlab::PROVIDER => {
            let api = GitLabApi::from_config(store);
            Box::new(GitLabProvider::new(root, Arc::clone(store), Arc::new(api)))
        }
        _ => Box::new(GenericProvider::new(host, root, Arc::clone(store))),
    }
}
