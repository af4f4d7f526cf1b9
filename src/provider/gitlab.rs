//! GitLab: groups, possibly nested, holding projects.
//!
//! Policy lives under `providers.gitlab.com.groups.<group>` with
//! `projects.<project>` below it, where `<group>` is the full path such as
//! `team/infra`. A subgroup without its own entry falls back to its parent
//! groups' literal entries before the provider-wide pattern applies.
//!
//! A group's `enabled` has three states: `false` skips it, `true` lists it
//! through the API, and unset syncs only the projects already on disk.

use std::collections::BTreeSet;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info, warn};
use serde::de::IgnoredAny;
use serde::Deserialize;

use super::http::{encode_segment, ApiClient};
use super::{
    discover, from_remote, run_scopes, Provider, RemoteRepo, RepositorySource, ScopeJob,
    SyncContext,
};
use crate::action::RepoState;
use crate::config::{ConfigStore, ConfigView};
use crate::error::Result;
use crate::path::{child_dirs, is_git_repo, local_group_names};
use crate::resolve::{first, resolve, CloneUrls, RawRepo, RepoPolicy};
use crate::sync::Failure;

pub const PROVIDER: &str = "gitlab.com";

const API_URL: &str = "https://gitlab.com/api/v4";

/// GitLab REST API client.
#[derive(Clone)]
pub struct GitLabApi {
    client: ApiClient,
}

#[derive(Debug, Deserialize)]
struct Project {
    path: String,
    http_url_to_repo: String,
    ssh_url_to_repo: String,
    #[serde(default)]
    archived: bool,
    #[serde(default)]
    topics: Vec<String>,
}

impl From<Project> for RemoteRepo {
    fn from(project: Project) -> Self {
        RemoteRepo {
            name: project.path,
            clone_urls: CloneUrls {
                https: project.http_url_to_repo,
                ssh: project.ssh_url_to_repo,
            },
            archived: project.archived,
            topics: project.topics,
        }
    }
}

impl GitLabApi {
    pub fn new(token: Option<String>) -> Self {
        let mut client = ApiClient::new(PROVIDER, API_URL);
        if let Some(token) = token {
            client = client.with_header("PRIVATE-TOKEN", &token);
        }
        Self { client }
    }

    /// Token from `providers.gitlab.com.auth.token`, else `$GITLAB_TOKEN`.
    pub fn from_config(store: &ConfigStore) -> Self {
        let token = store
            .get::<String>(&["providers", PROVIDER, "auth", "token"])
            .or_else(|| env::var("GITLAB_TOKEN").ok());
        Self::new(token)
    }
}

impl RepositorySource for GitLabApi {
    fn list_repositories(&self, scope: &str) -> Result<Vec<RemoteRepo>> {
        let path = format!("/groups/{}/projects", encode_segment(scope));
        let projects: Vec<Project> = self.client.get_pages(scope, &path, &[])?;
        Ok(projects.into_iter().map(RemoteRepo::from).collect())
    }

    fn get_repository(&self, scope: &str, name: &str) -> Result<Option<RemoteRepo>> {
        let path = format!("/projects/{}", encode_segment(&format!("{}/{}", scope, name)));
        Ok(self
            .client
            .get_json::<Project>(scope, &path, &[])?
            .map(RemoteRepo::from))
    }

    fn scope_exists(&self, scope: &str) -> Result<bool> {
        let path = format!("/groups/{}", encode_segment(scope));
        Ok(self.client.get_json::<IgnoredAny>(scope, &path, &[])?.is_some())
    }
}

/// Syncs `<src_dir>/gitlab.com`.
#[derive(Clone)]
pub struct GitLabProvider {
    root: PathBuf,
    config: ConfigView,
    source: Arc<dyn RepositorySource>,
}

/// `a/b/c`, `a/b`, `a`.
fn group_lineage(group: &str) -> Vec<&str> {
    let mut lineage = vec![group];
    let mut current = group;
    while let Some((parent, _)) = current.rsplit_once('/') {
        lineage.push(parent);
        current = parent;
    }
    lineage
}

impl GitLabProvider {
    pub fn new(root: PathBuf, store: Arc<ConfigStore>, source: Arc<dyn RepositorySource>) -> Self {
        Self {
            root,
            config: ConfigView::root(store, &["providers", PROVIDER]),
            source,
        }
    }

    /// Groups named in config plus every local directory that is not a
    /// working tree.
    fn group_names(&self) -> BTreeSet<String> {
        let mut groups: BTreeSet<String> = self
            .config
            .store()
            .literal_keys(&["providers", PROVIDER, "groups"])
            .into_iter()
            .collect();
        groups.extend(local_group_names(&self.root));
        groups
    }

    /// Literal entries for the group and its ancestors, then the pattern.
    fn group_views(&self, group: &str) -> Vec<ConfigView> {
        let mut views: Vec<ConfigView> = group_lineage(group)
            .into_iter()
            .map(|name| self.config.scope_literal("groups", name))
            .collect();
        views.push(self.config.scope_wildcard("groups", group));
        views
    }

    fn group_enabled(&self, group: &str) -> Option<bool> {
        first(&self.group_views(group), &["enabled"])
    }

    fn policy(&self, group: &str, project: &str) -> RepoPolicy {
        let groups = self.group_views(group);
        let literal = &groups[..groups.len() - 1];
        RepoPolicy {
            exact: literal
                .iter()
                .map(|view| view.child(&["projects", project]))
                .collect(),
            topics: Vec::new(),
            repo: groups
                .iter()
                .map(|view| view.scope("projects", project))
                .collect(),
            groups,
            enabled_by_default: true,
            default_branch: None,
        }
    }

    fn scope_job(group: &str, remote: bool, project: Option<&str>) -> ScopeJob {
        ScopeJob {
            provider: PROVIDER.to_string(),
            scope: group.to_string(),
            remote,
            repo: project.map(str::to_string),
        }
    }

    fn enumerate(&self, ctx: &SyncContext, job: &ScopeJob) -> Result<()> {
        let group = job.scope.as_str();
        let scope_dir = self.root.join(group);

        let repos: Vec<RawRepo> = match &job.repo {
            Some(project) => self.single(group, project, &scope_dir)?.into_iter().collect(),
            None => {
                let remote = if job.remote {
                    let remote = self.source.list_repositories(group)?;
                    debug!("{}/{}: {} remote projects", PROVIDER, group, remote.len());
                    remote
                } else {
                    Vec::new()
                };
                let local: Vec<(PathBuf, String)> = child_dirs(&scope_dir)?
                    .into_iter()
                    .filter(|(path, _)| is_git_repo(path))
                    .collect();
                discover(PROVIDER, group, &scope_dir, remote, local)
                    .into_iter()
                    .map(|raw| self.confirm_orphan(raw))
                    .collect::<Result<_>>()?
            }
        };

        for raw in repos {
            if ctx.cancelled() {
                break;
            }
            let policy = self.policy(group, &raw.name);
            if let Some(synced) = resolve(raw, &policy) {
                ctx.submit(synced.into_job())?;
            }
        }
        Ok(())
    }

    /// A local project missing from the listing (or not listed at all) is
    /// only orphaned when the API does not know it.
    fn confirm_orphan(&self, raw: RawRepo) -> Result<RawRepo> {
        if raw.state != RepoState::Orphaned {
            return Ok(raw);
        }
        match self.source.get_repository(&raw.scope, &raw.name)? {
            Some(remote) => {
                let scope_dir = self.root.join(&raw.scope);
                Ok(from_remote(PROVIDER, &raw.scope, &scope_dir, remote))
            }
            None => Ok(raw),
        }
    }

    fn single(&self, group: &str, project: &str, scope_dir: &Path) -> Result<Option<RawRepo>> {
        let path = scope_dir.join(project);
        let mut repo = match self.source.get_repository(group, project)? {
            Some(remote) => from_remote(PROVIDER, group, scope_dir, remote),
            None if path.exists() => RawRepo {
                provider: PROVIDER.to_string(),
                scope: group.to_string(),
                name: project.to_string(),
                state: RepoState::Orphaned,
                path,
                clone_urls: None,
                topics: Vec::new(),
                force_enable: false,
            },
            None => {
                warn!("{}/{}/{} not found remotely or locally", PROVIDER, group, project);
                return Ok(None);
            }
        };
        repo.force_enable = true;
        Ok(Some(repo))
    }

    fn run(&self, ctx: &SyncContext, scopes: Vec<ScopeJob>) -> Result<Vec<Failure>> {
        let this = self.clone();
        let worker_ctx = ctx.clone();
        run_scopes(
            ctx,
            PROVIDER,
            scopes,
            Arc::new(move |job: &ScopeJob| this.enumerate(&worker_ctx, job)),
        )
    }
}

impl Provider for GitLabProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn sync_all(&self, ctx: &SyncContext) -> Result<Vec<Failure>> {
        let mut scopes = Vec::new();
        for group in self.group_names() {
            match self.group_enabled(&group) {
                Some(false) => info!("{}/{}: enabled=false", PROVIDER, group),
                enabled => scopes.push(Self::scope_job(&group, enabled == Some(true), None)),
            }
        }
        self.run(ctx, scopes)
    }

    fn sync_path(&self, ctx: &SyncContext, sub_path: &str) -> Result<Vec<Failure>> {
        let sub_path = sub_path.trim_matches('/');
        let (group, project) = if self.source.scope_exists(sub_path)? {
            (sub_path, None)
        } else {
            match sub_path.rsplit_once('/') {
                Some((group, project)) => (group, Some(project)),
                None => (sub_path, None),
            }
        };

        let enabled = self.group_enabled(group);
        if enabled == Some(false) {
            warn!("{}/{} is disabled in config", PROVIDER, group);
        }
        self.run(ctx, vec![Self::scope_job(group, enabled == Some(true), project)])
    }
}
