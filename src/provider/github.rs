//! GitHub: organizations and users, each holding repositories.
//!
//! Policy lives under `providers.github.com.orgs.<org>`, with
//! `repos.<repo>` and `topics.<topic>` below it. Repositories live at
//! `<src_dir>/github.com/<org>/<repo>`.

use std::collections::BTreeSet;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info, warn};
use serde::Deserialize;

use super::http::{encode_segment, ApiClient};
use super::{
    discover, from_remote, run_scopes, Provider, RemoteRepo, RepositorySource, ScopeJob,
    SyncContext,
};
use crate::action::RepoState;
use crate::config::{ConfigStore, ConfigView};
use crate::error::Result;
use crate::path::child_dirs;
use crate::resolve::{first, resolve, CloneUrls, RawRepo, RepoPolicy};
use crate::sync::Failure;

pub const PROVIDER: &str = "github.com";

const API_URL: &str = "https://api.github.com";

/// GitHub REST API client.
#[derive(Clone)]
pub struct GitHubApi {
    client: ApiClient,
    authenticated: bool,
}

#[derive(Debug, Deserialize)]
struct Account {
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct Owner {
    login: String,
}

#[derive(Debug, Deserialize)]
struct Repository {
    name: String,
    clone_url: String,
    ssh_url: String,
    #[serde(default)]
    archived: bool,
    #[serde(default)]
    topics: Vec<String>,
    owner: Owner,
}

impl From<Repository> for RemoteRepo {
    fn from(repo: Repository) -> Self {
        RemoteRepo {
            name: repo.name,
            clone_urls: CloneUrls {
                https: repo.clone_url,
                ssh: repo.ssh_url,
            },
            archived: repo.archived,
            topics: repo.topics,
        }
    }
}

impl GitHubApi {
    pub fn new(token: Option<String>) -> Self {
        let mut client = ApiClient::new(PROVIDER, API_URL)
            .with_header("Accept", "application/vnd.github+json")
            .with_header("X-GitHub-Api-Version", "2022-11-28");
        let authenticated = token.is_some();
        if let Some(token) = token {
            client = client.with_header("Authorization", &format!("Bearer {}", token));
        }
        Self {
            client,
            authenticated,
        }
    }

    /// Token from `providers.github.com.auth.token`, else `$GITHUB_TOKEN`.
    pub fn from_config(store: &ConfigStore) -> Self {
        let token = store
            .get::<String>(&["providers", PROVIDER, "auth", "token"])
            .or_else(|| env::var("GITHUB_TOKEN").ok());
        Self::new(token)
    }

    fn account_kind(&self, name: &str) -> Result<Option<String>> {
        let path = format!("/users/{}", encode_segment(name));
        Ok(self
            .client
            .get_json::<Account>(name, &path, &[])?
            .map(|account| account.kind))
    }
}

impl RepositorySource for GitHubApi {
    fn list_repositories(&self, scope: &str) -> Result<Vec<RemoteRepo>> {
        let kind = self
            .account_kind(scope)?
            .ok_or_else(|| self.client.error(scope, "no such user or organization".to_string()))?;

        let repos: Vec<Repository> = if kind == "Organization" {
            let path = format!("/orgs/{}/repos", encode_segment(scope));
            self.client.get_pages(scope, &path, &[("type", "all")])?
        } else {
            // The users endpoint only lists public repositories; private ones
            // come from the authenticated user's own listing.
            let path = format!("/users/{}/repos", encode_segment(scope));
            let mut repos: Vec<Repository> = self.client.get_pages(scope, &path, &[])?;
            if self.authenticated {
                let own: Vec<Repository> =
                    self.client
                        .get_pages(scope, "/user/repos", &[("affiliation", "owner")])?;
                repos.extend(own.into_iter().filter(|repo| repo.owner.login == scope));
            }
            repos
        };

        let mut seen = BTreeSet::new();
        Ok(repos
            .into_iter()
            .filter(|repo| seen.insert(repo.name.clone()))
            .map(RemoteRepo::from)
            .collect())
    }

    fn get_repository(&self, scope: &str, name: &str) -> Result<Option<RemoteRepo>> {
        let path = format!("/repos/{}/{}", encode_segment(scope), encode_segment(name));
        Ok(self
            .client
            .get_json::<Repository>(scope, &path, &[])?
            .map(RemoteRepo::from))
    }

    fn scope_exists(&self, scope: &str) -> Result<bool> {
        Ok(self.account_kind(scope)?.is_some())
    }
}

/// Syncs `<src_dir>/github.com`.
#[derive(Clone)]
pub struct GitHubProvider {
    root: PathBuf,
    config: ConfigView,
    source: Arc<dyn RepositorySource>,
}

impl GitHubProvider {
    pub fn new(root: PathBuf, store: Arc<ConfigStore>, source: Arc<dyn RepositorySource>) -> Self {
        Self {
            root,
            config: ConfigView::root(store, &["providers", PROVIDER]),
            source,
        }
    }

    /// Organizations named in config plus those present on disk.
    fn org_names(&self) -> Result<BTreeSet<String>> {
        let mut orgs: BTreeSet<String> = self
            .config
            .store()
            .literal_keys(&["providers", PROVIDER, "orgs"])
            .into_iter()
            .collect();
        orgs.extend(child_dirs(&self.root)?.into_iter().map(|(_, name)| name));
        Ok(orgs)
    }

    /// The organization's own scope, then the provider-wide pattern.
    fn org_views(&self, org: &str) -> [ConfigView; 2] {
        [
            self.config.scope("orgs", org),
            self.config.scope_wildcard("orgs", org),
        ]
    }

    fn org_enabled(&self, org: &str) -> bool {
        first(&self.org_views(org), &["enabled"]).unwrap_or(false)
    }

    fn policy(&self, org: &str, repo: &str, topics: &[String]) -> RepoPolicy {
        let [org_view, org_wildcard] = self.org_views(org);
        RepoPolicy {
            exact: vec![org_view.child(&["repos", repo])],
            topics: topics.iter().map(|topic| org_view.scope("topics", topic)).collect(),
            repo: vec![org_view.scope("repos", repo), org_wildcard.scope("repos", repo)],
            groups: vec![org_view, org_wildcard],
            enabled_by_default: false,
            default_branch: None,
        }
    }

    fn scope_dir(&self, org: &str) -> PathBuf {
        self.root.join(org)
    }

    /// List one organization, resolve every repository and submit the jobs.
    fn enumerate(&self, ctx: &SyncContext, job: &ScopeJob) -> Result<()> {
        let org = job.scope.as_str();
        let scope_dir = self.scope_dir(org);
        let repos: Vec<RawRepo> = match &job.repo {
            Some(name) => self.single(org, name, &scope_dir)?.into_iter().collect(),
            None => {
                let remote = self.source.list_repositories(org)?;
                debug!("{}/{}: {} remote repositories", PROVIDER, org, remote.len());
                discover(PROVIDER, org, &scope_dir, remote, child_dirs(&scope_dir)?)
            }
        };
        self.submit_all(ctx, org, repos)
    }

    /// One explicitly named repository, force-enabled.
    fn single(&self, org: &str, name: &str, scope_dir: &Path) -> Result<Option<RawRepo>> {
        let path = scope_dir.join(name);
        let mut repo = match self.source.get_repository(org, name)? {
            Some(remote) => from_remote(PROVIDER, org, scope_dir, remote),
            None if path.exists() => RawRepo {
                provider: PROVIDER.to_string(),
                scope: org.to_string(),
                name: name.to_string(),
                state: RepoState::Orphaned,
                path,
                clone_urls: None,
                topics: Vec::new(),
                force_enable: false,
            },
            None => {
                warn!("{}/{}/{} not found remotely or locally", PROVIDER, org, name);
                return Ok(None);
            }
        };
        repo.force_enable = true;
        Ok(Some(repo))
    }

    fn submit_all(&self, ctx: &SyncContext, org: &str, repos: Vec<RawRepo>) -> Result<()> {
        for raw in repos {
            if ctx.cancelled() {
                break;
            }
            let policy = self.policy(org, &raw.name, &raw.topics);
            if let Some(synced) = resolve(raw, &policy) {
                ctx.submit(synced.into_job())?;
            }
        }
        Ok(())
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

    fn scope_job(org: &str, repo: Option<&str>) -> ScopeJob {
        ScopeJob {
            provider: PROVIDER.to_string(),
            scope: org.to_string(),
            remote: true,
            repo: repo.map(str::to_string),
        }
    }
}

impl Provider for GitHubProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn sync_all(&self, ctx: &SyncContext) -> Result<Vec<Failure>> {
        let mut scopes = Vec::new();
        for org in self.org_names()? {
            if !self.org_enabled(&org) {
                info!("{}/{}: enabled=false", PROVIDER, org);
                continue;
            }
            scopes.push(Self::scope_job(&org, None));
        }
        self.run(ctx, scopes)
    }

    fn sync_path(&self, ctx: &SyncContext, sub_path: &str) -> Result<Vec<Failure>> {
        let (org, repo) = match sub_path.trim_matches('/').split_once('/') {
            Some((org, repo)) => (org, Some(repo)),
            None => (sub_path.trim_matches('/'), None),
        };
        if !self.org_enabled(org) {
            warn!(
                "{}/{} is disabled in config, syncing it because it was named explicitly",
                PROVIDER, org
            );
        }
        self.run(ctx, vec![Self::scope_job(org, repo)])
    }
}
