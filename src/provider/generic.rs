//! Hosts without an API.
//!
//! Every git working tree directly under `<src_dir>/<host>` is a repository.
//! Nothing is listed remotely, so there are no clone URLs and every
//! repository is `active` unless policy says otherwise. Policy lives under
//! `providers.<host>.repos.<name>` and falls back to
//! `providers.generic.repos.<name>`.

use std::path::PathBuf;
use std::sync::Arc;

use log::{debug, warn};

use super::{Provider, SyncContext};
use crate::action::RepoState;
use crate::config::{ConfigStore, ConfigView};
use crate::error::Result;
use crate::path::{child_dirs, is_git_repo};
use crate::resolve::{resolve, RawRepo, RepoPolicy};
use crate::sync::Failure;

/// Section holding the policy shared by every generic host.
pub const GENERIC: &str = "generic";

pub struct GenericProvider {
    host: String,
    root: PathBuf,
    configs: Vec<ConfigView>,
}

impl GenericProvider {
    pub fn new(host: &str, root: PathBuf, store: Arc<ConfigStore>) -> Self {
        let mut configs = Vec::new();
        if host != GENERIC {
            configs.push(ConfigView::root(Arc::clone(&store), &["providers", host]));
        }
        configs.push(ConfigView::root(store, &["providers", GENERIC]));
        Self {
            host: host.to_string(),
            root,
            configs,
        }
    }

    fn policy(&self, name: &str) -> RepoPolicy {
        RepoPolicy {
            exact: self
                .configs
                .iter()
                .map(|view| view.child(&["repos", name]))
                .collect(),
            topics: Vec::new(),
            repo: self
                .configs
                .iter()
                .map(|view| view.scope("repos", name))
                .collect(),
            groups: Vec::new(),
            enabled_by_default: false,
            default_branch: None,
        }
    }

    fn raw(&self, path: PathBuf, name: String, force_enable: bool) -> RawRepo {
        RawRepo {
            provider: self.host.clone(),
            scope: String::new(),
            name,
            state: RepoState::Active,
            path,
            clone_urls: None,
            topics: Vec::new(),
            force_enable,
        }
    }

    fn submit(&self, ctx: &SyncContext, repos: Vec<RawRepo>) -> Result<Vec<Failure>> {
        for raw in repos {
            if ctx.cancelled() {
                break;
            }
            let policy = self.policy(&raw.name);
            if let Some(synced) = resolve(raw, &policy) {
                ctx.submit(synced.into_job())?;
            }
        }
        Ok(Vec::new())
    }
}

impl Provider for GenericProvider {
    fn name(&self) -> &str {
        &self.host
    }

    fn sync_all(&self, ctx: &SyncContext) -> Result<Vec<Failure>> {
        let repos: Vec<RawRepo> = child_dirs(&self.root)?
            .into_iter()
            .filter(|(path, _)| is_git_repo(path))
            .map(|(path, name)| self.raw(path, name, false))
            .collect();
        debug!("{}: {} local repositories", self.host, repos.len());
        self.submit(ctx, repos)
    }

    fn sync_path(&self, ctx: &SyncContext, sub_path: &str) -> Result<Vec<Failure>> {
        let name = sub_path.trim_matches('/');
        let path = self.root.join(name);
        if !path.exists() {
            warn!("{}/{} does not exist locally", self.host, name);
            return Ok(Vec::new());
        }
        self.submit(ctx, vec![self.raw(path, name.to_string(), true)])
    }
}
