//! # Action Resolution
//!
//! Turns an enumerated repository plus the policy that applies to it into a
//! [`SyncedRepo`], and that into a [`Job`].
//!
//! Providers describe where their policy lives with a [`RepoPolicy`]: which
//! views hold the repository's own entry, which hold its topics, and which
//! hold its organization or group. Resolution itself is provider-agnostic:
//!
//! 1. `enabled` gates everything. A disabled repository produces no job.
//! 2. A configured `state` overrides the observed one.
//! 3. The candidate actions for that state come from the first non-empty
//!    tier: the repository's literal entry, the union of its topics' lists,
//!    then the scope defaults (organization pattern first, provider-wide
//!    pattern last).
//! 4. The default branch set is the repository's `default_branch`, else the
//!    organization's `default_branches`, else
//!    [`DEFAULT_DEFAULT_BRANCH`](crate::defaults::DEFAULT_DEFAULT_BRANCH).

use std::collections::BTreeSet;
use std::path::PathBuf;

use log::{info, warn};
use serde::de::DeserializeOwned;

use crate::action::{self, CloneScheme, JobAction, RepoAction, RepoState};
use crate::config::ConfigView;
use crate::defaults::DEFAULT_DEFAULT_BRANCH;
use crate::job::Job;

/// Clone URLs a provider reports for one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloneUrls {
    pub https: String,
    pub ssh: String,
}

impl CloneUrls {
    pub fn select(&self, scheme: CloneScheme) -> &str {
        match scheme {
            CloneScheme::Https => &self.https,
            CloneScheme::Ssh => &self.ssh,
        }
    }
}

/// One enumerated repository, before policy is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRepo {
    pub provider: String,
    /// Organization or group path; empty for generic repositories.
    pub scope: String,
    pub name: String,
    pub state: RepoState,
    pub path: PathBuf,
    /// `None` for orphans and generic repositories.
    pub clone_urls: Option<CloneUrls>,
    pub topics: Vec<String>,
    /// Named explicitly on the command line; `enabled: false` is overridden.
    pub force_enable: bool,
}

impl RawRepo {
    pub fn full_name(&self) -> String {
        if self.scope.is_empty() {
            self.name.clone()
        } else {
            format!("{}/{}", self.scope, self.name)
        }
    }
}

/// Where a repository's policy lives.
///
/// Within each list the first view holding a value wins.
#[derive(Debug, Clone, Default)]
pub struct RepoPolicy {
    /// Literal repository entries, e.g. `orgs.acme.repos.widgets`.
    pub exact: Vec<ConfigView>,
    /// One view per topic, e.g. `orgs.acme.topics.python`.
    pub topics: Vec<ConfigView>,
    /// Repository scopes with pattern fallback, most specific first.
    pub repo: Vec<ConfigView>,
    /// Organization or group scopes, most specific first.
    pub groups: Vec<ConfigView>,
    /// `enabled` when no view sets it.
    pub enabled_by_default: bool,
    /// Fallback for `default_branch` when neither repo nor group sets one.
    pub default_branch: Option<String>,
}

impl RepoPolicy {
    fn repo_get<T: DeserializeOwned>(&self, path: &[&str]) -> Option<T> {
        first(&self.repo, path)
    }

    /// Candidate actions for `state`.
    pub fn actions(&self, state: RepoState) -> Vec<RepoAction> {
        let path = ["actions", state.as_str()];

        let exact = self
            .exact
            .iter()
            .filter_map(|view| view.get::<Vec<RepoAction>>(&path))
            .find(|actions| !actions.is_empty());
        if let Some(actions) = exact {
            return actions;
        }

        let mut topic_actions: Vec<RepoAction> = Vec::new();
        for view in &self.topics {
            for action in view.get::<Vec<RepoAction>>(&path).unwrap_or_default() {
                if !topic_actions.contains(&action) {
                    topic_actions.push(action);
                }
            }
        }
        if !topic_actions.is_empty() {
            return topic_actions;
        }

        self.repo_get(&path).unwrap_or_default()
    }

    pub fn default_branches(&self) -> BTreeSet<String> {
        if let Some(branch) = self.repo_get::<String>(&["default_branch"]) {
            return BTreeSet::from([branch]);
        }
        if let Some(branches) = first::<Vec<String>>(&self.groups, &["default_branches"]) {
            return branches.into_iter().collect();
        }
        let fallback = self
            .default_branch
            .clone()
            .unwrap_or_else(|| DEFAULT_DEFAULT_BRANCH.to_string());
        BTreeSet::from([fallback])
    }
}

/// First value present at `path` across `views`.
pub fn first<T: DeserializeOwned>(views: &[ConfigView], path: &[&str]) -> Option<T> {
    views.iter().find_map(|view| view.get(path))
}

/// A repository's resolved plan for this pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncedRepo {
    pub provider: String,
    pub full_name: String,
    pub state: RepoState,
    pub path: PathBuf,
    pub clone_url: Option<String>,
    pub actions: Vec<RepoAction>,
    pub default_branches: BTreeSet<String>,
}

impl SyncedRepo {
    /// Build the job, checking the filesystem for the working tree.
    pub fn into_job(self) -> Job {
        let exists = self.path.exists();
        self.into_job_with(exists)
    }

    /// Build the job for a known local existence.
    pub fn into_job_with(self, exists_locally: bool) -> Job {
        Job {
            action: JobAction::resolve(&self.actions, exists_locally),
            clean: action::clean_requested(&self.actions, exists_locally),
            provider: self.provider,
            full_name: self.full_name,
            state: self.state,
            path: self.path,
            clone_url: self.clone_url,
            actions: self.actions,
            default_branches: self.default_branches,
            exists_locally,
        }
    }
}

/// Apply `policy` to `raw`. `None` when the repository is disabled.
pub fn resolve(raw: RawRepo, policy: &RepoPolicy) -> Option<SyncedRepo> {
    let full_name = raw.full_name();
    let enabled = policy
        .repo_get::<bool>(&["enabled"])
        .unwrap_or(policy.enabled_by_default);
    if !enabled {
        if !raw.force_enable {
            info!("{}/{}: enabled=false", raw.provider, full_name);
            return None;
        }
        warn!(
            "{}/{} is disabled in config, syncing it because it was named explicitly",
            raw.provider, full_name
        );
    }

    // Orphans never get a clone URL, even when policy forces another state.
    let clone_url = match (&raw.clone_urls, raw.state) {
        (Some(urls), state) if state != RepoState::Orphaned => {
            let scheme = policy.repo_get::<CloneScheme>(&["clone_scheme"]).unwrap_or_default();
            Some(urls.select(scheme).to_string())
        }
        _ => None,
    };

    let state = policy.repo_get::<RepoState>(&["state"]).unwrap_or(raw.state);

    Some(SyncedRepo {
        actions: policy.actions(state),
        default_branches: policy.default_branches(),
        provider: raw.provider,
        full_name,
        state,
        path: raw.path,
        clone_url,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigStore;
    use std::sync::Arc;

    const POLICY: &str = r#"
providers:
  github.com:
    orgs:
      acme:
        default_branches: [main, develop]
        repos:
          widgets:
            actions:
              active: [clone, pull]
          sprockets:
            enabled: false
          gears:
            state: archived
            clone_scheme: ssh
          quiet:
            actions:
              active: []
          /legacy-.*/:
            actions:
              active: [raise]
        topics:
          python:
            actions:
              active: [clean, pull]
          tooling:
            actions:
              active: [pull, clone]
              archived: [delete]
"#;

    fn store() -> Arc<ConfigStore> {
        Arc::new(ConfigStore::from_yaml(POLICY).unwrap())
    }

    fn github_policy(store: &Arc<ConfigStore>, org: &str, repo: &str, topics: &[&str]) -> RepoPolicy {
        let provider = ConfigView::root(Arc::clone(store), &["providers", "github.com"]);
        let org_view = provider.scope("orgs", org);
        let org_wildcard = provider.scope_wildcard("orgs", org);
        RepoPolicy {
            exact: vec![org_view.child(&["repos", repo])],
            topics: topics.iter().map(|t| org_view.scope("topics", t)).collect(),
            repo: vec![org_view.scope("repos", repo), org_wildcard.scope("repos", repo)],
            groups: vec![org_view],
            enabled_by_default: false,
            default_branch: None,
        }
    }

    fn raw(name: &str, state: RepoState, topics: &[&str]) -> RawRepo {
        RawRepo {
            provider: "github.com".to_string(),
            scope: "acme".to_string(),
            name: name.to_string(),
            state,
            path: PathBuf::from(format!("/src/github.com/acme/{}", name)),
            clone_urls: Some(CloneUrls {
                https: format!("https://github.com/acme/{}.git", name),
                ssh: format!("git@github.com:acme/{}.git", name),
            }),
            topics: topics.iter().map(|t| t.to_string()).collect(),
            force_enable: false,
        }
    }

    fn resolve_in(store: &Arc<ConfigStore>, repo: RawRepo) -> Option<SyncedRepo> {
        let topics: Vec<&str> = repo.topics.iter().map(String::as_str).collect();
        let policy = github_policy(store, &repo.scope, &repo.name, &topics);
        resolve(repo, &policy)
    }

    #[test]
    fn test_exact_repo_actions_win() {
        let store = store();
        let synced = resolve_in(&store, raw("widgets", RepoState::Active, &["python"])).unwrap();
        assert_eq!(synced.actions, vec![RepoAction::Clone, RepoAction::Pull]);
        assert_eq!(synced.full_name, "acme/widgets");
    }

    #[test]
    fn test_topic_union() {
        let store = store();
        let synced =
            resolve_in(&store, raw("gadgets", RepoState::Active, &["python", "tooling"])).unwrap();
        assert_eq!(
            synced.actions,
            vec![RepoAction::Clean, RepoAction::Pull, RepoAction::Clone]
        );
    }

    #[test]
    fn test_topic_without_list_for_state_falls_through() {
        let store = store();
        let synced = resolve_in(&store, raw("gadgets", RepoState::Archived, &["python"])).unwrap();
        // Built-in provider default for archived is empty.
        assert!(synced.actions.is_empty());
    }

    #[test]
    fn test_scope_pattern_tier() {
        let store = store();
        let synced = resolve_in(&store, raw("legacy-api", RepoState::Active, &[])).unwrap();
        assert_eq!(synced.actions, vec![RepoAction::Raise]);
    }

    #[test]
    fn test_provider_wildcard_tier() {
        let store = store();
        let synced = resolve_in(&store, raw("gadgets", RepoState::Active, &[])).unwrap();
        assert_eq!(synced.actions, vec![RepoAction::Pull]);
    }

    #[test]
    fn test_explicit_empty_list_means_no_actions() {
        let store = store();
        let synced = resolve_in(&store, raw("quiet", RepoState::Active, &[])).unwrap();
        assert!(synced.actions.is_empty());
        assert_eq!(synced.into_job_with(true).action, JobAction::Nop);
    }

    #[test]
    fn test_disabled_repo_is_skipped() {
        let store = store();
        assert!(resolve_in(&store, raw("sprockets", RepoState::Active, &[])).is_none());
    }

    #[test]
    fn test_force_enable_overrides_disabled() {
        let store = store();
        let mut repo = raw("sprockets", RepoState::Active, &[]);
        repo.force_enable = true;
        assert!(resolve_in(&store, repo).is_some());
    }

    #[test]
    fn test_state_override_and_clone_scheme() {
        let store = store();
        let synced = resolve_in(&store, raw("gears", RepoState::Active, &["tooling"])).unwrap();
        assert_eq!(synced.state, RepoState::Archived);
        assert_eq!(synced.actions, vec![RepoAction::Delete]);
        assert_eq!(synced.clone_url.as_deref(), Some("git@github.com:acme/gears.git"));
    }

    #[test]
    fn test_orphans_have_no_clone_url() {
        let store = store();
        let synced = resolve_in(&store, raw("gadgets", RepoState::Orphaned, &[])).unwrap();
        assert_eq!(synced.clone_url, None);
    }

    #[test]
    fn test_default_branches() {
        let store = store();
        let synced = resolve_in(&store, raw("gadgets", RepoState::Active, &[])).unwrap();
        assert_eq!(
            synced.default_branches,
            BTreeSet::from(["develop".to_string(), "main".to_string()])
        );

        let mut repo = raw("gadgets", RepoState::Active, &[]);
        repo.scope = "globex".to_string();
        let synced = resolve_in(&store, repo).unwrap();
        assert_eq!(synced.default_branches, BTreeSet::from(["main".to_string()]));
    }

    #[test]
    fn test_default_branch_fallback() {
        let policy = RepoPolicy {
            enabled_by_default: true,
            ..Default::default()
        };
        assert_eq!(
            policy.default_branches(),
            BTreeSet::from([DEFAULT_DEFAULT_BRANCH.to_string()])
        );
    }

    #[test]
    fn test_into_job_reduces_by_existence() {
        let store = store();
        let synced = resolve_in(&store, raw("widgets", RepoState::Active, &[])).unwrap();
        let missing = synced.clone().into_job_with(false);
        assert_eq!(missing.action, JobAction::Clone);
        assert!(!missing.clean);
        let present = synced.into_job_with(true);
        assert_eq!(present.action, JobAction::Pull);
        assert_eq!(present.actions, vec![RepoAction::Clone, RepoAction::Pull]);
    }

    #[test]
    fn test_into_job_checks_filesystem() {
        let dir = tempfile::tempdir().unwrap();
        let store = store();
        let mut repo = raw("widgets", RepoState::Active, &[]);
        repo.path = dir.path().to_path_buf();
        let job = resolve_in(&store, repo).unwrap().into_job();
        assert!(job.exists_locally);
        assert_eq!(job.action, JobAction::Pull);
    }
}
