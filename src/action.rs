//! # Repository States and Actions
//!
//! The closed vocabulary of the sync policy: the observed `RepoState` of a
//! repository, the `RepoAction`s a policy may list for a state, and the
//! `JobAction` that is finally executed for a repository.
//!
//! A policy lists candidate actions in preference order. Which one runs
//! depends on whether the repository already exists on disk: `clone` makes
//! no sense for an existing clone, `pull` and `delete` make no sense for a
//! missing one. [`JobAction::resolve`] drops the candidates that do not
//! apply and takes the first remaining one. `clean` never competes in that
//! reduction; it is a separate flag, see [`clean_requested`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Observed (or policy-forced) state of a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepoState {
    /// Listed by the provider and not archived.
    Active,
    /// Listed by the provider and archived.
    Archived,
    /// Present locally, absent from the provider's listing.
    Orphaned,
}

impl RepoState {
    pub const ALL: [RepoState; 3] = [RepoState::Active, RepoState::Archived, RepoState::Orphaned];

    pub fn as_str(&self) -> &'static str {
        match self {
            RepoState::Active => "active",
            RepoState::Archived => "archived",
            RepoState::Orphaned => "orphaned",
        }
    }

    /// State derived from a provider's archived flag.
    pub fn from_archived(archived: bool) -> Self {
        if archived {
            RepoState::Archived
        } else {
            RepoState::Active
        }
    }
}

impl fmt::Display for RepoState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RepoState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RepoState::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| format!("unknown repository state '{}'", s))
    }
}

/// An action a policy may list for a repository state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepoAction {
    /// Prune local branches whose upstream is gone.
    Clean,
    Clone,
    Delete,
    /// Pull on a default branch, fetch otherwise.
    Pull,
    /// Report the repository for manual attention.
    Raise,
    Nop,
}

impl RepoAction {
    pub const ALL: [RepoAction; 6] = [
        RepoAction::Clean,
        RepoAction::Clone,
        RepoAction::Delete,
        RepoAction::Pull,
        RepoAction::Raise,
        RepoAction::Nop,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RepoAction::Clean => "clean",
            RepoAction::Clone => "clone",
            RepoAction::Delete => "delete",
            RepoAction::Pull => "pull",
            RepoAction::Raise => "raise",
            RepoAction::Nop => "nop",
        }
    }
}

impl fmt::Display for RepoAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RepoAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RepoAction::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| format!("unknown action '{}'", s))
    }
}

/// Which of a provider's clone URLs to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloneScheme {
    #[default]
    Https,
    Ssh,
}

impl CloneScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            CloneScheme::Https => "https",
            CloneScheme::Ssh => "ssh",
        }
    }
}

impl FromStr for CloneScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "https" => Ok(CloneScheme::Https),
            "ssh" => Ok(CloneScheme::Ssh),
            other => Err(format!("unknown clone scheme '{}'", other)),
        }
    }
}

/// The single action a job executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobAction {
    Clone,
    Delete,
    Pull,
    Raise,
    Nop,
}

impl JobAction {
    /// Reduce a candidate list to the action to execute.
    ///
    /// Existing clones drop `clone`; missing ones drop `delete` and `pull`.
    /// `clean` is always dropped. The first remaining candidate wins, and an
    /// empty remainder is a no-op.
    pub fn resolve(actions: &[RepoAction], exists_locally: bool) -> Self {
        let deletes: &[RepoAction] = if exists_locally {
            &[RepoAction::Clean, RepoAction::Clone]
        } else {
            &[RepoAction::Clean, RepoAction::Delete, RepoAction::Pull]
        };
        reduce(actions, deletes).map_or(JobAction::Nop, JobAction::from)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobAction::Clone => "clone",
            JobAction::Delete => "delete",
            JobAction::Pull => "pull",
            JobAction::Raise => "raise",
            JobAction::Nop => "nop",
        }
    }
}

impl From<RepoAction> for JobAction {
    fn from(action: RepoAction) -> Self {
        match action {
            RepoAction::Clone => JobAction::Clone,
            RepoAction::Delete => JobAction::Delete,
            RepoAction::Pull => JobAction::Pull,
            RepoAction::Raise => JobAction::Raise,
            RepoAction::Clean | RepoAction::Nop => JobAction::Nop,
        }
    }
}

impl fmt::Display for JobAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// First action of `actions` that is not listed in `deletes`.
pub fn reduce(actions: &[RepoAction], deletes: &[RepoAction]) -> Option<RepoAction> {
    actions
        .iter()
        .copied()
        .find(|action| !deletes.contains(action))
}

/// Whether stale-branch pruning runs in addition to the primary action.
pub fn clean_requested(actions: &[RepoAction], exists_locally: bool) -> bool {
    exists_locally && actions.contains(&RepoAction::Clean)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use RepoAction::{Clean, Delete, Nop, Pull, Raise};

    #[test]
    fn test_reduce_empty() {
        assert_eq!(reduce(&[], &[]), None);
    }

    #[test]
    fn test_reduce_skips_deleted() {
        assert_eq!(reduce(&[Pull, RepoAction::Clone], &[Pull]), Some(RepoAction::Clone));
        assert_eq!(reduce(&[Pull, RepoAction::Clone], &[RepoAction::Clone]), Some(Pull));
        assert_eq!(reduce(&[Clean, Pull, RepoAction::Clone], &[Clean, RepoAction::Clone]), Some(Pull));
    }

    #[test]
    fn test_resolve_existing_repo() {
        assert_eq!(JobAction::resolve(&[Pull, RepoAction::Clone], true), JobAction::Pull);
        assert_eq!(JobAction::resolve(&[RepoAction::Clone, Pull], true), JobAction::Pull);
        assert_eq!(JobAction::resolve(&[Clean, Pull, RepoAction::Clone], true), JobAction::Pull);
        assert_eq!(JobAction::resolve(&[], true), JobAction::Nop);
    }

    #[test]
    fn test_resolve_missing_repo() {
        assert_eq!(JobAction::resolve(&[Pull, RepoAction::Clone], false), JobAction::Clone);
        assert_eq!(JobAction::resolve(&[Delete, Pull], false), JobAction::Nop);
        assert_eq!(JobAction::resolve(&[Delete, Raise], false), JobAction::Raise);
    }

    #[test]
    fn test_resolve_explicit_nop_stops_reduction() {
        assert_eq!(JobAction::resolve(&[Nop, Pull], true), JobAction::Nop);
    }

    #[test]
    fn test_clean_requested_only_for_existing() {
        assert!(clean_requested(&[Clean, Pull], true));
        assert!(!clean_requested(&[Clean, Pull], false));
        assert!(!clean_requested(&[Pull], true));
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("pull".parse::<RepoAction>(), Ok(Pull));
        assert!("push".parse::<RepoAction>().is_err());
        assert_eq!("orphaned".parse::<RepoState>(), Ok(RepoState::Orphaned));
        assert_eq!(RepoState::from_archived(true), RepoState::Archived);
    }

    #[test]
    fn test_serde_names_match_display() {
        let actions: Vec<RepoAction> = serde_yaml::from_str("[clean, clone, raise]").unwrap();
        assert_eq!(actions, vec![Clean, RepoAction::Clone, Raise]);
        let scheme: CloneScheme = serde_yaml::from_str("ssh").unwrap();
        assert_eq!(scheme, CloneScheme::Ssh);
    }

    fn any_action() -> impl Strategy<Value = RepoAction> {
        prop::sample::select(RepoAction::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn prop_existing_repo_takes_first_non_clone(actions in prop::collection::vec(any_action(), 0..8)) {
            let expected = actions
                .iter()
                .copied()
                .find(|a| *a != RepoAction::Clone && *a != Clean)
                .map_or(JobAction::Nop, JobAction::from);
            prop_assert_eq!(JobAction::resolve(&actions, true), expected);
        }

        #[test]
        fn prop_missing_repo_never_pulls_or_deletes(actions in prop::collection::vec(any_action(), 0..8)) {
            let resolved = JobAction::resolve(&actions, false);
            prop_assert!(resolved != JobAction::Pull && resolved != JobAction::Delete);
        }

        #[test]
        fn prop_resolve_is_deterministic(actions in prop::collection::vec(any_action(), 0..8), exists in any::<bool>()) {
            prop_assert_eq!(JobAction::resolve(&actions, exists), JobAction::resolve(&actions, exists));
        }
    }
}
