//! # codesync
//!
//! Keeps a local tree of git clones in sync with hosting providers. The
//! tree is laid out as `<src_dir>/<host>/<scope>/<repo>`; a declarative
//! policy document decides per repository whether to clone, pull, fetch,
//! delete, prune stale branches, or report it for manual attention.
//!
//! ## Quick Example
//!
//! ```
//! use std::sync::Arc;
//! use codesync::config::{ConfigStore, ConfigView};
//!
//! let store = Arc::new(ConfigStore::from_yaml(r#"
//! providers:
//!   github.com:
//!     orgs:
//!       acme:
//!         repos:
//!           /legacy-.*/:
//!             actions:
//!               active: [raise]
//! "#).unwrap());
//!
//! let repo = ConfigView::root(store, &["providers", "github.com"])
//!     .scope("orgs", "acme")
//!     .scope("repos", "legacy-api");
//! let actions: Vec<String> = repo.get(&["actions", "active"]).unwrap();
//! assert_eq!(actions, vec!["raise"]);
//! ```
//!
//! ## Core Concepts
//!
//! - **Configuration (`config`)**: the built-in defaults deep-merged with the
//!   user document, frozen into a [`config::ConfigStore`] and read through
//!   scoped [`config::ConfigView`]s that fall back from literal keys to
//!   `/regex/` pattern keys.
//! - **Resolution (`resolve`, `action`)**: per-repository policy reduced to
//!   one executable action plus an optional branch prune.
//! - **Providers (`provider`)**: GitHub, GitLab and generic directories; each
//!   enumerates its scopes and submits jobs.
//! - **Pipeline (`pool`, `job`, `sync`)**: a scope-enumeration pool per
//!   provider feeding one shared execution pool, with per-job failure
//!   isolation and cooperative cancellation.
//! - **Git (`git`, `repository`)**: the git subprocess calls behind the
//!   [`repository::GitOperations`] trait.

pub mod action;
pub mod config;
pub mod defaults;
pub mod error;
pub mod git;
pub mod job;
pub mod output;
pub mod path;
pub mod pool;
pub mod provider;
pub mod repository;
pub mod resolve;
pub mod sync;

#[cfg(test)]
mod pattern_proptest;
