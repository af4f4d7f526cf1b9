//! # Policy Configuration
//!
//! This module holds the merged policy document and answers lookups into it.
//!
//! ## Lifecycle
//!
//! 1.  The built-in defaults ([`crate::defaults::DEFAULT_DOCUMENT`]) are
//!     deep-merged with the user's document ([`merge`]).
//! 2.  The result is checked against the schema registered for its declared
//!     version ([`schema`]).
//! 3.  Every pattern key is compiled once and the store is frozen behind an
//!     `Arc`. Nothing mutates it afterwards, so providers and workers share it
//!     without locking.
//!
//! ## Hierarchical lookups
//!
//! Policy is nested by scope: `providers.<host>.orgs.<org>.repos.<repo>`.
//! Any scope level may use a pattern key (`/regex/flags`) instead of a literal
//! name. [`ConfigStore::lookup`] walks a path in which [`SCOPE_MARKER`]
//! segments stand for scope names supplied separately. At each marker the
//! literal child is tried first; if there is none, pattern children are tried
//! longest first, and the first whose regex matches the name is used in its
//! place. A miss anywhere yields `None`, so callers fall back to a default.
//!
//! Most callers do not build marker paths by hand; they use a [`ConfigView`].

pub mod merge;
pub mod pattern;
pub mod schema;
pub mod view;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use semver::Version;
use serde::de::DeserializeOwned;
use serde_yaml::{Mapping, Value};

use crate::defaults::{self, DEFAULT_CONCURRENCY, DEFAULT_SRC_DIR};
use crate::error::{Error, Result};

pub use merge::merge_documents;
pub use pattern::PatternKey;
pub use view::ConfigView;

/// Placeholder path segment filled in by the next scope key of a lookup.
pub const SCOPE_MARKER: &str = "{}";

/// How a scope name is resolved against the children of a mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeKey {
    /// Literal child first, then pattern children.
    Name(String),
    /// Literal child only.
    Literal(String),
    /// Pattern children only, skipping any literal child of the same name.
    Wildcard(String),
}

impl ScopeKey {
    pub fn name(&self) -> &str {
        match self {
            ScopeKey::Name(name) | ScopeKey::Literal(name) | ScopeKey::Wildcard(name) => name,
        }
    }
}

/// Merge the user document onto the built-in defaults.
pub fn load(defaults: Value, user: Value) -> Value {
    merge_documents(defaults, user)
}

/// The frozen, merged policy document.
#[derive(Debug)]
pub struct ConfigStore {
    document: Value,
    patterns: HashMap<String, PatternKey>,
}

impl ConfigStore {
    /// Freeze `document`, compiling every pattern key it contains.
    pub fn new(document: Value) -> Result<Self> {
        let mut patterns = HashMap::new();
        collect_patterns(&document, &mut patterns)?;
        Ok(Self { document, patterns })
    }

    /// Built-in defaults merged with `user`.
    pub fn with_defaults(user: Value) -> Result<Self> {
        Self::new(load(defaults::default_document()?, user))
    }

    /// Built-in defaults merged with the YAML text `user`.
    pub fn from_yaml(user: &str) -> Result<Self> {
        let user: Value = serde_yaml::from_str(user).map_err(|e| Error::ConfigParse {
            message: e.to_string(),
            hint: None,
        })?;
        Self::with_defaults(user)
    }

    /// Load the user document from `path`, or from the default location.
    ///
    /// An explicitly named file must exist; the default
    /// `~/.codesync.yaml` is optional.
    pub fn from_file(path: Option<&Path>) -> Result<Self> {
        let (path, explicit): (PathBuf, bool) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (defaults::default_config_path(), false),
        };

        if !path.exists() {
            if explicit {
                return Err(Error::ConfigParse {
                    message: format!("config file not found: {}", path.display()),
                    hint: Some("Check the --config-file path".to_string()),
                });
            }
            debug!("No config file at {}, using defaults", path.display());
            return Self::with_defaults(Value::Null);
        }

        debug!("Loading config from {}", path.display());
        let content = fs::read_to_string(&path)?;
        Self::from_yaml(&content).map_err(|e| match e {
            Error::ConfigParse { message, hint } => Error::ConfigParse {
                message: format!("{}: {}", path.display(), message),
                hint,
            },
            other => other,
        })
    }

    /// Check the document against its version's schema.
    pub fn validate(&self) -> Result<Version> {
        schema::validate(&self.document)
    }

    pub fn document(&self) -> &Value {
        &self.document
    }

    /// Plain nested lookup. `None` on a missing key or on indexing into a
    /// non-mapping.
    pub fn get_value(&self, path: &[&str]) -> Option<&Value> {
        path.iter().try_fold(&self.document, |current, segment| {
            child(current.as_mapping()?, segment)
        })
    }

    /// Nested lookup deserialized into `T`. A value of the wrong type is
    /// treated as missing.
    pub fn get<T: DeserializeOwned>(&self, path: &[&str]) -> Option<T> {
        self.get_value(path)
            .and_then(|value| serde_yaml::from_value(value.clone()).ok())
    }

    pub fn get_or<T: DeserializeOwned>(&self, path: &[&str], default: T) -> T {
        self.get(path).unwrap_or(default)
    }

    /// Hierarchical lookup with pattern fallback.
    ///
    /// Each [`SCOPE_MARKER`] in `path` consumes one entry of `keys`, in
    /// order. Segments after a marker are literal continuations.
    pub fn lookup(&self, path: &[&str], keys: &[ScopeKey]) -> Option<&Value> {
        let Some((key, rest)) = keys.split_first() else {
            return self.get_value(path);
        };
        let (before, after) = match path.iter().position(|s| *s == SCOPE_MARKER) {
            Some(index) => (&path[..index], &path[index + 1..]),
            None => (path, &[][..]),
        };

        let parent = self.get_value(before)?.as_mapping()?;
        let resolved = self.resolve_key(parent, key)?;

        let mut next: Vec<&str> = Vec::with_capacity(path.len());
        next.extend_from_slice(before);
        next.push(resolved);
        next.extend_from_slice(after);

        if rest.is_empty() {
            self.get_value(&next)
        } else {
            self.lookup(&next, rest)
        }
    }

    /// Typed [`lookup`](Self::lookup).
    pub fn lookup_as<T: DeserializeOwned>(&self, path: &[&str], keys: &[ScopeKey]) -> Option<T> {
        self.lookup(path, keys)
            .and_then(|value| serde_yaml::from_value(value.clone()).ok())
    }

    /// The child key of `parent` that `key` resolves to.
    fn resolve_key<'a>(&'a self, parent: &'a Mapping, key: &'a ScopeKey) -> Option<&'a str> {
        match key {
            ScopeKey::Name(name) | ScopeKey::Literal(name) if child(parent, name).is_some() => {
                return Some(name.as_str());
            }
            ScopeKey::Literal(_) => return None,
            _ => {}
        }

        let mut candidates: Vec<&PatternKey> = parent
            .keys()
            .filter_map(Value::as_str)
            .filter_map(|raw| self.patterns.get(raw))
            .collect();
        // Longest pattern first; the sort is stable so equal lengths keep
        // declaration order.
        candidates.sort_by(|a, b| b.raw().len().cmp(&a.raw().len()));

        candidates
            .into_iter()
            .find(|pattern| pattern.matches(key.name()))
            .map(PatternKey::raw)
    }

    /// Literal child names of the mapping at `path`, excluding pattern keys
    /// and the `_` placeholder.
    pub fn literal_keys(&self, path: &[&str]) -> Vec<String> {
        let Some(mapping) = self.get_value(path).and_then(Value::as_mapping) else {
            return Vec::new();
        };
        mapping
            .keys()
            .filter_map(key_string)
            .filter(|key| key != "_" && !pattern::is_pattern_key(key))
            .collect()
    }

    /// Top-level settings with their defaults applied.
    pub fn settings(&self) -> Settings {
        let src_dir: String = self.get_or(&["src_dir"], DEFAULT_SRC_DIR.to_string());
        Settings {
            src_dir: defaults::expand_home(&src_dir),
            concurrency: self.get_or(&["concurrency"], DEFAULT_CONCURRENCY),
            clean_on_raise: self.get_or(&["clean_on_raise"], false),
            git: GitArgs {
                clone: self.get_or(&["git", "clone", "args"], Vec::new()),
                fetch: self.get_or(&["git", "fetch", "args"], Vec::new()),
                pull: self.get_or(&["git", "pull", "args"], Vec::new()),
            },
        }
    }
}

/// Typed top-level settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Root holding one directory per provider host.
    pub src_dir: PathBuf,
    /// Worker count per pool; `0` runs everything on the calling thread.
    pub concurrency: usize,
    /// Whether `clean` still runs when the primary action is `raise`.
    pub clean_on_raise: bool,
    pub git: GitArgs,
}

/// Extra arguments forwarded verbatim to git subcommands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitArgs {
    pub clone: Vec<String>,
    pub fetch: Vec<String>,
    pub pull: Vec<String>,
}

fn key_string(key: &Value) -> Option<String> {
    match key {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Child of `mapping` whose key, as a string, equals `name`.
fn child<'a>(mapping: &'a Mapping, name: &str) -> Option<&'a Value> {
    if let Some(value) = mapping.get(name) {
        return Some(value);
    }
    mapping
        .iter()
        .find(|(key, _)| !key.is_string() && key_string(key).as_deref() == Some(name))
        .map(|(_, value)| value)
}

fn collect_patterns(value: &Value, patterns: &mut HashMap<String, PatternKey>) -> Result<()> {
    let Some(mapping) = value.as_mapping() else {
        return Ok(());
    };
    for (key, child) in mapping {
        if let Some(raw) = key.as_str() {
            if !patterns.contains_key(raw) {
                if let Some(pattern) = PatternKey::parse(raw) {
                    patterns.insert(raw.to_string(), pattern?);
                }
            }
        }
        collect_patterns(child, patterns)?;
    }
    Ok(())
}
