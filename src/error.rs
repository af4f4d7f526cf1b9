//! # Error Handling
//!
//! This module defines the centralized error type for `codesync`. It uses the
//! `thiserror` library to build a single `Error` enum covering every failure
//! mode of a sync pass, and a `Result<T>` alias used throughout the library.
//!
//! The variants fall into four groups that mirror how failures propagate:
//!
//! - **Configuration errors** (`ConfigParse`, `UnsupportedVersion`, `Schema`)
//!   are fatal and abort the run before any repository is touched.
//! - **Enumeration errors** (`Provider`) are isolated to the organization or
//!   group that failed to list; other scopes keep going.
//! - **Per-repository errors** (`GitClone`, `GitCommand`, `Io`, ...) are
//!   caught at the worker pool boundary and collected.
//! - **`NeedsAttention`** is not an accident at all: it is what the `raise`
//!   policy action produces, and it carries the full context of the job so
//!   the final report can tell the operator what to look at.

use thiserror::Error;

/// Main error type for codesync operations
#[derive(Error, Debug)]
pub enum Error {
    /// The configuration document could not be read or parsed.
    #[error("Configuration parsing error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    ConfigParse {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// The document declares a version newer than this build understands, or
    /// a version for which no schema is registered.
    #[error("Unsupported configuration version {found} (this codesync handles up to {supported})")]
    UnsupportedVersion { found: String, supported: String },

    /// The document does not match the schema for its declared version.
    #[error("Configuration schema error at {path}: {message}")]
    Schema { path: String, message: String },

    /// An error occurred while cloning a Git repository.
    #[error("Git clone error for {url} into {path}: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    GitClone {
        url: String,
        path: String,
        message: String,
        /// Optional hint for how to resolve the clone issue
        hint: Option<String>,
    },

    /// An error occurred while executing a Git command in a working tree.
    #[error("Git command failed in {path}: {command} - {stderr}")]
    GitCommand {
        command: String,
        path: String,
        stderr: String,
    },

    /// A hosting provider API call failed for one organization or group.
    #[error("Provider error for {provider}/{scope}: {message}")]
    Provider {
        provider: String,
        scope: String,
        message: String,
    },

    /// Policy resolved to `raise`: a human has to look at this repository.
    #[error(
        "{provider}/{full_name} needs your attention (state={state}, path={path}, clone_url={}, actions=[{}])",
        clone_url.as_deref().unwrap_or("none"),
        actions.join(", ")
    )]
    NeedsAttention {
        provider: String,
        full_name: String,
        state: String,
        path: String,
        clone_url: Option<String>,
        actions: Vec<String>,
    },

    /// The run was interrupted before all work was started.
    #[error("Sync cancelled: {context}")]
    Cancelled { context: String },

    /// An error indicating that a mutex or other lock has been poisoned.
    #[error("Lock poisoned: {context}")]
    LockPoisoned { context: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A regular expression error, wrapped from `regex::Error`.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// A glob pattern error, wrapped from `glob::PatternError`.
    #[error("Glob pattern error: {0}")]
    Glob(#[from] glob::PatternError),

    /// A semantic versioning parsing error, wrapped from `semver::Error`.
    #[error("Semver parsing error: {0}")]
    Semver(#[from] semver::Error),
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
