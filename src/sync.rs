//! # Sync Orchestration
//!
//! One sync pass wires the pieces together:
//!
//! ```text
//! src_dir/<host>  ->  Provider  ->  scope pool  ->  resolve  ->  exec pool
//! ```
//!
//! The execution pool is started first and shared by every provider. Each
//! provider enumerates its scopes on its own pool and submits jobs as they
//! are resolved, so cloning starts while other scopes are still listing.
//! Failures from either stage are collected into one [`SyncReport`] once the
//! execution pool has drained.

use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, info};

use crate::config::ConfigStore;
use crate::error::{Error, Result};
use crate::job::{ExecContext, Job};
use crate::path::child_dirs;
use crate::pool::{Handler, JobError, WorkerPool};
use crate::provider::{self, Provider, SyncContext};
use crate::repository::{DefaultGitOperations, GitOperations};

/// One failed unit of work: a scope that could not be enumerated or a job
/// that could not be executed.
#[derive(Debug)]
pub struct Failure {
    /// What failed, e.g. `github.com/acme/widgets`.
    pub context: String,
    pub error: Error,
}

impl<J: fmt::Display> From<JobError<J>> for Failure {
    fn from(failure: JobError<J>) -> Self {
        Failure {
            context: failure.job.to_string(),
            error: failure.error,
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.context, self.error)
    }
}

/// Options for one pass, usually straight from the command line.
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// `host[/sub/path]`. `None` syncs every host directory.
    pub target: Option<String>,
    pub dry_run: bool,
    /// Overrides the document's `concurrency`.
    pub concurrency: Option<usize>,
}

/// Outcome of a pass.
#[derive(Debug, Default)]
pub struct SyncReport {
    pub failures: Vec<Failure>,
    pub cancelled: bool,
}

impl SyncReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Builds the provider for a host directory.
pub type ProviderFactory =
    Box<dyn Fn(&str, &Path, &Arc<ConfigStore>) -> Box<dyn Provider> + Send + Sync>;

/// Runs sync passes against one loaded configuration.
pub struct Syncer {
    store: Arc<ConfigStore>,
    git: Arc<dyn GitOperations>,
    providers: ProviderFactory,
    shutdown: Arc<AtomicBool>,
}

impl Syncer {
    pub fn new(store: Arc<ConfigStore>) -> Self {
        Self {
            store,
            git: Arc::new(DefaultGitOperations),
            providers: Box::new(provider::for_host),
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_git(mut self, git: Arc<dyn GitOperations>) -> Self {
        self.git = git;
        self
    }

    pub fn with_providers(mut self, providers: ProviderFactory) -> Self {
        self.providers = providers;
        self
    }

    /// Share an externally owned flag, typically one set by a signal handler.
    pub fn with_shutdown(mut self, shutdown: Arc<AtomicBool>) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Run one pass.
    ///
    /// Returns `Err` only for problems that prevent the pass from starting
    /// (a bad target, an unreadable `src_dir`). Everything else ends up in
    /// the report.
    pub fn run(&self, options: &SyncOptions) -> Result<SyncReport> {
        let settings = self.store.settings();
        let concurrency = options.concurrency.unwrap_or(settings.concurrency);
        info!(
            "Concurrency: {}{}",
            concurrency,
            if concurrency == 0 { " (disabled)" } else { "" }
        );

        let exec = ExecContext {
            git: Arc::clone(&self.git),
            args: settings.git.clone(),
            dry_run: options.dry_run,
            clean_on_raise: settings.clean_on_raise,
        };
        let handler: Handler<Job> = Arc::new(move |job: &Job| job.execute(&exec));
        let executor = Arc::new(WorkerPool::new(
            "exec",
            concurrency,
            handler,
            Arc::clone(&self.shutdown),
        ));
        executor.start()?;

        let ctx = SyncContext {
            executor: Arc::clone(&executor),
            concurrency,
            shutdown: Arc::clone(&self.shutdown),
        };

        let mut failures = Vec::new();
        match options.target.as_deref() {
            Some(target) => {
                let (host, sub_path) = split_target(target)?;
                let provider = (self.providers)(host, &settings.src_dir, &self.store);
                let result = match sub_path {
                    Some(sub_path) => provider.sync_path(&ctx, sub_path),
                    None => provider.sync_all(&ctx),
                };
                collect(&mut failures, provider.as_ref(), result);
            }
            None => {
                for (_, host) in child_dirs(&settings.src_dir)? {
                    if ctx.cancelled() {
                        break;
                    }
                    let provider = (self.providers)(&host, &settings.src_dir, &self.store);
                    debug!("{}: syncing with the {} provider", host, provider.name());
                    let result = provider.sync_all(&ctx);
                    collect(&mut failures, provider.as_ref(), result);
                }
            }
        }

        failures.extend(executor.join()?.into_iter().map(Failure::from));

        let cancelled = self.shutdown.load(Ordering::SeqCst);
        if cancelled {
            failures.push(Failure {
                context: "sync".to_string(),
                error: Error::Cancelled {
                    context: "interrupted before all repositories were processed".to_string(),
                },
            });
        }

        Ok(SyncReport {
            failures,
            cancelled,
        })
    }
}

/// A provider that fails outright is one failure; the others still run.
fn collect(failures: &mut Vec<Failure>, provider: &dyn Provider, result: Result<Vec<Failure>>) {
    match result {
        Ok(scope_failures) => failures.extend(scope_failures),
        Err(error) => failures.push(Failure {
            context: provider.name().to_string(),
            error,
        }),
    }
}

/// Split `host/sub/path` into the host and the optional rest.
pub fn split_target(target: &str) -> Result<(&str, Option<&str>)> {
    let target = target.trim_matches('/');
    if target.is_empty() {
        return Err(Error::ConfigParse {
            message: "invalid sync path: empty".to_string(),
            hint: Some("Use host[/scope[/repo]], e.g. github.com/acme".to_string()),
        });
    }
    Ok(match target.split_once('/') {
        Some((host, rest)) => {
            let rest = rest.trim_matches('/');
            (host, (!rest.is_empty()).then_some(rest))
        }
        None => (target, None),
    })
}
