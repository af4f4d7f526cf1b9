//! # Worker Pool
//!
//! A fixed-size pool of threads draining one job queue. A sync pass runs two
//! of them: one enumerates scopes and resolves policy, the other executes
//! the resulting git jobs.
//!
//! - Jobs are isolated: a failing job is recorded with its error and the
//!   worker moves on to the next one.
//! - Workers poll the queue with a timeout and check the shared shutdown
//!   flag between jobs, so an interrupt stops new work within
//!   [`POLL_INTERVAL`] even while the queue is idle.
//! - A pool of size `0` runs every job on the pushing thread, in push order.
//!   This is the deterministic mode used for debugging and tests.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use log::{debug, warn};

use crate::error::{Error, Result};

/// How long an idle worker waits before re-checking the shutdown flag.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Executes one job. Shared by all workers of a pool.
pub type Handler<J> = Arc<dyn Fn(&J) -> Result<()> + Send + Sync>;

enum Message<J> {
    Job(J),
    Finish,
}

/// A job that failed, with the error it failed with.
#[derive(Debug)]
pub struct JobError<J> {
    pub job: J,
    pub error: Error,
}

impl<J: fmt::Display> fmt::Display for JobError<J> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.job, self.error)
    }
}

pub struct WorkerPool<J> {
    name: String,
    size: usize,
    handler: Handler<J>,
    sender: Sender<Message<J>>,
    receiver: Receiver<Message<J>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    errors: Arc<Mutex<Vec<JobError<J>>>>,
    shutdown: Arc<AtomicBool>,
}

impl<J: fmt::Display + Send + 'static> WorkerPool<J> {
    /// Create a pool of `size` workers. Nothing runs until [`start`](Self::start).
    pub fn new(name: &str, size: usize, handler: Handler<J>, shutdown: Arc<AtomicBool>) -> Self {
        let (sender, receiver) = channel::unbounded();
        Self {
            name: name.to_string(),
            size,
            handler,
            sender,
            receiver,
            workers: Mutex::new(Vec::new()),
            errors: Arc::new(Mutex::new(Vec::new())),
            shutdown,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Spawn the workers. A no-op for a synchronous pool or when already
    /// started.
    pub fn start(&self) -> Result<()> {
        let mut workers = lock(&self.workers, "worker handles")?;
        if self.size == 0 || !workers.is_empty() {
            return Ok(());
        }
        debug!("Starting {} pool with {} workers", self.name, self.size);
        for index in 0..self.size {
            let receiver = self.receiver.clone();
            let handler = Arc::clone(&self.handler);
            let errors = Arc::clone(&self.errors);
            let shutdown = Arc::clone(&self.shutdown);
            let handle = thread::Builder::new()
                .name(format!("{}-{}", self.name, index))
                .spawn(move || worker_loop(&receiver, &handler, &errors, &shutdown))?;
            workers.push(handle);
        }
        Ok(())
    }

    /// Queue a job, or run it right away in a synchronous pool.
    ///
    /// Jobs pushed after cancellation are dropped.
    pub fn push(&self, job: J) -> Result<()> {
        if self.cancelled() {
            debug!("Dropping {} after cancellation", job);
            return Ok(());
        }
        if self.size == 0 {
            execute(&self.handler, job, &self.errors);
            return Ok(());
        }
        self.sender
            .send(Message::Job(job))
            .map_err(|_| Error::Cancelled {
                context: format!("{} queue closed", self.name),
            })
    }

    /// Tell every worker to exit once the jobs queued so far are done.
    pub fn finish(&self) -> Result<()> {
        let workers = lock(&self.workers, "worker handles")?;
        for _ in 0..workers.len() {
            self.sender
                .send(Message::Finish)
                .map_err(|_| Error::Cancelled {
                    context: format!("{} queue closed", self.name),
                })?;
        }
        Ok(())
    }

    /// Block until every worker has exited.
    pub fn wait(&self) -> Result<()> {
        let handles: Vec<JoinHandle<()>> = lock(&self.workers, "worker handles")?
            .drain(..)
            .collect();
        for handle in handles {
            if handle.join().is_err() {
                warn!("A {} worker panicked", self.name);
            }
        }
        Ok(())
    }

    /// [`finish`](Self::finish), [`wait`](Self::wait), then hand back the
    /// failures.
    pub fn join(&self) -> Result<Vec<JobError<J>>> {
        self.finish()?;
        self.wait()?;
        self.take_errors()
    }

    /// Drain the failures recorded so far.
    pub fn take_errors(&self) -> Result<Vec<JobError<J>>> {
        Ok(lock(&self.errors, "job errors")?.drain(..).collect())
    }

    pub fn cancelled(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }
}

fn worker_loop<J: fmt::Display>(
    receiver: &Receiver<Message<J>>,
    handler: &Handler<J>,
    errors: &Mutex<Vec<JobError<J>>>,
    shutdown: &AtomicBool,
) {
    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }
        match receiver.recv_timeout(POLL_INTERVAL) {
            Ok(Message::Job(job)) => execute(handler, job, errors),
            Ok(Message::Finish) => break,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

fn execute<J: fmt::Display>(handler: &Handler<J>, job: J, errors: &Mutex<Vec<JobError<J>>>) {
    if let Err(error) = handler(&job) {
        debug!("{} failed: {}", job, error);
        // A poisoned list still holds every error pushed before the panic.
        errors
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(JobError { job, error });
    }
}

fn lock<'a, T>(mutex: &'a Mutex<T>, context: &str) -> Result<MutexGuard<'a, T>> {
    mutex.lock().map_err(|_| Error::LockPoisoned {
        context: context.to_string(),
    })
}
