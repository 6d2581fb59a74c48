//! Persistence coordinator: bounded retry around store reads and writes.
//!
//! Every logical operation either succeeds or raises exactly one terminal
//! notification. Writes also raise exactly one `Saved` notification on
//! success, however many attempts it took.

mod notify;
mod retry;
mod store;

pub use notify::*;
pub use retry::*;
pub use store::*;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{Assignment, AssignmentStatus, Question};

/// Terminal persistence failures, raised after the user has been notified.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PersistenceError {
    #[error("{operation} failed after {attempts} attempts: {source}")]
    Exhausted {
        operation: &'static str,
        attempts: u32,
        #[source]
        source: StoreError,
    },

    #[error("{operation} failed: {source}")]
    Rejected {
        operation: &'static str,
        #[source]
        source: StoreError,
    },
}

impl PersistenceError {
    /// The underlying store error.
    pub fn store_error(&self) -> &StoreError {
        match self {
            PersistenceError::Exhausted { source, .. } | PersistenceError::Rejected { source, .. } => {
                source
            }
        }
    }
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

static THREAD_SLEEPER: ThreadSleeper = ThreadSleeper;

/// Retrying wrapper around an [`AssignmentStore`].
pub struct PersistenceCoordinator<'a, S: AssignmentStore + ?Sized> {
    store: &'a S,
    notifier: &'a dyn Notifier,
    sleeper: &'a dyn Sleeper,
    read_policy: RetryPolicy,
    write_policy: RetryPolicy,
}

impl<'a, S: AssignmentStore + ?Sized> PersistenceCoordinator<'a, S> {
    /// Create a coordinator with the default read/write policies.
    pub fn new(store: &'a S, notifier: &'a dyn Notifier) -> Self {
        Self {
            store,
            notifier,
            sleeper: &THREAD_SLEEPER,
            read_policy: RetryPolicy::reads(),
            write_policy: RetryPolicy::writes(),
        }
    }

    /// Replace the sleeper (tests use one that records instead of blocking).
    pub fn with_sleeper(mut self, sleeper: &'a dyn Sleeper) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Override the read and write policies.
    pub fn with_policies(mut self, read_policy: RetryPolicy, write_policy: RetryPolicy) -> Self {
        self.read_policy = read_policy;
        self.write_policy = write_policy;
        self
    }

    pub fn store(&self) -> &'a S {
        self.store
    }

    /// Load a definition snapshot.
    pub fn load_definition(&self, definition_id: &str) -> PersistenceResult<DefinitionSnapshot> {
        let result = self.run("load definition", &self.read_policy, || {
            self.store.fetch_definition(definition_id)
        });
        self.finish_read(result)
    }

    /// Load an assignment.
    pub fn load_assignment(&self, assignment_id: &str) -> PersistenceResult<Assignment> {
        let result = self.run("load assignment", &self.read_policy, || {
            self.store.fetch_assignment(assignment_id)
        });
        self.finish_read(result)
    }

    /// Save the full answer state plus completion fields.
    pub fn save_answers(
        &self,
        assignment_id: &str,
        answers: &[Question],
        finished_on: Option<DateTime<Utc>>,
        expires_on: Option<DateTime<Utc>>,
        status: AssignmentStatus,
    ) -> PersistenceResult<()> {
        let result = self.run("save answers", &self.write_policy, || {
            self.store
                .save_assignment_answers(assignment_id, answers, finished_on, expires_on, status)
        });
        self.finish_write(result)
    }

    /// Save the whole assignment document.
    pub fn save_assignment(&self, assignment: &Assignment) -> PersistenceResult<()> {
        let result = self.run("save assignment", &self.write_policy, || {
            self.store.save_assignment(assignment)
        });
        self.finish_write(result)
    }

    fn finish_read<T>(&self, result: PersistenceResult<T>) -> PersistenceResult<T> {
        if result.is_err() {
            self.notifier.notify(Notification::connection_error());
        }
        result
    }

    fn finish_write(&self, result: PersistenceResult<()>) -> PersistenceResult<()> {
        match &result {
            Ok(()) => self.notifier.notify(Notification::saved()),
            Err(_) => self.notifier.notify(Notification::save_failed()),
        }
        result
    }

    fn run<T>(
        &self,
        operation: &'static str,
        policy: &RetryPolicy,
        mut attempt_once: impl FnMut() -> Result<T, StoreError>,
    ) -> PersistenceResult<T> {
        let max_attempts = policy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match attempt_once() {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::info!(operation, attempt, "Store operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(source) if !source.is_transient() => {
                    tracing::error!(operation, error = %source, "Store operation rejected");
                    return Err(PersistenceError::Rejected { operation, source });
                }
                Err(source) if attempt >= max_attempts => {
                    tracing::error!(
                        operation,
                        attempts = attempt,
                        error = %source,
                        "Store operation failed: retries exhausted"
                    );
                    return Err(PersistenceError::Exhausted {
                        operation,
                        attempts: attempt,
                        source,
                    });
                }
                Err(source) => {
                    let wait = policy.delay_after(attempt);
                    tracing::warn!(
                        operation,
                        attempt,
                        backoff_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
                        error = %source,
                        "Store operation failed, will retry after backoff"
                    );
                    self.sleeper.sleep(wait);
                    attempt += 1;
                }
            }
        }
    }
}
