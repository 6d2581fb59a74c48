//! Data store seam used by the coordinator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Assignment, AssignmentStatus, ChecklistFormat, Question};

/// Store failures, split by whether retrying can help.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

impl StoreError {
    /// Network/backend hiccups worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

/// Current version of a definition as the editing surfaces see it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefinitionSnapshot {
    pub definition_id: String,
    pub title: String,
    pub category: String,
    pub version_id: String,
    pub version_number: u32,
    pub format: ChecklistFormat,
    pub total_questions: usize,
    pub questions: Vec<Question>,
}

/// Reads and writes against the backing store.
///
/// Writes are not assumed idempotent; callers always pass the full answer
/// state so a retried write cannot partially apply.
pub trait AssignmentStore {
    fn fetch_definition(&self, definition_id: &str) -> Result<DefinitionSnapshot, StoreError>;

    fn fetch_assignment(&self, assignment_id: &str) -> Result<Assignment, StoreError>;

    fn save_assignment_answers(
        &self,
        assignment_id: &str,
        answers: &[Question],
        finished_on: Option<DateTime<Utc>>,
        expires_on: Option<DateTime<Utc>>,
        status: AssignmentStatus,
    ) -> Result<(), StoreError>;

    /// Full-document write used by lifecycle transitions (start, retake).
    fn save_assignment(&self, assignment: &Assignment) -> Result<(), StoreError>;
}
