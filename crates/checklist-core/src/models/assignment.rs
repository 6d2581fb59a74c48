//! A clinician's instance of a checklist version.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::answer::{ChecklistFormat, Question};
use super::definition::ExpirationPolicy;

/// Assignment lifecycle status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    /// Assigned, not yet opened
    Pending,
    /// Agreements accepted, answering pages
    InProgress,
    /// Last page submitted
    Completed,
    /// Due date passed before completion
    DueDateExpired,
}

impl AssignmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AssignmentStatus::Pending => "pending",
            AssignmentStatus::InProgress => "in_progress",
            AssignmentStatus::Completed => "completed",
            AssignmentStatus::DueDateExpired => "due_date_expired",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(AssignmentStatus::Pending),
            "in_progress" => Some(AssignmentStatus::InProgress),
            "completed" => Some(AssignmentStatus::Completed),
            "due_date_expired" => Some(AssignmentStatus::DueDateExpired),
            _ => None,
        }
    }

    /// Completed and expired instances accept no further edits without a retake.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            AssignmentStatus::Completed | AssignmentStatus::DueDateExpired
        )
    }
}

/// One clinician's checklist instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Assignment {
    /// Unique assignment ID
    pub id: String,
    /// Checklist definition this was assigned from
    pub definition_id: String,
    /// Version the answers were copied from (kept across retakes)
    pub version_id: String,
    /// Clinician answering the checklist
    pub clinician_id: String,
    /// Agency that assigned it
    pub agency_id: String,
    /// Format fixed at creation from the version
    pub format: ChecklistFormat,
    /// Expiration policy copied from the version
    pub expiration_policy: ExpirationPolicy,
    /// Lifecycle status
    pub status: AssignmentStatus,
    /// Deep copy of the version's question tree, answered page by page
    pub answers: Vec<Question>,
    pub assigned_on: DateTime<Utc>,
    pub started_on: Option<DateTime<Utc>>,
    /// Set iff status is completed
    pub finished_on: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub expires_on: Option<DateTime<Utc>>,
    /// Accepted on first page entry
    pub accepted_agreements: bool,
}

impl Assignment {
    /// Number of pages.
    pub fn total_steps(&self) -> usize {
        self.answers.len()
    }
}
