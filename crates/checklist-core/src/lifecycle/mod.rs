//! Assignment lifecycle.
//!
//! ```text
//! pending ──accept──▶ in_progress ──complete──▶ completed
//!    │                     │                        │
//!    └──── due date ───────┴──▶ due_date_expired     │
//!                                   │               │
//!                                   └──── retake ◀──┘
//! ```
//!
//! Transitions return [`LifecycleError`] when their precondition does not
//! hold. Callers driving a UI treat these as guards: the action does not
//! proceed and nothing is persisted.

mod expiration;

pub use expiration::*;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::answers::{clear_ratings, find_last_completed_page, hydrate};
use crate::models::{Assignment, AssignmentStatus, ChecklistDefinition, Question, Version};

/// Lifecycle precondition failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("Cannot {action} an assignment that is {status:?}")]
    InvalidTransition {
        action: &'static str,
        status: AssignmentStatus,
    },

    #[error("Agreements must be accepted before completing the checklist")]
    AgreementsNotAccepted,

    #[error("Version {version_id} does not belong to definition {definition_id}")]
    VersionMismatch {
        definition_id: String,
        version_id: String,
    },

    #[error("Answer tree has {actual} pages, expected {expected}")]
    PageCountMismatch { expected: usize, actual: usize },
}

pub type LifecycleResult<T> = Result<T, LifecycleError>;

/// How a retake seeds its answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetakeMode {
    /// Start from unanswered items; agreements are accepted again
    Blank,
    /// Start from the previous submission's ratings
    Seeded,
}

impl Assignment {
    /// Assign `version` of `definition` to a clinician.
    ///
    /// The answers are a hydrated deep copy of the version's question tree and
    /// the format is fixed here for the life of the assignment.
    pub fn assign(
        definition: &ChecklistDefinition,
        version: &Version,
        clinician_id: String,
        agency_id: String,
        due_date: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> LifecycleResult<Self> {
        if version.definition_id != definition.id {
            return Err(LifecycleError::VersionMismatch {
                definition_id: definition.id.clone(),
                version_id: version.id.clone(),
            });
        }

        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            definition_id: definition.id.clone(),
            version_id: version.id.clone(),
            clinician_id,
            agency_id,
            format: version.format,
            expiration_policy: version.expiration_policy,
            status: AssignmentStatus::Pending,
            answers: hydrate(&version.questions, version.format),
            assigned_on: now,
            started_on: None,
            finished_on: None,
            due_date,
            expires_on: None,
            accepted_agreements: false,
        })
    }

    /// First page entry: accept agreements and start the checklist.
    pub fn accept_agreements(&mut self, now: DateTime<Utc>) -> LifecycleResult<()> {
        match self.status {
            AssignmentStatus::Pending => {
                self.status = AssignmentStatus::InProgress;
                self.started_on = Some(now);
                self.accepted_agreements = true;
                tracing::info!(assignment_id = %self.id, "Checklist started");
                Ok(())
            }
            AssignmentStatus::InProgress => {
                self.accepted_agreements = true;
                Ok(())
            }
            status => Err(LifecycleError::InvalidTransition {
                action: "start",
                status,
            }),
        }
    }

    /// Replace the full answer state. Only allowed while in progress.
    pub fn record_answers(&mut self, answers: Vec<Question>) -> LifecycleResult<()> {
        if self.status != AssignmentStatus::InProgress {
            return Err(LifecycleError::InvalidTransition {
                action: "edit",
                status: self.status,
            });
        }
        if answers.len() != self.answers.len() {
            return Err(LifecycleError::PageCountMismatch {
                expected: self.answers.len(),
                actual: answers.len(),
            });
        }
        self.answers = answers;
        Ok(())
    }

    /// Final page submitted.
    pub fn complete(
        &mut self,
        now: DateTime<Utc>,
        calculator: &dyn ExpirationCalculator,
    ) -> LifecycleResult<()> {
        if self.status != AssignmentStatus::InProgress {
            return Err(LifecycleError::InvalidTransition {
                action: "complete",
                status: self.status,
            });
        }
        if !self.accepted_agreements {
            return Err(LifecycleError::AgreementsNotAccepted);
        }

        self.status = AssignmentStatus::Completed;
        self.finished_on = Some(now);
        self.expires_on = calculator.expires_on(&self.expiration_policy, now);
        tracing::info!(
            assignment_id = %self.id,
            expires_on = ?self.expires_on,
            "Checklist completed"
        );
        Ok(())
    }

    /// Move an open assignment to `due_date_expired` once `now` passes the due date.
    ///
    /// Returns whether the status changed.
    pub fn observe_due_date(&mut self, now: DateTime<Utc>) -> bool {
        let overdue = self.due_date.is_some_and(|due| now > due);
        let open = matches!(
            self.status,
            AssignmentStatus::Pending | AssignmentStatus::InProgress
        );
        if overdue && open {
            self.status = AssignmentStatus::DueDateExpired;
            tracing::info!(assignment_id = %self.id, "Checklist due date passed");
            return true;
        }
        false
    }

    /// Start a new editable cycle on the same version.
    ///
    /// `due_date` replaces the previous cycle's due date; `None` leaves the
    /// new cycle without one.
    pub fn retake(
        &mut self,
        mode: RetakeMode,
        due_date: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> LifecycleResult<()> {
        if !self.status.is_terminal() {
            return Err(LifecycleError::InvalidTransition {
                action: "retake",
                status: self.status,
            });
        }

        self.finished_on = None;
        self.due_date = due_date;
        match mode {
            RetakeMode::Blank => {
                self.answers = clear_ratings(&self.answers);
                self.status = AssignmentStatus::Pending;
                self.started_on = None;
                self.accepted_agreements = false;
            }
            RetakeMode::Seeded => {
                self.status = AssignmentStatus::InProgress;
                self.started_on = Some(now);
            }
        }

        tracing::info!(
            assignment_id = %self.id,
            mode = ?mode,
            due_date = ?self.due_date,
            "Checklist retake started"
        );
        Ok(())
    }

    /// 1-based step to resume on: the highest page with any rating, or the first page.
    pub fn resume_step(&self) -> usize {
        find_last_completed_page(&self.answers).map_or(1, |index| index + 1)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::answers::set_item_value;
    use crate::models::{ChecklistFormat, ExpirationPolicy, Item, ItemField, Rating, Section};

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, day, 9, 0, 0).unwrap()
    }

    fn template() -> Vec<Question> {
        ["Respiratory", "Cardiac", "Neuro"]
            .iter()
            .map(|prompt| Question {
                prompt: prompt.to_string(),
                sections: vec![Section {
                    title: "Core".into(),
                    exclude_from_score: false,
                    items: vec![Item::blank("First"), Item::blank("Second")],
                }],
            })
            .collect()
    }

    fn setup(format: ChecklistFormat) -> (ChecklistDefinition, Version) {
        ChecklistDefinition::create(
            "ICU RN".into(),
            "Critical Care".into(),
            template(),
            ExpirationPolicy::Years(1),
            format,
            at(1),
        )
        .unwrap()
    }

    fn assign(format: ChecklistFormat) -> Assignment {
        let (definition, version) = setup(format);
        Assignment::assign(
            &definition,
            &version,
            "clinician-1".into(),
            "agency-1".into(),
            Some(at(20)),
            at(1),
        )
        .unwrap()
    }

    fn rate(assignment: &Assignment, step: usize, item: usize, value: u8) -> Vec<Question> {
        set_item_value(
            &assignment.answers,
            step,
            0,
            item,
            ItemField::Proficiency,
            Some(Rating::new(value).unwrap()),
            assignment.format,
        )
    }

    #[test]
    fn test_assign_copies_and_hydrates_version() {
        let assignment = assign(ChecklistFormat::New);
        assert_eq!(assignment.status, AssignmentStatus::Pending);
        assert_eq!(assignment.format, ChecklistFormat::New);
        assert_eq!(assignment.total_steps(), 3);
        assert_eq!(assignment.answers[0].sections[0].items[0].proficiency, Some(None));
        assert!(assignment.finished_on.is_none());
        assert!(!assignment.accepted_agreements);
    }

    #[test]
    fn test_assign_rejects_foreign_version() {
        let (definition, _) = setup(ChecklistFormat::New);
        let (_, other_version) = setup(ChecklistFormat::New);
        let result = Assignment::assign(&definition, &other_version, "c".into(), "a".into(), None, at(1));
        assert!(matches!(result, Err(LifecycleError::VersionMismatch { .. })));
    }

    #[test]
    fn test_full_lifecycle() {
        let mut assignment = assign(ChecklistFormat::New);

        assignment.accept_agreements(at(2)).unwrap();
        assert_eq!(assignment.status, AssignmentStatus::InProgress);
        assert_eq!(assignment.started_on, Some(at(2)));

        let answers = rate(&assignment, 1, 0, 3);
        assignment.record_answers(answers).unwrap();

        assignment.complete(at(3), &CalendarExpiration).unwrap();
        assert_eq!(assignment.status, AssignmentStatus::Completed);
        assert_eq!(assignment.finished_on, Some(at(3)));
        assert_eq!(
            assignment.expires_on,
            Some(Utc.with_ymd_and_hms(2025, 5, 3, 9, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_complete_requires_agreements() {
        let mut assignment = assign(ChecklistFormat::New);
        assignment.status = AssignmentStatus::InProgress;

        let result = assignment.complete(at(3), &CalendarExpiration);
        assert_eq!(result, Err(LifecycleError::AgreementsNotAccepted));
        assert_eq!(assignment.status, AssignmentStatus::InProgress);
        assert!(assignment.finished_on.is_none());
    }

    #[test]
    fn test_complete_requires_in_progress() {
        let mut assignment = assign(ChecklistFormat::New);
        let result = assignment.complete(at(3), &CalendarExpiration);
        assert!(matches!(result, Err(LifecycleError::InvalidTransition { .. })));
    }

    #[test]
    fn test_completed_answers_are_immutable() {
        let mut assignment = assign(ChecklistFormat::New);
        assignment.accept_agreements(at(2)).unwrap();
        assignment.complete(at(3), &CalendarExpiration).unwrap();

        let edited = rate(&assignment, 1, 0, 4);
        let result = assignment.record_answers(edited);
        assert!(matches!(
            result,
            Err(LifecycleError::InvalidTransition { action: "edit", .. })
        ));
        assert!(!assignment.answers[0].has_answers());
    }

    #[test]
    fn test_record_answers_rejects_wrong_page_count() {
        let mut assignment = assign(ChecklistFormat::New);
        assignment.accept_agreements(at(2)).unwrap();
        let result = assignment.record_answers(vec![]);
        assert_eq!(
            result,
            Err(LifecycleError::PageCountMismatch { expected: 3, actual: 0 })
        );
    }

    #[test]
    fn test_due_date_expiry_is_observed() {
        let mut assignment = assign(ChecklistFormat::New);
        assert!(!assignment.observe_due_date(at(20)));
        assert!(assignment.observe_due_date(at(20) + Duration::seconds(1)));
        assert_eq!(assignment.status, AssignmentStatus::DueDateExpired);

        // terminal: cannot start anymore
        assert!(assignment.accept_agreements(at(21)).is_err());
    }

    #[test]
    fn test_completed_is_not_expired_by_due_date() {
        let mut assignment = assign(ChecklistFormat::New);
        assignment.accept_agreements(at(2)).unwrap();
        assignment.complete(at(3), &CalendarExpiration).unwrap();
        assert!(!assignment.observe_due_date(at(25)));
        assert_eq!(assignment.status, AssignmentStatus::Completed);
    }

    #[test]
    fn test_blank_retake() {
        let mut assignment = assign(ChecklistFormat::New);
        let version_id = assignment.version_id.clone();
        assignment.accept_agreements(at(2)).unwrap();
        let answers = rate(&assignment, 2, 1, 4);
        assignment.record_answers(answers).unwrap();
        assignment.complete(at(3), &CalendarExpiration).unwrap();

        assignment.retake(RetakeMode::Blank, None, at(10)).unwrap();
        assert_eq!(assignment.status, AssignmentStatus::Pending);
        assert!(assignment.finished_on.is_none());
        assert!(!assignment.accepted_agreements);
        assert!(assignment.answers.iter().all(|q| !q.has_answers()));
        assert_eq!(assignment.version_id, version_id);
    }

    #[test]
    fn test_seeded_retake() {
        let mut assignment = assign(ChecklistFormat::New);
        assignment.accept_agreements(at(2)).unwrap();
        let answers = rate(&assignment, 2, 1, 4);
        assignment.record_answers(answers).unwrap();
        assignment.complete(at(3), &CalendarExpiration).unwrap();

        assignment.retake(RetakeMode::Seeded, None, at(10)).unwrap();
        assert_eq!(assignment.status, AssignmentStatus::InProgress);
        assert_eq!(assignment.started_on, Some(at(10)));
        assert!(assignment.finished_on.is_none());
        assert!(assignment.answers[1].has_answers());
        assert_eq!(assignment.resume_step(), 2);
    }

    #[test]
    fn test_retake_replaces_due_date() {
        let mut assignment = assign(ChecklistFormat::New);
        assignment.due_date = Some(at(5));
        assert!(assignment.observe_due_date(at(6)));

        assignment.retake(RetakeMode::Seeded, Some(at(20)), at(6)).unwrap();
        assert_eq!(assignment.due_date, Some(at(20)));
        assert!(!assignment.observe_due_date(at(7)));
        assert_eq!(assignment.status, AssignmentStatus::InProgress);

        assert!(assignment.observe_due_date(at(21)));
    }

    #[test]
    fn test_retake_requires_terminal_status() {
        let mut assignment = assign(ChecklistFormat::New);
        let result = assignment.retake(RetakeMode::Blank, None, at(2));
        assert!(matches!(
            result,
            Err(LifecycleError::InvalidTransition { action: "retake", .. })
        ));
    }

    #[test]
    fn test_resume_step() {
        let mut assignment = assign(ChecklistFormat::New);
        assert_eq!(assignment.resume_step(), 1);

        assignment.accept_agreements(at(2)).unwrap();
        let answers = rate(&assignment, 1, 0, 4);
        assignment.record_answers(answers).unwrap();
        let answers = rate(&assignment, 1, 1, 3);
        assignment.record_answers(answers).unwrap();
        let answers = rate(&assignment, 2, 0, 2);
        assignment.record_answers(answers).unwrap();

        assert_eq!(assignment.resume_step(), 2);
    }
}
