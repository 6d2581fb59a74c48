//! A clinician's editing session over one assignment.
//!
//! The session holds the in-memory answer tree, the current page and the
//! format resolved once from the assignment. Store traffic goes through the
//! [`PersistenceCoordinator`], so every save either lands or leaves the
//! session exactly as it was before the call.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::answers::{hydrate, question_at_step, set_item_value, skip_section};
use crate::lifecycle::{ExpirationCalculator, LifecycleError, RetakeMode};
use crate::models::{Assignment, AssignmentStatus, ChecklistFormat, ItemField, Question, Rating};
use crate::persistence::{AssignmentStore, DefinitionSnapshot, PersistenceCoordinator, PersistenceResult};
use crate::presentation::{merge_page, FormView, ReviewView};
use crate::scoring::{score, ScoreSummary};
use crate::settings::ChecklistSettings;

/// Why an action was dropped without touching the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum IgnoreReason {
    /// The assignment is not open for editing
    NotEditable { status: AssignmentStatus },
    /// Agreements were never accepted
    AgreementsNotAccepted,
    /// The session is not on a valid page
    UnknownStep { step: usize },
    /// Any other lifecycle precondition
    Rejected { message: String },
}

impl From<LifecycleError> for IgnoreReason {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::InvalidTransition { status, .. } => IgnoreReason::NotEditable { status },
            LifecycleError::AgreementsNotAccepted => IgnoreReason::AgreementsNotAccepted,
            other => IgnoreReason::Rejected {
                message: other.to_string(),
            },
        }
    }
}

/// Result of submitting a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubmitOutcome {
    /// Page saved; the session moved to `next_step`
    Saved { next_step: usize },
    /// Last page saved and the assignment completed
    Completed,
    /// Nothing was saved
    Ignored(IgnoreReason),
}

/// Editing session for one assignment.
pub struct ChecklistSession<'a, S: AssignmentStore + ?Sized> {
    coordinator: PersistenceCoordinator<'a, S>,
    settings: ChecklistSettings,
    assignment: Assignment,
    definition: DefinitionSnapshot,
    step: usize,
}

impl<'a, S: AssignmentStore + ?Sized> ChecklistSession<'a, S> {
    /// Load the assignment and its definition and position on the resume step.
    ///
    /// The coordinator's retry policies are replaced by the settings' policies.
    pub fn open(
        coordinator: PersistenceCoordinator<'a, S>,
        assignment_id: &str,
        settings: ChecklistSettings,
        now: DateTime<Utc>,
    ) -> PersistenceResult<Self> {
        let coordinator = coordinator.with_policies(settings.read_policy(), settings.write_policy());

        let mut assignment = coordinator.load_assignment(assignment_id)?;
        let definition = coordinator.load_definition(&assignment.definition_id)?;

        if definition.version_id != assignment.version_id {
            tracing::debug!(
                assignment_id,
                assignment_version = %assignment.version_id,
                current_version = %definition.version_id,
                "Definition has a newer version; keeping the assignment's format"
            );
        }

        assignment.answers = hydrate(&assignment.answers, assignment.format);
        assignment.observe_due_date(now);
        let step = assignment.resume_step();

        tracing::info!(
            assignment_id,
            status = assignment.status.as_str(),
            step,
            "Checklist session opened"
        );

        Ok(Self {
            coordinator,
            settings,
            assignment,
            definition,
            step,
        })
    }

    pub fn assignment(&self) -> &Assignment {
        &self.assignment
    }

    pub fn definition(&self) -> &DefinitionSnapshot {
        &self.definition
    }

    pub fn settings(&self) -> &ChecklistSettings {
        &self.settings
    }

    /// Format fixed for this assignment.
    pub fn format(&self) -> ChecklistFormat {
        self.assignment.format
    }

    /// Current 1-based page.
    pub fn step(&self) -> usize {
        self.step
    }

    pub fn total_steps(&self) -> usize {
        self.assignment.total_steps()
    }

    /// Move to another page. Returns false for an out-of-range step.
    pub fn go_to(&mut self, step: usize) -> bool {
        if question_at_step(&self.assignment.answers, step).is_none() {
            return false;
        }
        self.step = step;
        true
    }

    pub fn current_page(&self) -> Option<&Question> {
        question_at_step(&self.assignment.answers, self.step)
    }

    /// Page entry: accept agreements and start the checklist.
    ///
    /// Persists only when something changed. Returns false when the
    /// assignment cannot be started.
    pub fn enter(&mut self, now: DateTime<Utc>) -> PersistenceResult<bool> {
        let before = self.assignment.clone();
        if let Err(err) = self.assignment.accept_agreements(now) {
            tracing::debug!(assignment_id = %self.assignment.id, error = %err, "Ignoring page entry");
            return Ok(false);
        }
        if self.assignment == before {
            return Ok(true);
        }

        if let Err(err) = self.coordinator.save_assignment(&self.assignment) {
            self.assignment = before;
            return Err(err);
        }
        Ok(true)
    }

    /// Set one rating on the current page. Nothing is saved until the page is submitted.
    pub fn set_value(
        &mut self,
        section_idx: usize,
        item_idx: usize,
        field: ItemField,
        value: Option<Rating>,
    ) -> bool {
        let updated = set_item_value(
            &self.assignment.answers,
            self.step,
            section_idx,
            item_idx,
            field,
            value,
            self.format(),
        );
        self.apply_edit(updated)
    }

    /// Mark a section of the current page N/A. No-op unless the agency allows it.
    pub fn skip_section(&mut self, section_idx: usize, field: ItemField) -> bool {
        if !self.settings.allow_na_skip {
            tracing::debug!(assignment_id = %self.assignment.id, "N/A skip not allowed");
            return false;
        }
        let updated = skip_section(
            &self.assignment.answers,
            self.step,
            section_idx,
            field,
            self.format(),
        );
        self.apply_edit(updated)
    }

    fn apply_edit(&mut self, updated: Vec<Question>) -> bool {
        if updated == self.assignment.answers {
            return false;
        }
        match self.assignment.record_answers(updated) {
            Ok(()) => true,
            Err(err) => {
                tracing::debug!(assignment_id = %self.assignment.id, error = %err, "Ignoring edit");
                false
            }
        }
    }

    /// Save the edited current page. On the last page this completes the assignment.
    ///
    /// On a persistence failure the session keeps its previous state and stays
    /// on the same page.
    pub fn submit_page(
        &mut self,
        edited: &Question,
        now: DateTime<Utc>,
        calculator: &dyn ExpirationCalculator,
    ) -> PersistenceResult<SubmitOutcome> {
        if self.assignment.status != AssignmentStatus::InProgress {
            return Ok(self.ignore(IgnoreReason::NotEditable {
                status: self.assignment.status,
            }));
        }
        if self.current_page().is_none() {
            return Ok(self.ignore(IgnoreReason::UnknownStep { step: self.step }));
        }

        let merged = merge_page(&self.assignment.answers, self.step, edited, self.format());
        let mut next = self.assignment.clone();
        if let Err(err) = next.record_answers(merged) {
            return Ok(self.ignore(err.into()));
        }

        let is_last = self.step == self.total_steps();
        if is_last {
            if let Err(err) = next.complete(now, calculator) {
                return Ok(self.ignore(err.into()));
            }
        }

        self.coordinator.save_answers(
            &next.id,
            &next.answers,
            next.finished_on,
            next.expires_on,
            next.status,
        )?;
        self.assignment = next;

        if is_last {
            return Ok(SubmitOutcome::Completed);
        }
        self.step += 1;
        Ok(SubmitOutcome::Saved {
            next_step: self.step,
        })
    }

    fn ignore(&self, reason: IgnoreReason) -> SubmitOutcome {
        tracing::debug!(assignment_id = %self.assignment.id, ?reason, "Ignoring page submit");
        SubmitOutcome::Ignored(reason)
    }

    /// Start a retake of a completed or expired assignment.
    ///
    /// `due_date` is the new cycle's due date. Returns false when the
    /// assignment is still open.
    pub fn retake(
        &mut self,
        mode: RetakeMode,
        due_date: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> PersistenceResult<bool> {
        let mut next = self.assignment.clone();
        if let Err(err) = next.retake(mode, due_date, now) {
            tracing::debug!(assignment_id = %self.assignment.id, error = %err, "Ignoring retake");
            return Ok(false);
        }

        self.coordinator.save_assignment(&next)?;
        self.assignment = next;
        self.step = 1;
        Ok(true)
    }

    /// Live totals over the whole tree.
    pub fn summary(&self) -> ScoreSummary {
        score(&self.assignment.answers, self.format())
    }

    /// Editable view of the current page.
    pub fn form(&self) -> Option<FormView> {
        FormView::for_step(&self.assignment.answers, self.step, self.format())
    }

    /// Read-only view of every page.
    pub fn review(&self) -> ReviewView {
        ReviewView::build(&self.definition.title, &self.assignment.answers, self.format())
    }
}
