//! Checklist Core Library
//!
//! Clinician skills checklists: authoring, assignment, page-by-page
//! answering, scoring and review, stored locally in SQLite.
//!
//! # Architecture
//!
//! ```text
//! Definition ──publish/revise──▶ Version (immutable once published)
//!                                    │
//!                               assign (deep copy, format fixed)
//!                                    │
//!                                    ▼
//!                               Assignment
//!                                    │
//!          ┌───────────── ChecklistSession ─────────────┐
//!          │  enter → set_value / skip_section → submit  │
//!          └──────────────────────┬─────────────────────┘
//!                                 │
//!                    PersistenceCoordinator (bounded retry)
//!                                 │
//!                                 ▼
//!                        AssignmentStore (SQLite)
//!
//!     scoring::score / scoring::section_averages ──▶ form, review, print
//! ```
//!
//! # Core Principle
//!
//! **N/A is not a zero.** A rating of `0` and an unanswered item are both left
//! out of every overall average; only the section header average counts them
//! against the section.
//!
//! # Modules
//!
//! - [`models`]: Domain types (Item, Question, Version, Assignment, etc.)
//! - [`answers`]: Pure edits and format normalization of answer trees
//! - [`scoring`]: Overall and section averages
//! - [`lifecycle`]: Assignment state machine and expiry
//! - [`persistence`]: Retry coordinator and user notifications
//! - [`presentation`]: Form, review and print views
//! - [`session`]: Editing session over one assignment
//! - [`db`]: SQLite database layer
//! - [`settings`]: Agency settings

pub mod answers;
pub mod db;
pub mod lifecycle;
pub mod models;
pub mod persistence;
pub mod presentation;
pub mod scoring;
pub mod session;
pub mod settings;

// Re-export commonly used types
pub use db::Database;
pub use lifecycle::{CalendarExpiration, ExpirationCalculator, LifecycleError, RetakeMode};
pub use models::{
    Assignment, AssignmentStatus, ChecklistDefinition, ChecklistFormat, ExpirationPolicy, Item,
    ItemField, Question, Rating, Section, Version,
};
pub use persistence::{
    AssignmentStore, Notification, NotificationKind, NotificationLog, PersistenceCoordinator,
    RetryPolicy,
};
pub use scoring::{score, section_averages, ScoreSummary, SectionAverages};
pub use session::{ChecklistSession, IgnoreReason, SubmitOutcome};
pub use settings::ChecklistSettings;

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum ChecklistError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),
}

impl From<db::DbError> for ChecklistError {
    fn from(e: db::DbError) -> Self {
        match e {
            db::DbError::NotFound(what) => ChecklistError::NotFound(what),
            other => ChecklistError::DatabaseError(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for ChecklistError {
    fn from(e: serde_json::Error) -> Self {
        ChecklistError::SerializationError(e.to_string())
    }
}

impl From<models::AnswerError> for ChecklistError {
    fn from(e: models::AnswerError) -> Self {
        ChecklistError::InvalidInput(e.to_string())
    }
}

impl From<LifecycleError> for ChecklistError {
    fn from(e: LifecycleError) -> Self {
        ChecklistError::InvalidInput(e.to_string())
    }
}

impl From<persistence::PersistenceError> for ChecklistError {
    fn from(e: persistence::PersistenceError) -> Self {
        match e.store_error() {
            persistence::StoreError::NotFound(what) => ChecklistError::NotFound(what.clone()),
            _ => ChecklistError::ConnectionError(e.to_string()),
        }
    }
}

impl From<settings::SettingsError> for ChecklistError {
    fn from(e: settings::SettingsError) -> Self {
        ChecklistError::InvalidInput(e.to_string())
    }
}

impl From<chrono::ParseError> for ChecklistError {
    fn from(e: chrono::ParseError) -> Self {
        ChecklistError::InvalidInput(format!("Invalid timestamp: {}", e))
    }
}

impl<T> From<std::sync::PoisonError<T>> for ChecklistError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        ChecklistError::DatabaseError(format!("Lock poisoned: {}", e))
    }
}

fn parse_format(value: &str) -> Result<ChecklistFormat, ChecklistError> {
    ChecklistFormat::parse(value)
        .ok_or_else(|| ChecklistError::InvalidInput(format!("Unknown checklist format: {}", value)))
}

fn parse_field(value: &str) -> Result<ItemField, ChecklistError> {
    match value {
        "skill" => Ok(ItemField::Skill),
        "frequency" => Ok(ItemField::Frequency),
        "proficiency" => Ok(ItemField::Proficiency),
        other => Err(ChecklistError::InvalidInput(format!("Unknown rating field: {}", other))),
    }
}

fn parse_rating(value: Option<u8>) -> Result<Option<Rating>, ChecklistError> {
    Ok(value.map(Rating::new).transpose()?)
}

fn parse_rfc3339(value: &str) -> Result<DateTime<Utc>, ChecklistError> {
    Ok(DateTime::parse_from_rfc3339(value)?.with_timezone(&Utc))
}

fn to_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open or create a database at the given path.
#[uniffi::export]
pub fn open_database(path: String) -> Result<Arc<ChecklistCore>, ChecklistError> {
    let db = Database::open(&path)?;
    Ok(Arc::new(ChecklistCore::new(db)))
}

/// Create an in-memory database (for testing).
#[uniffi::export]
pub fn open_database_in_memory() -> Result<Arc<ChecklistCore>, ChecklistError> {
    let db = Database::open_in_memory()?;
    Ok(Arc::new(ChecklistCore::new(db)))
}

// =========================================================================
// Stateless Answer Operations
// =========================================================================

/// Set one rating in an answer tree. Returns the updated tree as JSON.
#[uniffi::export]
pub fn set_item_value_json(
    answers_json: String,
    step: u32,
    section_idx: u32,
    item_idx: u32,
    field: String,
    value: Option<u8>,
    format: String,
) -> Result<String, ChecklistError> {
    let answers: Vec<Question> = serde_json::from_str(&answers_json)?;
    let updated = answers::set_item_value(
        &answers,
        step as usize,
        section_idx as usize,
        item_idx as usize,
        parse_field(&field)?,
        parse_rating(value)?,
        parse_format(&format)?,
    );
    Ok(serde_json::to_string(&updated)?)
}

/// Score an answer tree.
#[uniffi::export]
pub fn score_answers_json(answers_json: String, format: String) -> Result<FfiScoreSummary, ChecklistError> {
    let answers: Vec<Question> = serde_json::from_str(&answers_json)?;
    Ok(score(&answers, parse_format(&format)?).into())
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe database wrapper for FFI.
#[derive(uniffi::Object)]
pub struct ChecklistCore {
    db: Arc<Mutex<Database>>,
    settings: Mutex<ChecklistSettings>,
}

impl ChecklistCore {
    fn new(db: Database) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            settings: Mutex::new(ChecklistSettings::default()),
        }
    }

    fn current_settings(&self) -> Result<ChecklistSettings, ChecklistError> {
        Ok(self.settings.lock()?.clone())
    }

    /// Open a session, run `action`, and hand back whatever was notified along the way.
    fn with_session<T>(
        &self,
        assignment_id: &str,
        action: impl FnOnce(&mut ChecklistSession<'_, Database>) -> Result<T, ChecklistError>,
    ) -> (Result<T, ChecklistError>, Vec<FfiNotification>) {
        let settings = match self.current_settings() {
            Ok(settings) => settings,
            Err(e) => return (Err(e), Vec::new()),
        };
        let db = match self.db.lock() {
            Ok(db) => db,
            Err(e) => return (Err(e.into()), Vec::new()),
        };

        let log = NotificationLog::new();
        let result = ChecklistSession::open(
            PersistenceCoordinator::new(&*db, &log),
            assignment_id,
            settings,
            Utc::now(),
        )
        .map_err(ChecklistError::from)
        .and_then(|mut session| action(&mut session));

        let notifications = log.take().into_iter().map(FfiNotification::from).collect();
        (result, notifications)
    }
}

#[uniffi::export]
impl ChecklistCore {
    // =========================================================================
    // Settings
    // =========================================================================

    /// Replace the agency settings from a JSON document.
    pub fn set_settings_json(&self, json: String) -> Result<(), ChecklistError> {
        let parsed = ChecklistSettings::from_json_str(&json)?;
        *self.settings.lock()? = parsed;
        Ok(())
    }

    /// Current settings as JSON.
    pub fn get_settings_json(&self) -> Result<String, ChecklistError> {
        Ok(serde_json::to_string(&self.current_settings()?)?)
    }

    // =========================================================================
    // Definition Operations
    // =========================================================================

    /// Create an unpublished definition.
    ///
    /// Without an explicit `format` the settings' authoring default applies.
    pub fn create_definition(
        &self,
        title: String,
        category: String,
        questions_json: String,
        expiration: FfiExpirationPolicy,
        format: Option<String>,
    ) -> Result<FfiDefinition, ChecklistError> {
        let questions: Vec<Question> = serde_json::from_str(&questions_json)?;
        let format = match format {
            Some(format) => parse_format(&format)?,
            None => ChecklistFormat::authoring_default(self.current_settings()?.new_format_enabled),
        };

        let db = self.db.lock()?;
        let (definition, version) = ChecklistDefinition::create(
            title,
            category,
            questions,
            expiration.try_into()?,
            format,
            Utc::now(),
        )?;
        db.insert_definition(&definition, &version)?;
        Ok(FfiDefinition::new(definition, &version))
    }

    /// Publish a definition. Later semantic edits create new versions.
    pub fn publish_definition(&self, definition_id: String) -> Result<FfiDefinition, ChecklistError> {
        let db = self.db.lock()?;
        let mut definition = db
            .get_definition(&definition_id)?
            .ok_or_else(|| ChecklistError::NotFound(format!("definition {}", definition_id)))?;
        definition.publish(Utc::now());
        db.update_definition(&definition)?;
        let version = current_version(&db, &definition)?;
        Ok(FfiDefinition::new(definition, &version))
    }

    /// Edit a definition's questions, expiration policy or format.
    pub fn revise_definition(
        &self,
        definition_id: String,
        questions_json: String,
        expiration: FfiExpirationPolicy,
        format: String,
    ) -> Result<FfiRevision, ChecklistError> {
        let questions: Vec<Question> = serde_json::from_str(&questions_json)?;
        let db = self.db.lock()?;
        let mut definition = db
            .get_definition(&definition_id)?
            .ok_or_else(|| ChecklistError::NotFound(format!("definition {}", definition_id)))?;
        let current = current_version(&db, &definition)?;
        let in_use = db.version_in_use(&current.id)?;

        let revision = definition.revise(
            &current,
            in_use,
            questions,
            expiration.try_into()?,
            parse_format(&format)?,
            Utc::now(),
        )?;
        db.save_revision(&definition, &revision)?;
        Ok(FfiRevision::new(&revision, &current))
    }

    /// Current version of a definition as JSON.
    pub fn get_definition_json(&self, definition_id: String) -> Result<Option<String>, ChecklistError> {
        let db = self.db.lock()?;
        let Some(definition) = db.get_definition(&definition_id)? else {
            return Ok(None);
        };
        let snapshot = db
            .fetch_definition(&definition.id)
            .map_err(|e| ChecklistError::DatabaseError(e.to_string()))?;
        Ok(Some(serde_json::to_string(&snapshot)?))
    }

    /// List definitions, optionally by category.
    pub fn list_definitions(&self, category: Option<String>) -> Result<Vec<FfiDefinition>, ChecklistError> {
        let db = self.db.lock()?;
        let definitions = db.list_definitions(category.as_deref())?;
        definitions
            .into_iter()
            .map(|definition| {
                let version = current_version(&db, &definition)?;
                Ok(FfiDefinition::new(definition, &version))
            })
            .collect()
    }

    // =========================================================================
    // Assignment Operations
    // =========================================================================

    /// Assign the current version of a definition to a clinician.
    pub fn assign_checklist(
        &self,
        definition_id: String,
        clinician_id: String,
        agency_id: String,
        due_date: Option<String>,
    ) -> Result<FfiAssignment, ChecklistError> {
        let due_date = due_date.as_deref().map(parse_rfc3339).transpose()?;
        let db = self.db.lock()?;
        let definition = db
            .get_definition(&definition_id)?
            .ok_or_else(|| ChecklistError::NotFound(format!("definition {}", definition_id)))?;
        let version = current_version(&db, &definition)?;

        let assignment =
            Assignment::assign(&definition, &version, clinician_id, agency_id, due_date, Utc::now())?;
        db.insert_assignment(&assignment)?;
        Ok(assignment.into())
    }

    /// Get an assignment by ID.
    pub fn get_assignment(&self, assignment_id: String) -> Result<Option<FfiAssignment>, ChecklistError> {
        let db = self.db.lock()?;
        let assignment = db.get_assignment(&assignment_id)?;
        Ok(assignment.map(|a| a.into()))
    }

    /// Full answer tree of an assignment as JSON.
    pub fn get_assignment_answers_json(&self, assignment_id: String) -> Result<String, ChecklistError> {
        let db = self.db.lock()?;
        let assignment = db
            .get_assignment(&assignment_id)?
            .ok_or_else(|| ChecklistError::NotFound(format!("assignment {}", assignment_id)))?;
        Ok(serde_json::to_string(&assignment.answers)?)
    }

    /// Assignments for a clinician, newest first.
    pub fn list_assignments_for_clinician(
        &self,
        clinician_id: String,
    ) -> Result<Vec<FfiAssignment>, ChecklistError> {
        let db = self.db.lock()?;
        let assignments = db.list_assignments_for_clinician(&clinician_id)?;
        Ok(assignments.into_iter().map(|a| a.into()).collect())
    }

    // =========================================================================
    // Session Operations
    // =========================================================================

    /// Accept agreements on first page entry and report the page to resume on.
    pub fn enter_checklist(&self, assignment_id: String) -> FfiActionResult {
        let (result, notifications) = self.with_session(&assignment_id, |session| {
            let applied = session.enter(Utc::now())?;
            Ok((applied, session.step()))
        });
        FfiActionResult::from_parts(result, notifications)
    }

    /// Editable view of one page as JSON.
    pub fn form_json(&self, assignment_id: String, step: u32) -> Result<Option<String>, ChecklistError> {
        let (result, _) = self.with_session(&assignment_id, |session| {
            if !session.go_to(step as usize) {
                return Ok(None);
            }
            session.form().map(|form| serde_json::to_string(&form)).transpose().map_err(Into::into)
        });
        result
    }

    /// Mark a section N/A on a page tree held by the host. Returns the updated tree.
    ///
    /// The tree comes back unchanged unless the agency allows N/A skipping.
    pub fn skip_section_json(
        &self,
        answers_json: String,
        step: u32,
        section_idx: u32,
        field: String,
        format: String,
    ) -> Result<String, ChecklistError> {
        let answers: Vec<Question> = serde_json::from_str(&answers_json)?;
        if !self.current_settings()?.allow_na_skip {
            return Ok(answers_json);
        }
        let updated = answers::skip_section(
            &answers,
            step as usize,
            section_idx as usize,
            parse_field(&field)?,
            parse_format(&format)?,
        );
        Ok(serde_json::to_string(&updated)?)
    }

    /// Submit an edited page. The last page completes the assignment.
    pub fn submit_page(&self, assignment_id: String, step: u32, page_json: String) -> FfiSubmitResult {
        let page: Question = match serde_json::from_str(&page_json) {
            Ok(page) => page,
            Err(e) => return FfiSubmitResult::failed(ChecklistError::from(e), Vec::new()),
        };

        let (result, notifications) = self.with_session(&assignment_id, |session| {
            if !session.go_to(step as usize) {
                return Ok(SubmitOutcome::Ignored(IgnoreReason::UnknownStep {
                    step: step as usize,
                }));
            }
            Ok(session.submit_page(&page, Utc::now(), &CalendarExpiration)?)
        });

        match result {
            Ok(outcome) => FfiSubmitResult::from_outcome(outcome, notifications),
            Err(e) => FfiSubmitResult::failed(e, notifications),
        }
    }

    /// Start a retake. `mode` is `blank` or `seeded`; `due_date` (RFC 3339)
    /// is the new cycle's due date.
    pub fn retake(&self, assignment_id: String, mode: String, due_date: Option<String>) -> FfiActionResult {
        let mode = match mode.as_str() {
            "blank" => RetakeMode::Blank,
            "seeded" => RetakeMode::Seeded,
            other => {
                return FfiActionResult::from_parts(
                    Err(ChecklistError::InvalidInput(format!("Unknown retake mode: {}", other))),
                    Vec::new(),
                )
            }
        };
        let due_date = match due_date.as_deref().map(parse_rfc3339).transpose() {
            Ok(due_date) => due_date,
            Err(e) => return FfiActionResult::from_parts(Err(e), Vec::new()),
        };
        let (result, notifications) = self.with_session(&assignment_id, |session| {
            let applied = session.retake(mode, due_date, Utc::now())?;
            Ok((applied, session.step()))
        });
        FfiActionResult::from_parts(result, notifications)
    }

    // =========================================================================
    // Scoring and Review
    // =========================================================================

    /// Overall and per-axis averages of an assignment.
    pub fn score_assignment(&self, assignment_id: String) -> Result<FfiScoreSummary, ChecklistError> {
        let db = self.db.lock()?;
        let assignment = db
            .get_assignment(&assignment_id)?
            .ok_or_else(|| ChecklistError::NotFound(format!("assignment {}", assignment_id)))?;
        Ok(score(&assignment.answers, assignment.format).into())
    }

    /// Review view of an assignment as JSON.
    pub fn review_json(&self, assignment_id: String) -> Result<String, ChecklistError> {
        let (result, _) =
            self.with_session(&assignment_id, |session| Ok(serde_json::to_string(&session.review())?));
        result
    }

    /// Printable plain-text review.
    pub fn print_review(&self, assignment_id: String) -> Result<String, ChecklistError> {
        let (result, _) = self.with_session(&assignment_id, |session| {
            Ok(presentation::render_print(&session.review()))
        });
        result
    }
}

fn current_version(db: &Database, definition: &ChecklistDefinition) -> Result<Version, ChecklistError> {
    let version_id = definition.current_version_id.as_deref().ok_or_else(|| {
        ChecklistError::DatabaseError(format!("Definition {} has no version", definition.id))
    })?;
    db.get_version(version_id)?
        .ok_or_else(|| ChecklistError::NotFound(format!("version {}", version_id)))
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe expiration policy. `unit` is `never`, `days`, `months` or `years`.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiExpirationPolicy {
    pub unit: String,
    pub count: u32,
}

impl TryFrom<FfiExpirationPolicy> for ExpirationPolicy {
    type Error = ChecklistError;

    fn try_from(policy: FfiExpirationPolicy) -> Result<Self, Self::Error> {
        match policy.unit.as_str() {
            "never" => Ok(ExpirationPolicy::Never),
            "days" => Ok(ExpirationPolicy::Days(policy.count)),
            "months" => Ok(ExpirationPolicy::Months(policy.count)),
            "years" => Ok(ExpirationPolicy::Years(policy.count)),
            other => Err(ChecklistError::InvalidInput(format!("Unknown expiration unit: {}", other))),
        }
    }
}

/// FFI-safe definition with its current version number.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDefinition {
    pub id: String,
    pub title: String,
    pub category: String,
    pub published: bool,
    pub version_id: String,
    pub version_number: u32,
    pub format: String,
    pub total_questions: u32,
}

impl FfiDefinition {
    fn new(definition: ChecklistDefinition, version: &Version) -> Self {
        Self {
            id: definition.id,
            title: definition.title,
            category: definition.category,
            published: definition.published,
            version_id: version.id.clone(),
            version_number: version.number,
            format: version.format.as_str().to_string(),
            total_questions: to_u32(version.total_questions),
        }
    }
}

/// FFI-safe revision result.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiRevision {
    /// Any semantic field changed
    pub changed: bool,
    /// A new version was minted (definition published or version assigned)
    pub new_version: bool,
    pub version_id: String,
    pub version_number: u32,
}

impl FfiRevision {
    fn new(revision: &models::Revision, current: &Version) -> Self {
        let (changed, new_version, version) = match revision {
            models::Revision::Unchanged => (false, false, current),
            models::Revision::RevisedInPlace(version) => (true, false, version),
            models::Revision::NewVersion(version) => (true, true, version),
        };
        Self {
            changed,
            new_version,
            version_id: version.id.clone(),
            version_number: version.number,
        }
    }
}

/// FFI-safe assignment summary. Answers are fetched separately as JSON.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiAssignment {
    pub id: String,
    pub definition_id: String,
    pub version_id: String,
    pub clinician_id: String,
    pub agency_id: String,
    pub format: String,
    pub status: String,
    pub total_steps: u32,
    pub resume_step: u32,
    pub assigned_on: String,
    pub started_on: Option<String>,
    pub finished_on: Option<String>,
    pub due_date: Option<String>,
    pub expires_on: Option<String>,
    pub accepted_agreements: bool,
}

impl From<Assignment> for FfiAssignment {
    fn from(assignment: Assignment) -> Self {
        Self {
            total_steps: to_u32(assignment.total_steps()),
            resume_step: to_u32(assignment.resume_step()),
            id: assignment.id,
            definition_id: assignment.definition_id,
            version_id: assignment.version_id,
            clinician_id: assignment.clinician_id,
            agency_id: assignment.agency_id,
            format: assignment.format.as_str().to_string(),
            status: assignment.status.as_str().to_string(),
            assigned_on: assignment.assigned_on.to_rfc3339(),
            started_on: assignment.started_on.map(|t| t.to_rfc3339()),
            finished_on: assignment.finished_on.map(|t| t.to_rfc3339()),
            due_date: assignment.due_date.map(|t| t.to_rfc3339()),
            expires_on: assignment.expires_on.map(|t| t.to_rfc3339()),
            accepted_agreements: assignment.accepted_agreements,
        }
    }
}

/// FFI-safe score summary.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiScoreSummary {
    pub skill_average: Option<f64>,
    pub frequency_average: Option<f64>,
    pub proficiency_average: Option<f64>,
    pub overall_avg: f64,
}

impl From<ScoreSummary> for FfiScoreSummary {
    fn from(summary: ScoreSummary) -> Self {
        Self {
            skill_average: summary.skill_average,
            frequency_average: summary.frequency_average,
            proficiency_average: summary.proficiency_average,
            overall_avg: summary.overall_avg,
        }
    }
}

/// FFI-safe notification.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiNotification {
    pub kind: String,
    pub title: String,
    pub description: String,
}

impl From<Notification> for FfiNotification {
    fn from(notification: Notification) -> Self {
        Self {
            kind: notification.kind.as_str().to_string(),
            title: notification.title,
            description: notification.description,
        }
    }
}

/// FFI-safe result of a session action (enter, retake).
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiActionResult {
    /// The action changed the assignment
    pub applied: bool,
    /// Page the session is on afterwards
    pub step: u32,
    pub error: Option<String>,
    pub notifications: Vec<FfiNotification>,
}

impl FfiActionResult {
    fn from_parts(
        result: Result<(bool, usize), ChecklistError>,
        notifications: Vec<FfiNotification>,
    ) -> Self {
        match result {
            Ok((applied, step)) => Self {
                applied,
                step: to_u32(step),
                error: None,
                notifications,
            },
            Err(e) => Self {
                applied: false,
                step: 0,
                error: Some(e.to_string()),
                notifications,
            },
        }
    }
}

/// FFI-safe page submit result.
///
/// `outcome` is `saved`, `completed`, `ignored` or `failed`.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiSubmitResult {
    pub outcome: String,
    pub next_step: Option<u32>,
    /// Ignore reason or failure message
    pub detail: Option<String>,
    pub notifications: Vec<FfiNotification>,
}

impl FfiSubmitResult {
    fn from_outcome(outcome: SubmitOutcome, notifications: Vec<FfiNotification>) -> Self {
        let (outcome, next_step, detail) = match outcome {
            SubmitOutcome::Saved { next_step } => ("saved", Some(to_u32(next_step)), None),
            SubmitOutcome::Completed => ("completed", None, None),
            SubmitOutcome::Ignored(reason) => ("ignored", None, Some(format!("{:?}", reason))),
        };
        Self {
            outcome: outcome.to_string(),
            next_step,
            detail,
            notifications,
        }
    }

    fn failed(error: ChecklistError, notifications: Vec<FfiNotification>) -> Self {
        Self {
            outcome: "failed".to_string(),
            next_step: None,
            detail: Some(error.to_string()),
            notifications,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn questions_json() -> String {
        serde_json::json!([
            {
                "prompt": "Respiratory",
                "sections": [{
                    "title": "Airway",
                    "exclude_from_score": false,
                    "items": [{"title": "Suctioning"}, {"title": "Trach care"}]
                }]
            },
            {
                "prompt": "Cardiac",
                "sections": [{
                    "title": "Monitoring",
                    "exclude_from_score": false,
                    "items": [{"title": "Telemetry"}]
                }]
            }
        ])
        .to_string()
    }

    fn years(count: u32) -> FfiExpirationPolicy {
        FfiExpirationPolicy {
            unit: "years".into(),
            count,
        }
    }

    #[test]
    fn test_ffi_checklist_flow() {
        let core = open_database_in_memory().unwrap();
        let definition = core
            .create_definition("Resp RN".into(), "Nursing".into(), questions_json(), years(1), None)
            .unwrap();
        // authoring default without the toggle
        assert_eq!(definition.format, "legacy");

        let assignment = core
            .assign_checklist(definition.id.clone(), "c-1".into(), "a-1".into(), None)
            .unwrap();
        assert_eq!(assignment.status, "pending");
        assert_eq!(assignment.total_steps, 2);

        let entered = core.enter_checklist(assignment.id.clone());
        assert!(entered.applied);
        assert_eq!(entered.step, 1);
        assert_eq!(entered.notifications.len(), 1);
        assert_eq!(entered.notifications[0].kind, "saved");

        let answers = core.get_assignment_answers_json(assignment.id.clone()).unwrap();
        let answers =
            set_item_value_json(answers, 1, 0, 0, "skill".into(), Some(4), "legacy".into()).unwrap();
        let answers =
            set_item_value_json(answers, 1, 0, 0, "frequency".into(), Some(2), "legacy".into()).unwrap();
        let tree: Vec<Question> = serde_json::from_str(&answers).unwrap();

        let page = serde_json::to_string(&tree[0]).unwrap();
        let saved = core.submit_page(assignment.id.clone(), 1, page);
        assert_eq!(saved.outcome, "saved");
        assert_eq!(saved.next_step, Some(2));

        let page = serde_json::to_string(&tree[1]).unwrap();
        let completed = core.submit_page(assignment.id.clone(), 2, page);
        assert_eq!(completed.outcome, "completed");

        let stored = core.get_assignment(assignment.id.clone()).unwrap().unwrap();
        assert_eq!(stored.status, "completed");
        assert!(stored.expires_on.is_some());

        let summary = core.score_assignment(assignment.id.clone()).unwrap();
        assert_eq!(summary.overall_avg, 3.0);
        assert!(core.print_review(assignment.id.clone()).unwrap().contains("Resp RN"));

        let retake = core.retake(assignment.id.clone(), "blank".into(), None);
        assert!(retake.applied);
        let stored = core.get_assignment(assignment.id).unwrap().unwrap();
        assert_eq!(stored.status, "pending");
    }

    #[test]
    fn test_ffi_new_format_toggle() {
        let core = open_database_in_memory().unwrap();
        core.set_settings_json(r#"{"new_format_enabled": true}"#.into()).unwrap();

        let definition = core
            .create_definition("Resp RN".into(), "Nursing".into(), questions_json(), years(1), None)
            .unwrap();
        assert_eq!(definition.format, "new");

        let answers = core
            .assign_checklist(definition.id, "c-1".into(), "a-1".into(), None)
            .and_then(|a| core.get_assignment_answers_json(a.id))
            .unwrap();
        // frequency has no column in the new format
        let unchanged =
            set_item_value_json(answers.clone(), 1, 0, 0, "frequency".into(), Some(3), "new".into())
                .unwrap();
        assert_eq!(unchanged, answers);
    }

    #[test]
    fn test_ffi_revise_published_definition() {
        let core = open_database_in_memory().unwrap();
        let definition = core
            .create_definition(
                "Resp RN".into(),
                "Nursing".into(),
                questions_json(),
                years(1),
                Some("new".into()),
            )
            .unwrap();
        core.publish_definition(definition.id.clone()).unwrap();

        let same = core
            .revise_definition(definition.id.clone(), questions_json(), years(1), "new".into())
            .unwrap();
        assert!(!same.changed);

        let revised = core
            .revise_definition(definition.id.clone(), questions_json(), years(2), "new".into())
            .unwrap();
        assert!(revised.new_version);
        assert_eq!(revised.version_number, 2);

        let listed = core.list_definitions(None).unwrap();
        assert_eq!(listed[0].version_number, 2);
    }

    #[test]
    fn test_ffi_revise_assigned_draft_keeps_version() {
        let core = open_database_in_memory().unwrap();
        let definition = core
            .create_definition(
                "Resp RN".into(),
                "Nursing".into(),
                questions_json(),
                years(1),
                Some("legacy".into()),
            )
            .unwrap();
        let assignment = core
            .assign_checklist(definition.id.clone(), "clinician-1".into(), "agency-1".into(), None)
            .unwrap();

        let revised = core
            .revise_definition(definition.id.clone(), "[]".into(), years(1), "new".into())
            .unwrap();
        assert!(revised.new_version);
        assert_ne!(revised.version_id, assignment.version_id);

        let stored = core.get_assignment(assignment.id.clone()).unwrap().unwrap();
        assert_eq!(stored.version_id, assignment.version_id);
        assert_eq!(stored.format, "legacy");
        let db = core.db.lock().unwrap();
        let version = db.get_version(&assignment.version_id).unwrap().unwrap();
        assert_eq!(version.format, ChecklistFormat::Legacy);
        assert_eq!(version.total_questions, stored.total_steps as usize);
    }

    #[test]
    fn test_ffi_invalid_input() {
        let core = open_database_in_memory().unwrap();
        assert!(matches!(
            set_item_value_json("[]".into(), 1, 0, 0, "skill".into(), Some(5), "legacy".into()),
            Err(ChecklistError::InvalidInput(_))
        ));
        assert!(matches!(
            core.assign_checklist("missing".into(), "c".into(), "a".into(), None),
            Err(ChecklistError::NotFound(_))
        ));
        let result = core.submit_page("missing".into(), 1, r#"{"prompt": "Cardiac"}"#.into());
        assert_eq!(result.outcome, "failed");
        assert_eq!(result.notifications[0].kind, "connection_error");
    }
}
