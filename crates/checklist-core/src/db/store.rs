//! [`AssignmentStore`] backed by SQLite.

use chrono::{DateTime, Utc};

use super::{Database, DbError};
use crate::models::{Assignment, AssignmentStatus, Question};
use crate::persistence::{AssignmentStore, DefinitionSnapshot, StoreError};

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        if err.is_transient() {
            return StoreError::Unavailable(err.to_string());
        }
        match err {
            DbError::NotFound(what) => StoreError::NotFound(what),
            other => StoreError::Corrupt(other.to_string()),
        }
    }
}

impl AssignmentStore for Database {
    fn fetch_definition(&self, definition_id: &str) -> Result<DefinitionSnapshot, StoreError> {
        let definition = self
            .get_definition(definition_id)?
            .ok_or_else(|| StoreError::NotFound(format!("definition {}", definition_id)))?;
        let version_id = definition
            .current_version_id
            .as_deref()
            .ok_or_else(|| StoreError::Corrupt(format!("definition {} has no version", definition_id)))?;
        let version = self
            .get_version(version_id)?
            .ok_or_else(|| StoreError::NotFound(format!("version {}", version_id)))?;

        Ok(DefinitionSnapshot {
            definition_id: definition.id,
            title: definition.title,
            category: definition.category,
            version_id: version.id,
            version_number: version.number,
            format: version.format,
            total_questions: version.total_questions,
            questions: version.questions,
        })
    }

    fn fetch_assignment(&self, assignment_id: &str) -> Result<Assignment, StoreError> {
        self.get_assignment(assignment_id)?
            .ok_or_else(|| StoreError::NotFound(format!("assignment {}", assignment_id)))
    }

    fn save_assignment_answers(
        &self,
        assignment_id: &str,
        answers: &[Question],
        finished_on: Option<DateTime<Utc>>,
        expires_on: Option<DateTime<Utc>>,
        status: AssignmentStatus,
    ) -> Result<(), StoreError> {
        if self.update_assignment_answers(assignment_id, answers, finished_on, expires_on, status)? {
            Ok(())
        } else {
            Err(StoreError::NotFound(format!("assignment {}", assignment_id)))
        }
    }

    fn save_assignment(&self, assignment: &Assignment) -> Result<(), StoreError> {
        if self.update_assignment(assignment)? {
            Ok(())
        } else {
            Err(StoreError::NotFound(format!("assignment {}", assignment.id)))
        }
    }
}
