//! Assignment database operations.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use super::{
    parse_optional_timestamp, parse_timestamp, to_optional_timestamp, to_timestamp, Database, DbError,
    DbResult,
};
use crate::models::{Assignment, AssignmentStatus, ChecklistFormat, Question};

const ASSIGNMENT_COLUMNS: &str = "id, definition_id, version_id, clinician_id, agency_id, format, \
                                  expiration_policy, status, answers, assigned_on, started_on, \
                                  finished_on, due_date, expires_on, accepted_agreements";

impl Database {
    /// Insert a new assignment.
    pub fn insert_assignment(&self, assignment: &Assignment) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO assignments (
                id, definition_id, version_id, clinician_id, agency_id, format,
                expiration_policy, status, answers, assigned_on, started_on,
                finished_on, due_date, expires_on, accepted_agreements, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?10)
            "#,
            params![
                assignment.id,
                assignment.definition_id,
                assignment.version_id,
                assignment.clinician_id,
                assignment.agency_id,
                assignment.format.as_str(),
                serde_json::to_string(&assignment.expiration_policy)?,
                assignment.status.as_str(),
                serde_json::to_string(&assignment.answers)?,
                to_timestamp(&assignment.assigned_on),
                to_optional_timestamp(&assignment.started_on),
                to_optional_timestamp(&assignment.finished_on),
                to_optional_timestamp(&assignment.due_date),
                to_optional_timestamp(&assignment.expires_on),
                assignment.accepted_agreements,
            ],
        )?;
        Ok(())
    }

    /// Get an assignment by ID.
    pub fn get_assignment(&self, id: &str) -> DbResult<Option<Assignment>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM assignments WHERE id = ?", ASSIGNMENT_COLUMNS),
                [id],
                assignment_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// Overwrite every mutable column of an assignment.
    ///
    /// Format, version and ownership are fixed at creation and never written here.
    pub fn update_assignment(&self, assignment: &Assignment) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE assignments SET
                status = ?2,
                answers = ?3,
                started_on = ?4,
                finished_on = ?5,
                due_date = ?6,
                expires_on = ?7,
                accepted_agreements = ?8,
                updated_at = datetime('now')
            WHERE id = ?1
            "#,
            params![
                assignment.id,
                assignment.status.as_str(),
                serde_json::to_string(&assignment.answers)?,
                to_optional_timestamp(&assignment.started_on),
                to_optional_timestamp(&assignment.finished_on),
                to_optional_timestamp(&assignment.due_date),
                to_optional_timestamp(&assignment.expires_on),
                assignment.accepted_agreements,
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// Page-submit write: full answer state plus completion fields.
    pub fn update_assignment_answers(
        &self,
        id: &str,
        answers: &[Question],
        finished_on: Option<DateTime<Utc>>,
        expires_on: Option<DateTime<Utc>>,
        status: AssignmentStatus,
    ) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE assignments SET
                answers = ?2,
                finished_on = ?3,
                expires_on = ?4,
                status = ?5,
                updated_at = datetime('now')
            WHERE id = ?1
            "#,
            params![
                id,
                serde_json::to_string(answers)?,
                to_optional_timestamp(&finished_on),
                to_optional_timestamp(&expires_on),
                status.as_str(),
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// Assignments for a clinician, newest first.
    pub fn list_assignments_for_clinician(&self, clinician_id: &str) -> DbResult<Vec<Assignment>> {
        self.query_assignments(
            &format!(
                "SELECT {} FROM assignments WHERE clinician_id = ? ORDER BY assigned_on DESC",
                ASSIGNMENT_COLUMNS
            ),
            clinician_id,
        )
    }

    /// Assignments in a given status, oldest first.
    pub fn list_assignments_by_status(&self, status: AssignmentStatus) -> DbResult<Vec<Assignment>> {
        self.query_assignments(
            &format!(
                "SELECT {} FROM assignments WHERE status = ? ORDER BY assigned_on",
                ASSIGNMENT_COLUMNS
            ),
            status.as_str(),
        )
    }

    /// Delete an assignment.
    pub fn delete_assignment(&self, id: &str) -> DbResult<bool> {
        let rows_affected = self.conn.execute("DELETE FROM assignments WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }

    fn query_assignments(&self, sql: &str, param: &str) -> DbResult<Vec<Assignment>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map([param], assignment_row)?;

        let mut assignments = Vec::new();
        for row in rows {
            assignments.push(row?.try_into()?);
        }
        Ok(assignments)
    }
}

/// Intermediate row struct for database mapping.
struct AssignmentRow {
    id: String,
    definition_id: String,
    version_id: String,
    clinician_id: String,
    agency_id: String,
    format: String,
    expiration_policy: String,
    status: String,
    answers: String,
    assigned_on: String,
    started_on: Option<String>,
    finished_on: Option<String>,
    due_date: Option<String>,
    expires_on: Option<String>,
    accepted_agreements: bool,
}

fn assignment_row(row: &Row<'_>) -> rusqlite::Result<AssignmentRow> {
    Ok(AssignmentRow {
        id: row.get(0)?,
        definition_id: row.get(1)?,
        version_id: row.get(2)?,
        clinician_id: row.get(3)?,
        agency_id: row.get(4)?,
        format: row.get(5)?,
        expiration_policy: row.get(6)?,
        status: row.get(7)?,
        answers: row.get(8)?,
        assigned_on: row.get(9)?,
        started_on: row.get(10)?,
        finished_on: row.get(11)?,
        due_date: row.get(12)?,
        expires_on: row.get(13)?,
        accepted_agreements: row.get(14)?,
    })
}

impl TryFrom<AssignmentRow> for Assignment {
    type Error = DbError;

    fn try_from(row: AssignmentRow) -> Result<Self, Self::Error> {
        let format = ChecklistFormat::parse(&row.format)
            .ok_or_else(|| DbError::Constraint(format!("Unknown checklist format: {}", row.format)))?;
        let status = AssignmentStatus::parse(&row.status)
            .ok_or_else(|| DbError::Constraint(format!("Unknown assignment status: {}", row.status)))?;

        Ok(Assignment {
            id: row.id,
            definition_id: row.definition_id,
            version_id: row.version_id,
            clinician_id: row.clinician_id,
            agency_id: row.agency_id,
            format,
            expiration_policy: serde_json::from_str(&row.expiration_policy)?,
            status,
            answers: serde_json::from_str(&row.answers)?,
            assigned_on: parse_timestamp(&row.assigned_on)?,
            started_on: parse_optional_timestamp(row.started_on)?,
            finished_on: parse_optional_timestamp(row.finished_on)?,
            due_date: parse_optional_timestamp(row.due_date)?,
            expires_on: parse_optional_timestamp(row.expires_on)?,
            accepted_agreements: row.accepted_agreements,
        })
    }
}
