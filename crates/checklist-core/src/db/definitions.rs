//! Checklist definition and version database operations.

use rusqlite::{params, OptionalExtension, Row};

use super::{parse_timestamp, to_timestamp, Database, DbError, DbResult};
use crate::models::{ChecklistDefinition, ChecklistFormat, Revision, Version};

const VERSION_COLUMNS: &str = "id, definition_id, number, questions, total_questions, \
                               expiration_policy, format, content_hash, created_at";

impl Database {
    /// Insert a new definition together with its first version.
    pub fn insert_definition(&self, definition: &ChecklistDefinition, version: &Version) -> DbResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            r#"
            INSERT INTO checklist_definitions (
                id, title, category, current_version_id, published, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                definition.id,
                definition.title,
                definition.category,
                definition.current_version_id,
                definition.published,
                to_timestamp(&definition.created_at),
                to_timestamp(&definition.updated_at),
            ],
        )?;
        self.insert_version_row(&tx, version)?;
        tx.commit()?;
        Ok(())
    }

    /// Update definition metadata (title, category, published flag, current version).
    pub fn update_definition(&self, definition: &ChecklistDefinition) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE checklist_definitions SET
                title = ?2,
                category = ?3,
                current_version_id = ?4,
                published = ?5,
                updated_at = ?6
            WHERE id = ?1
            "#,
            params![
                definition.id,
                definition.title,
                definition.category,
                definition.current_version_id,
                definition.published,
                to_timestamp(&definition.updated_at),
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// Persist a revision produced by [`ChecklistDefinition::revise`].
    pub fn save_revision(&self, definition: &ChecklistDefinition, revision: &Revision) -> DbResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        match revision {
            Revision::Unchanged => return Ok(()),
            Revision::RevisedInPlace(version) => {
                let published: bool = tx.query_row(
                    "SELECT published FROM checklist_definitions WHERE id = ?",
                    [&definition.id],
                    |row| row.get(0),
                )?;
                if published {
                    return Err(DbError::Constraint(format!(
                        "Definition {} is published; versions cannot be edited in place",
                        definition.id
                    )));
                }
                let in_use: bool = tx.query_row(
                    "SELECT EXISTS (SELECT 1 FROM assignments WHERE version_id = ?)",
                    [&version.id],
                    |row| row.get(0),
                )?;
                if in_use {
                    return Err(DbError::Constraint(format!(
                        "Version {} is assigned; versions cannot be edited in place",
                        version.id
                    )));
                }
                tx.execute(
                    r#"
                    UPDATE checklist_versions SET
                        questions = ?2,
                        total_questions = ?3,
                        expiration_policy = ?4,
                        format = ?5,
                        content_hash = ?6
                    WHERE id = ?1
                    "#,
                    params![
                        version.id,
                        serde_json::to_string(&version.questions)?,
                        i64::try_from(version.total_questions).unwrap_or(i64::MAX),
                        serde_json::to_string(&version.expiration_policy)?,
                        version.format.as_str(),
                        version.content_hash,
                    ],
                )?;
            }
            Revision::NewVersion(version) => {
                self.insert_version_row(&tx, version)?;
            }
        }
        tx.execute(
            "UPDATE checklist_definitions SET current_version_id = ?2, updated_at = ?3 WHERE id = ?1",
            params![
                definition.id,
                definition.current_version_id,
                to_timestamp(&definition.updated_at),
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Whether any assignment references the version.
    pub fn version_in_use(&self, version_id: &str) -> DbResult<bool> {
        let in_use: bool = self.conn.query_row(
            "SELECT EXISTS (SELECT 1 FROM assignments WHERE version_id = ?)",
            [version_id],
            |row| row.get(0),
        )?;
        Ok(in_use)
    }

    fn insert_version_row(&self, conn: &rusqlite::Connection, version: &Version) -> DbResult<()> {
        conn.execute(
            r#"
            INSERT INTO checklist_versions (
                id, definition_id, number, questions, total_questions,
                expiration_policy, format, content_hash, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                version.id,
                version.definition_id,
                version.number,
                serde_json::to_string(&version.questions)?,
                i64::try_from(version.total_questions).unwrap_or(i64::MAX),
                serde_json::to_string(&version.expiration_policy)?,
                version.format.as_str(),
                version.content_hash,
                to_timestamp(&version.created_at),
            ],
        )?;
        Ok(())
    }

    /// Get a definition by ID.
    pub fn get_definition(&self, id: &str) -> DbResult<Option<ChecklistDefinition>> {
        self.conn
            .query_row(
                r#"
                SELECT id, title, category, current_version_id, published, created_at, updated_at
                FROM checklist_definitions
                WHERE id = ?
                "#,
                [id],
                |row| {
                    Ok(DefinitionRow {
                        id: row.get(0)?,
                        title: row.get(1)?,
                        category: row.get(2)?,
                        current_version_id: row.get(3)?,
                        published: row.get(4)?,
                        created_at: row.get(5)?,
                        updated_at: row.get(6)?,
                    })
                },
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// List definitions, optionally restricted to a category.
    pub fn list_definitions(&self, category: Option<&str>) -> DbResult<Vec<ChecklistDefinition>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, title, category, current_version_id, published, created_at, updated_at
            FROM checklist_definitions
            WHERE ?1 IS NULL OR category = ?1
            ORDER BY title
            "#,
        )?;

        let rows = stmt.query_map([category], |row| {
            Ok(DefinitionRow {
                id: row.get(0)?,
                title: row.get(1)?,
                category: row.get(2)?,
                current_version_id: row.get(3)?,
                published: row.get(4)?,
                created_at: row.get(5)?,
                updated_at: row.get(6)?,
            })
        })?;

        let mut definitions = Vec::new();
        for row in rows {
            definitions.push(row?.try_into()?);
        }
        Ok(definitions)
    }

    /// Get a version by ID.
    pub fn get_version(&self, id: &str) -> DbResult<Option<Version>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM checklist_versions WHERE id = ?", VERSION_COLUMNS),
                [id],
                version_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// All versions of a definition, oldest first.
    pub fn list_versions(&self, definition_id: &str) -> DbResult<Vec<Version>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM checklist_versions WHERE definition_id = ? ORDER BY number",
            VERSION_COLUMNS
        ))?;
        let rows = stmt.query_map([definition_id], version_row)?;

        let mut versions = Vec::new();
        for row in rows {
            versions.push(row?.try_into()?);
        }
        Ok(versions)
    }
}

/// Intermediate row struct for database mapping.
struct DefinitionRow {
    id: String,
    title: String,
    category: String,
    current_version_id: Option<String>,
    published: bool,
    created_at: String,
    updated_at: String,
}

impl TryFrom<DefinitionRow> for ChecklistDefinition {
    type Error = DbError;

    fn try_from(row: DefinitionRow) -> Result<Self, Self::Error> {
        Ok(ChecklistDefinition {
            id: row.id,
            title: row.title,
            category: row.category,
            current_version_id: row.current_version_id,
            published: row.published,
            created_at: parse_timestamp(&row.created_at)?,
            updated_at: parse_timestamp(&row.updated_at)?,
        })
    }
}

struct VersionRow {
    id: String,
    definition_id: String,
    number: u32,
    questions: String,
    total_questions: i64,
    expiration_policy: String,
    format: String,
    content_hash: String,
    created_at: String,
}

fn version_row(row: &Row<'_>) -> rusqlite::Result<VersionRow> {
    Ok(VersionRow {
        id: row.get(0)?,
        definition_id: row.get(1)?,
        number: row.get(2)?,
        questions: row.get(3)?,
        total_questions: row.get(4)?,
        expiration_policy: row.get(5)?,
        format: row.get(6)?,
        content_hash: row.get(7)?,
        created_at: row.get(8)?,
    })
}

impl TryFrom<VersionRow> for Version {
    type Error = DbError;

    fn try_from(row: VersionRow) -> Result<Self, Self::Error> {
        let format = ChecklistFormat::parse(&row.format)
            .ok_or_else(|| DbError::Constraint(format!("Unknown checklist format: {}", row.format)))?;

        Ok(Version {
            id: row.id,
            definition_id: row.definition_id,
            number: row.number,
            questions: serde_json::from_str(&row.questions)?,
            total_questions: usize::try_from(row.total_questions).map_err(|_| {
                DbError::Constraint(format!("Negative question count: {}", row.total_questions))
            })?,
            expiration_policy: serde_json::from_str(&row.expiration_policy)?,
            format,
            content_hash: row.content_hash,
            created_at: parse_timestamp(&row.created_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::{Assignment, ExpirationPolicy, Item, Question, Section};

    fn template() -> Vec<Question> {
        vec![Question {
            prompt: "Orthopedics".into(),
            sections: vec![Section {
                title: "Mobility".into(),
                exclude_from_score: false,
                items: vec![Item::blank("CPM machine"), Item::blank("Traction")],
            }],
        }]
    }

    fn create(db: &Database) -> (ChecklistDefinition, Version) {
        let (definition, version) = ChecklistDefinition::create(
            "Ortho RN".into(),
            "Nursing".into(),
            template(),
            ExpirationPolicy::Years(1),
            ChecklistFormat::Legacy,
            Utc::now(),
        )
        .unwrap();
        db.insert_definition(&definition, &version).unwrap();
        (definition, version)
    }

    #[test]
    fn test_insert_and_get_definition() {
        let db = Database::open_in_memory().unwrap();
        let (definition, version) = create(&db);

        let retrieved = db.get_definition(&definition.id).unwrap().unwrap();
        assert_eq!(retrieved, definition);

        let stored_version = db.get_version(&version.id).unwrap().unwrap();
        assert_eq!(stored_version, version);
    }

    #[test]
    fn test_get_missing_definition() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.get_definition("missing").unwrap().is_none());
    }

    #[test]
    fn test_published_revision_adds_version() {
        let db = Database::open_in_memory().unwrap();
        let (mut definition, version) = create(&db);
        definition.publish(Utc::now());
        db.update_definition(&definition).unwrap();

        let revision = definition
            .revise(&version, false, template(), ExpirationPolicy::Months(6), ChecklistFormat::Legacy, Utc::now())
            .unwrap();
        db.save_revision(&definition, &revision).unwrap();

        let versions = db.list_versions(&definition.id).unwrap();
        assert_eq!(versions.len(), 2);
        assert_eq!(versions[0].expiration_policy, ExpirationPolicy::Years(1));
        assert_eq!(versions[1].expiration_policy, ExpirationPolicy::Months(6));

        let stored = db.get_definition(&definition.id).unwrap().unwrap();
        assert_eq!(stored.current_version_id.as_deref(), Some(versions[1].id.as_str()));
    }

    #[test]
    fn test_unpublished_revision_edits_in_place() {
        let db = Database::open_in_memory().unwrap();
        let (mut definition, version) = create(&db);

        let revision = definition
            .revise(&version, false, template(), ExpirationPolicy::Never, ChecklistFormat::New, Utc::now())
            .unwrap();
        db.save_revision(&definition, &revision).unwrap();

        let versions = db.list_versions(&definition.id).unwrap();
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].format, ChecklistFormat::New);
        assert_eq!(versions[0].expiration_policy, ExpirationPolicy::Never);
    }

    #[test]
    fn test_in_place_revision_rejected_after_publish() {
        let db = Database::open_in_memory().unwrap();
        let (mut definition, version) = create(&db);

        let revision = definition
            .revise(&version, false, template(), ExpirationPolicy::Never, ChecklistFormat::Legacy, Utc::now())
            .unwrap();
        definition.publish(Utc::now());
        db.update_definition(&definition).unwrap();

        let result = db.save_revision(&definition, &revision);
        assert!(matches!(result, Err(DbError::Constraint(_))));
        assert_eq!(
            db.get_version(&version.id).unwrap().unwrap().expiration_policy,
            ExpirationPolicy::Years(1)
        );
    }

    #[test]
    fn test_assigned_version_is_not_edited_in_place() {
        let db = Database::open_in_memory().unwrap();
        let (mut definition, version) = create(&db);
        let assignment = Assignment::assign(
            &definition,
            &version,
            "clinician-2".into(),
            "agency-1".into(),
            None,
            Utc::now(),
        )
        .unwrap();
        db.insert_assignment(&assignment).unwrap();
        assert!(db.version_in_use(&version.id).unwrap());

        // a caller that ignores the assignment is stopped by the store
        let mut stale = definition.clone();
        let revision = stale
            .revise(&version, false, Vec::new(), ExpirationPolicy::Years(1), ChecklistFormat::New, Utc::now())
            .unwrap();
        let result = db.save_revision(&stale, &revision);
        assert!(matches!(result, Err(DbError::Constraint(_))));

        let in_use = db.version_in_use(&version.id).unwrap();
        let revision = definition
            .revise(&version, in_use, Vec::new(), ExpirationPolicy::Years(1), ChecklistFormat::New, Utc::now())
            .unwrap();
        assert!(matches!(revision, Revision::NewVersion(_)));
        db.save_revision(&definition, &revision).unwrap();

        let referenced = db.get_version(&assignment.version_id).unwrap().unwrap();
        assert_eq!(referenced.format, ChecklistFormat::Legacy);
        assert_eq!(referenced.questions.len(), 1);
        assert_eq!(referenced.content_hash, version.content_hash);
        assert_eq!(db.list_versions(&definition.id).unwrap().len(), 2);
    }

    #[test]
    fn test_list_definitions_by_category() {
        let db = Database::open_in_memory().unwrap();
        create(&db);
        let (other, other_version) = ChecklistDefinition::create(
            "Phlebotomy".into(),
            "Allied Health".into(),
            template(),
            ExpirationPolicy::Years(2),
            ChecklistFormat::New,
            Utc::now(),
        )
        .unwrap();
        db.insert_definition(&other, &other_version).unwrap();

        assert_eq!(db.list_definitions(None).unwrap().len(), 2);
        let allied = db.list_definitions(Some("Allied Health")).unwrap();
        assert_eq!(allied.len(), 1);
        assert_eq!(allied[0].title, "Phlebotomy");
    }
}
