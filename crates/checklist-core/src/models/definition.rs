//! Checklist definitions and their immutable versions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::answer::{ChecklistFormat, Question};

/// How long a completed checklist stays valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "unit", content = "count", rename_all = "snake_case")]
pub enum ExpirationPolicy {
    /// Completion never expires
    Never,
    Days(u32),
    Months(u32),
    Years(u32),
}

impl Default for ExpirationPolicy {
    fn default() -> Self {
        ExpirationPolicy::Years(1)
    }
}

/// Reusable checklist template.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChecklistDefinition {
    /// Unique definition ID
    pub id: String,
    /// Display title (e.g., "Med/Surg RN Skills")
    pub title: String,
    /// Specialty category
    pub category: String,
    /// Version new assignments are created from
    pub current_version_id: Option<String>,
    /// Once published, semantic edits create a new version instead of mutating
    pub published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A specific revision of a definition's question tree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Version {
    /// Unique version ID
    pub id: String,
    /// Owning definition
    pub definition_id: String,
    /// 1-based revision number
    pub number: u32,
    /// Question tree in template form
    pub questions: Vec<Question>,
    /// Number of pages
    pub total_questions: usize,
    /// Validity of a completion of this version
    pub expiration_policy: ExpirationPolicy,
    /// Question format of this version
    pub format: ChecklistFormat,
    /// SHA-256 over the semantic fields
    pub content_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Outcome of revising a definition's question tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Revision {
    /// Semantic fields are identical to the current version
    Unchanged,
    /// Definition is unpublished, so its current version was edited
    RevisedInPlace(Version),
    /// Definition is published, so a new version was minted
    NewVersion(Version),
}

#[derive(Serialize)]
struct SemanticFields<'a> {
    format: ChecklistFormat,
    expiration_policy: ExpirationPolicy,
    questions: &'a [Question],
}

/// Hash the fields whose change requires a new version.
pub fn content_hash(
    questions: &[Question],
    expiration_policy: ExpirationPolicy,
    format: ChecklistFormat,
) -> Result<String, serde_json::Error> {
    let payload = serde_json::to_string(&SemanticFields {
        format,
        expiration_policy,
        questions,
    })?;
    let mut hasher = Sha256::new();
    hasher.update(payload.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

impl Version {
    /// Build a version and compute its content hash.
    pub fn new(
        definition_id: String,
        number: u32,
        questions: Vec<Question>,
        expiration_policy: ExpirationPolicy,
        format: ChecklistFormat,
        now: DateTime<Utc>,
    ) -> Result<Self, serde_json::Error> {
        let content_hash = content_hash(&questions, expiration_policy, format)?;
        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            definition_id,
            number,
            total_questions: questions.len(),
            questions,
            expiration_policy,
            format,
            content_hash,
            created_at: now,
        })
    }
}

impl ChecklistDefinition {
    /// Create an unpublished definition together with its first version.
    pub fn create(
        title: String,
        category: String,
        questions: Vec<Question>,
        expiration_policy: ExpirationPolicy,
        format: ChecklistFormat,
        now: DateTime<Utc>,
    ) -> Result<(Self, Version), serde_json::Error> {
        let id = uuid::Uuid::new_v4().to_string();
        let version = Version::new(id.clone(), 1, questions, expiration_policy, format, now)?;
        let definition = Self {
            id,
            title,
            category,
            current_version_id: Some(version.id.clone()),
            published: false,
            created_at: now,
            updated_at: now,
        };
        Ok((definition, version))
    }

    /// Mark the definition as published. Later semantic edits mint new versions.
    pub fn publish(&mut self, now: DateTime<Utc>) {
        self.published = true;
        self.updated_at = now;
    }

    /// Apply an edit of the semantic fields against the current version.
    ///
    /// `in_use` is true when an assignment references `current`; such a
    /// version is frozen just like a published one and the edit mints a new
    /// version.
    pub fn revise(
        &mut self,
        current: &Version,
        in_use: bool,
        questions: Vec<Question>,
        expiration_policy: ExpirationPolicy,
        format: ChecklistFormat,
        now: DateTime<Utc>,
    ) -> Result<Revision, serde_json::Error> {
        let hash = content_hash(&questions, expiration_policy, format)?;
        if hash == current.content_hash {
            return Ok(Revision::Unchanged);
        }

        self.updated_at = now;

        if !self.published && !in_use {
            let mut revised = current.clone();
            revised.total_questions = questions.len();
            revised.questions = questions;
            revised.expiration_policy = expiration_policy;
            revised.format = format;
            revised.content_hash = hash;
            return Ok(Revision::RevisedInPlace(revised));
        }

        let next = Version::new(
            self.id.clone(),
            current.number + 1,
            questions,
            expiration_policy,
            format,
            now,
        )?;
        self.current_version_id = Some(next.id.clone());
        Ok(Revision::NewVersion(next))
    }
}
