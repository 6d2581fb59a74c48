//! SQLite schema definition.

/// Complete database schema for checklist storage.
pub const SCHEMA: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Checklist Definitions (Authoring)
-- ============================================================================

CREATE TABLE IF NOT EXISTS checklist_definitions (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    category TEXT NOT NULL DEFAULT '',
    current_version_id TEXT,                     -- NULL only while the first version is written
    published INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_definitions_category ON checklist_definitions(category);

-- ============================================================================
-- Checklist Versions (Immutable once their definition is published)
-- ============================================================================

CREATE TABLE IF NOT EXISTS checklist_versions (
    id TEXT PRIMARY KEY,
    definition_id TEXT NOT NULL REFERENCES checklist_definitions(id),
    number INTEGER NOT NULL,
    questions TEXT NOT NULL DEFAULT '[]',        -- JSON array of Question
    total_questions INTEGER NOT NULL DEFAULT 0,
    expiration_policy TEXT NOT NULL,             -- JSON object {unit, count}
    format TEXT NOT NULL CHECK (format IN ('legacy', 'new')),
    content_hash TEXT NOT NULL,                  -- SHA-256 of semantic fields
    created_at TEXT NOT NULL,
    UNIQUE (definition_id, number)
);

CREATE INDEX IF NOT EXISTS idx_versions_definition ON checklist_versions(definition_id);

-- ============================================================================
-- Assignments (One clinician's instance of a version)
-- ============================================================================

CREATE TABLE IF NOT EXISTS assignments (
    id TEXT PRIMARY KEY,
    definition_id TEXT NOT NULL REFERENCES checklist_definitions(id),
    version_id TEXT NOT NULL REFERENCES checklist_versions(id),
    clinician_id TEXT NOT NULL,
    agency_id TEXT NOT NULL,
    format TEXT NOT NULL CHECK (format IN ('legacy', 'new')),
    expiration_policy TEXT NOT NULL,             -- JSON object {unit, count}
    status TEXT NOT NULL DEFAULT 'pending'
        CHECK (status IN ('pending', 'in_progress', 'completed', 'due_date_expired')),
    answers TEXT NOT NULL DEFAULT '[]',          -- JSON array of Question
    assigned_on TEXT NOT NULL,
    started_on TEXT,
    finished_on TEXT,
    due_date TEXT,
    expires_on TEXT,
    accepted_agreements INTEGER NOT NULL DEFAULT 0,
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    -- finished_on is set iff the assignment is completed
    CHECK ((status = 'completed') = (finished_on IS NOT NULL))
);

CREATE INDEX IF NOT EXISTS idx_assignments_clinician ON assignments(clinician_id);
CREATE INDEX IF NOT EXISTS idx_assignments_status ON assignments(status);
CREATE INDEX IF NOT EXISTS idx_assignments_version ON assignments(version_id);
"#;
