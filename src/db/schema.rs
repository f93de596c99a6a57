//! SQL DDL for all retrospect tables, packaged as named migration steps.
//!
//! Defines the `memory_entries`, `process_lessons`, and `workflow_audit`
//! tables plus their contextual indexes. All DDL uses `IF NOT EXISTS` so a
//! step can be re-applied without error.

/// One named schema step with forward and backward DDL.
pub struct Migration {
    /// Lexically-sortable step name; steps apply in this order.
    pub name: &'static str,
    pub up: &'static str,
    pub down: &'static str,
}

/// All schema steps, in application order.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        name: "0001_memory_entries",
        up: r#"
CREATE TABLE IF NOT EXISTS memory_entries (
    id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL,
    feature_scope TEXT NOT NULL,
    task_type TEXT NOT NULL CHECK(task_type IN ('dev','design','qa','pm','other')),
    agent_id TEXT NOT NULL,
    lesson_category TEXT NOT NULL CHECK(lesson_category IN ('success','error','decision','constraint')),
    content TEXT NOT NULL,
    source_refs TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_memory_entries_project_created
    ON memory_entries(project_id, created_at);
CREATE INDEX IF NOT EXISTS idx_memory_entries_project_feature_task
    ON memory_entries(project_id, feature_scope, task_type);
CREATE INDEX IF NOT EXISTS idx_memory_entries_agent_task
    ON memory_entries(agent_id, task_type);
CREATE INDEX IF NOT EXISTS idx_memory_entries_category_created
    ON memory_entries(lesson_category, created_at);
"#,
        down: r#"
DROP INDEX IF EXISTS idx_memory_entries_category_created;
DROP INDEX IF EXISTS idx_memory_entries_agent_task;
DROP INDEX IF EXISTS idx_memory_entries_project_feature_task;
DROP INDEX IF EXISTS idx_memory_entries_project_created;
DROP TABLE IF EXISTS memory_entries;
"#,
    },
    Migration {
        name: "0002_process_lessons",
        up: r#"
CREATE TABLE IF NOT EXISTS process_lessons (
    entry_id TEXT PRIMARY KEY REFERENCES memory_entries(id) ON DELETE CASCADE,
    decision_moment TEXT NOT NULL,
    assumption_made TEXT NOT NULL,
    human_reason TEXT NOT NULL,
    missed_control TEXT NOT NULL,
    next_rule TEXT NOT NULL
);
"#,
        down: r#"
DROP TABLE IF EXISTS process_lessons;
"#,
    },
    Migration {
        name: "0003_workflow_audit",
        up: r#"
CREATE TABLE IF NOT EXISTS workflow_audit (
    id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL,
    ticket_id TEXT NOT NULL,
    from_status TEXT NOT NULL,
    to_status TEXT NOT NULL CHECK(to_status IN ('in-review','done')),
    agent_id TEXT NOT NULL,
    memory_entry_id TEXT NOT NULL REFERENCES memory_entries(id),
    payload_json TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_workflow_audit_project_created
    ON workflow_audit(project_id, created_at);
CREATE INDEX IF NOT EXISTS idx_workflow_audit_ticket
    ON workflow_audit(ticket_id);
"#,
        down: r#"
DROP INDEX IF EXISTS idx_workflow_audit_ticket;
DROP INDEX IF EXISTS idx_workflow_audit_project_created;
DROP TABLE IF EXISTS workflow_audit;
"#,
    },
];
