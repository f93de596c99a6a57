#![allow(dead_code)]

use rusqlite::Connection;

use retrospect::db;
use retrospect::memory::store;
use retrospect::memory::types::MemoryEntry;
use retrospect::memory::validate::{validate_create, CreatePayload};

/// Open a fresh in-memory database with all migrations applied.
pub fn test_db() -> Connection {
    let mut conn = Connection::open_in_memory().unwrap();
    conn.pragma_update(None, "foreign_keys", "ON").unwrap();
    db::migrations::run_migrations(&mut conn).unwrap();
    conn
}

/// Build a creation payload with sensible defaults for tests.
pub fn payload(id: &str, feature_scope: &str, task_type: &str, category: &str) -> CreatePayload {
    CreatePayload {
        id: Some(id.to_string()),
        project_id: Some("vault-2".to_string()),
        feature_scope: Some(feature_scope.to_string()),
        task_type: Some(task_type.to_string()),
        agent_id: Some(format!("codex-{task_type}")),
        lesson_category: Some(category.to_string()),
        content: Some(format!("Lesson recorded for {feature_scope}")),
        source_refs: vec![format!("{}:ref", id.to_uppercase())],
        ..Default::default()
    }
}

/// Validate and insert a payload. Returns the normalized entry.
pub fn insert_lesson(conn: &mut Connection, payload: &CreatePayload) -> MemoryEntry {
    let entry = validate_create(payload).unwrap();
    store::insert_entry(conn, &entry).unwrap();
    entry
}
