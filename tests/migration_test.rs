use retrospect::db::{self, migrations, schema};

#[test]
fn open_database_creates_schema_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("retrospect.db");

    let conn = db::open_database(&path).unwrap();

    let tables: Vec<String> = conn
        .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
        .unwrap()
        .query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();

    assert!(tables.contains(&"memory_entries".to_string()));
    assert!(tables.contains(&"process_lessons".to_string()));
    assert!(tables.contains(&"workflow_audit".to_string()));
    assert!(tables.contains(&"schema_migrations".to_string()));
}

#[test]
fn reopening_an_existing_database_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("retrospect.db");

    {
        let mut conn = db::open_database(&path).unwrap();
        conn.execute(
            "INSERT INTO memory_entries (id, project_id, feature_scope, task_type, agent_id, \
             lesson_category, content, source_refs, created_at) \
             VALUES ('mem-1', 'vault-2', 'workflow', 'dev', 'codex-dev', 'error', 'Lesson', \
             '[\"ref-1\"]', '2026-02-20T09:00:00+00:00')",
            [],
        )
        .unwrap();
        migrations::run_migrations(&mut conn).unwrap();
    }

    let conn = db::open_database(&path).unwrap();
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM memory_entries", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);

    let applied = migrations::applied_migrations(&conn).unwrap();
    assert_eq!(applied.len(), schema::MIGRATIONS.len());
}

#[test]
fn rollback_then_rerun_restores_schema() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("retrospect.db");

    let mut conn = db::open_database(&path).unwrap();
    migrations::rollback_migrations(&mut conn).unwrap();

    let table: Option<String> = conn
        .query_row(
            "SELECT name FROM sqlite_master WHERE type='table' AND name='memory_entries'",
            [],
            |row| row.get(0),
        )
        .ok();
    assert!(table.is_none());

    migrations::run_migrations(&mut conn).unwrap();
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM memory_entries", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 0);
}
