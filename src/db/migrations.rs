//! Named schema migration framework.
//!
//! Tracks applied step names in `schema_migrations` and applies pending
//! steps from [`schema::MIGRATIONS`](crate::db::schema::MIGRATIONS) in
//! lexical order, each inside its own transaction. Rollback applies the
//! `down` DDL of applied steps in reverse order.

use rusqlite::{params, Connection};
use std::collections::HashSet;

use crate::db::schema::MIGRATIONS;

const BOOKKEEPING_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    name TEXT PRIMARY KEY,
    applied_at TEXT NOT NULL
);
"#;

/// Names of the migration steps already applied, in application order.
pub fn applied_migrations(conn: &Connection) -> rusqlite::Result<Vec<String>> {
    conn.execute_batch(BOOKKEEPING_SQL)?;
    let mut stmt = conn.prepare("SELECT name FROM schema_migrations ORDER BY name")?;
    let names = stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(names)
}

/// Apply any pending migration steps, in lexical order.
pub fn run_migrations(conn: &mut Connection) -> rusqlite::Result<()> {
    conn.execute_batch(BOOKKEEPING_SQL)?;
    let applied: HashSet<String> = applied_migrations(conn)?.into_iter().collect();

    for migration in MIGRATIONS {
        if applied.contains(migration.name) {
            continue;
        }
        tracing::info!(step = migration.name, "applying migration");

        let tx = conn.transaction()?;
        tx.execute_batch(migration.up)?;
        tx.execute(
            "INSERT INTO schema_migrations (name, applied_at) VALUES (?1, ?2)",
            params![migration.name, chrono::Utc::now().to_rfc3339()],
        )?;
        tx.commit()?;
    }

    Ok(())
}

/// Roll back every applied step, newest first.
pub fn rollback_migrations(conn: &mut Connection) -> rusqlite::Result<()> {
    conn.execute_batch(BOOKKEEPING_SQL)?;
    let applied: HashSet<String> = applied_migrations(conn)?.into_iter().collect();

    for migration in MIGRATIONS.iter().rev() {
        if !applied.contains(migration.name) {
            continue;
        }
        tracing::info!(step = migration.name, "rolling back migration");

        let tx = conn.transaction()?;
        tx.execute_batch(migration.down)?;
        tx.execute(
            "DELETE FROM schema_migrations WHERE name = ?1",
            params![migration.name],
        )?;
        tx.commit()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "foreign_keys", "ON").unwrap();
        conn
    }

    fn table_exists(conn: &Connection, name: &str) -> bool {
        conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
            [name],
            |row| row.get::<_, i64>(0),
        )
        .unwrap()
            > 0
    }

    #[test]
    fn run_migrations_creates_all_tables_and_indexes() {
        let mut conn = test_db();
        run_migrations(&mut conn).unwrap();

        assert!(table_exists(&conn, "memory_entries"));
        assert!(table_exists(&conn, "process_lessons"));
        assert!(table_exists(&conn, "workflow_audit"));

        let indexes: Vec<String> = conn
            .prepare(
                "SELECT name FROM sqlite_master WHERE type='index' AND tbl_name='memory_entries'",
            )
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        assert!(indexes.contains(&"idx_memory_entries_project_created".to_string()));
        assert!(indexes.contains(&"idx_memory_entries_project_feature_task".to_string()));
        assert!(indexes.contains(&"idx_memory_entries_agent_task".to_string()));
        assert!(indexes.contains(&"idx_memory_entries_category_created".to_string()));
    }

    #[test]
    fn migrations_are_idempotent() {
        let mut conn = test_db();
        run_migrations(&mut conn).unwrap();
        run_migrations(&mut conn).unwrap();

        let applied = applied_migrations(&conn).unwrap();
        assert_eq!(applied.len(), MIGRATIONS.len());
    }

    #[test]
    fn applied_migrations_in_lexical_order() {
        let mut conn = test_db();
        run_migrations(&mut conn).unwrap();

        let applied = applied_migrations(&conn).unwrap();
        let mut sorted = applied.clone();
        sorted.sort_unstable();
        assert_eq!(applied, sorted);
    }

    #[test]
    fn rollback_drops_all_tables() {
        let mut conn = test_db();
        run_migrations(&mut conn).unwrap();
        rollback_migrations(&mut conn).unwrap();

        assert!(!table_exists(&conn, "memory_entries"));
        assert!(!table_exists(&conn, "process_lessons"));
        assert!(!table_exists(&conn, "workflow_audit"));
        assert!(applied_migrations(&conn).unwrap().is_empty());
    }
}
