//! Write and read paths for memory entries and workflow audits.
//!
//! [`insert_entry`] and [`finish_workflow`] are the write entry points; both
//! run inside a transaction so an entry and its process lesson (and, for
//! workflow completions, the audit record) land as one atomic unit.
//! [`query_entries`] and [`query_audits`] are the filtered, time-ordered
//! read paths the ranking engine and listing callers share.

use rusqlite::{params, Connection, Transaction};

use crate::memory::types::{
    parse_label_refs, MemoryEntry, ProcessLesson, WorkflowAudit,
};
use crate::memory::validate::WorkflowCompletion;

/// Default cap for filtered queries when the caller does not set one.
pub const DEFAULT_QUERY_LIMIT: usize = 100;

/// Cap for ranking-engine candidate loads.
pub const CANDIDATE_LIMIT: usize = 1000;

/// Storage failure taxonomy. Id collisions are distinct so callers can map
/// them to a conflict instead of a generic failure.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("memory entry id already exists")]
    DuplicateId,
    #[error("storage failure: {0}")]
    Storage(#[from] rusqlite::Error),
    #[error("storage encoding failure: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// AND-combined entry filters. `None` fields are ignored, not matched empty.
#[derive(Debug, Clone)]
pub struct EntryFilters {
    /// `None` means cross-project (the `all` sentinel).
    pub project_id: Option<String>,
    pub feature_scope: Option<String>,
    pub task_type: Option<crate::memory::types::TaskType>,
    pub agent_id: Option<String>,
    pub lesson_category: Option<crate::memory::types::LessonCategory>,
    /// Substring match over content and process-lesson fields.
    pub search_query: Option<String>,
    pub limit: usize,
}

impl Default for EntryFilters {
    fn default() -> Self {
        Self {
            project_id: None,
            feature_scope: None,
            task_type: None,
            agent_id: None,
            lesson_category: None,
            search_query: None,
            limit: DEFAULT_QUERY_LIMIT,
        }
    }
}

/// AND-combined audit filters, same shape as [`EntryFilters`].
#[derive(Debug, Clone)]
pub struct AuditFilters {
    pub project_id: Option<String>,
    pub ticket_id: Option<String>,
    pub agent_id: Option<String>,
    pub limit: usize,
}

impl Default for AuditFilters {
    fn default() -> Self {
        Self {
            project_id: None,
            ticket_id: None,
            agent_id: None,
            limit: DEFAULT_QUERY_LIMIT,
        }
    }
}

/// Result of an atomic workflow completion: the entry and its audit record.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowTicketFinish {
    pub memory_entry: MemoryEntry,
    pub audit: WorkflowAudit,
}

/// Persist a memory entry and, when present, its process lesson.
///
/// One transaction; an id collision fails with [`StoreError::DuplicateId`]
/// and leaves nothing behind.
pub fn insert_entry(conn: &mut Connection, entry: &MemoryEntry) -> Result<(), StoreError> {
    let tx = conn.transaction()?;
    insert_entry_tx(&tx, entry)?;
    tx.commit()?;

    tracing::debug!(id = %entry.id, project = %entry.project_id, "memory entry stored");
    Ok(())
}

/// Persist a workflow audit record on its own.
///
/// Callers composing a ticket transition should prefer [`finish_workflow`],
/// which writes the entry and audit in one transaction.
pub fn insert_audit(conn: &mut Connection, audit: &WorkflowAudit) -> Result<(), StoreError> {
    let tx = conn.transaction()?;
    insert_audit_tx(&tx, audit)?;
    tx.commit()?;
    Ok(())
}

/// Atomic workflow completion: entry (+ process lesson) and audit in one
/// transaction. The audit id, payload snapshot, and timestamp are generated
/// here.
pub fn finish_workflow(
    conn: &mut Connection,
    completion: &WorkflowCompletion,
) -> Result<WorkflowTicketFinish, StoreError> {
    let entry = completion.entry.clone();
    let audit = WorkflowAudit {
        id: format!("audit-{}", uuid::Uuid::now_v7()),
        project_id: completion.project_id.clone(),
        ticket_id: completion.ticket_id.clone(),
        from_status: completion.from_status.clone(),
        to_status: completion.to_status,
        agent_id: completion.agent_id.clone(),
        memory_entry_id: entry.id.clone(),
        payload: serde_json::json!({
            "ticketId": completion.ticket_id,
            "fromStatus": completion.from_status,
            "toStatus": completion.to_status,
            "memory": {
                "id": entry.id,
                "featureScope": entry.feature_scope,
                "taskType": entry.task_type,
                "lessonCategory": entry.lesson_category,
                "labels": entry.labels,
                "sourceRefs": entry.source_refs,
            },
        }),
        created_at: chrono::Utc::now().to_rfc3339(),
    };

    let tx = conn.transaction()?;
    insert_entry_tx(&tx, &entry)?;
    insert_audit_tx(&tx, &audit)?;
    tx.commit()?;

    tracing::info!(
        ticket = %audit.ticket_id,
        entry = %entry.id,
        to = %audit.to_status,
        "workflow completion recorded"
    );
    Ok(WorkflowTicketFinish {
        memory_entry: entry,
        audit,
    })
}

/// Query entries matching all supplied filters, newest first.
///
/// Returned entries carry derived labels and a hydrated process lesson.
pub fn query_entries(
    conn: &Connection,
    filters: &EntryFilters,
) -> Result<Vec<MemoryEntry>, StoreError> {
    let mut clauses: Vec<String> = Vec::new();
    let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

    for (column, value) in [
        ("e.project_id", &filters.project_id),
        ("e.feature_scope", &filters.feature_scope),
        ("e.agent_id", &filters.agent_id),
    ] {
        if let Some(value) = value {
            params.push(Box::new(value.clone()));
            clauses.push(format!("{column} = ?{}", params.len()));
        }
    }
    if let Some(task_type) = filters.task_type {
        params.push(Box::new(task_type.as_str().to_string()));
        clauses.push(format!("e.task_type = ?{}", params.len()));
    }
    if let Some(category) = filters.lesson_category {
        params.push(Box::new(category.as_str().to_string()));
        clauses.push(format!("e.lesson_category = ?{}", params.len()));
    }
    if let Some(query) = &filters.search_query {
        params.push(Box::new(format!("%{query}%")));
        let n = params.len();
        clauses.push(format!(
            "(e.content LIKE ?{n} \
             OR COALESCE(pl.decision_moment, '') LIKE ?{n} \
             OR COALESCE(pl.assumption_made, '') LIKE ?{n} \
             OR COALESCE(pl.human_reason, '') LIKE ?{n} \
             OR COALESCE(pl.missed_control, '') LIKE ?{n} \
             OR COALESCE(pl.next_rule, '') LIKE ?{n})"
        ));
    }

    let where_clause = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };

    params.push(Box::new(filters.limit.max(1) as i64));
    let sql = format!(
        "SELECT e.id, e.project_id, e.feature_scope, e.task_type, e.agent_id, \
         e.lesson_category, e.content, e.source_refs, e.created_at, \
         pl.decision_moment, pl.assumption_made, pl.human_reason, pl.missed_control, pl.next_rule \
         FROM memory_entries e \
         LEFT JOIN process_lessons pl ON pl.entry_id = e.id \
         {where_clause} \
         ORDER BY e.created_at DESC \
         LIMIT ?{}",
        params.len()
    );

    let mut stmt = conn.prepare(&sql)?;
    let param_refs: Vec<&dyn rusqlite::types::ToSql> =
        params.iter().map(|p| p.as_ref()).collect();

    let entries = stmt
        .query_map(param_refs.as_slice(), entry_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(entries)
}

/// Query workflow audits matching all supplied filters, newest first.
pub fn query_audits(
    conn: &Connection,
    filters: &AuditFilters,
) -> Result<Vec<WorkflowAudit>, StoreError> {
    let mut clauses: Vec<String> = Vec::new();
    let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

    for (column, value) in [
        ("project_id", &filters.project_id),
        ("ticket_id", &filters.ticket_id),
        ("agent_id", &filters.agent_id),
    ] {
        if let Some(value) = value {
            params.push(Box::new(value.clone()));
            clauses.push(format!("{column} = ?{}", params.len()));
        }
    }

    let where_clause = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };

    params.push(Box::new(filters.limit.max(1) as i64));
    let sql = format!(
        "SELECT id, project_id, ticket_id, from_status, to_status, agent_id, \
         memory_entry_id, payload_json, created_at \
         FROM workflow_audit \
         {where_clause} \
         ORDER BY created_at DESC \
         LIMIT ?{}",
        params.len()
    );

    let mut stmt = conn.prepare(&sql)?;
    let param_refs: Vec<&dyn rusqlite::types::ToSql> =
        params.iter().map(|p| p.as_ref()).collect();

    let audits = stmt
        .query_map(param_refs.as_slice(), audit_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(audits)
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn insert_entry_tx(tx: &Transaction, entry: &MemoryEntry) -> Result<(), StoreError> {
    let source_refs = serde_json::to_string(&entry.source_refs)?;

    tx.execute(
        "INSERT INTO memory_entries (id, project_id, feature_scope, task_type, agent_id, \
         lesson_category, content, source_refs, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            entry.id,
            entry.project_id,
            entry.feature_scope,
            entry.task_type.as_str(),
            entry.agent_id,
            entry.lesson_category.as_str(),
            entry.content,
            source_refs,
            entry.created_at,
        ],
    )
    .map_err(map_constraint)?;

    if let Some(lesson) = &entry.process_lesson {
        tx.execute(
            "INSERT INTO process_lessons (entry_id, decision_moment, assumption_made, \
             human_reason, missed_control, next_rule) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                entry.id,
                lesson.decision_moment,
                lesson.assumption_made,
                lesson.human_reason,
                lesson.missed_control,
                lesson.next_rule,
            ],
        )
        .map_err(map_constraint)?;
    }

    Ok(())
}

fn insert_audit_tx(tx: &Transaction, audit: &WorkflowAudit) -> Result<(), StoreError> {
    tx.execute(
        "INSERT INTO workflow_audit (id, project_id, ticket_id, from_status, to_status, \
         agent_id, memory_entry_id, payload_json, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            audit.id,
            audit.project_id,
            audit.ticket_id,
            audit.from_status,
            audit.to_status.as_str(),
            audit.agent_id,
            audit.memory_entry_id,
            audit.payload.to_string(),
            audit.created_at,
        ],
    )
    .map_err(map_constraint)?;
    Ok(())
}

/// Constraint violations on insert are id collisions; everything else is a
/// plain storage failure.
fn map_constraint(err: rusqlite::Error) -> StoreError {
    match &err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            StoreError::DuplicateId
        }
        _ => StoreError::Storage(err),
    }
}

fn entry_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MemoryEntry> {
    let task_type: String = row.get(3)?;
    let lesson_category: String = row.get(5)?;
    let source_refs_json: String = row.get(7)?;

    let source_refs: Vec<String> = serde_json::from_str(&source_refs_json)
        .map_err(|e| decode_error(7, e))?;
    let labels = parse_label_refs(&source_refs);

    let decision_moment: Option<String> = row.get(9)?;
    let process_lesson = match decision_moment {
        Some(decision_moment) => Some(ProcessLesson {
            decision_moment,
            assumption_made: row.get(10)?,
            human_reason: row.get(11)?,
            missed_control: row.get(12)?,
            next_rule: row.get(13)?,
        }),
        None => None,
    };

    Ok(MemoryEntry {
        id: row.get(0)?,
        project_id: row.get(1)?,
        feature_scope: row.get(2)?,
        task_type: task_type.parse().map_err(|e: String| decode_error(3, e))?,
        agent_id: row.get(4)?,
        lesson_category: lesson_category
            .parse()
            .map_err(|e: String| decode_error(5, e))?,
        content: row.get(6)?,
        source_refs,
        labels,
        created_at: row.get(8)?,
        process_lesson,
    })
}

fn audit_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<WorkflowAudit> {
    let to_status: String = row.get(4)?;
    let payload_json: String = row.get(7)?;

    Ok(WorkflowAudit {
        id: row.get(0)?,
        project_id: row.get(1)?,
        ticket_id: row.get(2)?,
        from_status: row.get(3)?,
        to_status: to_status.parse().map_err(|e: String| decode_error(4, e))?,
        agent_id: row.get(5)?,
        memory_entry_id: row.get(6)?,
        payload: serde_json::from_str(&payload_json).map_err(|e| decode_error(7, e))?,
        created_at: row.get(8)?,
    })
}

fn decode_error(
    column: usize,
    err: impl Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, err.into())
}
