//! Memory injection into generated artifacts.
//!
//! Each helper validates its own required fields, runs the retrieval engine
//! with a context derived from the payload, and splices the ranked lessons
//! into a deterministic text block. The returned [`MemoryTrace`] records
//! which entries influenced the artifact so callers can audit the injection.

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::memory::retrieval::{self, RetrievalContext, ScoredEntry};
use crate::memory::store::StoreError;
use crate::memory::validate::{validate_retrieval, RetrievalPayload, ValidationError};

/// Composition callers default to a tighter result set than raw retrieval.
pub const COMPOSE_DEFAULT_LIMIT: i64 = 5;

const LESSONS_HEADING: &str = "## Lessons to avoid repeating mistakes";
const PROCESS_HEADING: &str = "## Human/Process Lessons";
const EMPTY_LESSONS_LINE: &str =
    "- No contextual memory matched; fall back to project safe defaults and document new lessons.";

/// Validation and storage errors pass through unchanged.
#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Which memories fed a composed artifact.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryTrace {
    pub source_memory_ids: Vec<String>,
    pub fallback_used: bool,
    pub context_signals: usize,
}

/// Ticket-composition request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TicketComposePayload {
    pub project_id: Option<String>,
    pub title: Option<String>,
    pub feature_scope: Option<String>,
    pub task_type: Option<String>,
    pub priority: Option<String>,
    pub labels: Vec<String>,
    pub search_query: Option<String>,
    pub spec_markdown: Option<String>,
    pub limit: Option<i64>,
}

/// Handoff-composition request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HandoffComposePayload {
    pub project_id: Option<String>,
    pub ticket_id: Option<String>,
    pub summary: Option<String>,
    pub feature_scope: Option<String>,
    pub task_type: Option<String>,
    pub priority: Option<String>,
    pub labels: Vec<String>,
    pub search_query: Option<String>,
    pub limit: Option<i64>,
}

/// Reference-prompt-composition request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReferencePromptComposePayload {
    pub project_id: Option<String>,
    pub ticket_id: Option<String>,
    pub title: Option<String>,
    pub feature_scope: Option<String>,
    pub task_type: Option<String>,
    pub priority: Option<String>,
    pub labels: Vec<String>,
    pub search_query: Option<String>,
    pub limit: Option<i64>,
}

/// A composed ticket draft with lessons spliced in.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComposedTicket {
    pub title: String,
    pub spec_markdown: String,
    pub reference_prompt: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketComposition {
    pub ticket: ComposedTicket,
    pub memory_trace: MemoryTrace,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HandoffComposition {
    pub handoff_markdown: String,
    pub memory_trace: MemoryTrace,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferencePromptComposition {
    pub reference_prompt: String,
    pub memory_trace: MemoryTrace,
}

/// Compose a ticket spec and its reference prompt with injected lessons.
pub fn compose_ticket(
    conn: &Connection,
    payload: &TicketComposePayload,
) -> Result<TicketComposition, ComposeError> {
    let title = required(&payload.title);
    let ctx = validated_context(
        RetrievalPayload {
            project_id: payload.project_id.clone(),
            feature_scope: payload.feature_scope.clone(),
            task_type: payload.task_type.clone(),
            priority: payload.priority.clone(),
            labels: payload.labels.clone(),
            search_query: payload.search_query.clone(),
            limit: Some(payload.limit.unwrap_or(COMPOSE_DEFAULT_LIMIT)),
        },
        &[("title", &title)],
    )?;
    let title = title.expect("validated above");

    let result = retrieval::retrieve(conn, &ctx)?;
    let block = render_lessons_block(&result.entries);

    let base_spec = payload
        .spec_markdown
        .as_deref()
        .map(str::trim)
        .unwrap_or("");
    let spec_markdown = if base_spec.is_empty() {
        block.clone()
    } else {
        format!("{base_spec}\n\n{block}")
    };
    let reference_prompt = format!(
        "# Reference Prompt - {title}\n\nUse the recorded lessons below when drafting work for this ticket.\n\n{block}"
    );

    Ok(TicketComposition {
        ticket: ComposedTicket {
            title,
            spec_markdown,
            reference_prompt,
        },
        memory_trace: trace(&result),
    })
}

/// Compose a handoff note with injected lessons.
pub fn compose_handoff(
    conn: &Connection,
    payload: &HandoffComposePayload,
) -> Result<HandoffComposition, ComposeError> {
    let ticket_id = required(&payload.ticket_id);
    let summary = required(&payload.summary);
    let ctx = validated_context(
        RetrievalPayload {
            project_id: payload.project_id.clone(),
            feature_scope: payload.feature_scope.clone(),
            task_type: payload.task_type.clone(),
            priority: payload.priority.clone(),
            labels: payload.labels.clone(),
            search_query: payload.search_query.clone(),
            limit: Some(payload.limit.unwrap_or(COMPOSE_DEFAULT_LIMIT)),
        },
        &[("ticketId", &ticket_id), ("summary", &summary)],
    )?;
    let ticket_id = ticket_id.expect("validated above");
    let summary = summary.expect("validated above");

    let result = retrieval::retrieve(conn, &ctx)?;
    let block = render_lessons_block(&result.entries);
    let handoff_markdown = format!("# Handoff - {ticket_id}\n\n{summary}\n\n{block}");

    Ok(HandoffComposition {
        handoff_markdown,
        memory_trace: trace(&result),
    })
}

/// Compose a standalone reference prompt with injected lessons.
pub fn compose_reference_prompt(
    conn: &Connection,
    payload: &ReferencePromptComposePayload,
) -> Result<ReferencePromptComposition, ComposeError> {
    let ticket_id = required(&payload.ticket_id);
    let title = required(&payload.title);
    let ctx = validated_context(
        RetrievalPayload {
            project_id: payload.project_id.clone(),
            feature_scope: payload.feature_scope.clone(),
            task_type: payload.task_type.clone(),
            priority: payload.priority.clone(),
            labels: payload.labels.clone(),
            search_query: payload.search_query.clone(),
            limit: Some(payload.limit.unwrap_or(COMPOSE_DEFAULT_LIMIT)),
        },
        &[("ticketId", &ticket_id), ("title", &title)],
    )?;
    let ticket_id = ticket_id.expect("validated above");
    let title = title.expect("validated above");

    let result = retrieval::retrieve(conn, &ctx)?;
    let block = render_lessons_block(&result.entries);
    let reference_prompt = format!("# Reference Prompt - {ticket_id}\n\n{title}\n\n{block}");

    Ok(ReferencePromptComposition {
        reference_prompt,
        memory_trace: trace(&result),
    })
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn required(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Validate the helper's own required fields together with the derived
/// retrieval context, surfacing every violation in one error.
fn validated_context(
    payload: RetrievalPayload,
    required_fields: &[(&str, &Option<String>)],
) -> Result<RetrievalContext, ValidationError> {
    let mut errors: Vec<String> = required_fields
        .iter()
        .filter(|(_, value)| value.is_none())
        .map(|(name, _)| format!("{name} is required"))
        .collect();

    match validate_retrieval(&payload) {
        Ok(ctx) if errors.is_empty() => Ok(ctx),
        Ok(_) => Err(ValidationError { errors }),
        Err(nested) => {
            errors.extend(nested.errors);
            Err(ValidationError { errors })
        }
    }
}

fn trace(result: &retrieval::RetrievalResult) -> MemoryTrace {
    MemoryTrace {
        source_memory_ids: result.entries.iter().map(|e| e.entry.id.clone()).collect(),
        fallback_used: result.fallback_used,
        context_signals: result.context_signals,
    }
}

/// Render the deterministic lessons block: the lessons section, the optional
/// process-lesson section, and the trailing source-id line.
fn render_lessons_block(entries: &[ScoredEntry]) -> String {
    let mut block = String::from(LESSONS_HEADING);
    block.push('\n');

    if entries.is_empty() {
        block.push_str(EMPTY_LESSONS_LINE);
        block.push('\n');
    } else {
        for scored in entries {
            block.push_str(&format!(
                "- [{}] {} (score: {}; sources: {})\n",
                scored.entry.id,
                scored.entry.content,
                scored.score,
                provenance_refs(&scored.entry.source_refs),
            ));
        }
    }

    let with_lessons: Vec<&ScoredEntry> = entries
        .iter()
        .filter(|s| s.entry.process_lesson.is_some())
        .collect();
    if !with_lessons.is_empty() {
        block.push('\n');
        block.push_str(PROCESS_HEADING);
        block.push('\n');
        for scored in with_lessons {
            let lesson = scored.entry.process_lesson.as_ref().expect("filtered above");
            block.push_str(&format!("- [{}]\n", scored.entry.id));
            block.push_str(&format!("  - Decision moment: {}\n", lesson.decision_moment));
            block.push_str(&format!("  - Assumption made: {}\n", lesson.assumption_made));
            block.push_str(&format!("  - Human reason: {}\n", lesson.human_reason));
            block.push_str(&format!("  - Missed control: {}\n", lesson.missed_control));
            block.push_str(&format!("  - Next rule: {}\n", lesson.next_rule));
        }
    }

    let ids: Vec<&str> = entries.iter().map(|s| s.entry.id.as_str()).collect();
    block.push('\n');
    block.push_str(&format!(
        "Memory source IDs: {}",
        if ids.is_empty() {
            "none".to_string()
        } else {
            ids.join(", ")
        }
    ));
    block
}

/// Non-label source refs, comma-joined, or "none".
fn provenance_refs(source_refs: &[String]) -> String {
    let refs: Vec<&str> = source_refs
        .iter()
        .filter(|r| !r.starts_with(crate::memory::types::LABEL_REF_PREFIX))
        .map(|r| r.as_str())
        .collect();
    if refs.is_empty() {
        "none".to_string()
    } else {
        refs.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::types::{LessonCategory, MemoryEntry, ProcessLesson, TaskType};

    fn scored(id: &str, content: &str, refs: &[&str], score: i64) -> ScoredEntry {
        ScoredEntry {
            entry: MemoryEntry {
                id: id.to_string(),
                project_id: "vault-2".to_string(),
                feature_scope: "workflow".to_string(),
                task_type: TaskType::Dev,
                agent_id: "codex-dev".to_string(),
                lesson_category: LessonCategory::Error,
                content: content.to_string(),
                source_refs: refs.iter().map(|r| r.to_string()).collect(),
                labels: Vec::new(),
                created_at: "2026-02-20T09:00:00+00:00".to_string(),
                process_lesson: None,
            },
            score,
            reasons: Vec::new(),
        }
    }

    #[test]
    fn lessons_block_renders_entries_with_provenance() {
        let entries = vec![scored(
            "mem-ticket-1",
            "Keep memory source IDs explicit.",
            &["VAULT-2-004", "label:workflow", "commit:workflow123"],
            57,
        )];
        let block = render_lessons_block(&entries);

        assert!(block.starts_with(LESSONS_HEADING));
        assert!(block.contains(
            "- [mem-ticket-1] Keep memory source IDs explicit. (score: 57; sources: VAULT-2-004, commit:workflow123)"
        ));
        assert!(block.ends_with("Memory source IDs: mem-ticket-1"));
        assert!(!block.contains(PROCESS_HEADING));
    }

    #[test]
    fn lessons_block_placeholder_when_empty() {
        let block = render_lessons_block(&[]);
        assert!(block.contains("No contextual memory matched"));
        assert!(block.ends_with("Memory source IDs: none"));
    }

    #[test]
    fn label_only_refs_render_as_none() {
        let entries = vec![scored("mem-1", "Lesson body", &["label:api"], 23)];
        let block = render_lessons_block(&entries);
        assert!(block.contains("sources: none"));
    }

    #[test]
    fn process_section_present_iff_a_lesson_carries_one() {
        let mut entries = vec![
            scored("mem-1", "Plain lesson", &["VAULT-2-001"], 30),
            scored("mem-2", "Post-mortem lesson", &["VAULT-2-002"], 25),
        ];
        entries[1].entry.process_lesson = Some(ProcessLesson {
            decision_moment: "Added fallback ranking".to_string(),
            assumption_made: "Query always had context".to_string(),
            human_reason: "Rushed for deadline".to_string(),
            missed_control: "Missing low-context tests".to_string(),
            next_rule: "Always add fallback tests".to_string(),
        });

        let block = render_lessons_block(&entries);
        assert!(block.contains(PROCESS_HEADING));
        assert!(block.contains("- [mem-2]"));
        assert!(block.contains("  - Next rule: Always add fallback tests"));
        assert!(block.contains("Memory source IDs: mem-1, mem-2"));
    }

    #[test]
    fn compose_validation_reports_every_missing_field() {
        let missing: Option<String> = None;
        let err = validated_context(
            RetrievalPayload::default(),
            &[("ticketId", &missing), ("summary", &missing)],
        )
        .unwrap_err();
        assert!(err.errors.contains(&"ticketId is required".to_string()));
        assert!(err.errors.contains(&"summary is required".to_string()));
        assert!(err.errors.contains(&"projectId is required".to_string()));
    }
}
