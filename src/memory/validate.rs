//! Payload validation and normalization.
//!
//! Pure functions, no storage I/O. Each validator trims string fields,
//! case-folds enum fields, and returns either a fully normalized value or
//! the complete list of field errors — callers surface every violation, not
//! just the first.

use serde::Deserialize;

use crate::memory::retrieval::RetrievalContext;
use crate::memory::store::{AuditFilters, EntryFilters};
use crate::memory::types::{
    label_ref, parse_label_refs, LessonCategory, MemoryEntry, Priority, ProcessLesson, TaskType,
    WorkflowStatus, ALL_PROJECTS,
};

/// Default/maximum limits for listing and retrieval requests.
pub const LIST_LIMIT_DEFAULT: usize = 100;
pub const LIST_LIMIT_MAX: usize = 200;
pub const RETRIEVAL_LIMIT_DEFAULT: usize = 10;
pub const RETRIEVAL_LIMIT_MAX: usize = 50;

/// One or more field-level validation failures. Never a partial accept.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid payload: {}", .errors.join("; "))]
pub struct ValidationError {
    pub errors: Vec<String>,
}

/// Raw entry-creation payload as submitted by a caller.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreatePayload {
    pub id: Option<String>,
    pub project_id: Option<String>,
    pub feature_scope: Option<String>,
    pub task_type: Option<String>,
    pub agent_id: Option<String>,
    pub lesson_category: Option<String>,
    pub content: Option<String>,
    pub source_refs: Vec<String>,
    pub labels: Vec<String>,
    pub created_at: Option<String>,
    pub process_lesson: Option<ProcessLessonPayload>,
}

/// Raw process-lesson payload; all five fields must be present together.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProcessLessonPayload {
    pub decision_moment: Option<String>,
    pub assumption_made: Option<String>,
    pub human_reason: Option<String>,
    pub missed_control: Option<String>,
    pub next_rule: Option<String>,
}

/// Raw listing query.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListPayload {
    pub project_id: Option<String>,
    pub feature_scope: Option<String>,
    pub task_type: Option<String>,
    pub agent_id: Option<String>,
    pub lesson_category: Option<String>,
    pub label: Option<String>,
    pub search_query: Option<String>,
    pub limit: Option<i64>,
}

/// Normalized listing request: store filters plus the post-query label filter.
#[derive(Debug, Clone)]
pub struct ListRequest {
    pub filters: EntryFilters,
    pub label: Option<String>,
}

impl ListRequest {
    /// Apply the label filter over derived labels. Labels live inside
    /// `sourceRefs`, so the store cannot express this as a column filter.
    pub fn filter_labels(&self, entries: Vec<MemoryEntry>) -> Vec<MemoryEntry> {
        match &self.label {
            Some(label) => entries
                .into_iter()
                .filter(|entry| entry.labels.contains(label))
                .collect(),
            None => entries,
        }
    }
}

/// Raw retrieval-context payload.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetrievalPayload {
    pub project_id: Option<String>,
    pub feature_scope: Option<String>,
    pub task_type: Option<String>,
    pub priority: Option<String>,
    pub labels: Vec<String>,
    pub search_query: Option<String>,
    pub limit: Option<i64>,
}

/// Raw workflow-completion payload.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkflowCompletionPayload {
    pub project_id: Option<String>,
    pub ticket_id: Option<String>,
    pub from_status: Option<String>,
    pub to_status: Option<String>,
    pub agent_id: Option<String>,
    pub memory: Option<CreatePayload>,
}

/// Raw audit-listing query.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuditQueryPayload {
    pub project_id: Option<String>,
    pub ticket_id: Option<String>,
    pub agent_id: Option<String>,
    pub limit: Option<i64>,
}

/// Normalized workflow completion, ready for the atomic store write.
#[derive(Debug, Clone)]
pub struct WorkflowCompletion {
    pub project_id: String,
    pub ticket_id: String,
    pub from_status: String,
    pub to_status: WorkflowStatus,
    pub agent_id: String,
    pub entry: MemoryEntry,
}

fn trimmed(value: &Option<String>) -> String {
    value.as_deref().unwrap_or("").trim().to_string()
}

/// Trim every element and drop the empties.
fn normalize_refs(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

fn unique(values: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    values.into_iter().filter(|v| seen.insert(v.clone())).collect()
}

/// Validate and normalize an entry-creation payload.
///
/// Returns the fully defaulted [`MemoryEntry`] (generated id, timestamp,
/// labels merged into `source_refs` as `label:` refs) or every field error
/// found.
pub fn validate_create(payload: &CreatePayload) -> Result<MemoryEntry, ValidationError> {
    let project_id = trimmed(&payload.project_id);
    let feature_scope = trimmed(&payload.feature_scope);
    let task_type_raw = trimmed(&payload.task_type).to_lowercase();
    let agent_id = trimmed(&payload.agent_id);
    let lesson_category_raw = trimmed(&payload.lesson_category).to_lowercase();
    let content = trimmed(&payload.content);
    let source_refs = normalize_refs(&payload.source_refs);
    let labels = normalize_refs(&payload.labels);
    let explicit_id = trimmed(&payload.id);
    let created_at = trimmed(&payload.created_at);

    let mut errors = Vec::new();

    if project_id.is_empty() {
        errors.push("projectId is required".to_string());
    }
    if feature_scope.is_empty() {
        errors.push("featureScope is required".to_string());
    }
    if task_type_raw.is_empty() {
        errors.push("taskType is required".to_string());
    }
    if agent_id.is_empty() {
        errors.push("agentId is required".to_string());
    }
    if lesson_category_raw.is_empty() {
        errors.push("lessonCategory is required".to_string());
    }
    if content.is_empty() {
        errors.push("content is required".to_string());
    }
    if source_refs.is_empty() {
        errors.push("sourceRefs must contain at least one source id".to_string());
    }

    let task_type = task_type_raw.parse::<TaskType>();
    if !task_type_raw.is_empty() && task_type.is_err() {
        errors.push("taskType must be one of dev|design|qa|pm|other".to_string());
    }

    let lesson_category = lesson_category_raw.parse::<LessonCategory>();
    if !lesson_category_raw.is_empty() && lesson_category.is_err() {
        errors.push("lessonCategory must be one of success|error|decision|constraint".to_string());
    }

    let process_lesson = match &payload.process_lesson {
        Some(raw) => {
            let lesson = validate_process_lesson(raw, &mut errors);
            Some(lesson)
        }
        None => None,
    };

    if !errors.is_empty() {
        return Err(ValidationError { errors });
    }

    let source_refs = unique(
        source_refs
            .into_iter()
            .chain(labels.iter().map(|l| label_ref(l)))
            .collect(),
    );
    let labels = parse_label_refs(&source_refs);

    Ok(MemoryEntry {
        id: if explicit_id.is_empty() {
            format!("mem-{}", uuid::Uuid::now_v7())
        } else {
            explicit_id
        },
        project_id,
        feature_scope,
        task_type: task_type.expect("validated above"),
        agent_id,
        lesson_category: lesson_category.expect("validated above"),
        content,
        source_refs,
        labels,
        created_at: if created_at.is_empty() {
            chrono::Utc::now().to_rfc3339()
        } else {
            created_at
        },
        process_lesson: process_lesson.flatten(),
    })
}

/// All five process-lesson fields are required together.
fn validate_process_lesson(
    raw: &ProcessLessonPayload,
    errors: &mut Vec<String>,
) -> Option<ProcessLesson> {
    let fields = [
        ("processLesson.decisionMoment", trimmed(&raw.decision_moment)),
        ("processLesson.assumptionMade", trimmed(&raw.assumption_made)),
        ("processLesson.humanReason", trimmed(&raw.human_reason)),
        ("processLesson.missedControl", trimmed(&raw.missed_control)),
        ("processLesson.nextRule", trimmed(&raw.next_rule)),
    ];

    let mut missing = false;
    for (name, value) in &fields {
        if value.is_empty() {
            errors.push(format!("{name} is required"));
            missing = true;
        }
    }
    if missing {
        return None;
    }

    let [decision_moment, assumption_made, human_reason, missed_control, next_rule] =
        fields.map(|(_, value)| value);
    Some(ProcessLesson {
        decision_moment,
        assumption_made,
        human_reason,
        missed_control,
        next_rule,
    })
}

/// Validate and normalize a listing query.
pub fn validate_list(payload: &ListPayload) -> Result<ListRequest, ValidationError> {
    let project_id = trimmed(&payload.project_id);
    let feature_scope = trimmed(&payload.feature_scope);
    let task_type_raw = trimmed(&payload.task_type).to_lowercase();
    let agent_id = trimmed(&payload.agent_id);
    let lesson_category_raw = trimmed(&payload.lesson_category).to_lowercase();
    let label = trimmed(&payload.label).to_lowercase();
    let search_query = trimmed(&payload.search_query);

    let mut errors = Vec::new();

    if project_id.is_empty() {
        errors.push("projectId is required".to_string());
    }

    let task_type = task_type_raw.parse::<TaskType>().ok();
    if !task_type_raw.is_empty() && task_type.is_none() {
        errors.push("Invalid taskType".to_string());
    }

    let lesson_category = lesson_category_raw.parse::<LessonCategory>().ok();
    if !lesson_category_raw.is_empty() && lesson_category.is_none() {
        errors.push("Invalid lessonCategory".to_string());
    }

    let limit = match validate_limit(payload.limit, LIST_LIMIT_DEFAULT, LIST_LIMIT_MAX) {
        Ok(limit) => limit,
        Err(message) => {
            errors.push(message);
            LIST_LIMIT_DEFAULT
        }
    };

    if !errors.is_empty() {
        return Err(ValidationError { errors });
    }

    Ok(ListRequest {
        filters: EntryFilters {
            project_id: scope_filter(&project_id),
            feature_scope: non_empty(feature_scope),
            task_type,
            agent_id: non_empty(agent_id),
            lesson_category,
            search_query: non_empty(search_query),
            limit,
        },
        label: non_empty(label),
    })
}

/// Validate and normalize a retrieval context.
pub fn validate_retrieval(payload: &RetrievalPayload) -> Result<RetrievalContext, ValidationError> {
    let project_id = trimmed(&payload.project_id);
    let feature_scope = trimmed(&payload.feature_scope);
    let task_type_raw = trimmed(&payload.task_type).to_lowercase();
    let priority_raw = trimmed(&payload.priority).to_uppercase();
    let search_query = trimmed(&payload.search_query);
    let labels: Vec<String> = normalize_refs(&payload.labels)
        .into_iter()
        .map(|l| l.to_lowercase())
        .collect();

    let mut errors = Vec::new();

    if project_id.is_empty() {
        errors.push("projectId is required".to_string());
    }

    let task_type = task_type_raw.parse::<TaskType>().ok();
    if !task_type_raw.is_empty() && task_type.is_none() {
        errors.push("Invalid taskType".to_string());
    }

    let priority = priority_raw.parse::<Priority>().ok();
    if !priority_raw.is_empty() && priority.is_none() {
        errors.push("priority must be one of P0|P1|P2|P3".to_string());
    }

    let limit = match validate_limit(payload.limit, RETRIEVAL_LIMIT_DEFAULT, RETRIEVAL_LIMIT_MAX) {
        Ok(limit) => limit,
        Err(message) => {
            errors.push(message);
            RETRIEVAL_LIMIT_DEFAULT
        }
    };

    if !errors.is_empty() {
        return Err(ValidationError { errors });
    }

    Ok(RetrievalContext {
        project_id,
        feature_scope,
        task_type,
        priority,
        labels: unique(labels),
        search_query,
        limit,
    })
}

/// Validate and normalize a workflow-completion payload.
///
/// The memory sub-payload inherits `projectId` and `agentId` from the outer
/// payload; its validation errors are reported with a `memory.` prefix. The
/// ticket id is folded into the entry's source refs.
pub fn validate_workflow_completion(
    payload: &WorkflowCompletionPayload,
) -> Result<WorkflowCompletion, ValidationError> {
    let project_id = trimmed(&payload.project_id);
    let ticket_id = trimmed(&payload.ticket_id);
    let from_status = trimmed(&payload.from_status);
    let to_status_raw = trimmed(&payload.to_status).to_lowercase();
    let agent_id = trimmed(&payload.agent_id);

    let mut errors = Vec::new();

    if project_id.is_empty() {
        errors.push("projectId is required".to_string());
    }
    if ticket_id.is_empty() {
        errors.push("ticketId is required".to_string());
    }
    if from_status.is_empty() {
        errors.push("fromStatus is required".to_string());
    }
    if to_status_raw.is_empty() {
        errors.push("toStatus is required".to_string());
    }
    if agent_id.is_empty() {
        errors.push("agentId is required".to_string());
    }

    let to_status = to_status_raw.parse::<WorkflowStatus>().ok();
    if !to_status_raw.is_empty() && to_status.is_none() {
        errors.push("toStatus must be one of in-review|done".to_string());
    }

    let entry = match &payload.memory {
        None => {
            errors.push("memory is required".to_string());
            None
        }
        Some(memory) => {
            let mut inherited = memory.clone();
            inherited.project_id = Some(project_id.clone());
            inherited.agent_id = Some(agent_id.clone());
            match validate_create(&inherited) {
                Ok(entry) => Some(entry),
                Err(nested) => {
                    errors.extend(nested.errors.into_iter().map(|e| format!("memory.{e}")));
                    None
                }
            }
        }
    };

    if !errors.is_empty() {
        return Err(ValidationError { errors });
    }

    let mut entry = entry.expect("validated above");
    entry.source_refs = unique(
        std::iter::once(ticket_id.clone())
            .chain(entry.source_refs)
            .collect(),
    );
    entry.labels = parse_label_refs(&entry.source_refs);

    Ok(WorkflowCompletion {
        project_id,
        ticket_id,
        from_status,
        to_status: to_status.expect("validated above"),
        agent_id,
        entry,
    })
}

/// Validate and normalize an audit-listing query.
pub fn validate_audit_query(payload: &AuditQueryPayload) -> Result<AuditFilters, ValidationError> {
    let project_id = trimmed(&payload.project_id);
    let ticket_id = trimmed(&payload.ticket_id);
    let agent_id = trimmed(&payload.agent_id);

    let mut errors = Vec::new();

    if project_id.is_empty() {
        errors.push("projectId is required".to_string());
    }

    let limit = match validate_limit(payload.limit, LIST_LIMIT_DEFAULT, LIST_LIMIT_MAX) {
        Ok(limit) => limit,
        Err(message) => {
            errors.push(message);
            LIST_LIMIT_DEFAULT
        }
    };

    if !errors.is_empty() {
        return Err(ValidationError { errors });
    }

    Ok(AuditFilters {
        project_id: scope_filter(&project_id),
        ticket_id: non_empty(ticket_id),
        agent_id: non_empty(agent_id),
        limit,
    })
}

/// Map the `all` sentinel to "no project filter".
fn scope_filter(project_id: &str) -> Option<String> {
    if project_id.eq_ignore_ascii_case(ALL_PROJECTS) {
        None
    } else {
        Some(project_id.to_string())
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn validate_limit(raw: Option<i64>, default: usize, max: usize) -> Result<usize, String> {
    match raw {
        None => Ok(default),
        Some(value) if value >= 1 && value as usize <= max => Ok(value as usize),
        Some(_) => Err(format!("limit must be an integer between 1 and {max}")),
    }
}
