//! Core memory type definitions.
//!
//! Defines [`TaskType`] and [`LessonCategory`] (the submission enums),
//! [`Priority`] and [`WorkflowStatus`] (retrieval/workflow enums),
//! [`MemoryEntry`] (a full lesson record), [`ProcessLesson`] (the optional
//! structured post-mortem), and [`WorkflowAudit`] (a ticket-transition
//! record tied to an entry).

use serde::{Deserialize, Serialize};

/// Reserved `projectId` sentinel meaning "across all projects".
pub const ALL_PROJECTS: &str = "all";

/// Prefix used inside `sourceRefs` to carry labels.
pub const LABEL_REF_PREFIX: &str = "label:";

/// The kind of work the lesson was learned during.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    Dev,
    Design,
    Qa,
    Pm,
    Other,
}

impl TaskType {
    /// SQL-compatible string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dev => "dev",
            Self::Design => "design",
            Self::Qa => "qa",
            Self::Pm => "pm",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dev" => Ok(Self::Dev),
            "design" => Ok(Self::Design),
            "qa" => Ok(Self::Qa),
            "pm" => Ok(Self::Pm),
            "other" => Ok(Self::Other),
            _ => Err(format!("unknown task type: {s}")),
        }
    }
}

/// What kind of lesson an entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LessonCategory {
    /// Something that worked and should be repeated.
    Success,
    /// A failure worth not repeating.
    Error,
    /// A recorded decision and its context.
    Decision,
    /// A hard constraint discovered along the way.
    Constraint,
}

impl LessonCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Decision => "decision",
            Self::Constraint => "constraint",
        }
    }
}

impl std::fmt::Display for LessonCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LessonCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(Self::Success),
            "error" => Ok(Self::Error),
            "decision" => Ok(Self::Decision),
            "constraint" => Ok(Self::Constraint),
            _ => Err(format!("unknown lesson category: {s}")),
        }
    }
}

/// Ticket priority supplied as a retrieval hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    P0,
    P1,
    P2,
    P3,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::P0 => "P0",
            Self::P1 => "P1",
            Self::P2 => "P2",
            Self::P3 => "P3",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "P0" => Ok(Self::P0),
            "P1" => Ok(Self::P1),
            "P2" => Ok(Self::P2),
            "P3" => Ok(Self::P3),
            _ => Err(format!("unknown priority: {s}")),
        }
    }
}

/// Terminal status of a ticket transition that triggers a memory push.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkflowStatus {
    InReview,
    Done,
}

impl WorkflowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InReview => "in-review",
            Self::Done => "done",
        }
    }
}

impl std::fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for WorkflowStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in-review" => Ok(Self::InReview),
            "done" => Ok(Self::Done),
            _ => Err(format!("unknown workflow status: {s}")),
        }
    }
}

/// Structured post-mortem attached to at most one entry.
///
/// All five fields are present together or the whole record is absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessLesson {
    /// The moment where the course of action was chosen.
    pub decision_moment: String,
    /// What was assumed to be true at that moment.
    pub assumption_made: String,
    /// The human factor behind the assumption.
    pub human_reason: String,
    /// The control or check that would have caught it.
    pub missed_control: String,
    /// The rule to apply next time.
    pub next_rule: String,
}

/// A recorded lesson, matching the `memory_entries` table schema.
///
/// Entries are immutable after creation; `labels` is always derived from the
/// `label:`-prefixed members of `source_refs`, never stored on its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryEntry {
    /// Opaque unique id (`mem-<uuid>` when generated).
    pub id: String,
    /// Owning project scope.
    pub project_id: String,
    /// Free-text sub-domain tag (e.g. "workflow", "retrieval").
    pub feature_scope: String,
    pub task_type: TaskType,
    /// Identifier of the producing agent or user.
    pub agent_id: String,
    pub lesson_category: LessonCategory,
    /// Free-text lesson body.
    pub content: String,
    /// Provenance tokens (ticket ids, commit hashes) plus `label:<name>` refs.
    pub source_refs: Vec<String>,
    /// Lower-cased label names derived from `source_refs`.
    pub labels: Vec<String>,
    /// ISO 8601 creation timestamp.
    pub created_at: String,
    /// Optional structured post-mortem.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process_lesson: Option<ProcessLesson>,
}

/// One record of a ticket status transition tied to a [`MemoryEntry`].
///
/// Never written without its entry — both land in a single transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowAudit {
    /// Opaque unique id (`audit-<uuid>` when generated).
    pub id: String,
    pub project_id: String,
    pub ticket_id: String,
    /// Status the ticket left. Free text, upstream boards vary.
    pub from_status: String,
    pub to_status: WorkflowStatus,
    pub agent_id: String,
    /// Entry created atomically with this audit.
    pub memory_entry_id: String,
    /// Snapshot of the transition and a memory summary.
    pub payload: serde_json::Value,
    pub created_at: String,
}

/// Extract lower-cased, de-duplicated label names from `label:` source refs.
pub fn parse_label_refs(source_refs: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut labels = Vec::new();
    for reference in source_refs {
        if let Some(name) = reference.strip_prefix(LABEL_REF_PREFIX) {
            let normalized = name.to_lowercase();
            if !normalized.is_empty() && seen.insert(normalized.clone()) {
                labels.push(normalized);
            }
        }
    }
    labels
}

/// Build the `label:<name>` source ref for a label, lower-casing the name.
pub fn label_ref(label: &str) -> String {
    format!("{LABEL_REF_PREFIX}{}", label.to_lowercase())
}
