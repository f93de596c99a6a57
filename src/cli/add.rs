use anyhow::Result;
use clap::Args;

use crate::config::RetrospectConfig;
use crate::memory::store;
use crate::memory::validate::{validate_create, CreatePayload, ProcessLessonPayload};

#[derive(Debug, Args)]
pub struct AddArgs {
    /// Owning project scope
    #[arg(long)]
    pub project: String,
    /// Feature area the lesson belongs to (e.g. "workflow")
    #[arg(long)]
    pub feature_scope: String,
    /// One of dev|design|qa|pm|other
    #[arg(long)]
    pub task_type: String,
    /// Producing agent or user id
    #[arg(long)]
    pub agent: String,
    /// One of success|error|decision|constraint
    #[arg(long)]
    pub category: String,
    /// The lesson body
    #[arg(long)]
    pub content: String,
    /// Provenance ref (ticket id, commit hash); repeatable
    #[arg(long = "source-ref")]
    pub source_refs: Vec<String>,
    /// Label name; repeatable
    #[arg(long = "label")]
    pub labels: Vec<String>,
    /// Explicit entry id (generated when omitted)
    #[arg(long)]
    pub id: Option<String>,

    // Optional structured post-mortem; all five fields go together.
    #[arg(long)]
    pub decision_moment: Option<String>,
    #[arg(long)]
    pub assumption_made: Option<String>,
    #[arg(long)]
    pub human_reason: Option<String>,
    #[arg(long)]
    pub missed_control: Option<String>,
    #[arg(long)]
    pub next_rule: Option<String>,
}

/// Validate, persist, and echo a new lesson.
pub fn add(config: &RetrospectConfig, args: &AddArgs) -> Result<()> {
    let process_lesson = if args.decision_moment.is_some()
        || args.assumption_made.is_some()
        || args.human_reason.is_some()
        || args.missed_control.is_some()
        || args.next_rule.is_some()
    {
        Some(ProcessLessonPayload {
            decision_moment: args.decision_moment.clone(),
            assumption_made: args.assumption_made.clone(),
            human_reason: args.human_reason.clone(),
            missed_control: args.missed_control.clone(),
            next_rule: args.next_rule.clone(),
        })
    } else {
        None
    };

    let entry = validate_create(&CreatePayload {
        id: args.id.clone(),
        project_id: Some(args.project.clone()),
        feature_scope: Some(args.feature_scope.clone()),
        task_type: Some(args.task_type.clone()),
        agent_id: Some(args.agent.clone()),
        lesson_category: Some(args.category.clone()),
        content: Some(args.content.clone()),
        source_refs: args.source_refs.clone(),
        labels: args.labels.clone(),
        created_at: None,
        process_lesson,
    })?;

    let mut conn = crate::db::open_database(config.resolved_db_path())?;
    store::insert_entry(&mut conn, &entry)?;

    super::print_json(&entry)
}
