use anyhow::Result;
use clap::Args;

use crate::config::RetrospectConfig;
use crate::memory::store;
use crate::memory::validate::{
    validate_workflow_completion, CreatePayload, WorkflowCompletionPayload,
};

#[derive(Debug, Args)]
pub struct FinishArgs {
    /// Owning project scope
    #[arg(long)]
    pub project: String,
    /// Ticket being transitioned
    #[arg(long)]
    pub ticket: String,
    /// Status the ticket left (free text)
    #[arg(long)]
    pub from: String,
    /// One of in-review|done
    #[arg(long)]
    pub to: String,
    /// Agent performing the transition
    #[arg(long)]
    pub agent: String,

    // Lesson recorded alongside the transition.
    #[arg(long)]
    pub feature_scope: String,
    /// One of dev|design|qa|pm|other
    #[arg(long)]
    pub task_type: String,
    /// One of success|error|decision|constraint
    #[arg(long)]
    pub category: String,
    #[arg(long)]
    pub content: String,
    /// Provenance ref; repeatable. The ticket id is folded in automatically.
    #[arg(long = "source-ref")]
    pub source_refs: Vec<String>,
    /// Label name; repeatable
    #[arg(long = "label")]
    pub labels: Vec<String>,
}

/// Record a ticket transition and its lesson in one atomic write.
pub fn finish(config: &RetrospectConfig, args: &FinishArgs) -> Result<()> {
    let completion = validate_workflow_completion(&WorkflowCompletionPayload {
        project_id: Some(args.project.clone()),
        ticket_id: Some(args.ticket.clone()),
        from_status: Some(args.from.clone()),
        to_status: Some(args.to.clone()),
        agent_id: Some(args.agent.clone()),
        memory: Some(CreatePayload {
            feature_scope: Some(args.feature_scope.clone()),
            task_type: Some(args.task_type.clone()),
            lesson_category: Some(args.category.clone()),
            content: Some(args.content.clone()),
            source_refs: args.source_refs.clone(),
            labels: args.labels.clone(),
            ..Default::default()
        }),
    })?;

    let mut conn = crate::db::open_database(config.resolved_db_path())?;
    let finish = store::finish_workflow(&mut conn, &completion)?;

    super::print_json(&finish)
}
