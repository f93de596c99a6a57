use anyhow::Result;
use clap::{Args, Subcommand};

use crate::config::RetrospectConfig;
use crate::memory::compose::{
    compose_handoff, compose_reference_prompt, compose_ticket, HandoffComposePayload,
    ReferencePromptComposePayload, TicketComposePayload,
};

/// Shared retrieval hints for all composition targets.
#[derive(Debug, Args)]
pub struct ContextArgs {
    /// Project scope ("all" for cross-project); defaults from config
    #[arg(long)]
    pub project: Option<String>,
    #[arg(long)]
    pub feature_scope: Option<String>,
    #[arg(long)]
    pub task_type: Option<String>,
    /// One of P0|P1|P2|P3
    #[arg(long)]
    pub priority: Option<String>,
    /// Label hint; repeatable
    #[arg(long = "label")]
    pub labels: Vec<String>,
    /// Free-text hint
    #[arg(long)]
    pub query: Option<String>,
    /// 1-50, defaults to 5 for composition
    #[arg(long)]
    pub limit: Option<i64>,
}

#[derive(Debug, Subcommand)]
pub enum ComposeTarget {
    /// Compose a ticket spec and reference prompt
    Ticket {
        #[arg(long)]
        title: String,
        /// Base spec markdown to extend
        #[arg(long)]
        spec: Option<String>,
        #[command(flatten)]
        context: ContextArgs,
    },
    /// Compose a handoff note
    Handoff {
        #[arg(long)]
        ticket: String,
        #[arg(long)]
        summary: String,
        #[command(flatten)]
        context: ContextArgs,
    },
    /// Compose a standalone reference prompt
    ReferencePrompt {
        #[arg(long)]
        ticket: String,
        #[arg(long)]
        title: String,
        #[command(flatten)]
        context: ContextArgs,
    },
}

/// Compose the requested artifact and print it with its memory trace.
pub fn compose(config: &RetrospectConfig, target: &ComposeTarget) -> Result<()> {
    let conn = crate::db::open_database(config.resolved_db_path())?;

    match target {
        ComposeTarget::Ticket {
            title,
            spec,
            context,
        } => {
            let composition = compose_ticket(
                &conn,
                &TicketComposePayload {
                    project_id: super::resolve_project(config, &context.project),
                    title: Some(title.clone()),
                    feature_scope: context.feature_scope.clone(),
                    task_type: context.task_type.clone(),
                    priority: context.priority.clone(),
                    labels: context.labels.clone(),
                    search_query: context.query.clone(),
                    spec_markdown: spec.clone(),
                    limit: context.limit,
                },
            )?;
            super::print_json(&composition)
        }
        ComposeTarget::Handoff {
            ticket,
            summary,
            context,
        } => {
            let composition = compose_handoff(
                &conn,
                &HandoffComposePayload {
                    project_id: super::resolve_project(config, &context.project),
                    ticket_id: Some(ticket.clone()),
                    summary: Some(summary.clone()),
                    feature_scope: context.feature_scope.clone(),
                    task_type: context.task_type.clone(),
                    priority: context.priority.clone(),
                    labels: context.labels.clone(),
                    search_query: context.query.clone(),
                    limit: context.limit,
                },
            )?;
            super::print_json(&composition)
        }
        ComposeTarget::ReferencePrompt {
            ticket,
            title,
            context,
        } => {
            let composition = compose_reference_prompt(
                &conn,
                &ReferencePromptComposePayload {
                    project_id: super::resolve_project(config, &context.project),
                    ticket_id: Some(ticket.clone()),
                    title: Some(title.clone()),
                    feature_scope: context.feature_scope.clone(),
                    task_type: context.task_type.clone(),
                    priority: context.priority.clone(),
                    labels: context.labels.clone(),
                    search_query: context.query.clone(),
                    limit: context.limit,
                },
            )?;
            super::print_json(&composition)
        }
    }
}
