use anyhow::Result;
use clap::Args;

use crate::config::RetrospectConfig;
use crate::memory::store;
use crate::memory::validate::{validate_list, ListPayload};

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Project scope ("all" for cross-project); defaults from config
    #[arg(long)]
    pub project: Option<String>,
    #[arg(long)]
    pub feature_scope: Option<String>,
    #[arg(long)]
    pub task_type: Option<String>,
    #[arg(long)]
    pub agent: Option<String>,
    #[arg(long)]
    pub category: Option<String>,
    /// Keep only entries carrying this label
    #[arg(long)]
    pub label: Option<String>,
    /// Substring match over content and process-lesson fields
    #[arg(long)]
    pub query: Option<String>,
    /// 1-200, defaults to 100
    #[arg(long)]
    pub limit: Option<i64>,
}

/// List stored lessons, newest first.
pub fn list(config: &RetrospectConfig, args: &ListArgs) -> Result<()> {
    let request = validate_list(&ListPayload {
        project_id: super::resolve_project(config, &args.project),
        feature_scope: args.feature_scope.clone(),
        task_type: args.task_type.clone(),
        agent_id: args.agent.clone(),
        lesson_category: args.category.clone(),
        label: args.label.clone(),
        search_query: args.query.clone(),
        limit: args.limit,
    })?;

    let conn = crate::db::open_database(config.resolved_db_path())?;
    let entries = request.filter_labels(store::query_entries(&conn, &request.filters)?);

    super::print_json(&entries)
}
