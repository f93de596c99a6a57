use anyhow::Result;
use clap::Args;

use crate::config::RetrospectConfig;
use crate::memory::insights;
use crate::memory::validate::{validate_list, ListPayload};

#[derive(Debug, Args)]
pub struct StatsArgs {
    /// Project scope ("all" for cross-project); defaults from config
    #[arg(long)]
    pub project: Option<String>,
    #[arg(long)]
    pub feature_scope: Option<String>,
    #[arg(long)]
    pub task_type: Option<String>,
}

/// Aggregate and print project insights.
pub fn stats(config: &RetrospectConfig, args: &StatsArgs) -> Result<()> {
    let request = validate_list(&ListPayload {
        project_id: super::resolve_project(config, &args.project),
        feature_scope: args.feature_scope.clone(),
        task_type: args.task_type.clone(),
        ..Default::default()
    })?;

    let conn = crate::db::open_database(config.resolved_db_path())?;
    let insights = insights::project_insights(&conn, &request.filters)?;

    super::print_json(&insights)
}
