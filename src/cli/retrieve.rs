use anyhow::Result;
use clap::Args;

use crate::config::RetrospectConfig;
use crate::memory::retrieval;
use crate::memory::validate::{validate_retrieval, RetrievalPayload};

#[derive(Debug, Args)]
pub struct RetrieveArgs {
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
    /// 1-50, defaults to 10
    #[arg(long)]
    pub limit: Option<i64>,
}

/// Rank lessons for the given context and print the scored result.
pub fn retrieve(config: &RetrospectConfig, args: &RetrieveArgs) -> Result<()> {
    let ctx = validate_retrieval(&RetrievalPayload {
        project_id: super::resolve_project(config, &args.project),
        feature_scope: args.feature_scope.clone(),
        task_type: args.task_type.clone(),
        priority: args.priority.clone(),
        labels: args.labels.clone(),
        search_query: args.query.clone(),
        limit: args.limit.or(Some(config.retrieval.default_limit as i64)),
    })?;

    let conn = crate::db::open_database(config.resolved_db_path())?;
    let result = retrieval::retrieve(&conn, &ctx)?;

    super::print_json(&result)
}
