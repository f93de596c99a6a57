use anyhow::Result;
use clap::Args;

use crate::config::RetrospectConfig;
use crate::memory::store;
use crate::memory::validate::{validate_audit_query, AuditQueryPayload};

#[derive(Debug, Args)]
pub struct AuditArgs {
    /// Project scope ("all" for cross-project); defaults from config
    #[arg(long)]
    pub project: Option<String>,
    #[arg(long)]
    pub ticket: Option<String>,
    #[arg(long)]
    pub agent: Option<String>,
    /// 1-200, defaults to 100
    #[arg(long)]
    pub limit: Option<i64>,
}

/// List workflow audit records, newest first.
pub fn audit(config: &RetrospectConfig, args: &AuditArgs) -> Result<()> {
    let filters = validate_audit_query(&AuditQueryPayload {
        project_id: super::resolve_project(config, &args.project),
        ticket_id: args.ticket.clone(),
        agent_id: args.agent.clone(),
        limit: args.limit,
    })?;

    let conn = crate::db::open_database(config.resolved_db_path())?;
    let audits = store::query_audits(&conn, &filters)?;

    super::print_json(&audits)
}
