pub mod add;
pub mod audit;
pub mod compose;
pub mod finish;
pub mod list;
pub mod retrieve;
pub mod stats;

use crate::config::RetrospectConfig;

/// Resolve the project scope: explicit flag, else the configured default.
pub fn resolve_project(config: &RetrospectConfig, project: &Option<String>) -> Option<String> {
    project
        .clone()
        .or_else(|| Some(config.storage.default_project.clone()))
}

/// Pretty-print a serializable value to stdout.
pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
