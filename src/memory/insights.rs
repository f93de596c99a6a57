//! Project insight aggregation over stored lessons.
//!
//! Groups entries by lesson category and a normalized content fingerprint so
//! repeated lessons surface as one group with a count, then derives the top
//! lessons, recurring errors, and frequent decisions for a scope.

use rusqlite::Connection;
use serde::Serialize;
use std::collections::HashMap;

use crate::memory::store::{self, EntryFilters, StoreError};
use crate::memory::types::{LessonCategory, MemoryEntry};

/// How many top lesson groups to surface.
const TOP_LESSONS_LIMIT: usize = 8;

/// One group of near-identical lessons.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonGroup {
    /// Content of the most recent entry in the group.
    pub summary: String,
    pub category: LessonCategory,
    pub count: usize,
    pub latest_at: String,
    pub source_entry_ids: Vec<String>,
    pub source_refs: Vec<String>,
}

/// Aggregated view of a project's memory.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInsights {
    pub total_source_entries: usize,
    pub top_lessons: Vec<LessonGroup>,
    pub recurring_errors: Vec<LessonGroup>,
    pub frequent_decisions: Vec<LessonGroup>,
}

/// Query a scope and aggregate its insights.
pub fn project_insights(
    conn: &Connection,
    filters: &EntryFilters,
) -> Result<ProjectInsights, StoreError> {
    let entries = store::query_entries(conn, filters)?;
    Ok(aggregate_insights(&entries))
}

/// Pure aggregation over an entry set.
pub fn aggregate_insights(entries: &[MemoryEntry]) -> ProjectInsights {
    let mut grouped: HashMap<String, LessonGroup> = HashMap::new();

    for entry in entries {
        let fingerprint = content_fingerprint(&entry.content);
        if fingerprint.is_empty() {
            continue;
        }
        let key = format!("{}::{fingerprint}", entry.lesson_category);

        let group = grouped.entry(key).or_insert_with(|| LessonGroup {
            summary: entry.content.clone(),
            category: entry.lesson_category,
            count: 0,
            latest_at: entry.created_at.clone(),
            source_entry_ids: Vec::new(),
            source_refs: Vec::new(),
        });
        group.count += 1;
        if !group.source_entry_ids.contains(&entry.id) {
            group.source_entry_ids.push(entry.id.clone());
        }
        for reference in &entry.source_refs {
            if !reference.trim().is_empty() && !group.source_refs.contains(reference) {
                group.source_refs.push(reference.clone());
            }
        }
        // The freshest entry names the group.
        if parse_timestamp(&entry.created_at) >= parse_timestamp(&group.latest_at) {
            group.latest_at = entry.created_at.clone();
            group.summary = entry.content.clone();
        }
    }

    let mut all_groups: Vec<LessonGroup> = grouped.into_values().collect();
    all_groups.sort_by(compare_groups);

    let recurring_errors: Vec<LessonGroup> = all_groups
        .iter()
        .filter(|g| g.category == LessonCategory::Error && g.count >= 2)
        .cloned()
        .collect();
    let frequent_decisions: Vec<LessonGroup> = all_groups
        .iter()
        .filter(|g| g.category == LessonCategory::Decision)
        .cloned()
        .collect();

    let mut top_lessons = all_groups;
    top_lessons.truncate(TOP_LESSONS_LIMIT);

    ProjectInsights {
        total_source_entries: entries.len(),
        top_lessons,
        recurring_errors,
        frequent_decisions,
    }
}

/// Lower-cased, punctuation-stripped, whitespace-collapsed content key.
fn content_fingerprint(content: &str) -> String {
    content
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse_timestamp(raw: &str) -> i64 {
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.timestamp())
        .unwrap_or(0)
}

/// Order groups by count, then freshness, then summary for stability.
fn compare_groups(a: &LessonGroup, b: &LessonGroup) -> std::cmp::Ordering {
    b.count
        .cmp(&a.count)
        .then_with(|| parse_timestamp(&b.latest_at).cmp(&parse_timestamp(&a.latest_at)))
        .then_with(|| a.summary.cmp(&b.summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::types::TaskType;

    fn entry(id: &str, category: LessonCategory, content: &str, created_at: &str) -> MemoryEntry {
        MemoryEntry {
            id: id.to_string(),
            project_id: "vault-2".to_string(),
            feature_scope: "workflow".to_string(),
            task_type: TaskType::Dev,
            agent_id: "codex-dev".to_string(),
            lesson_category: category,
            content: content.to_string(),
            source_refs: vec![format!("ref-{id}")],
            labels: Vec::new(),
            created_at: created_at.to_string(),
            process_lesson: None,
        }
    }

    #[test]
    fn groups_by_category_and_fingerprint() {
        let entries = vec![
            entry(
                "mem-1",
                LessonCategory::Error,
                "Missing project filter!",
                "2026-02-20T09:00:00+00:00",
            ),
            entry(
                "mem-2",
                LessonCategory::Error,
                "missing   project filter",
                "2026-02-20T10:00:00+00:00",
            ),
            entry(
                "mem-3",
                LessonCategory::Decision,
                "Missing project filter",
                "2026-02-20T11:00:00+00:00",
            ),
        ];

        let insights = aggregate_insights(&entries);
        assert_eq!(insights.total_source_entries, 3);
        // Same fingerprint, different categories: two groups.
        assert_eq!(insights.top_lessons.len(), 2);

        let error_group = insights
            .top_lessons
            .iter()
            .find(|g| g.category == LessonCategory::Error)
            .unwrap();
        assert_eq!(error_group.count, 2);
        // Freshest entry names the group.
        assert_eq!(error_group.summary, "missing   project filter");
        assert_eq!(error_group.source_entry_ids, vec!["mem-1", "mem-2"]);
    }

    #[test]
    fn recurring_errors_require_two_occurrences() {
        let entries = vec![
            entry("mem-1", LessonCategory::Error, "One-off failure", "2026-02-20T09:00:00+00:00"),
            entry("mem-2", LessonCategory::Error, "Repeated failure", "2026-02-20T10:00:00+00:00"),
            entry("mem-3", LessonCategory::Error, "Repeated failure", "2026-02-20T11:00:00+00:00"),
        ];

        let insights = aggregate_insights(&entries);
        assert_eq!(insights.recurring_errors.len(), 1);
        assert_eq!(insights.recurring_errors[0].summary, "Repeated failure");
    }

    #[test]
    fn frequent_decisions_include_singletons() {
        let entries = vec![entry(
            "mem-1",
            LessonCategory::Decision,
            "Reuse a shared retrieval engine",
            "2026-02-20T09:00:00+00:00",
        )];

        let insights = aggregate_insights(&entries);
        assert_eq!(insights.frequent_decisions.len(), 1);
    }

    #[test]
    fn groups_order_by_count_then_freshness() {
        let entries = vec![
            entry("mem-1", LessonCategory::Success, "Rare lesson", "2026-02-20T12:00:00+00:00"),
            entry("mem-2", LessonCategory::Success, "Common lesson", "2026-02-20T09:00:00+00:00"),
            entry("mem-3", LessonCategory::Success, "Common lesson", "2026-02-20T10:00:00+00:00"),
        ];

        let insights = aggregate_insights(&entries);
        assert_eq!(insights.top_lessons[0].summary, "Common lesson");
        assert_eq!(insights.top_lessons[0].count, 2);
    }

    #[test]
    fn blank_content_is_skipped() {
        let entries = vec![entry("mem-1", LessonCategory::Error, "!!!", "2026-02-20T09:00:00+00:00")];
        let insights = aggregate_insights(&entries);
        assert_eq!(insights.total_source_entries, 1);
        assert!(insights.top_lessons.is_empty());
    }
}
