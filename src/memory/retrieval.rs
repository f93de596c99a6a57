//! Contextual retrieval ranking engine.
//!
//! Given a retrieval context and the candidate entries for a project scope,
//! scores every candidate with a fixed additive signal model and returns an
//! ordered, capped result with per-entry score justifications. Low-signal or
//! unconvincing contexts degrade to recency ordering instead of surfacing an
//! arbitrary low-confidence best-scorer.
//!
//! The weights and the fallback threshold are empirically chosen constants
//! preserved for behavioral compatibility — do not re-derive them.

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::Serialize;

use crate::memory::store::{self, EntryFilters, StoreError, CANDIDATE_LIMIT};
use crate::memory::types::{LessonCategory, MemoryEntry, Priority, TaskType, ALL_PROJECTS};

const BASE_SCORE: i64 = 5;
const FEATURE_SCOPE_EXACT_BOOST: i64 = 44;
const FEATURE_SCOPE_PARTIAL_BOOST: i64 = 15;
const TASK_TYPE_BOOST: i64 = 26;
const LABEL_MATCH_BOOST: i64 = 18;
const SEARCH_HIT_BOOST: i64 = 6;
const SEARCH_BOOST_CAP: i64 = 18;
const SEARCH_MIN_TERM_LEN: usize = 3;
const RECENT_AGE_DAYS: f64 = 3.0;

/// Top scores below this are treated as unconvincing and fall back to
/// recency ordering.
pub const LOW_CONFIDENCE_THRESHOLD: i64 = 20;

/// Caller-supplied retrieval hints. Empty fields are simply absent signals.
#[derive(Debug, Clone, Default)]
pub struct RetrievalContext {
    /// Project scope, or the `all` sentinel for cross-project retrieval.
    pub project_id: String,
    /// Empty string means unset.
    pub feature_scope: String,
    pub task_type: Option<TaskType>,
    pub priority: Option<Priority>,
    /// Lower-cased label names.
    pub labels: Vec<String>,
    /// Empty string means unset.
    pub search_query: String,
    pub limit: usize,
}

/// One ranked candidate with its score and the signals that produced it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredEntry {
    #[serde(flatten)]
    pub entry: MemoryEntry,
    pub score: i64,
    pub reasons: Vec<String>,
}

/// Ordered, capped retrieval output plus ranking metadata.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalResult {
    pub entries: Vec<ScoredEntry>,
    pub fallback_used: bool,
    pub total_candidates: usize,
    pub context_signals: usize,
}

/// Load candidates for the context's scope and rank them.
pub fn retrieve(conn: &Connection, ctx: &RetrievalContext) -> Result<RetrievalResult, StoreError> {
    let filters = EntryFilters {
        project_id: if ctx.project_id.eq_ignore_ascii_case(ALL_PROJECTS) {
            None
        } else {
            Some(ctx.project_id.clone())
        },
        limit: CANDIDATE_LIMIT,
        ..Default::default()
    };
    let candidates = store::query_entries(conn, &filters)?;

    let result = rank(candidates, ctx, Utc::now());
    tracing::debug!(
        project = %ctx.project_id,
        candidates = result.total_candidates,
        signals = result.context_signals,
        fallback = result.fallback_used,
        "retrieval ranked"
    );
    Ok(result)
}

/// Number of non-empty context dimensions (0–5).
pub fn context_signals(ctx: &RetrievalContext) -> usize {
    [
        !ctx.feature_scope.is_empty(),
        ctx.task_type.is_some(),
        ctx.priority.is_some(),
        !ctx.search_query.is_empty(),
        !ctx.labels.is_empty(),
    ]
    .iter()
    .filter(|present| **present)
    .count()
}

/// Score, order, and cap a candidate set. Pure — `now` is injected so the
/// recency signal is deterministic under test.
pub fn rank(
    candidates: Vec<MemoryEntry>,
    ctx: &RetrievalContext,
    now: DateTime<Utc>,
) -> RetrievalResult {
    let signals = context_signals(ctx);
    let total_candidates = candidates.len();

    if candidates.is_empty() {
        return RetrievalResult {
            entries: Vec::new(),
            fallback_used: true,
            total_candidates: 0,
            context_signals: signals,
        };
    }

    let mut scored: Vec<ScoredEntry> = candidates
        .into_iter()
        .map(|entry| {
            let (score, reasons) = score_entry(&entry, ctx, now);
            ScoredEntry {
                entry,
                score,
                reasons,
            }
        })
        .collect();

    let fallback_used = if signals == 0 {
        // No context at all — scores are noise, recent memory is the signal.
        sort_by_recency(&mut scored);
        tag_all(&mut scored, "fallback:latest-project-memory");
        true
    } else {
        sort_by_score(&mut scored);
        let top_score = scored.first().map(|s| s.score).unwrap_or(0);
        if top_score < LOW_CONFIDENCE_THRESHOLD {
            sort_by_recency(&mut scored);
            tag_all(&mut scored, "fallback:low-context-match");
            true
        } else {
            false
        }
    };

    scored.truncate(ctx.limit.max(1));

    RetrievalResult {
        entries: scored,
        fallback_used,
        total_candidates,
        context_signals: signals,
    }
}

/// Additive signal scoring for one candidate. No normalization.
fn score_entry(
    entry: &MemoryEntry,
    ctx: &RetrievalContext,
    now: DateTime<Utc>,
) -> (i64, Vec<String>) {
    let mut score = BASE_SCORE;
    let mut reasons = Vec::new();

    if !ctx.feature_scope.is_empty() {
        let wanted = ctx.feature_scope.to_lowercase();
        let have = entry.feature_scope.to_lowercase();
        if have == wanted {
            score += FEATURE_SCOPE_EXACT_BOOST;
            reasons.push("feature-scope:exact".to_string());
        } else if have.contains(&wanted) || wanted.contains(&have) {
            score += FEATURE_SCOPE_PARTIAL_BOOST;
            reasons.push("feature-scope:partial".to_string());
        }
    }

    if let Some(task_type) = ctx.task_type {
        if task_type == entry.task_type {
            score += TASK_TYPE_BOOST;
            reasons.push("task-type:exact".to_string());
        }
    }

    for label in &ctx.labels {
        if entry.labels.contains(label) {
            score += LABEL_MATCH_BOOST;
            reasons.push(format!("labels:matched({label})"));
        }
    }

    if !ctx.search_query.is_empty() {
        let content = entry.content.to_lowercase();
        let matched: Vec<&str> = ctx
            .search_query
            .split_whitespace()
            .filter(|term| term.chars().count() >= SEARCH_MIN_TERM_LEN)
            .filter(|term| content.contains(&term.to_lowercase()))
            .collect();
        if !matched.is_empty() {
            score += SEARCH_BOOST_CAP.min(matched.len() as i64 * SEARCH_HIT_BOOST);
            reasons.push(format!("search:matched({})", matched.join(",")));
        }
    }

    if let Some(priority) = ctx.priority {
        score += priority_boost(priority, entry.lesson_category);
        reasons.push(format!("priority:{priority}->{}", entry.lesson_category));
    }

    let age_days = age_in_days(&entry.created_at, now);
    score += recency_boost(age_days);
    if age_days <= RECENT_AGE_DAYS {
        reasons.push("recency:recent".to_string());
    }

    (score, reasons)
}

/// Fixed priority × lesson-category boost table. Errors and constraints are
/// weighted highest for urgent work, successes for the long tail.
fn priority_boost(priority: Priority, category: LessonCategory) -> i64 {
    use LessonCategory::{Constraint, Decision, Error, Success};
    use Priority::{P0, P1, P2, P3};

    match (priority, category) {
        (P0, Error) => 22,
        (P0, Constraint) => 20,
        (P0, Decision) => 14,
        (P0, Success) => 9,
        (P1, Error) => 20,
        (P1, Constraint) => 18,
        (P1, Decision) => 14,
        (P1, Success) => 10,
        (P2, Error) => 12,
        (P2, Constraint) => 12,
        (P2, Decision) => 14,
        (P2, Success) => 16,
        (P3, Error) => 8,
        (P3, Constraint) => 9,
        (P3, Decision) => 12,
        (P3, Success) => 18,
    }
}

/// Always-on recency contribution: 10 for brand-new entries, decaying to a
/// floor of 1 at nine days and beyond.
fn recency_boost(age_days: f64) -> i64 {
    ((10.0 - age_days.min(9.0)).round() as i64).max(1)
}

/// Age of an entry in fractional days, clamped at zero. Unparseable
/// timestamps degrade to the floor boost instead of failing retrieval.
fn age_in_days(created_at: &str, now: DateTime<Utc>) -> f64 {
    match DateTime::parse_from_rfc3339(created_at) {
        Ok(created) => {
            let seconds = (now - created.with_timezone(&Utc)).num_seconds();
            (seconds.max(0) as f64) / 86_400.0
        }
        Err(_) => 9.0,
    }
}

fn sort_by_score(scored: &mut [ScoredEntry]) {
    scored.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| b.entry.created_at.cmp(&a.entry.created_at))
    });
}

fn sort_by_recency(scored: &mut [ScoredEntry]) {
    scored.sort_by(|a, b| b.entry.created_at.cmp(&a.entry.created_at));
}

fn tag_all(scored: &mut [ScoredEntry], tag: &str) {
    for entry in scored {
        entry.reasons.push(tag.to_string());
    }
}
