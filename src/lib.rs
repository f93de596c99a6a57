//! Lessons-learned memory for software-delivery agents — persistent,
//! structured, contextually retrieved.
//!
//! Retrospect persists short structured lessons emitted by delivery agents
//! and ranks the most contextually relevant ones for injection into newly
//! generated artifacts (tickets, handoffs, reference prompts). Each lesson
//! carries a project scope, a feature scope, a task type, a category, and
//! provenance refs; retrieval scores candidates with a fixed additive
//! signal model and degrades to recency ordering when context is absent or
//! unconvincing.
//!
//! # Architecture
//!
//! - **Storage**: SQLite via `rusqlite`, append-mostly, with named lexical
//!   migrations
//! - **Validation**: pure payload normalization returning complete
//!   field-error lists
//! - **Retrieval**: additive multi-signal scoring (feature scope, task
//!   type, labels, free text, priority, recency) with an explicit fallback
//!   policy
//! - **Composition**: deterministic lesson blocks spliced into ticket,
//!   handoff, and reference-prompt text with a full memory trace
//!
//! # Modules
//!
//! - [`config`] — Configuration loading from TOML files and environment variables
//! - [`db`] — SQLite database initialization, schema, and migrations
//! - [`memory`] — Core engine: types, validation, store, retrieval, compose, insights

pub mod config;
pub mod db;
pub mod memory;
