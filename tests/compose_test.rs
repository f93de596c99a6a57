mod helpers;

use helpers::{insert_lesson, payload, test_db};
use retrospect::memory::compose::{
    compose_handoff, compose_reference_prompt, compose_ticket, ComposeError, HandoffComposePayload,
    ReferencePromptComposePayload, TicketComposePayload,
};
use retrospect::memory::validate::ProcessLessonPayload;

#[test]
fn ticket_composition_injects_relevant_memory() {
    let mut conn = test_db();

    let mut a = payload("mem-ticket-1", "workflow", "dev", "error");
    a.content = Some("Always keep memory source IDs explicit in workflow transitions.".to_string());
    a.source_refs = vec!["VAULT-2-004".to_string(), "commit:workflow123".to_string()];
    a.labels = vec!["workflow".to_string(), "api".to_string()];
    insert_lesson(&mut conn, &a);

    let mut b = payload("mem-ticket-2", "memory-ui", "design", "success");
    b.content = Some("UI memory details should show stable card proportions.".to_string());
    b.labels = vec!["ui".to_string()];
    insert_lesson(&mut conn, &b);

    let composition = compose_ticket(
        &conn,
        &TicketComposePayload {
            project_id: Some("vault-2".to_string()),
            title: Some("Implement memory injection on ticket draft".to_string()),
            feature_scope: Some("workflow".to_string()),
            task_type: Some("dev".to_string()),
            priority: Some("P0".to_string()),
            labels: vec!["workflow".to_string(), "api".to_string()],
            spec_markdown: Some("Base ticket specification".to_string()),
            limit: Some(3),
            ..Default::default()
        },
    )
    .unwrap();

    assert!(composition
        .ticket
        .spec_markdown
        .contains("Lessons to avoid repeating mistakes"));
    assert!(composition.ticket.spec_markdown.contains("mem-ticket-1"));
    assert!(composition.ticket.spec_markdown.starts_with("Base ticket specification"));
    assert!(composition
        .ticket
        .reference_prompt
        .contains("Lessons to avoid repeating mistakes"));
    assert!(composition
        .memory_trace
        .source_memory_ids
        .contains(&"mem-ticket-1".to_string()));
    assert!(!composition.memory_trace.fallback_used);
}

#[test]
fn ticket_composition_keeps_placeholder_without_contextual_memory() {
    let conn = test_db();

    let composition = compose_ticket(
        &conn,
        &TicketComposePayload {
            project_id: Some("vault-2".to_string()),
            title: Some("Draft without memory context".to_string()),
            feature_scope: Some("unknown-scope".to_string()),
            task_type: Some("dev".to_string()),
            priority: Some("P1".to_string()),
            ..Default::default()
        },
    )
    .unwrap();

    assert!(composition
        .ticket
        .spec_markdown
        .contains("Lessons to avoid repeating mistakes"));
    assert!(composition
        .ticket
        .spec_markdown
        .contains("No contextual memory matched"));
    assert!(composition.memory_trace.source_memory_ids.is_empty());
    assert!(composition.memory_trace.fallback_used);
}

#[test]
fn handoff_composition_renders_heading_and_trace() {
    let mut conn = test_db();

    let mut a = payload("mem-handoff-1", "handoff", "dev", "decision");
    a.content = Some("Capture unresolved blockers directly in handoff body.".to_string());
    a.labels = vec!["handoff".to_string()];
    insert_lesson(&mut conn, &a);

    let composition = compose_handoff(
        &conn,
        &HandoffComposePayload {
            project_id: Some("vault-2".to_string()),
            ticket_id: Some("VAULT-2-006".to_string()),
            summary: Some("Handoff for memory injection work".to_string()),
            feature_scope: Some("handoff".to_string()),
            task_type: Some("dev".to_string()),
            labels: vec!["handoff".to_string()],
            ..Default::default()
        },
    )
    .unwrap();

    assert!(composition.handoff_markdown.starts_with("# Handoff - VAULT-2-006"));
    assert!(composition
        .handoff_markdown
        .contains("Lessons to avoid repeating mistakes"));
    assert!(composition.handoff_markdown.contains("mem-handoff-1"));
    assert!(composition
        .memory_trace
        .source_memory_ids
        .contains(&"mem-handoff-1".to_string()));
}

#[test]
fn reference_prompt_traces_source_memory_ids() {
    let mut conn = test_db();

    let mut a = payload("mem-prompt-1", "prompting", "dev", "constraint");
    a.content = Some("Reference prompts must include explicit source IDs.".to_string());
    a.source_refs = vec!["VAULT-2-006".to_string(), "commit:prompt001".to_string()];
    a.labels = vec!["prompting".to_string()];
    insert_lesson(&mut conn, &a);

    let composition = compose_reference_prompt(
        &conn,
        &ReferencePromptComposePayload {
            project_id: Some("vault-2".to_string()),
            ticket_id: Some("VAULT-2-006".to_string()),
            title: Some("Inject memory into reference prompt".to_string()),
            feature_scope: Some("prompting".to_string()),
            task_type: Some("dev".to_string()),
            labels: vec!["prompting".to_string()],
            ..Default::default()
        },
    )
    .unwrap();

    assert!(composition
        .reference_prompt
        .contains("Lessons to avoid repeating mistakes"));
    assert!(composition.reference_prompt.contains("Memory source IDs:"));
    assert!(composition
        .memory_trace
        .source_memory_ids
        .contains(&"mem-prompt-1".to_string()));
}

#[test]
fn process_lesson_section_appears_iff_present() {
    let mut conn = test_db();

    let mut plain = payload("mem-plain", "workflow", "dev", "error");
    plain.created_at = Some("2026-02-20T09:00:00+00:00".to_string());
    insert_lesson(&mut conn, &plain);

    let without = compose_ticket(
        &conn,
        &TicketComposePayload {
            project_id: Some("vault-2".to_string()),
            title: Some("No post-mortems yet".to_string()),
            feature_scope: Some("workflow".to_string()),
            task_type: Some("dev".to_string()),
            ..Default::default()
        },
    )
    .unwrap();
    assert!(!without.ticket.spec_markdown.contains("Human/Process Lessons"));

    let mut with_lesson = payload("mem-postmortem", "workflow", "dev", "error");
    with_lesson.process_lesson = Some(ProcessLessonPayload {
        decision_moment: Some("Added fallback ranking".to_string()),
        assumption_made: Some("Query always had context".to_string()),
        human_reason: Some("Rushed for deadline".to_string()),
        missed_control: Some("Missing low-context tests".to_string()),
        next_rule: Some("Always add fallback tests".to_string()),
    });
    insert_lesson(&mut conn, &with_lesson);

    let with = compose_ticket(
        &conn,
        &TicketComposePayload {
            project_id: Some("vault-2".to_string()),
            title: Some("Post-mortem present".to_string()),
            feature_scope: Some("workflow".to_string()),
            task_type: Some("dev".to_string()),
            ..Default::default()
        },
    )
    .unwrap();
    assert!(with.ticket.spec_markdown.contains("Human/Process Lessons"));
    assert!(with
        .ticket
        .spec_markdown
        .contains("Next rule: Always add fallback tests"));
}

#[test]
fn missing_required_fields_surface_every_violation() {
    let conn = test_db();

    let err = compose_handoff(&conn, &HandoffComposePayload::default()).unwrap_err();
    let ComposeError::Validation(validation) = err else {
        panic!("expected a validation error");
    };
    assert!(validation.errors.contains(&"ticketId is required".to_string()));
    assert!(validation.errors.contains(&"summary is required".to_string()));
    assert!(validation.errors.contains(&"projectId is required".to_string()));
}
