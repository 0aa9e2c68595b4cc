use std::fs;

use gavel_trace::{normalize_events, parse_trace, EventType, TraceStore};
use tempfile::TempDir;

/// Helper: create a temp directory with trace JSONL files.
fn create_test_traces_dir() -> TempDir {
    let dir = TempDir::new().unwrap();

    // Two-agent run where the writer consumes the researcher's output
    let trace1 = r#"{"sequence_num":1,"event_type":"agent_start","agent_name":"researcher"}
{"sequence_num":2,"event_type":"llm_request","agent_name":"researcher","payload":{"messages":[{"role":"user","content":"find sources on topic X"}]}}
{"sequence_num":3,"event_type":"llm_response","agent_name":"researcher","payload":{"content":"Source A says things.","usage":{"prompt_tokens":10,"completion_tokens":5}}}
{"sequence_num":4,"event_type":"memory_store","agent_name":"user_99"}
{"sequence_num":5,"event_type":"agent_end","agent_name":"researcher"}
{"sequence_num":6,"event_type":"agent_start","agent_name":"writer"}
{"sequence_num":7,"event_type":"llm_request","agent_name":"writer","payload":{"messages":[{"role":"user","content":"Write a report. Source A says things."}]}}
{"sequence_num":8,"event_type":"llm_response","agent_name":"writer","payload":{"content":"Report: done."}}
{"sequence_num":9,"event_type":"agent_end","agent_name":"writer"}"#;
    fs::write(dir.path().join("run_001.jsonl"), trace1).unwrap();

    // Unterminated single-agent run
    let trace2 = r#"{"sequence_num":1,"event_type":"agent_start","agent_name":"solo"}
{"sequence_num":2,"event_type":"llm_response","agent_name":"solo","payload":{"content":"partial"}}"#;
    fs::write(dir.path().join("run_002.jsonl"), trace2).unwrap();

    fs::write(dir.path().join("notes.txt"), "not a trace").unwrap();

    dir
}

#[test]
fn test_parse_trace_file() {
    let dir = create_test_traces_dir();

    let trace = parse_trace(&dir.path().join("run_001.jsonl")).unwrap();

    assert_eq!(trace.id, "run_001");
    assert_eq!(trace.events.len(), 9);
    assert_eq!(trace.events[0].event_type, EventType::AgentStart);
    assert_eq!(trace.events[0].agent_name.as_deref(), Some("researcher"));
}

#[test]
fn test_store_list_ignores_non_jsonl() {
    let dir = create_test_traces_dir();
    let store = TraceStore::with_dir(dir.path().to_path_buf());

    let ids = store.list().unwrap();

    assert_eq!(ids, vec!["run_002".to_string(), "run_001".to_string()]);
}

#[test]
fn test_store_list_nonexistent_dir() {
    let store = TraceStore::with_dir("/nonexistent/path/traces".into());
    assert!(store.list().unwrap().is_empty());
}

#[test]
fn test_store_get_and_normalize() {
    let dir = create_test_traces_dir();
    let store = TraceStore::with_dir(dir.path().to_path_buf());

    let trace = store.get("run_001").unwrap();
    let records = normalize_events(&trace.events, &|_| false);

    assert_eq!(records.len(), 2);

    let researcher = &records["researcher"];
    assert_eq!(researcher.output_snippets, vec!["Source A says things."]);
    assert_eq!(researcher.prompt_tokens, 10);
    // The memory store tagged "user_99" at seq 4 lands inside researcher's span
    assert_eq!(researcher.memory_stores, 1);

    let writer = &records["writer"];
    assert_eq!(writer.first_seq, 6);
    assert!(writer.combined_input().contains("Source A says things."));
}

#[test]
fn test_normalize_open_span() {
    let dir = create_test_traces_dir();
    let store = TraceStore::with_dir(dir.path().to_path_buf());

    let trace = store.get("run_002").unwrap();
    let records = normalize_events(&trace.events, &|_| false);

    assert_eq!(records.len(), 1);
    assert_eq!(records["solo"].output_snippets, vec!["partial"]);
}
