use std::collections::BTreeMap;

use serde_json::Value;
use tracing::debug;

use crate::spans::SpanIndex;
use crate::types::{AgentExecutionRecord, EventType, ToolCallRecord, TraceEvent};

/// Fold an ordered event stream into per-agent execution records.
///
/// Only agents that emitted an `AgentStart` become records. Events tagged
/// with a name that never started a span (memory subsystem user ids and
/// similar upstream relics) cannot fabricate a phantom agent: mode
/// operations are re-attributed to the nearest span, everything else tagged
/// with an unknown name is dropped.
///
/// `lossy` classifies tool results as lossily truncated; the sizing policy
/// supplies it so this crate stays free of scoring concerns.
pub fn normalize_events(
    events: &[TraceEvent],
    lossy: &dyn Fn(&str) -> bool,
) -> BTreeMap<String, AgentExecutionRecord> {
    let span_index = SpanIndex::build(events);

    let mut records: BTreeMap<String, AgentExecutionRecord> = BTreeMap::new();
    for event in events {
        if event.event_type == EventType::AgentStart {
            if let Some(name) = event.agent_name.as_deref() {
                records
                    .entry(name.to_string())
                    .or_insert_with(|| AgentExecutionRecord::new(name.to_string(), event.sequence_num));
            }
        }
    }

    // Tool starts awaiting their end, keyed by agent. Ends pair with the
    // first pending start of the same tool name.
    let mut pending_tools: BTreeMap<String, Vec<(String, Value)>> = BTreeMap::new();

    for event in events {
        if event.event_type.is_mode_operation() {
            accumulate_mode_operation(event, &span_index, &mut records);
            continue;
        }

        let Some(record) = event
            .agent_name
            .as_deref()
            .and_then(|name| records.get_mut(name))
        else {
            if event.agent_name.is_some() {
                debug!(
                    seq = event.sequence_num,
                    "Dropping event tagged with a name that never started an agent"
                );
            }
            continue;
        };

        match event.event_type {
            EventType::LlmRequest => {
                if let Some(messages) = event.payload.get("messages").and_then(Value::as_array) {
                    let last_user = messages
                        .iter()
                        .rev()
                        .find(|m| m.get("role").and_then(Value::as_str) == Some("user"))
                        .and_then(|m| m.get("content").and_then(Value::as_str));
                    if let Some(content) = last_user {
                        record.input_snippets.push(content.to_string());
                    }
                    record
                        .context_snippets
                        .push(Value::Array(messages.clone()).to_string());
                }
            }
            EventType::LlmResponse => {
                if let Some(content) = event.payload.get("content").and_then(Value::as_str) {
                    record.output_snippets.push(content.to_string());
                }
                if let Some(usage) = event.payload.get("usage") {
                    record.prompt_tokens +=
                        usage.get("prompt_tokens").and_then(Value::as_u64).unwrap_or(0);
                    record.completion_tokens += usage
                        .get("completion_tokens")
                        .and_then(Value::as_u64)
                        .unwrap_or(0);
                }
            }
            EventType::ToolCallStart => {
                if let Some(tool_name) = event.payload.get("tool_name").and_then(Value::as_str) {
                    let args = event.payload.get("args").cloned().unwrap_or(Value::Null);
                    pending_tools
                        .entry(record.agent_name.clone())
                        .or_default()
                        .push((tool_name.to_string(), args));
                }
            }
            EventType::ToolCallEnd => {
                if let Some(tool_name) = event.payload.get("tool_name").and_then(Value::as_str) {
                    let pending = pending_tools.entry(record.agent_name.clone()).or_default();
                    let args = pending
                        .iter()
                        .position(|(name, _)| name == tool_name)
                        .map(|pos| pending.remove(pos).1)
                        .unwrap_or(Value::Null);

                    let result = match event.payload.get("result") {
                        Some(Value::String(s)) => Some(s.clone()),
                        Some(Value::Null) | None => None,
                        Some(other) => Some(other.to_string()),
                    };
                    let result_truncated = result.as_deref().map(lossy).unwrap_or(false);

                    record.tool_calls.push(ToolCallRecord {
                        tool_name: tool_name.to_string(),
                        args,
                        result,
                        result_truncated,
                    });
                }
            }
            _ => {}
        }
    }

    // Starts that never completed are still tool calls the agent made.
    for (agent_name, pending) in pending_tools {
        if let Some(record) = records.get_mut(&agent_name) {
            for (tool_name, args) in pending {
                record.tool_calls.push(ToolCallRecord {
                    tool_name,
                    args,
                    result: None,
                    result_truncated: false,
                });
            }
        }
    }

    records
}

fn accumulate_mode_operation(
    event: &TraceEvent,
    span_index: &SpanIndex,
    records: &mut BTreeMap<String, AgentExecutionRecord>,
) {
    // The emitted name is a fallback used only when no spans exist at all.
    let owner = span_index
        .attribute(event.sequence_num)
        .map(str::to_string)
        .or_else(|| event.agent_name.clone());

    let Some(record) = owner.as_deref().and_then(|name| records.get_mut(name)) else {
        debug!(
            seq = event.sequence_num,
            "Mode operation could not be attributed to any actual agent"
        );
        return;
    };

    match event.event_type {
        EventType::MemoryStore => record.memory_stores += 1,
        EventType::MemorySearch => record.memory_searches += 1,
        EventType::KnowledgeSearch => record.knowledge_searches += 1,
        EventType::KnowledgeAdd => record.knowledge_adds += 1,
        _ => {}
    }
}
