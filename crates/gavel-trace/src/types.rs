use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Event kinds emitted by the workflow engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    AgentStart,
    AgentEnd,
    LlmRequest,
    LlmResponse,
    ToolCallStart,
    ToolCallEnd,
    MemoryStore,
    MemorySearch,
    KnowledgeSearch,
    KnowledgeAdd,
}

impl EventType {
    /// Memory and knowledge events carry unreliable agent names upstream and
    /// are re-attributed by span distance instead of being trusted.
    pub fn is_mode_operation(&self) -> bool {
        matches!(
            self,
            EventType::MemoryStore
                | EventType::MemorySearch
                | EventType::KnowledgeSearch
                | EventType::KnowledgeAdd
        )
    }
}

/// One entry in a workflow execution trace.
///
/// Events are immutable and ordered by `sequence_num`. The `agent_name` tag
/// is reliable for agent/LLM/tool events but not for memory or knowledge
/// operations, where upstream subsystems reuse unrelated identifiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEvent {
    pub sequence_num: u64,
    pub event_type: EventType,
    #[serde(default)]
    pub agent_name: Option<String>,
    #[serde(default)]
    pub payload: Value,
}

/// A fully loaded trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trace {
    pub id: String,
    pub events: Vec<TraceEvent>,
}

/// One tool invocation observed during an agent's span.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub tool_name: String,
    pub args: Value,
    /// Recorded result text; `None` when the call never completed.
    pub result: Option<String>,
    /// True when the result carries signs of lossy truncation.
    pub result_truncated: bool,
}

/// Aggregated view of one agent's execution, built once per judge run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentExecutionRecord {
    pub agent_name: String,
    /// Sequence number of the agent's `AgentStart`, used for execution ordering.
    pub first_seq: u64,
    /// Last user-authored message of each LLM request.
    pub input_snippets: Vec<String>,
    /// Serialized message sets of each LLM request.
    pub context_snippets: Vec<String>,
    /// Response text of each LLM response.
    pub output_snippets: Vec<String>,
    pub tool_calls: Vec<ToolCallRecord>,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub memory_stores: usize,
    pub memory_searches: usize,
    pub knowledge_searches: usize,
    pub knowledge_adds: usize,
}

impl AgentExecutionRecord {
    pub fn new(agent_name: String, first_seq: u64) -> Self {
        Self {
            agent_name,
            first_seq,
            ..Default::default()
        }
    }

    /// All output text produced by the agent, in emission order.
    pub fn combined_output(&self) -> String {
        self.output_snippets.join("\n\n")
    }

    /// All input-side text: user messages followed by full message contexts.
    pub fn combined_input(&self) -> String {
        let mut parts: Vec<&str> = self.input_snippets.iter().map(String::as_str).collect();
        parts.extend(self.context_snippets.iter().map(String::as_str));
        parts.join("\n\n")
    }

    pub fn total_tokens(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }
}
