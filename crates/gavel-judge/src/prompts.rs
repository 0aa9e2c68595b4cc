use gavel_trace::AgentExecutionRecord;

use crate::chunker::ContentChunk;
use crate::sizing::smart_truncate;

/// What aspect of the agent's execution is being judged.
///
/// Each mode selects one fixed prompt template; scoring call sites never
/// branch on free-form strings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum EvaluationMode {
    /// Context handling: inputs in, outputs out
    #[default]
    Context,
    /// Memory operations on top of context handling
    Memory,
    /// Knowledge-base operations on top of context handling
    Knowledge,
}

impl std::fmt::Display for EvaluationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvaluationMode::Context => write!(f, "context"),
            EvaluationMode::Memory => write!(f, "memory"),
            EvaluationMode::Knowledge => write!(f, "knowledge"),
        }
    }
}

impl std::str::FromStr for EvaluationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "context" => Ok(EvaluationMode::Context),
            "memory" => Ok(EvaluationMode::Memory),
            "knowledge" => Ok(EvaluationMode::Knowledge),
            _ => Err(format!("Unknown evaluation mode: {}", s)),
        }
    }
}

const TOOL_SUMMARY_BUDGET: usize = 2_000;

/// Prompt templates for the scoring oracle.
///
/// Callers size `input_content` and `output_content` beforehand (sizing
/// policy and chunker respectively); only the tool summary is budgeted
/// here.
pub struct JudgePrompts;

impl JudgePrompts {
    /// Build the evaluation prompt for an agent's full (or inline) output.
    pub fn build_agent_prompt(
        mode: EvaluationMode,
        record: &AgentExecutionRecord,
        goal: &str,
        input_content: &str,
        output_content: &str,
    ) -> String {
        let mode_section = Self::mode_section(mode, record);
        format!(
            r#"You are a rigorous evaluator of multi-agent workflow executions. Judge how effectively one agent used the context it was given.

## Workflow Goal
{goal}

## Agent Under Evaluation
{agent}

## Agent Input
```
{input}
```

## Agent Output
```
{output}
```

## Tool Usage
{tools}
{mode_section}
---

## Required Response Format

Score each criterion from 1 (worst) to 10 (best). Respond with exactly these lines:

TASK_ACHIEVEMENT_SCORE: <1-10>
CONTEXT_UTILIZATION_SCORE: <1-10>
OUTPUT_QUALITY_SCORE: <1-10>
INSTRUCTION_FOLLOWING_SCORE: <1-10>
HALLUCINATION_FREE_SCORE: <1-10>
ERROR_HANDLING_SCORE: <1-10>
REASONING: <one paragraph explaining the scores>
SUGGESTIONS:
- <improvement suggestion>
- <improvement suggestion>
FAILURE_DETECTED: true|false
FAILURE_REASON: <only if a failure was detected>"#,
            goal = goal,
            agent = record.agent_name,
            input = input_content,
            output = output_content,
            tools = Self::tool_summary(record),
            mode_section = mode_section,
        )
    }

    /// Build the prompt for one chunk of an oversized output.
    ///
    /// Carries a `[CHUNK i of N]` marker so the oracle knows it sees a
    /// slice, and a continuation note past the first chunk.
    pub fn build_chunk_prompt(
        mode: EvaluationMode,
        record: &AgentExecutionRecord,
        goal: &str,
        input_content: &str,
        chunk: &ContentChunk,
    ) -> String {
        let continuation = if chunk.index > 0 {
            "\nNote: this chunk continues mid-content from the previous chunk; \
             do not penalize an abrupt beginning.\n"
        } else {
            ""
        };
        let header = format!(
            "[CHUNK {} of {}]\n{}",
            chunk.index + 1,
            chunk.total,
            continuation
        );
        let body = Self::build_agent_prompt(mode, record, goal, input_content, &chunk.text);
        format!("{}\n{}", header, body)
    }

    fn mode_section(mode: EvaluationMode, record: &AgentExecutionRecord) -> String {
        match mode {
            EvaluationMode::Context => String::new(),
            EvaluationMode::Memory => format!(
                "\n## Memory Operations\nStores: {}, searches: {}. Weigh whether memory was used to carry context across steps.\n",
                record.memory_stores, record.memory_searches
            ),
            EvaluationMode::Knowledge => format!(
                "\n## Knowledge Operations\nSearches: {}, additions: {}. Weigh whether the knowledge base was consulted where the task needed it.\n",
                record.knowledge_searches, record.knowledge_adds
            ),
        }
    }

    fn tool_summary(record: &AgentExecutionRecord) -> String {
        if record.tool_calls.is_empty() {
            return "No tool calls.".to_string();
        }
        let lines: Vec<String> = record
            .tool_calls
            .iter()
            .map(|call| {
                format!(
                    "- {} ({}{})",
                    call.tool_name,
                    if call.result.is_some() {
                        "completed"
                    } else {
                        "no result recorded"
                    },
                    if call.result_truncated {
                        ", result truncated"
                    } else {
                        ""
                    }
                )
            })
            .collect();
        smart_truncate(&lines.join("\n"), TOOL_SUMMARY_BUDGET)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> AgentExecutionRecord {
        let mut record = AgentExecutionRecord::new("writer".to_string(), 1);
        record.input_snippets.push("write the summary".to_string());
        record.output_snippets.push("the summary".to_string());
        record.memory_stores = 3;
        record
    }

    #[test]
    fn test_mode_parses_and_displays() {
        assert_eq!("memory".parse::<EvaluationMode>().unwrap(), EvaluationMode::Memory);
        assert_eq!(EvaluationMode::Knowledge.to_string(), "knowledge");
        assert!("other".parse::<EvaluationMode>().is_err());
    }

    #[test]
    fn test_agent_prompt_embeds_named_sections() {
        let prompt = JudgePrompts::build_agent_prompt(
            EvaluationMode::Context,
            &record(),
            "summarize the findings",
            "write the summary",
            "the summary",
        );

        assert!(prompt.contains("summarize the findings"));
        assert!(prompt.contains("writer"));
        assert!(prompt.contains("write the summary"));
        assert!(prompt.contains("TASK_ACHIEVEMENT_SCORE"));
        assert!(prompt.contains("No tool calls."));
    }

    #[test]
    fn test_memory_mode_adds_operation_counts() {
        let prompt = JudgePrompts::build_agent_prompt(
            EvaluationMode::Memory,
            &record(),
            "goal",
            "in",
            "out",
        );
        assert!(prompt.contains("Stores: 3"));
    }

    #[test]
    fn test_chunk_prompt_has_marker_and_continuation() {
        let chunk = ContentChunk {
            index: 1,
            total: 3,
            text: "middle slice".to_string(),
            start_offset: 100,
            end_offset: 200,
        };
        let prompt = JudgePrompts::build_chunk_prompt(
            EvaluationMode::Context,
            &record(),
            "goal",
            "in",
            &chunk,
        );

        assert!(prompt.starts_with("[CHUNK 2 of 3]"));
        assert!(prompt.contains("continues mid-content"));

        let first = ContentChunk {
            index: 0,
            total: 3,
            text: "first".to_string(),
            start_offset: 0,
            end_offset: 100,
        };
        let prompt = JudgePrompts::build_chunk_prompt(
            EvaluationMode::Context,
            &record(),
            "goal",
            "in",
            &first,
        );
        assert!(prompt.starts_with("[CHUNK 1 of 3]"));
        assert!(!prompt.contains("continues mid-content"));
    }
}
