use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use gavel_core::{JudgeConfig, JudgeRunner};
use gavel_oracle::{OracleConfig, OracleError, ScoringOracle};
use gavel_report::{DocumentLayout, YamlDocumentStore};
use gavel_trace::{EventType, Trace, TraceEvent};
use serde_json::{json, Value};

const SCRIPTED_RESPONSE: &str = r#"TASK_ACHIEVEMENT_SCORE: 8
CONTEXT_UTILIZATION_SCORE: 7
OUTPUT_QUALITY_SCORE: 9
INSTRUCTION_FOLLOWING_SCORE: 8
HALLUCINATION_FREE_SCORE: 10
ERROR_HANDLING_SCORE: 6
REASONING: Coherent and grounded.
SUGGESTIONS:
- Cite the upstream data
FAILURE_DETECTED: false"#;

const WEAK_RESPONSE: &str = r#"TASK_ACHIEVEMENT_SCORE: 2
CONTEXT_UTILIZATION_SCORE: 3
OUTPUT_QUALITY_SCORE: 4
INSTRUCTION_FOLLOWING_SCORE: 8
HALLUCINATION_FREE_SCORE: 8
ERROR_HANDLING_SCORE: 8
REASONING: Largely missed the task.
FAILURE_DETECTED: false"#;

struct ScriptedOracle {
    response: String,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedOracle {
    fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ScoringOracle for ScriptedOracle {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn score(&self, prompt: &str, _config: &OracleConfig) -> Result<String, OracleError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.response.clone())
    }
}

/// Oracle that always times out from the caller's perspective.
struct StalledOracle;

#[async_trait]
impl ScoringOracle for StalledOracle {
    fn name(&self) -> &str {
        "stalled"
    }

    async fn score(&self, _prompt: &str, _config: &OracleConfig) -> Result<String, OracleError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        unreachable!("the caller-side timeout must fire first")
    }
}

fn event(seq: u64, event_type: EventType, agent: &str, payload: Value) -> TraceEvent {
    TraceEvent {
        sequence_num: seq,
        event_type,
        agent_name: Some(agent.to_string()),
        payload,
    }
}

/// Two agents where the second consumes the first's output verbatim.
fn two_agent_trace() -> Trace {
    let handoff = "Key finding: retention drops sharply after the third week.";
    Trace {
        id: "trace_a".to_string(),
        events: vec![
            event(1, EventType::AgentStart, "researcher", Value::Null),
            event(
                2,
                EventType::LlmRequest,
                "researcher",
                json!({"messages": [{"role": "user", "content": "investigate retention"}]}),
            ),
            event(
                3,
                EventType::LlmResponse,
                "researcher",
                json!({"content": handoff, "usage": {"prompt_tokens": 20, "completion_tokens": 15}}),
            ),
            event(4, EventType::AgentEnd, "researcher", Value::Null),
            event(5, EventType::AgentStart, "writer", Value::Null),
            event(
                6,
                EventType::LlmRequest,
                "writer",
                json!({"messages": [{"role": "user", "content": format!("Write the summary. {}", handoff)}]}),
            ),
            event(
                7,
                EventType::LlmResponse,
                "writer",
                json!({"content": "Summary: retention drops after week three."}),
            ),
            event(8, EventType::AgentEnd, "writer", Value::Null),
        ],
    }
}

fn single_agent_trace(output: String) -> Trace {
    Trace {
        id: "trace_b".to_string(),
        events: vec![
            event(1, EventType::AgentStart, "generator", Value::Null),
            event(
                2,
                EventType::LlmResponse,
                "generator",
                json!({"content": output}),
            ),
            event(3, EventType::AgentEnd, "generator", Value::Null),
        ],
    }
}

// ============================================================
// Scenario A: verbatim handoff between two agents
// ============================================================

#[tokio::test]
async fn test_verbatim_handoff_scores_full_flow() {
    let oracle = Arc::new(ScriptedOracle::new(SCRIPTED_RESPONSE));
    let runner = JudgeRunner::new(oracle, JudgeConfig::default());

    let report = runner.run(&two_agent_trace(), "summarize retention research").await;

    assert_eq!(report.agent_scores.len(), 2);
    assert_eq!(report.flow_evaluations.len(), 1);

    let flow = &report.flow_evaluations[0];
    assert_eq!(flow.from_agent, "researcher");
    assert_eq!(flow.to_agent, "writer");
    assert_eq!(flow.passed_score, 10.0);
    assert!(!flow.content_loss_detected);
    assert!(!report.content_loss_detected);
}

// ============================================================
// Scenario B: oversized output gets chunked without loss
// ============================================================

#[tokio::test]
async fn test_oversized_output_chunked_evaluation() {
    let oracle = Arc::new(ScriptedOracle::new(SCRIPTED_RESPONSE));
    let mut config = JudgeConfig::default();
    config.evaluator.chunk_threshold = 8_000;
    config.evaluator.max_chars = 8_000;
    config.evaluator.max_chunks = 5;
    config.evaluator.overlap = 200;
    let runner = JudgeRunner::new(oracle.clone(), config);

    let output = "word ".repeat(10_000); // 50,000 chars
    let report = runner.run(&single_agent_trace(output), "generate the corpus").await;

    let score = &report.agent_scores["generator"];
    assert!(score.chunked);
    assert_eq!(score.chunk_count, 5);
    assert!(score.overall_score >= 1.0 && score.overall_score <= 10.0);

    let prompts = oracle.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 5);
    assert!(prompts.iter().any(|p| p.contains("[CHUNK 5 of 5]")));
    // The final chunk absorbed the remainder behind the continuation marker
    assert!(prompts.iter().any(|p| p.contains("[CONTINUED...]")));
}

// ============================================================
// Scenario C: a dead oracle still yields a complete report
// ============================================================

#[tokio::test]
async fn test_dead_oracle_yields_complete_neutral_report() {
    let mut config = JudgeConfig::default();
    config.oracle.timeout = Duration::from_millis(20);
    let runner = JudgeRunner::new(Arc::new(StalledOracle), config);

    let report = runner.run(&two_agent_trace(), "summarize retention research").await;

    assert_eq!(report.agent_scores.len(), 2);
    assert_eq!(report.overall_score, 5.0);
    for score in report.agent_scores.values() {
        assert_eq!(score.scores.task_achievement, 5.0);
        assert_eq!(score.scores.error_handling, 5.0);
        assert!(!score.failure_detected);
    }
    assert_eq!(report.failure_count, 0);
}

// ============================================================
// Scenario D: weak scores drive a high-confidence, appliable plan
// ============================================================

#[tokio::test]
async fn test_weak_run_generates_and_applies_plan() {
    let oracle = Arc::new(ScriptedOracle::new(WEAK_RESPONSE));
    let runner = JudgeRunner::new(oracle, JudgeConfig::default());

    let report = runner.run(&two_agent_trace(), "summarize retention research").await;

    let dir = tempfile::TempDir::new().unwrap();
    let doc_path = dir.path().join("crew.yaml");
    std::fs::write(
        &doc_path,
        "tasks:\n  researcher:\n    description: investigate\n  writer:\n    description: write\n",
    )
    .unwrap();

    let plan = runner.generate_plan(&report, &doc_path, DocumentLayout::RoleTask);

    // Both agents fail task achievement (2.0), context utilization (3.0),
    // and output quality (4.0): three fixes each.
    assert_eq!(plan.fixes.len(), 6);

    let task_fix = plan
        .fixes
        .iter()
        .find(|f| f.target_path == "tasks.researcher.description")
        .unwrap();
    // append_instruction base 0.6 + severity boost 0.3 for a score of 2
    assert!((task_fix.confidence - 0.9).abs() < 1e-9);

    let result = runner.apply_plan(&plan, &YamlDocumentStore).unwrap();
    assert_eq!(result.applied(), 6);
    assert_eq!(result.failed(), 0);
    assert!(result.backup_path.exists());

    let updated = std::fs::read_to_string(&doc_path).unwrap();
    assert!(updated.contains("investigate\n"));
    assert!(updated.contains("Be explicit about the final deliverable"));
}

// ============================================================
// Recommendations surface weak criteria
// ============================================================

#[tokio::test]
async fn test_report_recommendations_from_weak_scores() {
    let oracle = Arc::new(ScriptedOracle::new(WEAK_RESPONSE));
    let runner = JudgeRunner::new(oracle, JudgeConfig::default());

    let report = runner.run(&two_agent_trace(), "summarize retention research").await;

    assert!(!report.recommendations.is_empty());
    assert!(report
        .recommendations
        .iter()
        .any(|r| r.contains("task_achievement")));
}
