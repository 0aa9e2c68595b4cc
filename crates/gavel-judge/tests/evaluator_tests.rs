use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use gavel_judge::{
    is_lossy_truncation, oracle_summarize, AggregationStrategy, ChunkedEvaluator, EvaluationMode,
    EvaluatorSettings, SizingPolicy,
};
use gavel_oracle::{OracleConfig, OracleError, ScoringOracle};
use gavel_trace::AgentExecutionRecord;

const GOOD_RESPONSE: &str = r#"TASK_ACHIEVEMENT_SCORE: 8
CONTEXT_UTILIZATION_SCORE: 7
OUTPUT_QUALITY_SCORE: 9
INSTRUCTION_FOLLOWING_SCORE: 8
HALLUCINATION_FREE_SCORE: 10
ERROR_HANDLING_SCORE: 6
REASONING: Well grounded output.
SUGGESTIONS:
- Tighten the summary section
FAILURE_DETECTED: false"#;

/// Oracle that replies with a fixed script and records every prompt.
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

/// Oracle that never answers within any reasonable timeout.
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

fn record_with_output(output: String) -> AgentExecutionRecord {
    let mut record = AgentExecutionRecord::new("writer".to_string(), 1);
    record.input_snippets.push("write it up".to_string());
    record.output_snippets.push(output);
    record
}

fn settings() -> EvaluatorSettings {
    EvaluatorSettings {
        chunk_threshold: 2_000,
        max_chars: 1_000,
        max_chunks: 5,
        overlap: 100,
        strategy: AggregationStrategy::WeightedAverage,
        mode: EvaluationMode::Context,
        sizing: SizingPolicy::default(),
    }
}

#[tokio::test]
async fn test_standard_evaluation_parses_scores() {
    let oracle = Arc::new(ScriptedOracle::new(GOOD_RESPONSE));
    let evaluator = ChunkedEvaluator::new(oracle.clone(), OracleConfig::default(), settings());

    let record = record_with_output("a short output".to_string());
    let score = evaluator.evaluate(&record, "the goal").await;

    assert!(!score.chunked);
    assert_eq!(score.chunk_count, 1);
    assert_eq!(score.scores.task_achievement, 8.0);
    assert_eq!(score.scores.error_handling, 6.0);
    assert!((score.overall_score - 48.0 / 6.0).abs() < 1e-9);
    assert_eq!(score.suggestions, vec!["Tighten the summary section"]);
    assert_eq!(oracle.prompts.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_chunked_evaluation_issues_one_call_per_chunk() {
    let oracle = Arc::new(ScriptedOracle::new(GOOD_RESPONSE));
    let evaluator = ChunkedEvaluator::new(oracle.clone(), OracleConfig::default(), settings());

    let record = record_with_output("word ".repeat(1000)); // 5000 bytes > threshold
    let score = evaluator.evaluate(&record, "the goal").await;

    assert!(score.chunked);
    assert!(score.chunk_count > 1);

    let prompts = oracle.prompts.lock().unwrap();
    assert_eq!(prompts.len(), score.chunk_count);
    assert!(prompts.iter().any(|p| p.starts_with("[CHUNK 1 of")));
    // All chunks scored identically, so the aggregate matches the script
    assert_eq!(score.scores.task_achievement, 8.0);
    assert!((score.overall_score - 8.0).abs() < 1.0);
}

#[tokio::test]
async fn test_oracle_timeout_yields_neutral_scores() {
    let config = OracleConfig::default().with_timeout(Duration::from_millis(20));
    let evaluator = ChunkedEvaluator::new(Arc::new(StalledOracle), config, settings());

    let record = record_with_output("anything".to_string());
    let score = evaluator.evaluate(&record, "the goal").await;

    assert_eq!(score.overall_score, 5.0);
    assert_eq!(score.scores.task_achievement, 5.0);
    assert!(!score.failure_detected);
}

#[tokio::test]
async fn test_chunk_failures_do_not_fail_the_batch() {
    let config = OracleConfig::default().with_timeout(Duration::from_millis(20));
    let evaluator = ChunkedEvaluator::new(Arc::new(StalledOracle), config, settings());

    let record = record_with_output("word ".repeat(1000));
    let score = evaluator.evaluate(&record, "the goal").await;

    assert!(score.chunked);
    assert_eq!(score.overall_score, 5.0);
}

#[tokio::test]
async fn test_oversized_input_is_summarized_before_prompting() {
    let oracle = Arc::new(ScriptedOracle::new("a compact restatement"));
    let mut settings = settings();
    settings.sizing = SizingPolicy {
        inline_max: 100,
        summarize_max: 10_000,
    };
    let evaluator = ChunkedEvaluator::new(oracle.clone(), OracleConfig::default(), settings);

    let mut record = record_with_output("short output".to_string());
    record.input_snippets = vec!["background material ".repeat(50)]; // 1000 bytes

    evaluator.evaluate(&record, "the goal").await;

    let prompts = oracle.prompts.lock().unwrap();
    // First call summarizes the input, second call scores with the summary
    assert_eq!(prompts.len(), 2);
    assert!(prompts[0].contains("Summarize the following content"));
    assert!(prompts[1].contains("[LLM summary] a compact restatement"));
}

#[tokio::test]
async fn test_oracle_summarize_happy_path() {
    let oracle = ScriptedOracle::new("the gist of it");
    let text = "x".repeat(5_000);

    let summary = oracle_summarize(&oracle, &OracleConfig::default(), &text, 500).await;

    assert_eq!(summary, "[LLM summary] the gist of it");
    assert!(!is_lossy_truncation(&summary));
}

#[tokio::test]
async fn test_oracle_summarize_falls_back_on_timeout() {
    let config = OracleConfig::default().with_timeout(Duration::from_millis(20));
    let text: String = (0..500).map(|i| format!("line {}\n", i)).collect();

    let summary = oracle_summarize(&StalledOracle, &config, &text, 400).await;

    assert!(summary.len() <= 400 + 80); // head + tail + marker
    assert!(summary.contains("smart truncation"));
    assert!(summary.starts_with("line 0"));
    assert!(!is_lossy_truncation(&summary));
}

#[tokio::test]
async fn test_oracle_summarize_rejects_overlong_summary() {
    // A "summary" longer than the budget must not be accepted verbatim
    let oracle = ScriptedOracle::new(&"verbose ".repeat(100));
    let text = "y".repeat(5_000);

    let summary = oracle_summarize(&oracle, &OracleConfig::default(), &text, 200).await;

    assert!(summary.contains("smart truncation"));
}

#[tokio::test]
async fn test_failure_flag_propagates_from_response() {
    let response = format!(
        "{}\nFAILURE_DETECTED: true\nFAILURE_REASON: tool loop detected",
        GOOD_RESPONSE.replace("FAILURE_DETECTED: false", "")
    );
    let oracle = Arc::new(ScriptedOracle::new(&response));
    let evaluator = ChunkedEvaluator::new(oracle, OracleConfig::default(), settings());

    let record = record_with_output("short".to_string());
    let score = evaluator.evaluate(&record, "the goal").await;

    assert!(score.failure_detected);
    assert_eq!(score.failure_reason.as_deref(), Some("tool loop detected"));
}
