use std::sync::Arc;

use gavel_oracle::{OracleConfig, OracleError, ScoringOracle};
use gavel_trace::AgentExecutionRecord;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::aggregate::{aggregate, AggregationStrategy, ChunkScore};
use crate::chunker::split;
use crate::parse::{parse_evaluation, CriterionScores, ParsedEvaluation};
use crate::prompts::{EvaluationMode, JudgePrompts};
use crate::sizing::{oracle_summarize, smart_truncate, SizingAction, SizingPolicy};

/// Tunables for one evaluator instance.
#[derive(Debug, Clone)]
pub struct EvaluatorSettings {
    /// Output size above which chunked evaluation applies
    pub chunk_threshold: usize,
    pub max_chars: usize,
    pub max_chunks: usize,
    pub overlap: usize,
    pub strategy: AggregationStrategy,
    pub mode: EvaluationMode,
    /// Governs how the agent's input side is fitted into prompts
    pub sizing: SizingPolicy,
}

impl Default for EvaluatorSettings {
    fn default() -> Self {
        Self {
            chunk_threshold: 8_000,
            max_chars: 8_000,
            max_chunks: 10,
            overlap: 200,
            strategy: AggregationStrategy::default(),
            mode: EvaluationMode::default(),
            sizing: SizingPolicy::default(),
        }
    }
}

/// One agent's evaluation result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextEffectivenessScore {
    pub agent_name: String,
    pub scores: CriterionScores,
    /// Arithmetic mean of the six sub-scores
    pub overall_score: f64,
    pub reasoning: String,
    pub suggestions: Vec<String>,
    pub failure_detected: bool,
    pub failure_reason: Option<String>,
    /// Whether chunked evaluation was used
    pub chunked: bool,
    pub chunk_count: usize,
}

/// Evaluates agent execution records through the scoring oracle, chunking
/// oversized outputs so every part of the content gets scored.
///
/// Availability over consistency: an oracle failure or timeout on any call
/// degrades that call to neutral scores and evaluation continues. Chunk
/// scores are only aggregated after the whole batch resolves, so an
/// abandoned batch leaves no partial state behind.
pub struct ChunkedEvaluator {
    oracle: Arc<dyn ScoringOracle>,
    oracle_config: OracleConfig,
    settings: EvaluatorSettings,
    /// Caps concurrent in-flight oracle calls across all evaluations
    /// sharing this evaluator.
    permits: Arc<Semaphore>,
}

impl ChunkedEvaluator {
    pub fn new(
        oracle: Arc<dyn ScoringOracle>,
        oracle_config: OracleConfig,
        settings: EvaluatorSettings,
    ) -> Self {
        let permits = Arc::new(Semaphore::new(oracle_config.max_concurrency.max(1)));
        Self {
            oracle,
            oracle_config,
            settings,
            permits,
        }
    }

    pub fn settings(&self) -> &EvaluatorSettings {
        &self.settings
    }

    /// Evaluate one agent's execution.
    pub async fn evaluate(
        &self,
        record: &AgentExecutionRecord,
        goal: &str,
    ) -> ContextEffectivenessScore {
        let output = record.combined_output();
        let input = self.prepare_input(record).await;

        if output.len() <= self.settings.chunk_threshold {
            self.evaluate_standard(record, goal, &input, &output).await
        } else {
            self.evaluate_chunked(record, goal, &input, &output).await
        }
    }

    /// Fit the agent's input side into the prompt budget.
    ///
    /// Mid-size inputs get an oracle summary (best-effort, falls back to
    /// smart truncation); anything beyond the summarize threshold is smart
    /// truncated outright, since the input is context for the judge rather
    /// than the content under evaluation.
    async fn prepare_input(&self, record: &AgentExecutionRecord) -> String {
        let input = record.combined_input();
        match self.settings.sizing.classify(&input) {
            SizingAction::Inline => input,
            SizingAction::Summarize => {
                oracle_summarize(
                    self.oracle.as_ref(),
                    &self.oracle_config,
                    &input,
                    self.settings.sizing.inline_max,
                )
                .await
            }
            SizingAction::Chunk => smart_truncate(&input, self.settings.sizing.inline_max),
        }
    }

    async fn evaluate_standard(
        &self,
        record: &AgentExecutionRecord,
        goal: &str,
        input: &str,
        output: &str,
    ) -> ContextEffectivenessScore {
        let prompt =
            JudgePrompts::build_agent_prompt(self.settings.mode, record, goal, input, output);

        debug!(
            agent = %record.agent_name,
            prompt_len = prompt.len(),
            "Running standard evaluation"
        );

        let parsed = match self.score_with_timeout(&prompt).await {
            Ok(response) => parse_evaluation(&response),
            Err(e) => {
                warn!(agent = %record.agent_name, error = %e, "Oracle call failed, scoring neutral");
                ParsedEvaluation::neutral("Oracle unavailable; neutral scores substituted.")
            }
        };

        let scores = parsed.scores.clone();
        Self::from_parsed(record, scores, parsed, false, 1)
    }

    async fn evaluate_chunked(
        &self,
        record: &AgentExecutionRecord,
        goal: &str,
        input: &str,
        output: &str,
    ) -> ContextEffectivenessScore {
        let chunks = split(
            output,
            self.settings.max_chars,
            self.settings.max_chunks,
            self.settings.overlap,
        );

        info!(
            agent = %record.agent_name,
            output_len = output.len(),
            chunks = chunks.len(),
            strategy = %self.settings.strategy,
            "Running chunked evaluation"
        );

        let mut set: JoinSet<(usize, usize, ParsedEvaluation)> = JoinSet::new();

        for chunk in &chunks {
            let prompt =
                JudgePrompts::build_chunk_prompt(self.settings.mode, record, goal, input, chunk);
            let oracle = self.oracle.clone();
            let config = self.oracle_config.clone();
            let permits = self.permits.clone();
            let agent_name = record.agent_name.clone();
            let chunk_index = chunk.index;
            let chunk_size = chunk.text.len();

            set.spawn(async move {
                // Closed only on shutdown; treat as an unavailable oracle.
                let _permit = permits.acquire().await;
                let parsed = match score_with_timeout(oracle.as_ref(), &config, &prompt).await {
                    Ok(response) => parse_evaluation(&response),
                    Err(e) => {
                        warn!(
                            agent = %agent_name,
                            chunk_index,
                            error = %e,
                            "Chunk evaluation failed, scoring neutral"
                        );
                        ParsedEvaluation::neutral("Oracle unavailable for this chunk.")
                    }
                };
                (chunk_index, chunk_size, parsed)
            });
        }

        let mut results: Vec<(usize, usize, ParsedEvaluation)> = Vec::with_capacity(chunks.len());
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(e) => warn!(error = %e, "Chunk evaluation task panicked, dropping to neutral"),
            }
        }
        // A panicked task still owes the batch a neutral row.
        while results.len() < chunks.len() {
            let missing = (0..chunks.len())
                .find(|i| !results.iter().any(|(idx, _, _)| idx == i))
                .unwrap_or(0);
            results.push((
                missing,
                chunks[missing].text.len(),
                ParsedEvaluation::neutral("Chunk evaluation did not complete."),
            ));
        }
        results.sort_by_key(|(index, _, _)| *index);

        let chunk_scores: Vec<ChunkScore> = results
            .iter()
            .map(|(index, size, parsed)| ChunkScore {
                chunk_index: *index,
                sub_scores: parsed.scores.clone(),
                chunk_size: *size,
            })
            .collect();

        let aggregated = aggregate(&chunk_scores, self.settings.strategy);
        let merged = merge_chunk_evaluations(results);
        let chunk_count = chunk_scores.len();

        Self::from_parsed(record, aggregated, merged, true, chunk_count)
    }

    async fn score_with_timeout(&self, prompt: &str) -> Result<String, OracleError> {
        let _permit = self.permits.acquire().await;
        score_with_timeout(self.oracle.as_ref(), &self.oracle_config, prompt).await
    }

    fn from_parsed(
        record: &AgentExecutionRecord,
        scores: CriterionScores,
        parsed: ParsedEvaluation,
        chunked: bool,
        chunk_count: usize,
    ) -> ContextEffectivenessScore {
        let overall_score = scores.mean();
        ContextEffectivenessScore {
            agent_name: record.agent_name.clone(),
            scores,
            overall_score,
            reasoning: parsed.reasoning,
            suggestions: parsed.suggestions,
            failure_detected: parsed.failure_detected,
            failure_reason: parsed.failure_reason,
            chunked,
            chunk_count,
        }
    }
}

/// Wrap one oracle call in the configured timeout.
async fn score_with_timeout(
    oracle: &dyn ScoringOracle,
    config: &OracleConfig,
    prompt: &str,
) -> Result<String, OracleError> {
    match tokio::time::timeout(config.timeout, oracle.score(prompt, config)).await {
        Ok(result) => result,
        Err(_) => Err(OracleError::Timeout(config.timeout)),
    }
}

/// Fold per-chunk reasoning, suggestions, and failure flags into one
/// evaluation-level view.
fn merge_chunk_evaluations(results: Vec<(usize, usize, ParsedEvaluation)>) -> ParsedEvaluation {
    let mut reasoning = String::new();
    let mut suggestions: Vec<String> = Vec::new();
    let mut failure_detected = false;
    let mut failure_reason: Option<String> = None;

    let total = results.len();
    for (_, _, parsed) in results {
        if reasoning.is_empty() && !parsed.reasoning.is_empty() {
            reasoning = parsed.reasoning;
        }
        for suggestion in parsed.suggestions {
            if !suggestions.contains(&suggestion) {
                suggestions.push(suggestion);
            }
        }
        if parsed.failure_detected {
            failure_detected = true;
        }
        if failure_reason.is_none() {
            failure_reason = parsed.failure_reason;
        }
    }

    if !reasoning.is_empty() && total > 1 {
        reasoning.push_str(&format!(" (aggregated from {} chunks)", total));
    }

    ParsedEvaluation {
        scores: CriterionScores::neutral(),
        reasoning,
        suggestions,
        failure_detected,
        failure_reason,
    }
}
