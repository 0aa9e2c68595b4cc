use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use gavel_judge::sizing::is_lossy_truncation;
use gavel_judge::ContextEffectivenessScore;
use gavel_trace::AgentExecutionRecord;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

/// Sub-scores below this produce a targeted recommendation.
const RECOMMENDATION_THRESHOLD: f64 = 6.0;
/// Oracle suggestions propagated per agent, at most.
const MAX_SUGGESTIONS_PER_AGENT: usize = 2;

/// The top-level judge output. Immutable once produced; persisted by an
/// external store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeReport {
    pub report_id: String,
    pub trace_id: Option<String>,
    /// Recipe-level goal text the workflow was judged against
    pub goal: String,
    pub agent_scores: BTreeMap<String, ContextEffectivenessScore>,
    pub flow_evaluations: Vec<super::ContextFlowEvaluation>,
    /// Mean of the per-agent overall scores; 0.0 when no agents were seen
    pub overall_score: f64,
    pub failure_count: usize,
    pub content_loss_detected: bool,
    pub content_loss_details: Vec<String>,
    pub recommendations: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

/// Combine per-agent scores, flow evaluations, and a global content-loss
/// scan into one report.
pub fn synthesize_report(
    goal: &str,
    trace_id: Option<String>,
    records: &BTreeMap<String, AgentExecutionRecord>,
    agent_scores: BTreeMap<String, ContextEffectivenessScore>,
    flow_evaluations: Vec<super::ContextFlowEvaluation>,
) -> JudgeReport {
    let overall_score = if agent_scores.is_empty() {
        0.0
    } else {
        agent_scores.values().map(|s| s.overall_score).sum::<f64>() / agent_scores.len() as f64
    };

    let failure_count = agent_scores.values().filter(|s| s.failure_detected).count();

    let mut content_loss_details = scan_content_loss(records);
    for flow in &flow_evaluations {
        if let Some(description) = flow.loss_description.as_deref() {
            content_loss_details.push(description.to_string());
        }
    }
    let content_loss_detected = !content_loss_details.is_empty();

    let recommendations = build_recommendations(&agent_scores);

    let report = JudgeReport {
        report_id: Uuid::new_v4().to_string(),
        trace_id,
        goal: goal.to_string(),
        agent_scores,
        flow_evaluations,
        overall_score,
        failure_count,
        content_loss_detected,
        content_loss_details,
        recommendations,
        generated_at: Utc::now(),
    };

    info!(
        report_id = %report.report_id,
        overall_score = report.overall_score,
        failures = report.failure_count,
        content_loss = report.content_loss_detected,
        "Synthesized judge report"
    );

    report
}

/// Scan every tool result and model response for lossy truncation.
fn scan_content_loss(records: &BTreeMap<String, AgentExecutionRecord>) -> Vec<String> {
    let mut details = Vec::new();

    for record in records.values() {
        for call in &record.tool_calls {
            if call.result_truncated
                || call
                    .result
                    .as_deref()
                    .map(is_lossy_truncation)
                    .unwrap_or(false)
            {
                details.push(format!(
                    "Tool '{}' used by {} returned a lossily truncated result",
                    call.tool_name, record.agent_name
                ));
            }
        }
        for snippet in &record.output_snippets {
            if is_lossy_truncation(snippet) {
                details.push(format!(
                    "A model response from {} shows lossy truncation",
                    record.agent_name
                ));
            }
        }
    }

    details
}

/// Hints paired with each criterion for targeted recommendations.
const CRITERION_HINTS: [(&str, &str); 6] = [
    ("task_achievement", "clarify the task definition and its success criteria"),
    ("context_utilization", "pass richer upstream context into the agent's inputs"),
    ("output_quality", "tighten the expected output format"),
    ("instruction_following", "make the instructions explicit and ordered"),
    ("hallucination_free", "require the agent to ground claims in provided context"),
    ("error_handling", "add instructions for failure paths and partial results"),
];

fn build_recommendations(
    agent_scores: &BTreeMap<String, ContextEffectivenessScore>,
) -> Vec<String> {
    let mut recommendations: Vec<String> = Vec::new();

    for (agent, score) in agent_scores {
        for (criterion, value) in score.scores.iter_named() {
            if value < RECOMMENDATION_THRESHOLD {
                let hint = CRITERION_HINTS
                    .iter()
                    .find(|(name, _)| *name == criterion)
                    .map(|(_, hint)| *hint)
                    .unwrap_or("review the agent's configuration");
                recommendations.push(format!(
                    "Agent '{}' scored {:.1} on {}: {}",
                    agent, value, criterion, hint
                ));
            }
        }

        for suggestion in score.suggestions.iter().take(MAX_SUGGESTIONS_PER_AGENT) {
            recommendations.push(format!("[{}] {}", agent, suggestion));
        }
    }

    // Dedup preserving first occurrence
    let mut seen = std::collections::HashSet::new();
    recommendations.retain(|r| seen.insert(r.clone()));

    recommendations
}
