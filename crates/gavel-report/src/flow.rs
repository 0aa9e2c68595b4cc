use std::collections::{BTreeMap, HashSet};

use gavel_trace::AgentExecutionRecord;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Whether one agent's output detectably reached the next agent's input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextFlowEvaluation {
    pub from_agent: String,
    pub to_agent: String,
    pub passed_score: f64,
    pub relevance_score: f64,
    pub content_loss_detected: bool,
    pub loss_description: Option<String>,
}

/// Bytes of output probed for verbatim containment before falling back to
/// token overlap.
const VERBATIM_PROBE: usize = 200;
/// Minimum token length considered meaningful for the overlap estimate.
const MIN_TOKEN_LEN: usize = 4;
/// Pairs scoring below this are flagged as content loss.
const LOSS_THRESHOLD: f64 = 5.0;

/// Evaluate context flow for each adjacent pair of agents in execution
/// order (ascending span start).
///
/// This heuristic is intentionally crude: it answers "did something
/// recognizable cross the boundary", not whether the transfer was
/// semantically faithful.
pub fn analyze_flows(records: &BTreeMap<String, AgentExecutionRecord>) -> Vec<ContextFlowEvaluation> {
    let mut ordered: Vec<&AgentExecutionRecord> = records.values().collect();
    ordered.sort_by_key(|r| r.first_seq);

    ordered
        .windows(2)
        .map(|pair| evaluate_pair(pair[0], pair[1]))
        .collect()
}

fn evaluate_pair(
    from: &AgentExecutionRecord,
    to: &AgentExecutionRecord,
) -> ContextFlowEvaluation {
    let output = from.combined_output();
    let input = to.combined_input();

    if output.trim().is_empty() {
        return ContextFlowEvaluation {
            from_agent: from.agent_name.clone(),
            to_agent: to.agent_name.clone(),
            passed_score: 2.0,
            relevance_score: 2.0,
            content_loss_detected: true,
            loss_description: Some(format!(
                "{} produced no output for {} to consume",
                from.agent_name, to.agent_name
            )),
        };
    }

    let probe_end = {
        let mut end = VERBATIM_PROBE.min(output.len());
        while !output.is_char_boundary(end) {
            end -= 1;
        }
        end
    };
    if input.contains(&output) || input.contains(&output[..probe_end]) {
        debug!(
            from = %from.agent_name,
            to = %to.agent_name,
            "Output found verbatim in downstream input"
        );
        return ContextFlowEvaluation {
            from_agent: from.agent_name.clone(),
            to_agent: to.agent_name.clone(),
            passed_score: 10.0,
            relevance_score: 9.0,
            content_loss_detected: false,
            loss_description: None,
        };
    }

    let output_tokens = tokenize(&output);
    let input_tokens = tokenize(&input);
    let intersection = output_tokens.intersection(&input_tokens).count();
    let ratio = intersection as f64 / output_tokens.len().max(1) as f64;
    let score = (ratio * 12.0 + 2.0).min(10.0);

    let content_loss_detected = score < LOSS_THRESHOLD;
    let loss_description = content_loss_detected.then(|| {
        format!(
            "Only {:.0}% of {}'s output tokens were found in {}'s input",
            ratio * 100.0,
            from.agent_name,
            to.agent_name
        )
    });

    ContextFlowEvaluation {
        from_agent: from.agent_name.clone(),
        to_agent: to.agent_name.clone(),
        passed_score: score,
        relevance_score: score,
        content_loss_detected,
        loss_description,
    }
}

/// Lowercase alphanumeric runs of meaningful length.
fn tokenize(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() >= MIN_TOKEN_LEN)
        .map(str::to_string)
        .collect()
}
