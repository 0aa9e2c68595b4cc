use serde::{Deserialize, Serialize};
use tracing::debug;

/// The neutral default used whenever a sub-score cannot be obtained. It
/// never blocks aggregation; a missing or malformed value degrades quality,
/// not availability.
pub const NEUTRAL_SCORE: f64 = 5.0;

/// The six bounded sub-scores of one evaluation, each in [1, 10].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionScores {
    pub task_achievement: f64,
    pub context_utilization: f64,
    pub output_quality: f64,
    pub instruction_following: f64,
    pub hallucination_free: f64,
    pub error_handling: f64,
}

impl Default for CriterionScores {
    fn default() -> Self {
        Self::neutral()
    }
}

impl CriterionScores {
    pub fn neutral() -> Self {
        Self {
            task_achievement: NEUTRAL_SCORE,
            context_utilization: NEUTRAL_SCORE,
            output_quality: NEUTRAL_SCORE,
            instruction_following: NEUTRAL_SCORE,
            hallucination_free: NEUTRAL_SCORE,
            error_handling: NEUTRAL_SCORE,
        }
    }

    /// Arithmetic mean of the six sub-scores.
    pub fn mean(&self) -> f64 {
        (self.task_achievement
            + self.context_utilization
            + self.output_quality
            + self.instruction_following
            + self.hallucination_free
            + self.error_handling)
            / 6.0
    }

    /// The sub-scores with their stable names, for reporting.
    pub fn iter_named(&self) -> [(&'static str, f64); 6] {
        [
            ("task_achievement", self.task_achievement),
            ("context_utilization", self.context_utilization),
            ("output_quality", self.output_quality),
            ("instruction_following", self.instruction_following),
            ("hallucination_free", self.hallucination_free),
            ("error_handling", self.error_handling),
        ]
    }
}

/// One parsed oracle response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedEvaluation {
    pub scores: CriterionScores,
    pub reasoning: String,
    pub suggestions: Vec<String>,
    pub failure_detected: bool,
    pub failure_reason: Option<String>,
}

impl ParsedEvaluation {
    /// The all-neutral evaluation substituted for a failed oracle call.
    pub fn neutral(reason: &str) -> Self {
        Self {
            reasoning: reason.to_string(),
            ..Default::default()
        }
    }
}

const SCORE_MARKERS: [(&str, usize); 6] = [
    ("TASK_ACHIEVEMENT_SCORE:", 0),
    ("CONTEXT_UTILIZATION_SCORE:", 1),
    ("OUTPUT_QUALITY_SCORE:", 2),
    ("INSTRUCTION_FOLLOWING_SCORE:", 3),
    ("HALLUCINATION_FREE_SCORE:", 4),
    ("ERROR_HANDLING_SCORE:", 5),
];

/// Parse the oracle's fixed-format response.
///
/// This treats the response as an untrusted external format: every field
/// has an explicit default (sub-scores fall back to [`NEUTRAL_SCORE`]) and
/// nothing here ever fails. Unrecognized lines are ignored.
pub fn parse_evaluation(text: &str) -> ParsedEvaluation {
    let mut values = [NEUTRAL_SCORE; 6];
    let mut reasoning = String::new();
    let mut suggestions: Vec<String> = Vec::new();
    let mut failure_detected = false;
    let mut failure_reason: Option<String> = None;
    let mut in_suggestions = false;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some((rest, slot)) = SCORE_MARKERS
            .iter()
            .find_map(|(marker, slot)| strip_marker(line, marker).map(|rest| (rest, *slot)))
        {
            if let Some(score) = parse_score(rest) {
                values[slot] = score;
            }
            in_suggestions = false;
            continue;
        }

        if let Some(rest) = strip_marker(line, "REASONING:") {
            reasoning = rest.trim().to_string();
            in_suggestions = false;
            continue;
        }

        if strip_marker(line, "SUGGESTIONS:").is_some() {
            in_suggestions = true;
            continue;
        }

        if let Some(rest) = strip_marker(line, "FAILURE_DETECTED:") {
            failure_detected = rest.trim().eq_ignore_ascii_case("true");
            in_suggestions = false;
            continue;
        }

        if let Some(rest) = strip_marker(line, "FAILURE_REASON:") {
            let rest = rest.trim();
            if !rest.is_empty() {
                failure_reason = Some(rest.to_string());
            }
            in_suggestions = false;
            continue;
        }

        if in_suggestions {
            if let Some(item) = line.strip_prefix("- ") {
                suggestions.push(item.trim().to_string());
            }
        }
    }

    debug!(
        reasoning_len = reasoning.len(),
        suggestions = suggestions.len(),
        failure_detected,
        "Parsed oracle evaluation"
    );

    ParsedEvaluation {
        scores: CriterionScores {
            task_achievement: values[0],
            context_utilization: values[1],
            output_quality: values[2],
            instruction_following: values[3],
            hallucination_free: values[4],
            error_handling: values[5],
        },
        reasoning,
        suggestions,
        failure_detected,
        failure_reason,
    }
}

/// Case-insensitive marker match at the start of a line.
fn strip_marker<'a>(line: &'a str, marker: &str) -> Option<&'a str> {
    let head = line.get(..marker.len())?;
    head.eq_ignore_ascii_case(marker)
        .then(|| &line[marker.len()..])
}

/// Parse a score value, clamped into [1, 10]. Tolerates trailing prose
/// ("8 - solid work") by reading the leading number only.
fn parse_score(rest: &str) -> Option<f64> {
    let rest = rest.trim();
    let numeric: String = rest
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    numeric.parse::<f64>().ok().map(|v| v.clamp(1.0, 10.0))
}
