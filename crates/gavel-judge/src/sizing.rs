use gavel_oracle::{OracleConfig, ScoringOracle};
use tracing::debug;

/// How a piece of content should be presented to the oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizingAction {
    /// Fits as-is
    Inline,
    /// Too big to inline, small enough for one bounded summary
    Summarize,
    /// Needs to be split into overlapping chunks
    Chunk,
}

/// Size thresholds deciding inline vs summarize vs chunk.
#[derive(Debug, Clone)]
pub struct SizingPolicy {
    pub inline_max: usize,
    pub summarize_max: usize,
}

impl Default for SizingPolicy {
    fn default() -> Self {
        Self {
            inline_max: 4_000,
            summarize_max: 16_000,
        }
    }
}

impl SizingPolicy {
    pub fn classify(&self, text: &str) -> SizingAction {
        if text.len() <= self.inline_max {
            SizingAction::Inline
        } else if text.len() <= self.summarize_max {
            SizingAction::Summarize
        } else {
            SizingAction::Chunk
        }
    }
}

/// Marker inserted by [`smart_truncate`]; its presence means both ends of
/// the content survived.
const SMART_MARKER: &str = "smart truncation";
/// Marker prefixed to oracle summaries by [`oracle_summarize`].
const SUMMARY_MARKER: &str = "llm summary";

/// Only short texts get the structural unbalanced-bracket check; longer
/// texts legitimately open structures they close much later.
const STRUCTURAL_CHECK_MAX: usize = 500;

/// Detect whether text shows signs of lossy truncation.
///
/// Safe markers win over hard markers: content produced by smart truncation
/// or oracle summarization preserved both extremities (or a compressed
/// restatement) even though it also mentions truncation. These are
/// structural signals of a cut string, not content judgments.
pub fn is_lossy_truncation(text: &str) -> bool {
    let lower = text.to_lowercase();

    if lower.contains(SMART_MARKER) || lower.contains(SUMMARY_MARKER) {
        return false;
    }

    if lower.contains("[truncated]") || lower.contains("(truncated)") {
        return true;
    }

    if text.len() < STRUCTURAL_CHECK_MAX {
        let trimmed = text.trim_start();
        if let Some(first) = trimmed.chars().next() {
            let (open, close) = match first {
                '[' => ('[', ']'),
                '{' => ('{', '}'),
                _ => return false,
            };
            let opens = trimmed.chars().filter(|&c| c == open).count();
            let closes = trimmed.chars().filter(|&c| c == close).count();
            return opens > closes;
        }
    }

    false
}

/// Truncate to `max_chars` keeping the first 60% and last 30% of the budget
/// verbatim, with a marker naming what was elided in between.
///
/// The 60/30/10 split is a fixed policy constant. Budgets are in bytes with
/// cuts snapped to character boundaries.
pub fn smart_truncate(text: &str, max_chars: usize) -> String {
    if text.len() <= max_chars {
        return text.to_string();
    }

    let head_end = floor_char_boundary(text, max_chars * 6 / 10);
    let tail_start = ceil_char_boundary(text, text.len() - max_chars * 3 / 10);

    let elided = &text[head_end..tail_start];
    let elided_lines = elided.lines().count();

    format!(
        "{}\n\n[... smart truncation: {} chars, {} lines elided ...]\n\n{}",
        &text[..head_end],
        elided.len(),
        elided_lines,
        &text[tail_start..]
    )
}

/// Ask the oracle for a bounded summary, falling back to [`smart_truncate`]
/// on any failure. Strictly best-effort: never returns an error.
pub async fn oracle_summarize(
    oracle: &dyn ScoringOracle,
    config: &OracleConfig,
    text: &str,
    max_chars: usize,
) -> String {
    if text.len() <= max_chars {
        return text.to_string();
    }

    let prompt = format!(
        "Summarize the following content in at most {} characters. \
         Preserve key facts, names, and conclusions. Reply with the summary only.\n\n{}",
        max_chars, text
    );

    let call = oracle.score(&prompt, config);
    match tokio::time::timeout(config.timeout, call).await {
        Ok(Ok(summary)) => {
            let summary = summary.trim();
            let prefixed = format!("[LLM summary] {}", summary);
            if !summary.is_empty() && prefixed.len() <= max_chars {
                return prefixed;
            }
            debug!(
                summary_len = summary.len(),
                max_chars, "Oracle summary unusable, falling back to smart truncation"
            );
            smart_truncate(text, max_chars)
        }
        Ok(Err(e)) => {
            debug!(error = %e, "Oracle summarization failed, falling back to smart truncation");
            smart_truncate(text, max_chars)
        }
        Err(_) => {
            debug!("Oracle summarization timed out, falling back to smart truncation");
            smart_truncate(text, max_chars)
        }
    }
}

/// Largest character boundary at or below `index`.
pub(crate) fn floor_char_boundary(text: &str, index: usize) -> usize {
    let mut index = index.min(text.len());
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

/// Smallest character boundary at or above `index`.
pub(crate) fn ceil_char_boundary(text: &str, index: usize) -> usize {
    let mut index = index.min(text.len());
    while !text.is_char_boundary(index) {
        index += 1;
    }
    index
}
