use regex::Regex;
use tracing::warn;

use crate::types::TraceEvent;

/// Search events by a caller-supplied pattern.
///
/// The pattern is compiled as a regular expression; an invalid pattern falls
/// back to literal substring matching instead of erroring. Matching is done
/// against the agent name and the serialized payload.
pub fn search_events<'a>(events: &'a [TraceEvent], pattern: &str) -> Vec<&'a TraceEvent> {
    match Regex::new(pattern) {
        Ok(re) => events
            .iter()
            .filter(|e| re.is_match(&haystack(e)))
            .collect(),
        Err(e) => {
            warn!(pattern, error = %e, "Invalid search pattern, falling back to literal match");
            events
                .iter()
                .filter(|e| haystack(e).contains(pattern))
                .collect()
        }
    }
}

fn haystack(event: &TraceEvent) -> String {
    format!(
        "{} {}",
        event.agent_name.as_deref().unwrap_or(""),
        event.payload
    )
}
