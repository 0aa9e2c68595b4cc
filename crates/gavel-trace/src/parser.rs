use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result};

use crate::types::{Trace, TraceEvent};

/// Parse a single JSONL trace file into a fully-loaded Trace.
pub fn parse_trace(path: &Path) -> Result<Trace> {
    let id = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown")
        .to_string();

    let file =
        File::open(path).with_context(|| format!("Failed to open trace file: {:?}", path))?;
    let events = parse_trace_reader(BufReader::new(file))?;

    Ok(Trace { id, events })
}

/// Parse trace events from any reader, one JSON event per line.
///
/// Blank lines are skipped. Events are sorted by `sequence_num` after
/// loading so downstream attribution never sees an unsorted stream, even
/// from producers that interleave writers.
pub fn parse_trace_reader<R: Read>(reader: BufReader<R>) -> Result<Vec<TraceEvent>> {
    let mut events: Vec<TraceEvent> = Vec::new();

    for line in reader.lines() {
        let line = line.with_context(|| "Failed to read line from trace file")?;
        if line.trim().is_empty() {
            continue;
        }

        let event: TraceEvent = serde_json::from_str(&line).with_context(|| {
            format!(
                "Failed to parse trace event: {}",
                &line[..line.len().min(100)]
            )
        })?;
        events.push(event);
    }

    events.sort_by_key(|e| e.sequence_num);

    Ok(events)
}
