use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::parser::parse_trace;
use crate::types::Trace;

/// Provides access to trace files on disk.
pub struct TraceStore {
    traces_dir: PathBuf,
}

impl TraceStore {
    /// Create a new TraceStore using the default traces directory.
    pub fn new() -> Result<Self> {
        let data_dir = dirs::data_dir().with_context(|| "Could not determine data directory")?;
        let traces_dir = data_dir.join("gavel").join("traces");
        Ok(Self { traces_dir })
    }

    /// Create a TraceStore with a custom directory (useful for testing).
    pub fn with_dir(traces_dir: PathBuf) -> Self {
        Self { traces_dir }
    }

    pub fn traces_dir(&self) -> &PathBuf {
        &self.traces_dir
    }

    /// List trace IDs, newest first by file name.
    ///
    /// Non-jsonl files are ignored; unreadable entries are skipped with a
    /// warning rather than failing the whole listing.
    pub fn list(&self) -> Result<Vec<String>> {
        if !self.traces_dir.exists() {
            return Ok(Vec::new());
        }

        let mut ids: Vec<String> = Vec::new();

        let entries = std::fs::read_dir(&self.traces_dir)
            .with_context(|| format!("Failed to read traces dir: {:?}", self.traces_dir))?;

        for entry in entries {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::warn!("Failed to read traces dir entry: {}", e);
                    continue;
                }
            };
            let path = entry.path();

            if path.extension().and_then(|s| s.to_str()) != Some("jsonl") {
                continue;
            }

            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                ids.push(stem.to_string());
            }
        }

        ids.sort_by(|a, b| b.cmp(a));

        Ok(ids)
    }

    /// Load a fully parsed trace by ID.
    pub fn get(&self, id: &str) -> Result<Trace> {
        let path = self.traces_dir.join(format!("{}.jsonl", id));
        parse_trace(&path)
    }
}
