use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::report::JudgeReport;

/// Persists finished reports as JSON files under an explicit directory
/// handle. No ambient process-wide state: callers decide where reports
/// live, tests point it at a temp dir.
pub struct ReportStore {
    reports_dir: PathBuf,
}

impl ReportStore {
    /// Create a ReportStore using the default reports directory.
    pub fn new() -> Result<Self> {
        let data_dir = dirs::data_dir().with_context(|| "Could not determine data directory")?;
        let reports_dir = data_dir.join("gavel").join("reports");
        Ok(Self { reports_dir })
    }

    /// Create a ReportStore with a custom directory (useful for testing).
    pub fn with_dir(reports_dir: PathBuf) -> Self {
        Self { reports_dir }
    }

    pub fn reports_dir(&self) -> &Path {
        &self.reports_dir
    }

    /// Persist a report, returning the written path.
    pub fn save(&self, report: &JudgeReport) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.reports_dir)
            .with_context(|| format!("Failed to create reports dir: {:?}", self.reports_dir))?;

        let path = self.reports_dir.join(format!("{}.json", report.report_id));
        let content = serde_json::to_string_pretty(report)
            .with_context(|| "Failed to serialize report")?;
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write report: {:?}", path))?;

        Ok(path)
    }

    /// Load a report by ID.
    pub fn load(&self, report_id: &str) -> Result<JudgeReport> {
        let path = self.reports_dir.join(format!("{}.json", report_id));
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read report: {:?}", path))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse report: {:?}", path))
    }

    /// List report IDs, newest first by file name.
    pub fn list(&self) -> Result<Vec<String>> {
        if !self.reports_dir.exists() {
            return Ok(Vec::new());
        }

        let mut ids: Vec<String> = Vec::new();

        let entries = std::fs::read_dir(&self.reports_dir)
            .with_context(|| format!("Failed to read reports dir: {:?}", self.reports_dir))?;

        for entry in entries {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::warn!("Failed to read reports dir entry: {}", e);
                    continue;
                }
            };
            let path = entry.path();

            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }

            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                ids.push(stem.to_string());
            }
        }

        ids.sort_by(|a, b| b.cmp(a));

        Ok(ids)
    }
}
