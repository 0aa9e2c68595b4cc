use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

/// Structured log events for a judge run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum JudgeEvent {
    RunStarted {
        trace_id: Option<String>,
        agent_count: usize,
    },
    AgentEvaluated {
        agent: String,
        overall_score: f64,
        chunked: bool,
        chunk_count: usize,
    },
    FlowAnalyzed {
        pairs: usize,
        losses: usize,
    },
    ReportSynthesized {
        report_id: String,
        overall_score: f64,
        failure_count: usize,
    },
    PlanGenerated {
        fix_count: usize,
        overall_score: f64,
    },
    FixApplied {
        fix_id: String,
        target_path: String,
        success: bool,
    },
}

impl JudgeEvent {
    /// Add a timestamp to serialize with the event
    fn with_timestamp(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or_default();
        if let Some(obj) = value.as_object_mut() {
            obj.insert(
                "timestamp".to_string(),
                serde_json::Value::String(chrono::Utc::now().to_rfc3339()),
            );
        }
        value
    }
}

/// Logger for gavel events - mirrors every event to `tracing` and
/// optionally appends JSON lines to a file.
pub struct Logger {
    file_writer: Option<Mutex<File>>,
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

impl Logger {
    pub fn new() -> Self {
        Self { file_writer: None }
    }

    /// Create a logger with file output in addition to tracing
    pub fn with_file(log_path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        Ok(Self {
            file_writer: Some(Mutex::new(file)),
        })
    }

    pub fn log(&self, event: &JudgeEvent) {
        if let Some(ref writer) = self.file_writer {
            if let Ok(mut file) = writer.lock() {
                let json = event.with_timestamp();
                let _ = writeln!(file, "{}", json);
            }
        }

        match event {
            JudgeEvent::RunStarted {
                trace_id,
                agent_count,
            } => tracing::info!(
                trace_id = trace_id.as_deref().unwrap_or("-"),
                agent_count = *agent_count,
                "judge run started"
            ),
            JudgeEvent::AgentEvaluated {
                agent,
                overall_score,
                chunked,
                chunk_count,
            } => tracing::info!(
                agent = %agent,
                overall_score = *overall_score,
                chunked = *chunked,
                chunk_count = *chunk_count,
                "agent evaluated"
            ),
            JudgeEvent::FlowAnalyzed { pairs, losses } => {
                tracing::info!(pairs = *pairs, losses = *losses, "context flow analyzed")
            }
            JudgeEvent::ReportSynthesized {
                report_id,
                overall_score,
                failure_count,
            } => tracing::info!(
                report_id = %report_id,
                overall_score = *overall_score,
                failure_count = *failure_count,
                "report synthesized"
            ),
            JudgeEvent::PlanGenerated {
                fix_count,
                overall_score,
            } => tracing::info!(
                fix_count = *fix_count,
                overall_score = *overall_score,
                "fix plan generated"
            ),
            JudgeEvent::FixApplied {
                fix_id,
                target_path,
                success,
            } => tracing::info!(
                fix_id = %fix_id,
                target_path = %target_path,
                success = *success,
                "fix applied"
            ),
        }
    }
}
