use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::report::JudgeReport;

/// Sub-scores below this generate a fix.
const FIX_THRESHOLD: f64 = 6.0;
/// Confidence never exceeds this, however severe the score.
const CONFIDENCE_CAP: f64 = 0.95;

/// The kind of document edit a fix performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixType {
    /// Concatenate guidance onto the existing instruction text
    AppendInstruction,
    /// Replace the instruction text outright
    RewriteInstruction,
    /// Point the agent at an additional context source
    AddContextSource,
}

impl FixType {
    /// Base confidence per fix type; the severity boost stacks on top.
    pub fn base_confidence(self) -> f64 {
        match self {
            FixType::AppendInstruction => 0.6,
            FixType::RewriteInstruction => 0.5,
            FixType::AddContextSource => 0.55,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FixPriority {
    High,
    Medium,
    Low,
}

/// Confidence for a fix: base by type plus a linear severity boost, capped.
/// Lower scores produce higher-confidence fixes.
pub fn fix_confidence(fix_type: FixType, score: f64) -> f64 {
    let boost = if score <= 3.0 {
        0.3
    } else if score <= 5.0 {
        0.15
    } else {
        0.0
    };
    (fix_type.base_confidence() + boost).min(CONFIDENCE_CAP)
}

pub fn fix_priority(score: f64) -> FixPriority {
    if score <= 3.0 {
        FixPriority::High
    } else if score <= 5.0 {
        FixPriority::Medium
    } else {
        FixPriority::Low
    }
}

/// One targeted, path-addressed edit to the workflow's definition document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionableFix {
    pub id: String,
    pub agent_name: String,
    pub fix_type: FixType,
    /// Dotted path into the target document; numeric segments index
    /// sequences.
    pub target_path: String,
    pub current_value: Option<String>,
    pub suggested_value: String,
    pub reasoning: String,
    pub confidence: f64,
    pub priority: FixPriority,
}

/// Ordered fixes plus provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgePlan {
    pub fixes: Vec<ActionableFix>,
    pub source_trace_id: Option<String>,
    pub target_document: PathBuf,
    /// Overall report score at generation time
    pub overall_score: f64,
    pub generated_at: DateTime<Utc>,
}

/// How agents are keyed in the target document. Each layout carries its own
/// path templates; nothing below branches on the document itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentLayout {
    /// Agents split across `roles.<name>` and `tasks.<name>` sections
    RoleTask,
    /// Agents defined flat under `agents.<name>`
    FlatAgents,
}

struct PathTemplates {
    task: &'static str,
    context: &'static str,
    output: &'static str,
}

const ROLE_TASK_PATHS: PathTemplates = PathTemplates {
    task: "tasks.{agent}.description",
    context: "tasks.{agent}.context",
    output: "tasks.{agent}.expected_output",
};

const FLAT_AGENT_PATHS: PathTemplates = PathTemplates {
    task: "agents.{agent}.instructions",
    context: "agents.{agent}.context",
    output: "agents.{agent}.output_format",
};

impl DocumentLayout {
    fn templates(self) -> &'static PathTemplates {
        match self {
            DocumentLayout::RoleTask => &ROLE_TASK_PATHS,
            DocumentLayout::FlatAgents => &FLAT_AGENT_PATHS,
        }
    }
}

fn render_path(template: &str, agent: &str) -> String {
    template.replace("{agent}", agent)
}

/// Derive a fix plan from a report: one fix per failing criterion among
/// task achievement, context utilization, and output quality.
pub fn generate_plan(
    report: &JudgeReport,
    target_document: &Path,
    layout: DocumentLayout,
) -> JudgePlan {
    let templates = layout.templates();
    let mut fixes: Vec<ActionableFix> = Vec::new();

    for (agent, score) in &report.agent_scores {
        let task = score.scores.task_achievement;
        if task < FIX_THRESHOLD {
            fixes.push(make_fix(
                agent,
                FixType::AppendInstruction,
                render_path(templates.task, agent),
                "Be explicit about the final deliverable. List each required outcome and verify \
                 all of them are present before finishing.",
                format!("task_achievement scored {:.1}, below {:.0}", task, FIX_THRESHOLD),
                task,
            ));
        }

        let context = score.scores.context_utilization;
        if context < FIX_THRESHOLD {
            fixes.push(make_fix(
                agent,
                FixType::AddContextSource,
                render_path(templates.context, agent),
                "Include the upstream agent's full output in this agent's context rather than a \
                 paraphrase.",
                format!(
                    "context_utilization scored {:.1}, below {:.0}",
                    context, FIX_THRESHOLD
                ),
                context,
            ));
        }

        let quality = score.scores.output_quality;
        if quality < FIX_THRESHOLD {
            fixes.push(make_fix(
                agent,
                FixType::RewriteInstruction,
                render_path(templates.output, agent),
                "A structured deliverable with explicit sections for findings, evidence, and \
                 open questions.",
                format!("output_quality scored {:.1}, below {:.0}", quality, FIX_THRESHOLD),
                quality,
            ));
        }
    }

    info!(
        fixes = fixes.len(),
        overall_score = report.overall_score,
        "Generated fix plan"
    );

    JudgePlan {
        fixes,
        source_trace_id: report.trace_id.clone(),
        target_document: target_document.to_path_buf(),
        overall_score: report.overall_score,
        generated_at: Utc::now(),
    }
}

fn make_fix(
    agent: &str,
    fix_type: FixType,
    target_path: String,
    suggested_value: &str,
    reasoning: String,
    score: f64,
) -> ActionableFix {
    ActionableFix {
        id: Uuid::new_v4().to_string(),
        agent_name: agent.to_string(),
        fix_type,
        target_path,
        current_value: None,
        suggested_value: suggested_value.to_string(),
        reasoning,
        confidence: fix_confidence(fix_type, score),
        priority: fix_priority(score),
    }
}
