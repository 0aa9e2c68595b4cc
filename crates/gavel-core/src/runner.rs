use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, warn};

use gavel_judge::sizing::is_lossy_truncation;
use gavel_judge::{ChunkedEvaluator, ContextEffectivenessScore};
use gavel_logging::{JudgeEvent, Logger};
use gavel_oracle::ScoringOracle;
use gavel_report::{
    analyze_flows, apply_plan, generate_plan, synthesize_report, DocumentLayout, DocumentStore,
    JudgePlan, JudgeReport, PlanApplyReport,
};
use gavel_trace::{normalize_events, Trace};

use crate::config::JudgeConfig;
use crate::error::JudgeError;

/// Orchestrates a full judge run: trace in, report (and optionally a fix
/// plan) out.
///
/// Per-agent evaluations run concurrently; there is no shared mutable state
/// between them. The only exclusive operation is plan application, and the
/// single-writer discipline for the target document is the caller's
/// responsibility.
pub struct JudgeRunner {
    oracle: Arc<dyn ScoringOracle>,
    config: JudgeConfig,
    logger: Arc<Logger>,
}

impl JudgeRunner {
    pub fn new(oracle: Arc<dyn ScoringOracle>, config: JudgeConfig) -> Self {
        Self {
            oracle,
            config,
            logger: Arc::new(Logger::new()),
        }
    }

    pub fn with_logger(mut self, logger: Arc<Logger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn config(&self) -> &JudgeConfig {
        &self.config
    }

    /// Run the full analysis pipeline over one trace.
    ///
    /// Never fails: oracle trouble degrades scores to neutral, malformed
    /// trace content degrades evaluation quality, and the report always
    /// comes out complete.
    pub async fn run(&self, trace: &Trace, goal: &str) -> JudgeReport {
        let records = normalize_events(&trace.events, &is_lossy_truncation);

        self.logger.log(&JudgeEvent::RunStarted {
            trace_id: Some(trace.id.clone()),
            agent_count: records.len(),
        });

        let evaluator = Arc::new(ChunkedEvaluator::new(
            self.oracle.clone(),
            self.config.oracle.clone(),
            self.config.evaluator.clone(),
        ));

        let mut set: JoinSet<ContextEffectivenessScore> = JoinSet::new();
        for record in records.values() {
            let evaluator = evaluator.clone();
            let record = record.clone();
            let goal = goal.to_string();
            set.spawn(async move { evaluator.evaluate(&record, &goal).await });
        }

        let mut agent_scores: BTreeMap<String, ContextEffectivenessScore> = BTreeMap::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(score) => {
                    self.logger.log(&JudgeEvent::AgentEvaluated {
                        agent: score.agent_name.clone(),
                        overall_score: score.overall_score,
                        chunked: score.chunked,
                        chunk_count: score.chunk_count,
                    });
                    agent_scores.insert(score.agent_name.clone(), score);
                }
                Err(e) => warn!(error = %e, "Agent evaluation task failed"),
            }
        }

        let flow_evaluations = analyze_flows(&records);
        self.logger.log(&JudgeEvent::FlowAnalyzed {
            pairs: flow_evaluations.len(),
            losses: flow_evaluations
                .iter()
                .filter(|f| f.content_loss_detected)
                .count(),
        });

        let report = synthesize_report(
            goal,
            Some(trace.id.clone()),
            &records,
            agent_scores,
            flow_evaluations,
        );

        self.logger.log(&JudgeEvent::ReportSynthesized {
            report_id: report.report_id.clone(),
            overall_score: report.overall_score,
            failure_count: report.failure_count,
        });

        report
    }

    /// Derive a fix plan for the workflow's definition document.
    pub fn generate_plan(
        &self,
        report: &JudgeReport,
        target_document: &Path,
        layout: DocumentLayout,
    ) -> JudgePlan {
        let plan = generate_plan(report, target_document, layout);
        self.logger.log(&JudgeEvent::PlanGenerated {
            fix_count: plan.fixes.len(),
            overall_score: plan.overall_score,
        });
        plan
    }

    /// Apply a fix plan through the given document store.
    pub fn apply_plan(
        &self,
        plan: &JudgePlan,
        store: &dyn DocumentStore,
    ) -> Result<PlanApplyReport, JudgeError> {
        debug!(fixes = plan.fixes.len(), document = %plan.target_document.display(), "Applying fix plan");
        let result = apply_plan(plan, store)?;
        for fix_result in &result.results {
            self.logger.log(&JudgeEvent::FixApplied {
                fix_id: fix_result.fix_id.clone(),
                target_path: fix_result.target_path.clone(),
                success: fix_result.success,
            });
        }
        Ok(result)
    }
}
