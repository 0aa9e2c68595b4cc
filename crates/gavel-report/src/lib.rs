//! # gavel-report
//!
//! The reporting half of gavel: the context-flow analyzer that estimates
//! whether each agent's output reached the next agent's input, the report
//! synthesizer, the fix-plan generator that turns weak scores into
//! path-addressed document edits, plan application against a document
//! store, and JSON persistence of finished reports.

mod apply;
mod fixplan;
mod flow;
mod report;
mod store;

pub use apply::{
    apply_plan, ApplyError, DocumentStore, FixApplyResult, JsonDocumentStore, PlanApplyReport,
    YamlDocumentStore,
};
pub use fixplan::{
    fix_confidence, fix_priority, generate_plan, ActionableFix, DocumentLayout, FixPriority,
    FixType, JudgePlan,
};
pub use flow::{analyze_flows, ContextFlowEvaluation};
pub use report::{synthesize_report, JudgeReport};
pub use store::ReportStore;
