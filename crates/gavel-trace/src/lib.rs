//! # gavel-trace
//!
//! Trace ingestion for gavel: the workflow event model, JSONL trace parsing,
//! a directory-backed trace store, span reconstruction with nearest-span
//! attribution, and the normalizer that folds an ordered event stream into
//! per-agent execution records.
//!
//! The trace is read-only input produced by the external workflow engine.
//! `sequence_num` is the sole ordering authority; every piece of attribution
//! logic in this crate depends on it being monotonic.

mod normalizer;
mod parser;
mod search;
mod spans;
mod store;
mod types;

pub use normalizer::normalize_events;
pub use parser::{parse_trace, parse_trace_reader};
pub use search::search_events;
pub use spans::{AgentSpan, SpanIndex};
pub use store::TraceStore;
pub use types::{AgentExecutionRecord, EventType, ToolCallRecord, Trace, TraceEvent};
