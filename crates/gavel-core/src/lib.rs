//! # gavel-core
//!
//! Orchestration for gavel judge runs: wires the trace normalizer, the
//! chunked evaluator, the context-flow analyzer, and the report and plan
//! generators into one pipeline. Each run is a pure function of the trace,
//! the configuration, and the scoring oracle; nothing mutable is shared
//! across runs.

mod config;
mod error;
mod runner;

pub use config::{JudgeConfig, JudgeConfigFile};
pub use error::JudgeError;
pub use runner::JudgeRunner;
