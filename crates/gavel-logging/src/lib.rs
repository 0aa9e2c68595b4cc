//! # gavel-logging
//!
//! Logging for gavel judge runs.
//!
//! This crate provides structured JSONL event logging plus tracing
//! initialization.
//!
//! ## Key Types
//!
//! - [`Logger`] - Structured event logging
//! - [`JudgeEvent`] - Log event types

mod events;

pub use events::{JudgeEvent, Logger};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize tracing for the application
pub fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(false))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false))
            .init();
    }
}
