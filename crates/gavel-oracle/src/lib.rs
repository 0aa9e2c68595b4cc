//! # gavel-oracle
//!
//! The scoring oracle abstraction for gavel.
//!
//! An oracle is the external language-model service that scores an evaluation
//! prompt. It is treated as an untrusted, fallible dependency: callers must
//! never assume a call succeeds and always keep a fallback on hand. Retries,
//! rate limiting, and model routing are the implementor's concern.

mod traits;

pub use traits::{OracleConfig, OracleError, ScoringOracle};
