use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during an oracle call
#[derive(Error, Debug)]
pub enum OracleError {
    #[error("Oracle call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Oracle transport error: {0}")]
    Transport(String),

    #[error("Oracle returned malformed output: {0}")]
    Malformed(String),

    #[error("Oracle unavailable: {0}")]
    Unavailable(String),
}

/// Configuration for oracle calls
#[derive(Debug, Clone)]
pub struct OracleConfig {
    /// Upper bound on a single call. Enforced by the caller wrapping the
    /// call; implementations may additionally enforce it themselves.
    pub timeout: Duration,
    /// Model to use (if the oracle supports selection)
    pub model: Option<String>,
    /// Maximum concurrent in-flight calls the caller should issue
    pub max_concurrency: usize,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            model: None,
            max_concurrency: 4,
        }
    }
}

impl OracleConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_model(mut self, model: String) -> Self {
        self.model = Some(model);
        self
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }
}

/// The core abstraction over an external scoring model.
///
/// The oracle is stateless from the caller's perspective: one prompt in, one
/// free-text response out. Response format is negotiated in the prompt, not
/// in this interface.
#[async_trait]
pub trait ScoringOracle: Send + Sync {
    /// Human-readable name of the oracle (e.g., "anthropic", "ollama")
    fn name(&self) -> &str;

    /// Score a single prompt, returning the raw response text
    async fn score(&self, prompt: &str, config: &OracleConfig) -> Result<String, OracleError>;
}
