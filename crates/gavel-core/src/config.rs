//! Run configuration for gavel.
//!
//! Loads overrides from `gavel.toml` in a given directory and merges them
//! over built-in defaults.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use gavel_judge::{AggregationStrategy, EvaluationMode, EvaluatorSettings};
use gavel_oracle::OracleConfig;
use serde::Deserialize;

/// The config file name
pub const CONFIG_FILE_NAME: &str = "gavel.toml";

/// Runtime configuration for a judge run.
#[derive(Debug, Clone, Default)]
pub struct JudgeConfig {
    pub evaluator: EvaluatorSettings,
    pub oracle: OracleConfig,
}

/// Raw `gavel.toml` contents.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct JudgeConfigFile {
    /// Aggregation strategy name (see gavel-judge)
    pub aggregation: Option<String>,
    /// Evaluation mode: context, memory, or knowledge
    pub mode: Option<String>,
    #[serde(default)]
    pub sizing: SizingSection,
    #[serde(default)]
    pub chunking: ChunkingSection,
    #[serde(default)]
    pub oracle: OracleSection,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct SizingSection {
    pub inline_max: Option<usize>,
    pub summarize_max: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ChunkingSection {
    pub threshold: Option<usize>,
    pub max_chars: Option<usize>,
    pub max_chunks: Option<usize>,
    pub overlap: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct OracleSection {
    pub timeout_secs: Option<u64>,
    pub model: Option<String>,
    pub max_concurrency: Option<usize>,
}

impl JudgeConfigFile {
    /// Load configuration from the given directory.
    ///
    /// Returns:
    /// - `Ok(Some(config))` if the file exists and parses successfully
    /// - `Ok(None)` if the file does not exist
    /// - `Err(...)` if the file exists but fails to parse (hard error)
    pub fn load(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        let config: JudgeConfigFile = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        Ok(Some(config))
    }

    /// Merge file overrides over the built-in defaults.
    pub fn into_config(self) -> Result<JudgeConfig> {
        let mut config = JudgeConfig::default();

        if let Some(aggregation) = self.aggregation {
            config.evaluator.strategy = aggregation
                .parse::<AggregationStrategy>()
                .map_err(anyhow::Error::msg)?;
        }
        if let Some(mode) = self.mode {
            config.evaluator.mode = mode.parse::<EvaluationMode>().map_err(anyhow::Error::msg)?;
        }

        if let Some(inline_max) = self.sizing.inline_max {
            config.evaluator.sizing.inline_max = inline_max;
        }
        if let Some(summarize_max) = self.sizing.summarize_max {
            config.evaluator.sizing.summarize_max = summarize_max;
        }

        if let Some(threshold) = self.chunking.threshold {
            config.evaluator.chunk_threshold = threshold;
        }
        if let Some(max_chars) = self.chunking.max_chars {
            config.evaluator.max_chars = max_chars;
        }
        if let Some(max_chunks) = self.chunking.max_chunks {
            config.evaluator.max_chunks = max_chunks;
        }
        if let Some(overlap) = self.chunking.overlap {
            config.evaluator.overlap = overlap;
        }

        if let Some(timeout_secs) = self.oracle.timeout_secs {
            config.oracle.timeout = Duration::from_secs(timeout_secs);
        }
        config.oracle.model = self.oracle.model;
        if let Some(max_concurrency) = self.oracle.max_concurrency {
            config.oracle.max_concurrency = max_concurrency.max(1);
        }

        Ok(config)
    }
}

impl JudgeConfig {
    /// Load from `gavel.toml` in `dir`, falling back to defaults when the
    /// file is absent.
    pub fn load(dir: &Path) -> Result<Self> {
        match JudgeConfigFile::load(dir)? {
            Some(file) => file.into_config(),
            None => Ok(Self::default()),
        }
    }
}
